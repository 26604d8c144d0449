use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A weighted rectangle, relative to the window origin at scale 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub weight: f32,
}

impl WeightedRect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32, weight: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            weight,
        }
    }
}

/// The rectangles of one stump, tagged by the table they are summed over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureSet {
    /// Axis-aligned rectangles, summed over the upright integral image.
    Upright(Vec<WeightedRect>),
    /// 45 degree rotated rectangles, summed over the rotated integral image.
    Tilted(Vec<WeightedRect>),
}

impl FeatureSet {
    pub fn is_tilted(&self) -> bool {
        matches!(self, FeatureSet::Tilted(_))
    }

    pub fn rects(&self) -> &[WeightedRect] {
        match self {
            FeatureSet::Upright(rects) | FeatureSet::Tilted(rects) => rects,
        }
    }
}

/// A depth-one decision tree over a Haar-like feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stump {
    pub threshold: f32,
    pub left_val: f32,
    pub right_val: f32,
    pub features: FeatureSet,
}

impl Stump {
    pub fn new(threshold: f32, left_val: f32, right_val: f32, features: FeatureSet) -> Self {
        Self {
            threshold,
            left_val,
            right_val,
            features,
        }
    }

    /// Leaf value for an area-normalized feature response.
    ///
    /// The threshold is trained on variance-normalized windows, so it is
    /// scaled by the window's standard deviation instead of normalizing
    /// every pixel.
    #[inline]
    pub fn predict(&self, normalized_sum: f64, std_dev: f64) -> f64 {
        if normalized_sum < self.threshold as f64 * std_dev {
            self.left_val as f64
        } else {
            self.right_val as f64
        }
    }
}

/// A boosted group of stumps acting as one rejection checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub threshold: f32,
    pub stumps: Vec<Stump>,
}

impl Stage {
    pub fn new(threshold: f32, stumps: Vec<Stump>) -> Self {
        Self { threshold, stumps }
    }

    /// Sum of all stump votes.
    ///
    /// `feature_sum` returns the area-normalized feature response of a
    /// stump's feature set for the current window.
    pub fn score<F>(&self, std_dev: f64, feature_sum: F) -> f64
    where
        F: Fn(&FeatureSet) -> f64,
    {
        self.stumps
            .iter()
            .map(|stump| stump.predict(feature_sum(&stump.features), std_dev))
            .sum()
    }

    pub fn passes<F>(&self, std_dev: f64, feature_sum: F) -> bool
    where
        F: Fn(&FeatureSet) -> f64,
    {
        self.score(std_dev, feature_sum) >= self.threshold as f64
    }
}

/// A trained cascade of boosted stages.
///
/// A window is accepted only if it passes every stage; evaluation stops at
/// the first stage it fails. The classifier is immutable once built and can
/// be shared between threads.
///
/// # Usage
///
/// ```ignore
/// let cascade = cascade_detect::interchange::load_cascade("frontalface.json")?;
/// cascade.save("frontalface.bin")?;
/// let same = CascadeClassifier::load("frontalface.bin")?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeClassifier {
    /// Base window size (width, height) the cascade was trained at.
    size: (u32, u32),

    /// Whether any stump uses tilted features.
    tilted: bool,

    stages: Vec<Stage>,
}

impl CascadeClassifier {
    /// Create a cascade without validation. Prefer [`CascadeBuilder`].
    pub fn new(size: (u32, u32), stages: Vec<Stage>) -> Self {
        let tilted = stages
            .iter()
            .flat_map(|stage| stage.stumps.iter())
            .any(|stump| stump.features.is_tilted());
        Self {
            size,
            tilted,
            stages,
        }
    }

    /// Load a cascade from the native binary format.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let cascade: Self = bincode::deserialize(&bytes)?;
        validate(&cascade)?;
        Ok(cascade)
    }

    /// Save the cascade in the native binary format.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        let bytes = bincode::serialize(self)?;
        writer.write_all(&bytes)?;
        Ok(())
    }

    /// Base window width and height.
    pub fn window_size(&self) -> (u32, u32) {
        self.size
    }

    /// True when the rotated integral image is needed.
    pub fn is_tilted(&self) -> bool {
        self.tilted
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn num_stages(&self) -> usize {
        self.stages.len()
    }

    pub fn num_stumps(&self) -> usize {
        self.stages.iter().map(|s| s.stumps.len()).sum()
    }

    pub fn num_features(&self) -> usize {
        self.stages
            .iter()
            .flat_map(|s| s.stumps.iter())
            .map(|stump| stump.features.rects().len())
            .sum()
    }

    /// Run the stages in order, stopping at the first rejection.
    pub fn accepts<F>(&self, std_dev: f64, feature_sum: F) -> bool
    where
        F: Fn(&FeatureSet) -> f64,
    {
        self.stages
            .iter()
            .all(|stage| stage.passes(std_dev, &feature_sum))
    }
}

/// Builder for creating a validated CascadeClassifier.
pub struct CascadeBuilder {
    size: Option<(u32, u32)>,
    stages: Vec<Stage>,
}

impl CascadeBuilder {
    pub fn new() -> Self {
        Self {
            size: None,
            stages: Vec::new(),
        }
    }

    /// Set the base window size.
    pub fn window_size(mut self, width: u32, height: u32) -> Self {
        self.size = Some((width, height));
        self
    }

    /// Append a stage to the cascade.
    pub fn add_stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Build the CascadeClassifier.
    pub fn build(self) -> Result<CascadeClassifier> {
        let size = self
            .size
            .ok_or_else(|| Error::InvalidCascade("Missing window size".into()))?;
        let cascade = CascadeClassifier::new(size, self.stages);
        validate(&cascade)?;
        Ok(cascade)
    }
}

impl Default for CascadeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Shape checks done once at load time so that the scan loop can index
/// tables without bounds special cases.
pub(crate) fn validate(cascade: &CascadeClassifier) -> Result<()> {
    let (w, h) = cascade.size;
    if w == 0 || h == 0 {
        return Err(Error::InvalidCascade(format!(
            "Window size must be positive, got {}x{}",
            w, h
        )));
    }
    if cascade.stages.is_empty() {
        return Err(Error::InvalidCascade(
            "Cascade must have at least one stage".into(),
        ));
    }

    let (w, h) = (w as f32, h as f32);
    for (stage_idx, stage) in cascade.stages.iter().enumerate() {
        if stage.stumps.is_empty() {
            return Err(Error::InvalidCascade(format!(
                "Stage {} has no stumps",
                stage_idx
            )));
        }
        if !stage.threshold.is_finite() {
            return Err(Error::InvalidCascade(format!(
                "Stage {} threshold is not finite",
                stage_idx
            )));
        }

        for (stump_idx, stump) in stage.stumps.iter().enumerate() {
            let finite = stump.threshold.is_finite()
                && stump.left_val.is_finite()
                && stump.right_val.is_finite();
            if !finite {
                return Err(Error::InvalidCascade(format!(
                    "Stage {} stump {} has non-finite values",
                    stage_idx, stump_idx
                )));
            }
            if stump.features.rects().is_empty() {
                return Err(Error::InvalidCascade(format!(
                    "Stage {} stump {} has no features",
                    stage_idx, stump_idx
                )));
            }

            for r in stump.features.rects() {
                let non_negative = r.x >= 0.0 && r.y >= 0.0 && r.width >= 0.0 && r.height >= 0.0;
                let inside = match stump.features {
                    FeatureSet::Upright(_) => r.x + r.width <= w && r.y + r.height <= h,
                    FeatureSet::Tilted(_) => {
                        r.x >= r.height && r.x + r.width <= w && r.y + r.width + r.height <= h
                    }
                };
                if !(non_negative && inside && r.weight.is_finite()) {
                    return Err(Error::InvalidCascade(format!(
                        "Stage {} stump {}: feature {:?} does not fit the {}x{} window",
                        stage_idx, stump_idx, r, w, h
                    )));
                }
            }
        }
    }

    Ok(())
}
