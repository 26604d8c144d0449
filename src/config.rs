//! Detector configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::scanner::ScanParams;

/// How scales are traversed during a detection pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Traversal {
    /// Scan every scale and collect all hits.
    #[default]
    Exhaustive,
    /// Stop at the first scale with any hit.
    FinestScale,
}

/// Region of the frame to search, in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Selection {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Clip to a `width` x `height` frame. `None` if nothing remains.
    pub fn clip(&self, width: u32, height: u32) -> Option<Selection> {
        let x = self.x.min(width);
        let y = self.y.min(height);
        let w = self.width.min(width - x);
        let h = self.height.min(height - y);
        (w > 0 && h > 0).then_some(Selection::new(x, y, w, h))
    }
}

/// Parameters for a [`Detector`](crate::pipeline::Detector).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Scale multiplier between passes
    pub scale_factor: f64,

    /// Smallest scale, relative to the cascade window
    pub scale_min: f64,

    /// Groups with fewer members are passed through unaveraged
    pub min_neighbors: u32,

    /// Height the selection is resampled to before scanning; `None` scans
    /// at full resolution
    pub working_height: Option<u32>,

    /// Region of interest; `None` searches the whole frame
    pub selection: Option<Selection>,

    /// Equalize the histogram of the working image
    pub equalize: bool,

    /// Skip windows by edge density
    pub edge_pruning: bool,

    pub traversal: Traversal,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            scale_factor: 1.2,
            scale_min: 1.0,
            min_neighbors: 1,
            working_height: Some(200),
            selection: None,
            equalize: true,
            edge_pruning: false,
            traversal: Traversal::Exhaustive,
        }
    }
}

impl DetectorConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn scan_params(&self) -> ScanParams {
        ScanParams {
            scale_factor: self.scale_factor,
            scale_min: self.scale_min,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.scale_factor.is_finite() || self.scale_factor <= 1.0 {
            return Err(Error::InvalidConfig(format!(
                "scale_factor must be greater than 1, got {}",
                self.scale_factor
            )));
        }
        if !self.scale_min.is_finite() || self.scale_min <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "scale_min must be positive, got {}",
                self.scale_min
            )));
        }
        if self.working_height == Some(0) {
            return Err(Error::InvalidConfig("working_height must be positive".to_string()));
        }
        if let Some(sel) = &self.selection {
            if sel.width == 0 || sel.height == 0 {
                return Err(Error::InvalidConfig("selection must not be empty".to_string()));
            }
        }
        Ok(())
    }
}
