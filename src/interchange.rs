//! Loader for the JSON cascade interchange format.
//!
//! This is the stump-based subset of the Haar cascade format as commonly
//! converted from OpenCV XML files:
//!
//! ```json
//! {
//!   "size": [24, 24],
//!   "tilted": true,
//!   "stages": [
//!     {
//!       "threshold": -1.23,
//!       "stumps": [
//!         {
//!           "tilted": 0,
//!           "threshold": 0.0041,
//!           "leftVal": 0.03,
//!           "rightVal": -0.8,
//!           "features": [[6, 4, 12, 9, -1], [6, 7, 12, 3, 3]]
//!         }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! The older key names `complexClassifiers`, `simpleClassifiers`,
//! `left_val` and `right_val` are accepted as well. Files whose name ends in
//! `.bz2` are decompressed on the fly.
//!
//! # Example
//!
//! ```ignore
//! use cascade_detect::interchange::load_cascade;
//!
//! let cascade = load_cascade("haarcascade_frontalface_alt.json.bz2")?;
//! ```

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use bzip2::read::BzDecoder;
use serde::{Deserialize, Deserializer, Serialize};

use crate::cascade::{CascadeClassifier, FeatureSet, Stage, Stump, WeightedRect};
use crate::error::Result;

#[derive(Debug, Serialize, Deserialize)]
struct RawCascade {
    size: [u32; 2],
    #[serde(default, deserialize_with = "flag")]
    tilted: bool,
    #[serde(alias = "complexClassifiers")]
    stages: Vec<RawStage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawStage {
    threshold: f32,
    #[serde(alias = "simpleClassifiers")]
    stumps: Vec<RawStump>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawStump {
    #[serde(default, deserialize_with = "flag")]
    tilted: bool,
    threshold: f32,
    #[serde(rename = "leftVal", alias = "left_val")]
    left_val: f32,
    #[serde(rename = "rightVal", alias = "right_val")]
    right_val: f32,
    features: Vec<[f32; 5]>,
}

/// Converters emit flags either as booleans or as 0/1.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Number(f64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Number(n) => n != 0.0,
    })
}

/// Load a cascade from a `.json` or `.json.bz2` file.
pub fn load_cascade<P: AsRef<Path>>(path: P) -> Result<CascadeClassifier> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let is_bz2 = path.extension().is_some_and(|ext| ext == "bz2");

    let cascade = if is_bz2 {
        load_cascade_from_reader(BzDecoder::new(reader))?
    } else {
        load_cascade_from_reader(reader)?
    };

    log::debug!(
        "loaded cascade {:?}: {}x{} window, {} stages, {} stumps, tilted={}",
        path,
        cascade.window_size().0,
        cascade.window_size().1,
        cascade.num_stages(),
        cascade.num_stumps(),
        cascade.is_tilted()
    );
    Ok(cascade)
}

/// Load a cascade from an already-opened reader of uncompressed JSON.
pub fn load_cascade_from_reader<R: Read>(reader: R) -> Result<CascadeClassifier> {
    let raw: RawCascade = serde_json::from_reader(reader)?;
    resolve_cascade(raw)
}

/// Parse a cascade from a JSON string.
pub fn parse_cascade(json: &str) -> Result<CascadeClassifier> {
    let raw: RawCascade = serde_json::from_str(json)?;
    resolve_cascade(raw)
}

/// Write a cascade in the interchange format.
pub fn write_cascade<W: Write>(cascade: &CascadeClassifier, writer: W) -> Result<()> {
    let raw = RawCascade {
        size: [cascade.window_size().0, cascade.window_size().1],
        tilted: cascade.is_tilted(),
        stages: cascade
            .stages()
            .iter()
            .map(|stage| RawStage {
                threshold: stage.threshold,
                stumps: stage.stumps.iter().map(raw_stump).collect(),
            })
            .collect(),
    };
    serde_json::to_writer(writer, &raw)?;
    Ok(())
}

fn raw_stump(stump: &Stump) -> RawStump {
    RawStump {
        tilted: stump.features.is_tilted(),
        threshold: stump.threshold,
        left_val: stump.left_val,
        right_val: stump.right_val,
        features: stump
            .features
            .rects()
            .iter()
            .map(|r| [r.x, r.y, r.width, r.height, r.weight])
            .collect(),
    }
}

fn resolve_cascade(raw: RawCascade) -> Result<CascadeClassifier> {
    let stages = raw
        .stages
        .into_iter()
        .map(|stage| Stage::new(stage.threshold, stage.stumps.into_iter().map(resolve_stump).collect()))
        .collect();

    let cascade = CascadeClassifier::new((raw.size[0], raw.size[1]), stages);
    if raw.tilted && !cascade.is_tilted() {
        log::debug!("cascade declares tilted features but none of its stumps use them");
    }

    crate::cascade::validate(&cascade)?;
    Ok(cascade)
}

fn resolve_stump(raw: RawStump) -> Stump {
    let rects = raw
        .features
        .into_iter()
        .map(|[x, y, w, h, weight]| WeightedRect::new(x, y, w, h, weight))
        .collect();

    let features = if raw.tilted {
        FeatureSet::Tilted(rects)
    } else {
        FeatureSet::Upright(rects)
    };

    Stump::new(raw.threshold, raw.left_val, raw.right_val, features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const SMALL_CASCADE: &str = r#"{
        "size": [20, 20],
        "tilted": true,
        "stages": [
            {
                "threshold": -0.5,
                "stumps": [
                    {
                        "tilted": 0,
                        "threshold": 0.004,
                        "leftVal": 0.03,
                        "rightVal": -0.8,
                        "features": [[2, 4, 16, 9, -1], [2, 7, 16, 3, 3]]
                    },
                    {
                        "tilted": 1,
                        "threshold": -0.01,
                        "leftVal": 0.5,
                        "rightVal": 0.2,
                        "features": [[8, 2, 6, 4, -1], [8, 4, 3, 2, 2]]
                    }
                ]
            }
        ]
    }"#;

    #[test]
    fn parse_small_cascade() {
        let cascade = parse_cascade(SMALL_CASCADE).unwrap();

        assert_eq!(cascade.window_size(), (20, 20));
        assert_eq!(cascade.num_stages(), 1);
        assert_eq!(cascade.num_stumps(), 2);
        assert_eq!(cascade.num_features(), 4);
        assert!(cascade.is_tilted());

        let stage = &cascade.stages()[0];
        assert_eq!(stage.threshold, -0.5);
        assert!(!stage.stumps[0].features.is_tilted());
        assert!(stage.stumps[1].features.is_tilted());
        assert_eq!(stage.stumps[0].left_val, 0.03);
        assert_eq!(stage.stumps[0].right_val, -0.8);
        assert_eq!(
            stage.stumps[0].features.rects()[1],
            WeightedRect::new(2.0, 7.0, 16.0, 3.0, 3.0)
        );
    }

    #[test]
    fn accepts_legacy_key_names() {
        let json = r#"{
            "size": [4, 4],
            "tilted": false,
            "complexClassifiers": [
                {
                    "threshold": 1.0,
                    "simpleClassifiers": [
                        {
                            "tilted": false,
                            "threshold": 0.0,
                            "left_val": 0.0,
                            "right_val": 2.0,
                            "features": [[0, 0, 4, 4, 1]]
                        }
                    ]
                }
            ]
        }"#;

        let cascade = parse_cascade(json).unwrap();
        assert_eq!(cascade.num_stumps(), 1);
        assert_eq!(cascade.stages()[0].stumps[0].right_val, 2.0);
        assert!(!cascade.is_tilted());
    }

    #[test]
    fn missing_fields_are_rejected() {
        let no_size = r#"{ "stages": [] }"#;
        assert!(matches!(parse_cascade(no_size), Err(Error::Json(_))));

        let no_stages = r#"{ "size": [24, 24] }"#;
        assert!(matches!(parse_cascade(no_stages), Err(Error::Json(_))));

        let empty = r#"{ "size": [24, 24], "stages": [] }"#;
        assert!(matches!(parse_cascade(empty), Err(Error::InvalidCascade(_))));
    }

    #[test]
    fn write_then_parse_preserves_cascade() {
        let cascade = parse_cascade(SMALL_CASCADE).unwrap();

        let mut json = Vec::new();
        write_cascade(&cascade, &mut json).unwrap();
        let reparsed = load_cascade_from_reader(json.as_slice()).unwrap();

        assert_eq!(reparsed, cascade);
    }

    #[test]
    fn load_compressed_file() {
        use bzip2::write::BzEncoder;
        use bzip2::Compression;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.json.bz2");
        let mut encoder = BzEncoder::new(File::create(&path).unwrap(), Compression::best());
        encoder.write_all(SMALL_CASCADE.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let cascade = load_cascade(&path).unwrap();
        assert_eq!(cascade.num_stumps(), 2);
    }

    #[test]
    fn load_plain_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.json");
        std::fs::write(&path, SMALL_CASCADE).unwrap();

        let cascade = load_cascade(&path).unwrap();
        assert_eq!(cascade.window_size(), (20, 20));
    }
}
