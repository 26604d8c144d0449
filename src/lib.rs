//! # cascade-detect
//!
//! Pure Rust object detection with boosted Haar-feature cascades.
//!
//! This crate provides:
//! - **Preprocessing**: fixed-point RGBA to grayscale conversion and
//!   histogram equalization
//! - **Integral Images**: plain, squared and 45-degree rotated summed-area
//!   tables with O(1) rectangle sums, plus an edge-magnitude table for
//!   pruning flat windows
//! - **Cascade Evaluation**: stump-based stages evaluated over a sliding
//!   window, with early rejection
//! - **Multi-scale Search**: exhaustive or stop-at-first-hit scale traversal
//! - **Grouping**: greedy clustering of overlapping hits into detections
//!
//! Implements the detector of "Rapid Object Detection using a Boosted Cascade
//! of Simple Features" (Viola & Jones, 2001) with the rotated features of
//! Lienhart & Maydt (2002). Cascades are read from the widely used JSON
//! conversion of OpenCV's stump-based Haar cascades.
//!
//! ## Algorithm Overview
//!
//! 1. Convert the frame to grayscale and equalize its histogram
//! 2. Build the summed-area tables (and the rotated one for tilted cascades)
//! 3. For each scale, starting at the cascade's base window:
//!    - Slide the window over the image with a scale-dependent step
//!    - Normalize by the window's standard deviation
//!    - Run the stages in order, rejecting as soon as one fails
//! 4. Cluster accepted windows and drop groups nested in larger ones
//!
//! ## Quick Start
//!
//! ```rust
//! use cascade_detect::{
//!     CascadeBuilder, Detector, DetectorConfig, FeatureSet, FrameBuffers, RgbaFrame, Stage,
//!     Stump, WeightedRect,
//! };
//!
//! // Load a trained cascade
//! // let cascade = cascade_detect::interchange::load_cascade("haarcascade_frontalface_alt.json").unwrap();
//!
//! // Or build a toy one
//! let stump = Stump::new(
//!     0.0,
//!     1.0,
//!     1.0,
//!     FeatureSet::Upright(vec![WeightedRect::new(0.0, 0.0, 24.0, 24.0, 1.0)]),
//! );
//! let cascade = CascadeBuilder::new()
//!     .window_size(24, 24)
//!     .add_stage(Stage::new(0.5, vec![stump]))
//!     .build()
//!     .unwrap();
//!
//! let config = DetectorConfig {
//!     working_height: None,
//!     ..Default::default()
//! };
//! let detector = Detector::new(cascade, config).unwrap();
//! let mut buffers = FrameBuffers::new();
//!
//! let pixels = vec![128u8; 48 * 48 * 4];
//! let detections = detector
//!     .detect(&RgbaFrame::new(&pixels, 48, 48), &mut buffers)
//!     .unwrap();
//! println!("Found {} objects", detections.len());
//! ```
//!
//! ## Lower-level Access
//!
//! The stages of the pipeline are exposed individually for callers that
//! manage their own frames or want manual control over scales:
//!
//! ```rust
//! use cascade_detect::{evaluate_window, GrayImage, IntegralTables};
//! # use cascade_detect::{CascadeBuilder, FeatureSet, Stage, Stump, WeightedRect};
//! # let cascade = CascadeBuilder::new()
//! #     .window_size(24, 24)
//! #     .add_stage(Stage::new(0.5, vec![Stump::new(0.0, 1.0, 1.0,
//! #         FeatureSet::Upright(vec![WeightedRect::new(0.0, 0.0, 24.0, 24.0, 1.0)]))]))
//! #     .build()
//! #     .unwrap();
//!
//! let gray = GrayImage::from_fn(64, 48, |x, y| ((x + y) % 256) as u8);
//! let mut tables = IntegralTables::new();
//! tables.update(&gray, cascade.is_tilted(), false);
//!
//! let hits = evaluate_window(&tables.view(), &cascade, 1.5);
//! ```

mod cascade;
mod config;
mod edges;
mod error;
mod evaluator;
mod gray;
mod group;
mod integral;
pub mod interchange;
mod pipeline;
mod preprocess;
mod scanner;
mod types;

pub use cascade::{CascadeBuilder, CascadeClassifier, FeatureSet, Stage, Stump, WeightedRect};
pub use config::{DetectorConfig, Selection, Traversal};
pub use edges::{compute_edge_magnitude, EdgeScratch};
pub use error::{Error, Result};
pub use evaluator::{evaluate_window, scaled_window, window_step, EDGE_DENSITY_MAX, EDGE_DENSITY_MIN};
pub use gray::GrayImage;
pub use group::group_rectangles;
pub use integral::{AreaSum, IntegralImage, IntegralTables, RotatedIntegralImage, WindowTables};
pub use pipeline::{open_rgba, Detector, FrameBuffers, RgbaFrame};
pub use preprocess::{equalize_histogram, equalize_histogram_into, luma, rgba_to_grayscale, rgba_to_grayscale_into};
pub use scanner::{detect_finest_scale, detect_multi_scale, scales, ScanParams, Scales};
pub use types::{Detection, Rect};
