//! Multi-scale search built on [`evaluate_window`].
//!
//! Both traversal policies visit scales in ascending order, starting at
//! `scale_min` and multiplying by `scale_factor` while the scaled window
//! still fits the image. Callers that need a latency bound can drive
//! [`scales`] and [`evaluate_window`] themselves and stop between scales.

use serde::{Deserialize, Serialize};

use crate::cascade::CascadeClassifier;
use crate::evaluator::{evaluate_window, scaled_window};
use crate::integral::WindowTables;
use crate::types::Rect;

/// Scale progression parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanParams {
    /// Multiplier applied to the scale after each round. Must exceed 1.
    pub scale_factor: f64,
    /// First scale tried.
    pub scale_min: f64,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            scale_factor: 1.2,
            scale_min: 1.0,
        }
    }
}

/// Iterator over the scales at which a cascade window fits an image.
#[derive(Debug, Clone)]
pub struct Scales {
    base: (f64, f64),
    image: (f64, f64),
    next: Option<f64>,
    factor: f64,
}

impl Iterator for Scales {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        let scale = self.next?;
        if scale * self.base.0 > self.image.0 || scale * self.base.1 > self.image.1 {
            self.next = None;
            return None;
        }
        // A non-growing factor would revisit the same scale forever
        self.next = (self.factor > 1.0).then_some(scale * self.factor);
        Some(scale)
    }
}

/// Scales visited for `cascade` on a `width` x `height` image.
pub fn scales(cascade: &CascadeClassifier, width: usize, height: usize, params: &ScanParams) -> Scales {
    let (w, h) = cascade.window_size();
    Scales {
        base: (w as f64, h as f64),
        image: (width as f64, height as f64),
        next: (params.scale_min > 0.0).then_some(params.scale_min),
        factor: params.scale_factor,
    }
}

/// Exhaustive search: detections from every scale, in ascending scale order.
pub fn detect_multi_scale(
    tables: &WindowTables<'_>,
    cascade: &CascadeClassifier,
    params: &ScanParams,
) -> Vec<Rect> {
    let mut rects = Vec::new();
    for scale in scales(cascade, tables.width(), tables.height(), params) {
        let found = evaluate_window(tables, cascade, scale);
        log_scale(cascade, scale, found.len());
        rects.extend(found);
    }
    rects
}

/// Presence check: detections from the first (finest) scale that yields any.
pub fn detect_finest_scale(
    tables: &WindowTables<'_>,
    cascade: &CascadeClassifier,
    params: &ScanParams,
) -> Vec<Rect> {
    for scale in scales(cascade, tables.width(), tables.height(), params) {
        let found = evaluate_window(tables, cascade, scale);
        log_scale(cascade, scale, found.len());
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

fn log_scale(cascade: &CascadeClassifier, scale: f64, accepted: usize) {
    let (w, h) = scaled_window(cascade, scale);
    log::debug!("scale {:.3} ({}x{} window): {} accepted", scale, w, h, accepted);
}
