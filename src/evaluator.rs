//! Single-scale sliding-window evaluation of a cascade.

use crate::cascade::{CascadeClassifier, FeatureSet, WeightedRect};
use crate::integral::{AreaSum, WindowTables};
use crate::types::Rect;

/// Windows whose mean edge magnitude falls outside this band are skipped
/// before any stage runs: flat regions below, heavy texture above.
pub const EDGE_DENSITY_MIN: f64 = 20.0;
pub const EDGE_DENSITY_MAX: f64 = 100.0;

/// Grid step for a given scale. Larger windows are searched more coarsely.
#[inline]
pub fn window_step(scale: f64) -> usize {
    (0.5 * scale + 1.5) as usize
}

/// Window size in pixels for the cascade's base size at `scale`.
#[inline]
pub fn scaled_window(cascade: &CascadeClassifier, scale: f64) -> (usize, usize) {
    let (w, h) = cascade.window_size();
    ((w as f64 * scale) as usize, (h as f64 * scale) as usize)
}

/// Weighted sum of `rects` scaled to `scale` and anchored at (`x`, `y`).
#[inline]
fn weighted_sum<T: AreaSum>(table: &T, rects: &[WeightedRect], x: usize, y: usize, scale: f64) -> f64 {
    rects
        .iter()
        .map(|r| {
            let fx = (x as f64 + r.x as f64 * scale) as usize;
            let fy = (y as f64 + r.y as f64 * scale) as usize;
            let fw = (r.width as f64 * scale) as usize;
            let fh = (r.height as f64 * scale) as usize;
            table.area_sum(fx, fy, fw, fh) * r.weight as f64
        })
        .sum()
}

/// Evaluate `cascade` on every window position at one scale.
///
/// Positions advance by [`window_step`] in both directions, columns in the
/// outer loop. Each accepted window is returned as
/// `(x, y, window_width, window_height)` in the coordinates of the scanned
/// image.
///
/// A tilted cascade needs `tables.rsat`; without it nothing is detected.
pub fn evaluate_window(tables: &WindowTables<'_>, cascade: &CascadeClassifier, scale: f64) -> Vec<Rect> {
    let (width, height) = (tables.width(), tables.height());
    let (window_width, window_height) = scaled_window(cascade, scale);
    let step = window_step(scale);

    let mut rects = Vec::new();
    if window_width == 0 || window_height == 0 {
        return rects;
    }
    if cascade.is_tilted() && tables.rsat.is_none() {
        log::warn!("tilted cascade scanned without a rotated integral image");
        return rects;
    }

    let inv_area = 1.0 / (window_width * window_height) as f64;

    let mut x = 0;
    while x + window_width <= width {
        let mut y = 0;
        while y + window_height <= height {
            if accepts_window(tables, cascade, scale, x, y, window_width, window_height, inv_area) {
                rects.push(Rect::new(
                    x as f32,
                    y as f32,
                    window_width as f32,
                    window_height as f32,
                ));
            }
            y += step;
        }
        x += step;
    }

    rects
}

#[allow(clippy::too_many_arguments)]
#[inline]
fn accepts_window(
    tables: &WindowTables<'_>,
    cascade: &CascadeClassifier,
    scale: f64,
    x: usize,
    y: usize,
    window_width: usize,
    window_height: usize,
    inv_area: f64,
) -> bool {
    if let Some(edges) = tables.edges {
        let density = edges.area_sum(x, y, window_width, window_height) * inv_area;
        if !(EDGE_DENSITY_MIN..=EDGE_DENSITY_MAX).contains(&density) {
            return false;
        }
    }

    let mean = tables.sat.area_sum(x, y, window_width, window_height) * inv_area;
    let variance = tables.ssat.area_sum(x, y, window_width, window_height) * inv_area - mean * mean;
    let std_dev = if variance > 1.0 { variance.sqrt() } else { 1.0 };

    cascade.accepts(std_dev, |features| {
        let raw = match (features, tables.rsat) {
            (FeatureSet::Upright(rects), _) => weighted_sum(tables.sat, rects, x, y, scale),
            (FeatureSet::Tilted(rects), Some(rsat)) => weighted_sum(rsat, rects, x, y, scale),
            // Checked before scanning
            (FeatureSet::Tilted(_), None) => 0.0,
        };
        raw * inv_area
    })
}
