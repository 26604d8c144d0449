//! Summed-area tables and their constant-time rectangle queries.
//!
//! All tables are one cell wider and taller than the source image; row 0 and
//! column 0 stay zero so that a query never needs a bounds special case.
//! Values are accumulated in `f64`, exact for sums below 2^53.

use crate::edges::{compute_edge_magnitude, EdgeScratch};
use crate::gray::GrayImage;

/// Constant-time rectangle sum over a precomputed table.
pub trait AreaSum {
    /// Sum of the source values covered by the rectangle anchored at
    /// (`x`, `y`) with the given extents.
    ///
    /// # Panics
    ///
    /// Panics if the rectangle reaches outside the table.
    fn area_sum(&self, x: usize, y: usize, width: usize, height: usize) -> f64;
}

/// Upright summed-area table. Also used for the squared table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntegralImage {
    data: Vec<f64>,
    width: usize,
    height: usize,
}

impl IntegralImage {
    /// Build the summed-area table of `src`.
    pub fn compute<T: Copy + Into<f64>>(src: &[T], width: usize, height: usize) -> Self {
        let mut sat = Self::default();
        sat.recompute(src, width, height);
        sat
    }

    /// Build the summed-area table of the squared values of `src`.
    pub fn compute_squared<T: Copy + Into<f64>>(src: &[T], width: usize, height: usize) -> Self {
        let mut ssat = Self::default();
        ssat.recompute_squared(src, width, height);
        ssat
    }

    /// Rebuild in place, reallocating only when the source size changed.
    pub fn recompute<T: Copy + Into<f64>>(&mut self, src: &[T], width: usize, height: usize) {
        self.prepare(width, height);
        self.accumulate(src, |v| v);
    }

    /// Squared variant of [`IntegralImage::recompute`].
    pub fn recompute_squared<T: Copy + Into<f64>>(
        &mut self,
        src: &[T],
        width: usize,
        height: usize,
    ) {
        self.prepare(width, height);
        self.accumulate(src, |v| v * v);
    }

    fn prepare(&mut self, width: usize, height: usize) {
        if self.width != width || self.height != height || self.data.is_empty() {
            log::trace!("allocating {}x{} integral table", width + 1, height + 1);
            self.data = vec![0.0; (width + 1) * (height + 1)];
            self.width = width;
            self.height = height;
        }
    }

    fn accumulate<T, F>(&mut self, src: &[T], f: F)
    where
        T: Copy + Into<f64>,
        F: Fn(f64) -> f64,
    {
        debug_assert_eq!(src.len(), self.width * self.height);
        let stride = self.width + 1;

        // Column prefix sums added onto the cell to the left
        for x in 1..=self.width {
            let mut column_sum = 0.0;
            for y in 1..=self.height {
                let index = x + y * stride;
                column_sum += f(src[(x - 1) + (y - 1) * self.width].into());
                self.data[index] = self.data[index - 1] + column_sum;
            }
        }
    }

    /// Width of the source image.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height of the source image.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row length of the table (`width + 1`).
    pub fn stride(&self) -> usize {
        self.width + 1
    }

    /// Table cell (x, y): the sum over source pixels (0,0)..(x-1,y-1).
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.data[x + y * self.stride()]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

impl AreaSum for IntegralImage {
    #[inline]
    fn area_sum(&self, x: usize, y: usize, width: usize, height: usize) -> f64 {
        let stride = self.stride();
        let top = y * stride;
        let bottom = (y + height) * stride;
        self.data[x + top] - self.data[x + width + top] - self.data[x + bottom]
            + self.data[x + width + bottom]
    }
}

/// Summed-area table rotated by 45 degrees, for tilted rectangle features.
///
/// A query at (x, y, w, h) covers the diamond whose top corner sits at
/// column x of row y, extending w pixels down-right and h pixels down-left.
/// In pixel terms, (px, py) is covered when, with `dx = px - x` and
/// `dy = py - y`, both `0 <= dx + dy + 1 < 2w` and `0 < dy - dx <= 2h` hold.
/// Queries are exact as long as `x >= h`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RotatedIntegralImage {
    data: Vec<f64>,
    width: usize,
    height: usize,
}

impl RotatedIntegralImage {
    pub fn compute<T: Copy + Into<f64>>(src: &[T], width: usize, height: usize) -> Self {
        let mut rsat = Self::default();
        rsat.recompute(src, width, height);
        rsat
    }

    /// Rebuild in place, reallocating only when the source size changed.
    pub fn recompute<T: Copy + Into<f64>>(&mut self, src: &[T], width: usize, height: usize) {
        debug_assert_eq!(src.len(), width * height);
        if self.width != width || self.height != height || self.data.is_empty() {
            log::trace!("allocating {}x{} rotated table", width + 1, height + 1);
            self.data = vec![0.0; (width + 1) * (height + 1)];
            self.width = width;
            self.height = height;
        }

        let stride = width + 1;
        let d = &mut self.data;

        // Column 0 holds wedge sums from the previous frame
        for y in 0..=height {
            d[y * stride] = 0.0;
        }

        // Forward pass: running sum along the up-left diagonal
        for y in 1..=height {
            for x in 1..=width {
                let index = x + y * stride;
                d[index] = src[(x - 1) + (y - 1) * width].into() + d[index - stride - 1];
            }
        }

        // Backward pass: fold in the two cells above, right column first
        for y in 1..=height {
            let index = width + y * stride;
            d[index] += d[index - stride];
        }
        for x in (0..width).rev() {
            for y in (1..=height).rev() {
                let index = x + y * stride;
                d[index] += d[index - stride] + d[index - stride + 1];
            }
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.width + 1
    }

    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.data[x + y * self.stride()]
    }
}

impl AreaSum for RotatedIntegralImage {
    #[inline]
    fn area_sum(&self, x: usize, y: usize, width: usize, height: usize) -> f64 {
        let stride = self.stride();
        self.data[x + y * stride]
            - self.data[x + width + (y + width) * stride]
            - self.data[x - height + (y + height) * stride]
            + self.data[x + width - height + (y + width + height) * stride]
    }
}

/// Borrowed set of tables consumed by the cascade evaluator for one frame.
#[derive(Debug, Clone, Copy)]
pub struct WindowTables<'a> {
    pub sat: &'a IntegralImage,
    pub ssat: &'a IntegralImage,
    /// Required when the cascade contains tilted stumps.
    pub rsat: Option<&'a RotatedIntegralImage>,
    /// Summed-area table of the edge magnitude image, enables edge pruning.
    pub edges: Option<&'a IntegralImage>,
}

impl<'a> WindowTables<'a> {
    pub fn new(sat: &'a IntegralImage, ssat: &'a IntegralImage) -> Self {
        debug_assert_eq!((sat.width(), sat.height()), (ssat.width(), ssat.height()));
        Self {
            sat,
            ssat,
            rsat: None,
            edges: None,
        }
    }

    pub fn with_rotated(mut self, rsat: &'a RotatedIntegralImage) -> Self {
        debug_assert_eq!((self.sat.width(), self.sat.height()), (rsat.width(), rsat.height()));
        self.rsat = Some(rsat);
        self
    }

    pub fn with_edges(mut self, edges: &'a IntegralImage) -> Self {
        debug_assert_eq!((self.sat.width(), self.sat.height()), (edges.width(), edges.height()));
        self.edges = Some(edges);
        self
    }

    /// Width of the scanned image.
    pub fn width(&self) -> usize {
        self.sat.width()
    }

    /// Height of the scanned image.
    pub fn height(&self) -> usize {
        self.sat.height()
    }
}

/// Owned, reusable set of every table a detection pass needs.
///
/// Keep one per concurrently processed stream; buffers are reused from frame
/// to frame and reallocated whenever the frame size changes.
#[derive(Debug, Clone, Default)]
pub struct IntegralTables {
    sat: IntegralImage,
    ssat: IntegralImage,
    rsat: RotatedIntegralImage,
    edge_sat: IntegralImage,
    edge_map: Vec<f32>,
    edge_scratch: EdgeScratch,
    has_rotated: bool,
    has_edges: bool,
}

impl IntegralTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh the tables from `gray`. The rotated table is only built when
    /// `rotated` is set, the edge table only when `edges` is set.
    pub fn update(&mut self, gray: &GrayImage, rotated: bool, edges: bool) {
        let (w, h) = (gray.width(), gray.height());
        let pixels = gray.pixels();

        self.sat.recompute(pixels, w, h);
        self.ssat.recompute_squared(pixels, w, h);

        self.has_rotated = rotated;
        if rotated {
            self.rsat.recompute(pixels, w, h);
        }

        self.has_edges = edges;
        if edges {
            compute_edge_magnitude(pixels, w, h, &mut self.edge_map, &mut self.edge_scratch);
            self.edge_sat.recompute(&self.edge_map, w, h);
        }
    }

    /// Borrow the tables computed by the last [`IntegralTables::update`].
    pub fn view(&self) -> WindowTables<'_> {
        let mut tables = WindowTables::new(&self.sat, &self.ssat);
        if self.has_rotated {
            tables = tables.with_rotated(&self.rsat);
        }
        if self.has_edges {
            tables = tables.with_edges(&self.edge_sat);
        }
        tables
    }

    pub fn sat(&self) -> &IntegralImage {
        &self.sat
    }

    pub fn squared_sat(&self) -> &IntegralImage {
        &self.ssat
    }

    pub fn rotated_sat(&self) -> Option<&RotatedIntegralImage> {
        self.has_rotated.then_some(&self.rsat)
    }
}
