use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle defined by top-left corner, width, and height.
///
/// Raw detections from the scanner always carry whole-pixel values; mean
/// rectangles produced by grouping may be fractional.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Whether `self` lies inside `outer` grown by `margin_x` / `margin_y`
    /// on every side.
    pub fn is_inside_expanded(&self, outer: &Rect, margin_x: f32, margin_y: f32) -> bool {
        self.x >= outer.x - margin_x
            && self.y >= outer.y - margin_y
            && self.right() <= outer.right() + margin_x
            && self.bottom() <= outer.bottom() + margin_y
    }
}

impl std::ops::Add for Rect {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            width: self.width + rhs.width,
            height: self.height + rhs.height,
        }
    }
}

impl std::ops::AddAssign for Rect {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.width += rhs.width;
        self.height += rhs.height;
    }
}

impl std::ops::Div<f32> for Rect {
    type Output = Self;

    fn div(self, rhs: f32) -> Self::Output {
        Self {
            x: self.x / rhs,
            y: self.y / rhs,
            width: self.width / rhs,
            height: self.height / rhs,
        }
    }
}

/// A cluster of near-duplicate detections collapsed into one rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub rect: Rect,
    /// Number of raw detections that fell into this cluster.
    pub neighbors: u32,
}

impl Detection {
    pub const fn new(rect: Rect, neighbors: u32) -> Self {
        Self { rect, neighbors }
    }
}
