use crate::preprocess::rgba_to_grayscale_into;

/// A single-channel 8-bit image buffer, row-major.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrayImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl GrayImage {
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            data,
            width,
            height,
        }
    }

    pub fn from_fn<F>(width: usize, height: usize, f: F) -> Self
    where
        F: Fn(usize, usize) -> u8,
    {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self { data, width, height }
    }

    /// Convert an RGBA buffer to grayscale.
    pub fn from_rgba(rgba: &[u8], width: usize, height: usize) -> Self {
        let mut image = Self::default();
        image.update_from_rgba(rgba, width, height);
        image
    }

    /// Overwrite this image with the grayscale version of `rgba`, reusing the
    /// pixel buffer when the size is unchanged.
    pub fn update_from_rgba(&mut self, rgba: &[u8], width: usize, height: usize) {
        debug_assert_eq!(rgba.len(), width * height * 4);
        rgba_to_grayscale_into(rgba, &mut self.data);
        self.width = width;
        self.height = height;
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}
