//! Gradient magnitude used to prune flat or overly textured windows.

const GAUSS_5: [f32; 5] = [0.1117, 0.2365, 0.3036, 0.2365, 0.1117];

/// Intermediate buffers for [`compute_edge_magnitude`].
///
/// Owned by the caller so that repeated calls on frames of the same size
/// allocate nothing.
#[derive(Debug, Clone, Default)]
pub struct EdgeScratch {
    horizontal: Vec<f32>,
    smoothed: Vec<f32>,
}

impl EdgeScratch {
    pub fn new() -> Self {
        Self::default()
    }

    fn prepare(&mut self, len: usize) {
        // Border cells are never written by the smoothing passes and must
        // stay zero, so a size change means fresh zeroed buffers.
        if self.horizontal.len() != len {
            log::trace!("allocating edge scratch for {} pixels", len);
            self.horizontal = vec![0.0; len];
            self.smoothed = vec![0.0; len];
        }
    }
}

/// Compute the edge magnitude of `src` into `dst`.
///
/// The image is smoothed with a separable 5-tap Gaussian (sigma about sqrt 2),
/// horizontally then vertically, and a 3x3 Sobel operator is applied to the
/// result. The magnitude is `|gx| + |gy|`. Pixels within two of the image
/// border are set to zero.
pub fn compute_edge_magnitude<T: Copy + Into<f32>>(
    src: &[T],
    width: usize,
    height: usize,
    dst: &mut Vec<f32>,
    scratch: &mut EdgeScratch,
) {
    let len = width * height;
    debug_assert_eq!(src.len(), len);
    scratch.prepare(len);
    if dst.len() != len {
        *dst = vec![0.0; len];
    } else {
        dst.iter_mut().for_each(|v| *v = 0.0);
    }
    if width < 5 || height < 5 {
        return;
    }

    let horizontal = &mut scratch.horizontal;
    for y in 0..height {
        for x in 2..width - 2 {
            let row = y * width;
            horizontal[row + x] = GAUSS_5
                .iter()
                .enumerate()
                .map(|(k, w)| w * src[row + x + k - 2].into())
                .sum();
        }
    }

    let smoothed = &mut scratch.smoothed;
    for y in 2..height - 2 {
        for x in 0..width {
            smoothed[x + y * width] = GAUSS_5
                .iter()
                .enumerate()
                .map(|(k, w)| w * horizontal[x + (y + k - 2) * width])
                .sum();
        }
    }

    let s = |x: usize, y: usize| smoothed[x + y * width];
    for y in 2..height - 2 {
        for x in 2..width - 2 {
            let grad_x = -s(x - 1, y - 1) + s(x + 1, y - 1) - 2.0 * s(x - 1, y)
                + 2.0 * s(x + 1, y)
                - s(x - 1, y + 1)
                + s(x + 1, y + 1);
            let grad_y = s(x - 1, y - 1) + 2.0 * s(x, y - 1) + s(x + 1, y - 1)
                - s(x - 1, y + 1)
                - 2.0 * s(x, y + 1)
                - s(x + 1, y + 1);
            dst[x + y * width] = grad_x.abs() + grad_y.abs();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_interior_has_no_edges() {
        let (w, h) = (20, 20);
        let src = vec![100u8; w * h];
        let mut dst = Vec::new();
        let mut scratch = EdgeScratch::new();
        compute_edge_magnitude(&src, w, h, &mut dst, &mut scratch);

        assert_eq!(dst.len(), w * h);
        // Away from the zero border of the smoothed image, flat means zero
        for y in 4..h - 4 {
            for x in 4..w - 4 {
                assert!(dst[x + y * w].abs() < 1e-3, "edge at ({x}, {y})");
            }
        }
    }

    #[test]
    fn vertical_step_responds_at_the_step() {
        let (w, h) = (24, 24);
        let src: Vec<u8> = (0..w * h)
            .map(|i| if i % w < 12 { 0 } else { 200 })
            .collect();
        let mut dst = Vec::new();
        let mut scratch = EdgeScratch::new();
        compute_edge_magnitude(&src, w, h, &mut dst, &mut scratch);

        let row = 12 * w;
        assert!(dst[row + 11] > 100.0);
        assert!(dst[row + 12] > 100.0);
        assert!(dst[row + 6].abs() < 1e-3);
        assert!(dst[row + 18].abs() < 1e-3);
    }

    #[test]
    fn border_is_zero() {
        let (w, h) = (10, 8);
        let src: Vec<u8> = (0..w * h).map(|i| (i * 37 % 251) as u8).collect();
        let mut dst = vec![9.0; w * h];
        let mut scratch = EdgeScratch::new();
        compute_edge_magnitude(&src, w, h, &mut dst, &mut scratch);

        for y in 0..h {
            for x in 0..w {
                if x < 2 || y < 2 || x >= w - 2 || y >= h - 2 {
                    assert_eq!(dst[x + y * w], 0.0);
                }
            }
        }
    }

    #[test]
    fn scratch_reuse_is_stable() {
        let (w, h) = (16, 16);
        let src: Vec<u8> = (0..w * h).map(|i| (i % 7 * 30) as u8).collect();
        let mut scratch = EdgeScratch::new();

        let mut first = Vec::new();
        compute_edge_magnitude(&src, w, h, &mut first, &mut scratch);

        // A different frame size in between must not leak into the next call
        let mut other = Vec::new();
        compute_edge_magnitude(&vec![255u8; 9 * 11], 9, 11, &mut other, &mut scratch);

        let mut second = Vec::new();
        compute_edge_magnitude(&src, w, h, &mut second, &mut scratch);
        assert_eq!(first, second);
    }

    #[test]
    fn tiny_image_is_all_zero() {
        let mut dst = Vec::new();
        compute_edge_magnitude(&[255u8; 12], 4, 3, &mut dst, &mut EdgeScratch::new());
        assert_eq!(dst, vec![0.0; 12]);
    }
}
