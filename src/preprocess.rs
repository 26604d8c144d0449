//! Color conversion and contrast normalization applied before integral
//! images are built.

const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;
const LUMA_SHIFT: u32 = 14;
const LUMA_ROUND: u32 = 1 << (LUMA_SHIFT - 1);

/// Convert one RGBA pixel to intensity with 14-bit fixed-point luma weights.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * LUMA_R + g as u32 * LUMA_G + b as u32 * LUMA_B + LUMA_ROUND) >> LUMA_SHIFT) as u8
}

/// Convert a 4-channel RGBA buffer to a freshly allocated 1-channel buffer.
pub fn rgba_to_grayscale(src: &[u8]) -> Vec<u8> {
    let mut dst = Vec::new();
    rgba_to_grayscale_into(src, &mut dst);
    dst
}

/// Convert a 4-channel RGBA buffer into `dst`.
///
/// `dst` is reused when it already holds `src.len() / 4` pixels and is
/// replaced by a new buffer otherwise. The alpha channel is ignored.
pub fn rgba_to_grayscale_into(src: &[u8], dst: &mut Vec<u8>) {
    let len = src.len() / 4;
    if dst.len() != len {
        log::trace!("reallocating grayscale buffer: {} -> {} pixels", dst.len(), len);
        *dst = vec![0; len];
    }

    for (out, px) in dst.iter_mut().zip(src.chunks_exact(4)) {
        *out = luma(px[0], px[1], px[2]);
    }
}

/// Build the cumulative 256-bin histogram of `src`.
fn cumulative_histogram(src: &[u8]) -> [u32; 256] {
    let mut hist = [0u32; 256];
    for &v in src {
        hist[v as usize] += 1;
    }
    for i in 1..256 {
        hist[i] += hist[i - 1];
    }
    hist
}

/// Lookup table mapping each intensity to its equalized value.
fn equalization_lut(src: &[u8]) -> [u8; 256] {
    let cdf = cumulative_histogram(src);
    let norm = 255.0 / src.len() as f64;

    let mut lut = [0u8; 256];
    for (out, &count) in lut.iter_mut().zip(cdf.iter()) {
        // Round half up; count <= len keeps this inside [0, 255]
        *out = (count as f64 * norm + 0.5) as u8;
    }
    lut
}

/// Equalize the histogram of an 8-bit image in place.
pub fn equalize_histogram(image: &mut [u8]) {
    if image.is_empty() {
        return;
    }

    let lut = equalization_lut(image);
    for v in image.iter_mut() {
        *v = lut[*v as usize];
    }
}

/// Equalize the histogram of `src` into `dst`, reusing `dst` when its length
/// already matches.
pub fn equalize_histogram_into(src: &[u8], dst: &mut Vec<u8>) {
    if dst.len() != src.len() {
        *dst = vec![0; src.len()];
    }
    if src.is_empty() {
        return;
    }

    let lut = equalization_lut(src);
    for (out, &v) in dst.iter_mut().zip(src.iter()) {
        *out = lut[v as usize];
    }
}
