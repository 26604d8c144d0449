//! End-to-end detection on RGBA frames.
//!
//! A [`Detector`] pairs an immutable cascade with a [`DetectorConfig`] and can
//! be shared between threads. All per-frame memory lives in [`FrameBuffers`],
//! which the caller keeps alive between frames so that a stream of equally
//! sized frames allocates only what resampling needs.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgba, RgbaImage};

use crate::cascade::CascadeClassifier;
use crate::config::{DetectorConfig, Selection, Traversal};
use crate::error::{Error, Result};
use crate::gray::GrayImage;
use crate::group::group_rectangles;
use crate::integral::IntegralTables;
use crate::preprocess::equalize_histogram;
use crate::scanner::{detect_finest_scale, detect_multi_scale};
use crate::types::{Detection, Rect};

/// A borrowed 4-channel, 8-bit, row-major frame.
#[derive(Debug, Clone, Copy)]
pub struct RgbaFrame<'a> {
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
}

impl<'a> RgbaFrame<'a> {
    pub fn new(data: &'a [u8], width: u32, height: u32) -> Self {
        Self { data, width, height }
    }

    pub fn from_image(image: &'a RgbaImage) -> Self {
        Self::new(image.as_raw(), image.width(), image.height())
    }

    fn check(&self) -> Result<()> {
        let expected = self.width as usize * self.height as usize * 4;
        if self.data.len() != expected {
            return Err(Error::InvalidFrame {
                expected,
                actual: self.data.len(),
            });
        }
        Ok(())
    }
}

/// Decode an image file to RGBA.
pub fn open_rgba<P: AsRef<Path>>(path: P) -> Result<RgbaImage> {
    Ok(image::open(path)?.to_rgba8())
}

/// Scratch memory for one stream of frames.
#[derive(Debug, Clone, Default)]
pub struct FrameBuffers {
    rgba: Vec<u8>,
    gray: GrayImage,
    tables: IntegralTables,
}

impl FrameBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grayscale working image from the last pass.
    pub fn gray(&self) -> &GrayImage {
        &self.gray
    }

    /// Tables from the last pass.
    pub fn tables(&self) -> &IntegralTables {
        &self.tables
    }
}

/// Cascade detector configured for repeated use.
#[derive(Debug, Clone)]
pub struct Detector {
    cascade: CascadeClassifier,
    config: DetectorConfig,
}

impl Detector {
    pub fn new(cascade: CascadeClassifier, config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { cascade, config })
    }

    pub fn cascade(&self) -> &CascadeClassifier {
        &self.cascade
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Run a full detection pass on `frame`.
    ///
    /// Returned rectangles are in frame coordinates, ordered by neighbor
    /// count, highest first.
    pub fn detect(&self, frame: &RgbaFrame<'_>, buffers: &mut FrameBuffers) -> Result<Vec<Detection>> {
        frame.check()?;

        let selection = match self.config.selection {
            Some(sel) => match sel.clip(frame.width, frame.height) {
                Some(sel) => sel,
                None => return Ok(Vec::new()),
            },
            None => Selection::new(0, 0, frame.width, frame.height),
        };
        if selection.width == 0 || selection.height == 0 {
            return Ok(Vec::new());
        }

        let (work_w, work_h) = match self.config.working_height {
            Some(size) => (
                (size as f64 * selection.width as f64 / selection.height as f64) as u32,
                size,
            ),
            None => (selection.width, selection.height),
        };
        if work_w == 0 {
            return Ok(Vec::new());
        }

        let rgba = self.working_rgba(frame, selection, (work_w, work_h), &mut buffers.rgba)?;
        buffers.gray.update_from_rgba(rgba, work_w as usize, work_h as usize);
        if self.config.equalize {
            equalize_histogram(buffers.gray.pixels_mut());
        }
        buffers
            .tables
            .update(&buffers.gray, self.cascade.is_tilted(), self.config.edge_pruning);

        let view = buffers.tables.view();
        let params = self.config.scan_params();
        let raw = match self.config.traversal {
            Traversal::Exhaustive => detect_multi_scale(&view, &self.cascade, &params),
            Traversal::FinestScale => detect_finest_scale(&view, &self.cascade, &params),
        };

        let mut detections = group_rectangles(&raw, self.config.min_neighbors);
        detections.sort_by(|a, b| b.neighbors.cmp(&a.neighbors));

        let ratio_x = selection.width as f64 / work_w as f64;
        let ratio_y = selection.height as f64 / work_h as f64;
        for detection in detections.iter_mut() {
            detection.rect = to_frame(&detection.rect, ratio_x, ratio_y, selection);
        }

        log::debug!(
            "{}x{} frame, {}x{} working image: {} raw hits, {} detections",
            frame.width,
            frame.height,
            work_w,
            work_h,
            raw.len(),
            detections.len()
        );
        Ok(detections)
    }

    /// RGBA pixels of the selection at working size. Borrows the frame when
    /// no cropping or resampling is needed.
    fn working_rgba<'a>(
        &self,
        frame: &RgbaFrame<'a>,
        selection: Selection,
        (work_w, work_h): (u32, u32),
        scratch: &'a mut Vec<u8>,
    ) -> Result<&'a [u8]> {
        let full_frame = selection == Selection::new(0, 0, frame.width, frame.height);
        let resample = (work_w, work_h) != (selection.width, selection.height);
        if full_frame && !resample {
            return Ok(frame.data);
        }

        if resample {
            let source = ImageBuffer::<Rgba<u8>, &[u8]>::from_raw(frame.width, frame.height, frame.data)
                .ok_or(Error::InvalidFrame {
                    expected: frame.width as usize * frame.height as usize * 4,
                    actual: frame.data.len(),
                })?;
            let region = imageops::crop_imm(&source, selection.x, selection.y, selection.width, selection.height);
            *scratch = imageops::resize(&*region, work_w, work_h, FilterType::Triangle).into_raw();
        } else {
            scratch.clear();
            let stride = frame.width as usize * 4;
            let (x0, row_len) = (selection.x as usize * 4, selection.width as usize * 4);
            for y in selection.y as usize..(selection.y + selection.height) as usize {
                let start = y * stride + x0;
                scratch.extend_from_slice(&frame.data[start..start + row_len]);
            }
        }
        Ok(scratch.as_slice())
    }
}

fn to_frame(rect: &Rect, ratio_x: f64, ratio_y: f64, selection: Selection) -> Rect {
    Rect::new(
        (rect.x as f64 * ratio_x).floor() as f32 + selection.x as f32,
        (rect.y as f64 * ratio_y).floor() as f32 + selection.y as f32,
        (rect.width as f64 * ratio_x).floor() as f32,
        (rect.height as f64 * ratio_y).floor() as f32,
    )
}
