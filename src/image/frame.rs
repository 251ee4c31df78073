//! Captured frames and grayscale reduction.

use crate::capture::CaptureRegion;
use crate::image::{GrayImage, ImageView};
use crate::util::{SpriteWatchError, SpriteWatchResult};
use std::time::SystemTime;

/// Channel layout of a captured frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// One intensity byte per pixel.
    Gray8,
    /// Red, green, blue.
    Rgb8,
    /// Red, green, blue, alpha.
    Rgba8,
    /// Blue, green, red, alpha (the usual layout of desktop capture APIs).
    Bgra8,
}

impl PixelFormat {
    /// Bytes per pixel.
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => 4,
        }
    }
}

/// BT.601 luma with integer weights that sum to 256.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((77 * r as u32 + 150 * g as u32 + 29 * b as u32 + 128) >> 8) as u8
}

/// A captured pixel buffer tagged with its wall-clock capture time and, once
/// it has passed through a frame source, the screen region it came from.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: usize,
    height: usize,
    format: PixelFormat,
    captured_at: SystemTime,
    region: Option<CaptureRegion>,
}

impl Frame {
    /// Wraps a tightly packed pixel buffer, stamping it with the current time.
    pub fn new(
        data: Vec<u8>,
        width: usize,
        height: usize,
        format: PixelFormat,
    ) -> SpriteWatchResult<Self> {
        if width == 0 || height == 0 {
            return Err(SpriteWatchError::InvalidDimensions { width, height });
        }
        let needed = width
            .checked_mul(height)
            .and_then(|v| v.checked_mul(format.channels()))
            .ok_or(SpriteWatchError::InvalidDimensions { width, height })?;
        if data.len() != needed {
            return Err(SpriteWatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            format,
            captured_at: SystemTime::now(),
            region: None,
        })
    }

    /// Builds a single-channel frame from a grayscale image.
    pub fn from_gray(img: &GrayImage) -> Self {
        Self {
            data: img.data().to_vec(),
            width: img.width(),
            height: img.height(),
            format: PixelFormat::Gray8,
            captured_at: SystemTime::now(),
            region: None,
        }
    }

    /// Replaces the capture timestamp.
    pub fn with_timestamp(mut self, captured_at: SystemTime) -> Self {
        self.captured_at = captured_at;
        self
    }

    /// Records the screen region the pixels were taken from.
    pub fn with_region(mut self, region: CaptureRegion) -> Self {
        self.region = Some(region);
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn captured_at(&self) -> SystemTime {
        self.captured_at
    }

    pub fn region(&self) -> Option<CaptureRegion> {
        self.region
    }

    /// Returns the packed pixel bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Copies a `width x height` window starting at `(x, y)` into a new frame.
    ///
    /// The copy keeps the pixel format and the source timestamp but not the
    /// source region.
    pub fn crop(&self, x: usize, y: usize, width: usize, height: usize) -> SpriteWatchResult<Self> {
        if x.saturating_add(width) > self.width || y.saturating_add(height) > self.height {
            return Err(SpriteWatchError::RoiOutOfBounds {
                x,
                y,
                width,
                height,
                img_width: self.width,
                img_height: self.height,
            });
        }
        let ch = self.format.channels();
        let bytes = ImageView::from_slice(&self.data, self.width * ch, self.height)?;
        let window = bytes.roi(x * ch, y, width * ch, height)?;
        let mut data = Vec::with_capacity(width * height * ch);
        for row in 0..height {
            if let Some(src) = window.row(row) {
                data.extend_from_slice(src);
            }
        }
        Ok(Self {
            data,
            width,
            height,
            format: self.format,
            captured_at: self.captured_at,
            region: None,
        })
    }

    /// Reduces the frame to one intensity channel.
    pub fn to_gray(&self) -> GrayImage {
        let data: Vec<u8> = match self.format {
            PixelFormat::Gray8 => self.data.clone(),
            PixelFormat::Rgb8 => self
                .data
                .chunks_exact(3)
                .map(|px| luma(px[0], px[1], px[2]))
                .collect(),
            PixelFormat::Rgba8 => self
                .data
                .chunks_exact(4)
                .map(|px| luma(px[0], px[1], px[2]))
                .collect(),
            PixelFormat::Bgra8 => self
                .data
                .chunks_exact(4)
                .map(|px| luma(px[2], px[1], px[0]))
                .collect(),
        };
        GrayImage {
            data,
            width: self.width,
            height: self.height,
        }
    }
}
