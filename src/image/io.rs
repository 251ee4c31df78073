//! Convenience helpers for loading images via the `image` crate.
//!
//! Available when the `image-io` feature is enabled. Color images are reduced
//! with the same [`luma`] weights used for captured frames, so a template cut
//! out of a screenshot matches that screenshot exactly.

use crate::image::{luma, Frame, GrayImage, PixelFormat};
use crate::util::{SpriteWatchError, SpriteWatchResult};
use std::path::Path;

/// Converts a decoded image into an RGBA frame.
pub fn frame_from_dynamic_image(img: &image::DynamicImage) -> SpriteWatchResult<Frame> {
    let rgba = img.to_rgba8();
    let width = rgba.width() as usize;
    let height = rgba.height() as usize;
    Frame::new(rgba.into_raw(), width, height, PixelFormat::Rgba8)
}

/// Reduces a decoded image to grayscale.
pub fn gray_from_dynamic_image(img: &image::DynamicImage) -> SpriteWatchResult<GrayImage> {
    let rgb = img.to_rgb8();
    let width = rgb.width() as usize;
    let height = rgb.height() as usize;
    let data = rgb.pixels().map(|px| luma(px[0], px[1], px[2])).collect();
    GrayImage::new(data, width, height)
}

/// Loads an image from disk and reduces it to grayscale.
///
/// Any decode failure or empty image is reported as `TemplateLoad` naming the
/// file.
pub fn load_gray_image<P: AsRef<Path>>(path: P) -> SpriteWatchResult<GrayImage> {
    let path = path.as_ref();
    let load_err = |reason: String| SpriteWatchError::TemplateLoad {
        path: path.to_path_buf(),
        reason,
    };
    let img = image::open(path).map_err(|err| load_err(err.to_string()))?;
    if img.width() == 0 || img.height() == 0 {
        return Err(load_err("image has no pixels".to_string()));
    }
    gray_from_dynamic_image(&img).map_err(|err| load_err(err.to_string()))
}

/// Loads a screenshot from disk as an RGBA frame.
pub fn load_frame<P: AsRef<Path>>(path: P) -> SpriteWatchResult<Frame> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|err| SpriteWatchError::Capture {
        reason: format!("{}: {err}", path.display()),
    })?;
    frame_from_dynamic_image(&img)
}
