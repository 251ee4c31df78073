//! Pixel buffers shared by capture, templates and the matcher.
//!
//! Frames arrive as packed colour ([`Frame`]), are reduced once per tick to a
//! [`GrayImage`], and every scan reads them through an [`ImageView`]: a
//! borrowed row-major window whose `stride` may exceed its width when it is
//! cut out of a larger buffer.

use crate::util::{SpriteWatchError, SpriteWatchResult};

pub mod frame;
#[cfg(feature = "image-io")]
pub mod io;

pub use frame::{luma, Frame, PixelFormat};

/// Borrowed row-major window into a buffer.
#[derive(Copy, Clone, Debug)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a, T> ImageView<'a, T> {
    /// View over a tightly packed buffer.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> SpriteWatchResult<Self> {
        Self::new(data, width, height, width)
    }

    /// View whose rows start `stride` elements apart.
    pub fn new(
        data: &'a [T],
        width: usize,
        height: usize,
        stride: usize,
    ) -> SpriteWatchResult<Self> {
        let needed = required_len(width, height, stride)?;
        match data.len() {
            got if got < needed => Err(SpriteWatchError::BufferTooSmall { needed, got }),
            _ => Ok(Self {
                data,
                width,
                height,
                stride,
            }),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Backing slice, row padding included.
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&'a T> {
        self.offset(x, y).and_then(|idx| self.data.get(idx))
    }

    /// The `width` pixels of row `y`.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        let start = self.offset(0, y)?;
        self.data.get(start..start + self.width)
    }

    /// Sub-window sharing this view's buffer and stride.
    ///
    /// Fails unless the whole rectangle lies inside the view.
    pub fn roi(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> SpriteWatchResult<ImageView<'a, T>> {
        if width == 0 || height == 0 {
            return Err(SpriteWatchError::InvalidDimensions { width, height });
        }
        let inside = x.checked_add(width).is_some_and(|r| r <= self.width)
            && y.checked_add(height).is_some_and(|b| b <= self.height);
        if !inside {
            return Err(SpriteWatchError::RoiOutOfBounds {
                x,
                y,
                width,
                height,
                img_width: self.width,
                img_height: self.height,
            });
        }
        let start = y * self.stride + x;
        ImageView::new(&self.data[start.min(self.data.len())..], width, height, self.stride)
    }

    fn offset(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y * self.stride + x)
    }
}

fn required_len(width: usize, height: usize, stride: usize) -> SpriteWatchResult<usize> {
    if width == 0 || height == 0 {
        return Err(SpriteWatchError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(SpriteWatchError::InvalidStride { width, stride });
    }
    (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(SpriteWatchError::InvalidDimensions { width, height })
}

/// Packed 8-bit intensity image, one per tick or per template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl GrayImage {
    /// Wraps a row-major buffer whose length is exactly `width * height`.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> SpriteWatchResult<Self> {
        let needed = required_len(width, height, width)?;
        if data.len() < needed {
            return Err(SpriteWatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(SpriteWatchError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Creates an image filled with a single intensity.
    pub fn filled(width: usize, height: usize, value: u8) -> SpriteWatchResult<Self> {
        let len = required_len(width, height, width)?;
        Self::new(vec![value; len], width, height)
    }

    /// Copies a (possibly strided) view into a contiguous buffer.
    pub fn from_view(view: ImageView<'_, u8>) -> Self {
        let mut data = Vec::with_capacity(view.width() * view.height());
        for y in 0..view.height() {
            if let Some(row) = view.row(y) {
                data.extend_from_slice(row);
            }
        }
        Self {
            data,
            width: view.width(),
            height: view.height(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn view(&self) -> ImageView<'_, u8> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
        }
    }

    /// Copies `src` into this image with its top-left corner at `(x, y)`.
    ///
    /// Pixels falling outside the destination are clipped.
    pub fn paste(&mut self, src: ImageView<'_, u8>, x: usize, y: usize) {
        if x >= self.width {
            return;
        }
        for sy in 0..src.height() {
            let dy = y + sy;
            if dy >= self.height {
                break;
            }
            let Some(row) = src.row(sy) else { break };
            let len = row.len().min(self.width.saturating_sub(x));
            let start = dy * self.width + x;
            self.data[start..start + len].copy_from_slice(&row[..len]);
        }
    }
}
