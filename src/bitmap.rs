// SPDX-License-Identifier: GPL-3.0-only

//! RGBA bitmaps and the padding helpers shared by every effect
//!
//! Two kinds of padding exist:
//! - effect padding: a transparent margin on all sides so spatial kernels
//!   (blur radius, distortion amplitude, outline thickness) have room to spill into
//! - alignment padding: transparent columns on the right so the row stride is a
//!   multiple of [`ROW_ALIGNMENT_BYTES`], as texture ↔ buffer copies require
//!
//! Effect padding is part of the result; alignment padding is always stripped again.

use crate::constants::{BYTES_PER_PIXEL, MAX_BITMAP_DIMENSION, ROW_ALIGNMENT_BYTES};
use crate::errors::{EffectError, EffectResult, GpuError};

/// Straight (non-premultiplied) 8-bit RGBA image
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl std::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Round `width` up so that `width * bytes_per_pixel` is a multiple of 256 bytes
pub fn aligned_width(width: u32, bytes_per_pixel: u32) -> u32 {
    let alignment = u64::from(ROW_ALIGNMENT_BYTES);
    let bytes_per_row = u64::from(width) * u64::from(bytes_per_pixel);
    let aligned_bytes = bytes_per_row.div_ceil(alignment) * alignment;
    u32::try_from(aligned_bytes.div_ceil(u64::from(bytes_per_pixel))).unwrap_or(u32::MAX)
}

/// Byte length of a `width`×`height` RGBA buffer
///
/// Fails for edges above [`MAX_BITMAP_DIMENSION`] or when the length does not
/// fit in `usize`.
pub fn byte_len(width: u32, height: u32) -> Result<usize, GpuError> {
    if width > MAX_BITMAP_DIMENSION || height > MAX_BITMAP_DIMENSION {
        return Err(GpuError::Validation(format!(
            "{}x{} exceeds the bitmap limit of {}",
            width, height, MAX_BITMAP_DIMENSION
        )));
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(BYTES_PER_PIXEL as usize))
        .ok_or_else(|| GpuError::Validation(format!("{}x{} bitmap is too large", width, height)))
}

/// Ceil a floating point margin into whole pixels, treating NaN and negatives as 0
pub fn padding_pixels(margin: f64) -> u32 {
    if margin.is_finite() && margin > 0.0 {
        margin.ceil().min(u32::MAX as f64) as u32
    } else {
        0
    }
}

impl Bitmap {
    /// Fully transparent bitmap
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * BYTES_PER_PIXEL as usize],
        }
    }

    /// Wrap an existing RGBA buffer, checking its length
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> EffectResult<Self> {
        let expected = width as usize * height as usize * BYTES_PER_PIXEL as usize;
        if data.len() != expected {
            return Err(EffectError::Image(format!(
                "RGBA buffer for {}x{} must be {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL as usize
    }

    /// RGBA value at (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL as usize;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let idx = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL as usize;
        self.data[idx..idx + 4].copy_from_slice(&rgba);
    }

    /// Whether the row stride already satisfies the copy alignment
    pub fn is_row_aligned(&self) -> bool {
        aligned_width(self.width, BYTES_PER_PIXEL) == self.width
    }

    /// Add a transparent margin of `padding` pixels on every side
    ///
    /// Fails with [`GpuError::Validation`] when the padded size is too large.
    pub fn pad(&self, padding: u32) -> EffectResult<Bitmap> {
        if padding == 0 {
            return Ok(self.clone());
        }

        let grow = |edge: u32| padding.checked_mul(2).and_then(|p| edge.checked_add(p));
        let (Some(width), Some(height)) = (grow(self.width), grow(self.height)) else {
            return Err(GpuError::Validation(format!(
                "padding {} overflows a {}x{} bitmap",
                padding, self.width, self.height
            ))
            .into());
        };
        let mut padded = Bitmap {
            width,
            height,
            data: vec![0; byte_len(width, height)?],
        };
        let src_stride = self.stride();
        let dst_stride = padded.stride();
        let x_offset = padding as usize * BYTES_PER_PIXEL as usize;

        for y in 0..self.height as usize {
            let src = &self.data[y * src_stride..(y + 1) * src_stride];
            let dst_start = (y + padding as usize) * dst_stride + x_offset;
            padded.data[dst_start..dst_start + src_stride].copy_from_slice(src);
        }

        Ok(padded)
    }

    /// Copy out a `width`×`height` window starting at (x, y)
    ///
    /// Parts of the window outside the source are transparent.
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Bitmap {
        let mut cropped = Bitmap::new(width, height);
        if x >= self.width || y >= self.height {
            return cropped;
        }

        let copy_width = width.min(self.width - x);
        let copy_height = height.min(self.height - y);
        let copy_bytes = copy_width as usize * BYTES_PER_PIXEL as usize;
        let src_stride = self.stride();
        let dst_stride = cropped.stride();
        let x_offset = x as usize * BYTES_PER_PIXEL as usize;

        for row in 0..copy_height as usize {
            let src_start = (row + y as usize) * src_stride + x_offset;
            let dst_start = row * dst_stride;
            cropped.data[dst_start..dst_start + copy_bytes]
                .copy_from_slice(&self.data[src_start..src_start + copy_bytes]);
        }

        cropped
    }

    /// Extend the right edge with transparent columns until rows are 256-byte aligned
    pub fn add_alignment_padding(&self) -> Bitmap {
        let new_width = aligned_width(self.width, BYTES_PER_PIXEL);
        if new_width == self.width {
            return self.clone();
        }
        self.crop(0, 0, new_width, self.height)
    }

    /// Drop the alignment columns again, keeping the top-left `width`×`height`
    pub fn remove_alignment_padding(&self, width: u32, height: u32) -> Bitmap {
        if width == self.width && height == self.height {
            return self.clone();
        }
        self.crop(0, 0, width, height)
    }

    /// Convert for encoding, failing if `data` no longer matches the dimensions
    pub fn into_rgba_image(self) -> EffectResult<image::RgbaImage> {
        let (width, height, len) = (self.width, self.height, self.data.len());
        image::RgbaImage::from_raw(width, height, self.data).ok_or_else(|| {
            EffectError::Image(format!(
                "{}x{} bitmap holds {} bytes, too few for an RGBA image",
                width, height, len
            ))
        })
    }
}

impl From<image::RgbaImage> for Bitmap {
    fn from(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.into_raw(),
        }
    }
}
