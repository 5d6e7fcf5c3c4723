// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Decoded input images.
//!
//! Detection works on a [`DecodedImage`], an RGB8 pixel buffer with non-zero
//! dimensions. Files and in-memory encodings are turned into one with
//! [`load_image`] and [`decode_image`]; every failure along the way is reported
//! as [`LandmarkError::ImageDecodeError`].

use std::path::Path;

use image::{DynamicImage, RgbImage};
use ndarray::Array3;

use crate::error::{LandmarkError, Result};

/// An RGB image ready for inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pixels: RgbImage,
}

impl DecodedImage {
    /// Wrap an RGB buffer.
    ///
    /// # Errors
    ///
    /// Returns [`LandmarkError::ImageDecodeError`] if either dimension is zero.
    pub fn new(pixels: RgbImage) -> Result<Self> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(LandmarkError::ImageDecodeError(format!(
                "image has empty dimensions {}x{}",
                pixels.width(),
                pixels.height()
            )));
        }
        Ok(Self { pixels })
    }

    /// Build an image from packed RGB bytes in row-major order.
    ///
    /// # Errors
    ///
    /// Returns [`LandmarkError::ImageDecodeError`] if the buffer length does not
    /// equal `width * height * 3` or a dimension is zero.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let len = data.len();
        let pixels = RgbImage::from_raw(width, height, data).ok_or_else(|| {
            LandmarkError::ImageDecodeError(format!(
                "buffer of {len} bytes does not match {width}x{height} RGB"
            ))
        })?;
        Self::new(pixels)
    }

    /// Build an image from an HWC `u8` array with three channels.
    ///
    /// # Errors
    ///
    /// Returns [`LandmarkError::ImageDecodeError`] if the array does not have
    /// three channels or its dimensions do not fit in `u32`.
    pub fn from_array(arr: &Array3<u8>) -> Result<Self> {
        let (height, width, channels) = arr.dim();
        if channels != 3 {
            return Err(LandmarkError::ImageDecodeError(format!(
                "expected 3 channels, got {channels}"
            )));
        }
        let height = u32::try_from(height).map_err(|_| {
            LandmarkError::ImageDecodeError("Image height exceeds u32::MAX".to_string())
        })?;
        let width = u32::try_from(width).map_err(|_| {
            LandmarkError::ImageDecodeError("Image width exceeds u32::MAX".to_string())
        })?;

        let data: Vec<u8> = arr.as_standard_layout().iter().copied().collect();
        Self::from_raw(width, height, data)
    }

    /// Image width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Image height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Underlying pixel buffer.
    #[must_use]
    pub const fn pixels(&self) -> &RgbImage {
        &self.pixels
    }
}

impl TryFrom<DynamicImage> for DecodedImage {
    type Error = LandmarkError;

    fn try_from(img: DynamicImage) -> Result<Self> {
        Self::new(img.into_rgb8())
    }
}

impl TryFrom<RgbImage> for DecodedImage {
    type Error = LandmarkError;

    fn try_from(pixels: RgbImage) -> Result<Self> {
        Self::new(pixels)
    }
}

/// Load and decode an image file.
///
/// # Errors
///
/// Returns [`LandmarkError::ImageDecodeError`] if the file is missing, cannot
/// be read, is not a supported image format or decodes to an empty image.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DecodedImage> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|e| {
        LandmarkError::ImageDecodeError(format!("cannot decode image {}: {e}", path.display()))
    })?;
    DecodedImage::try_from(img)
}

/// Decode an in-memory encoded image (PNG, JPEG, ...).
///
/// # Errors
///
/// Returns [`LandmarkError::ImageDecodeError`] if the bytes are not a
/// supported image or decode to an empty image.
pub fn decode_image(bytes: &[u8]) -> Result<DecodedImage> {
    let img = image::load_from_memory(bytes)?;
    DecodedImage::try_from(img)
}
