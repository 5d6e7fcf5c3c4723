// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Image preprocessing for the two-stage pose pipeline.
//!
//! The detector sees the whole image letterboxed into a 224x224 square with
//! values in `[-1, 1]`. The landmark model sees a 256x256 crop of the rotated
//! region of interest with values in `[0, 1]`. Both tensors are NHWC.

#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::similar_names,
    clippy::suboptimal_flops
)]

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use ndarray::Array4;

use crate::postprocessing::Roi;

// ================================================================================================
// Constants
// ================================================================================================

/// Side length of the square detector input.
pub const DETECTOR_INPUT_SIZE: u32 = 224;

/// Side length of the square landmark model input.
pub const LANDMARK_INPUT_SIZE: u32 = 256;

/// Reciprocal of 255 for normalization.
const INV_255: f32 = 1.0 / 255.0;

// ================================================================================================
// Types
// ================================================================================================

/// Transform applied when letterboxing an image into a square input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    /// Scale factors applied (`scale_y`, `scale_x`).
    pub scale: (f32, f32),
    /// Padding applied (`pad_top`, `pad_left`).
    pub padding: (f32, f32),
}

impl Letterbox {
    /// Map a point from letterboxed input pixels back to original image pixels.
    #[must_use]
    pub fn to_original(&self, point: (f32, f32)) -> (f32, f32) {
        let (scale_y, scale_x) = self.scale;
        let (pad_top, pad_left) = self.padding;
        ((point.0 - pad_left) / scale_x, (point.1 - pad_top) / scale_y)
    }
}

/// Detector input tensor and the letterbox used to build it.
#[derive(Debug, Clone)]
pub struct DetectorInput {
    /// Tensor with shape (1, 224, 224, 3), values in `[-1, 1]`.
    pub tensor: Array4<f32>,
    /// Letterbox transform for mapping keypoints back.
    pub letterbox: Letterbox,
}

// ================================================================================================
// Functions
// ================================================================================================

/// Compute letterbox resize and padding for fitting an image into a square.
///
/// # Returns
///
/// Tuple containing:
/// 1. `new_width`: Scaled width.
/// 2. `new_height`: Scaled height.
/// 3. `pad_left`: Left padding.
/// 4. `pad_top`: Top padding.
/// 5. `(scale_y, scale_x)`: Scale factors.
#[must_use]
pub fn calculate_letterbox_params(
    orig_width: u32,
    orig_height: u32,
    target: u32,
) -> (u32, u32, u32, u32, (f32, f32)) {
    let (orig_w, orig_h) = (orig_width as f32, orig_height as f32);
    let scale = (target as f32 / orig_h).min(target as f32 / orig_w);

    let new_w = ((orig_w * scale).round() as u32).clamp(1, target);
    let new_h = ((orig_h * scale).round() as u32).clamp(1, target);

    let pad_left = (target - new_w) / 2;
    let pad_top = (target - new_h) / 2;

    let scale_x = new_w as f32 / orig_w;
    let scale_y = new_h as f32 / orig_h;

    (new_w, new_h, pad_left, pad_top, (scale_y, scale_x))
}

/// Letterbox an image into the detector input tensor.
#[must_use]
pub fn preprocess_detector(image: &RgbImage) -> DetectorInput {
    let (new_w, new_h, pad_left, pad_top, scale) =
        calculate_letterbox_params(image.width(), image.height(), DETECTOR_INPUT_SIZE);

    let resized = imageops::resize(image, new_w, new_h, FilterType::Triangle);
    let mut canvas = RgbImage::new(DETECTOR_INPUT_SIZE, DETECTOR_INPUT_SIZE);
    imageops::replace(&mut canvas, &resized, i64::from(pad_left), i64::from(pad_top));

    DetectorInput {
        tensor: image_to_nhwc(&canvas, |v| f32::from(v) / 127.5 - 1.0),
        letterbox: Letterbox {
            scale,
            padding: (pad_top as f32, pad_left as f32),
        },
    }
}

/// Crop the rotated region of interest into the landmark model input tensor.
///
/// Samples bilinearly; area outside the image reads as black.
#[must_use]
pub fn preprocess_landmarks(image: &RgbImage, roi: &Roi) -> Array4<f32> {
    let crop = crop_roi(image, roi, LANDMARK_INPUT_SIZE);
    image_to_nhwc(&crop, |v| f32::from(v) * INV_255)
}

/// Resample the region of interest into a `size` x `size` image.
#[must_use]
pub fn crop_roi(image: &RgbImage, roi: &Roi, size: u32) -> RgbImage {
    let inv = 1.0 / size as f32;
    RgbImage::from_fn(size, size, |x, y| {
        let (px, py) = roi.to_image((x as f32 + 0.5) * inv, (y as f32 + 0.5) * inv);
        sample_bilinear(image, px, py)
    })
}

/// Sample a pixel at continuous coordinates, pixel centers at `i + 0.5`.
fn sample_bilinear(image: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    let sx = x - 0.5;
    let sy = y - 0.5;
    let x0 = sx.floor();
    let y0 = sy.floor();
    let fx = sx - x0;
    let fy = sy - y0;

    let fetch = |ix: f32, iy: f32| -> [f32; 3] {
        if ix < 0.0 || iy < 0.0 || ix >= image.width() as f32 || iy >= image.height() as f32 {
            return [0.0; 3];
        }
        let p = image.get_pixel(ix as u32, iy as u32).0;
        [f32::from(p[0]), f32::from(p[1]), f32::from(p[2])]
    };

    let tl = fetch(x0, y0);
    let tr = fetch(x0 + 1.0, y0);
    let bl = fetch(x0, y0 + 1.0);
    let br = fetch(x0 + 1.0, y0 + 1.0);

    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = tl[c] + (tr[c] - tl[c]) * fx;
        let bottom = bl[c] + (br[c] - bl[c]) * fx;
        out[c] = (top + (bottom - top) * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

/// Convert an RGB image to an NHWC tensor, normalizing each channel value.
fn image_to_nhwc<F>(image: &RgbImage, normalize: F) -> Array4<f32>
where
    F: Fn(u8) -> f32,
{
    let (w, h) = (image.width() as usize, image.height() as usize);
    let mut tensor = Array4::zeros((1, h, w, 3));
    for ((_, dst), &src) in tensor.indexed_iter_mut().zip(image.as_raw().iter()) {
        *dst = normalize(src);
    }
    tensor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letterbox_params_landscape() {
        let (new_w, new_h, pad_left, pad_top, (scale_y, scale_x)) =
            calculate_letterbox_params(640, 480, 224);
        assert_eq!((new_w, new_h), (224, 168));
        assert_eq!((pad_left, pad_top), (0, 28));
        assert!((scale_x - 0.35).abs() < 1e-6);
        assert!((scale_y - 0.35).abs() < 1e-6);
    }

    #[test]
    fn test_letterbox_round_trip_point() {
        let (_, _, pad_left, pad_top, scale) = calculate_letterbox_params(480, 640, 224);
        let letterbox = Letterbox {
            scale,
            padding: (pad_top as f32, pad_left as f32),
        };
        let (x, y) = letterbox.to_original((pad_left as f32 + 84.0, 112.0));
        assert!((x - 240.0).abs() < 0.5);
        assert!((y - 320.0).abs() < 0.5);
    }

    #[test]
    fn test_detector_tensor_range_and_padding() {
        let image = RgbImage::from_pixel(640, 480, Rgb([255, 255, 255]));
        let input = preprocess_detector(&image);
        assert_eq!(input.tensor.shape(), &[1, 224, 224, 3]);
        // padding rows are black -> -1, image rows are white -> 1
        assert!((input.tensor[[0, 0, 100, 0]] + 1.0).abs() < 1e-6);
        assert!(input.tensor[[0, 112, 100, 1]] > 0.98);
    }

    #[test]
    fn test_crop_roi_identity() {
        let mut image = RgbImage::new(4, 4);
        image.put_pixel(1, 2, Rgb([90, 180, 30]));
        let roi = Roi {
            center_x: 2.0,
            center_y: 2.0,
            size: 4.0,
            rotation: 0.0,
        };
        let crop = crop_roi(&image, &roi, 4);
        assert_eq!(crop, image);
    }

    #[test]
    fn test_crop_roi_outside_is_black() {
        let image = RgbImage::from_pixel(4, 4, Rgb([200, 200, 200]));
        let roi = Roi {
            center_x: 100.0,
            center_y: 100.0,
            size: 4.0,
            rotation: 0.0,
        };
        let crop = crop_roi(&image, &roi, 2);
        assert!(crop.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn test_landmark_tensor_shape() {
        let image = RgbImage::from_pixel(32, 32, Rgb([255, 0, 0]));
        let roi = Roi {
            center_x: 16.0,
            center_y: 16.0,
            size: 16.0,
            rotation: 0.3,
        };
        let tensor = preprocess_landmarks(&image, &roi);
        assert_eq!(tensor.shape(), &[1, 256, 256, 3]);
        assert!((tensor[[0, 128, 128, 0]] - 1.0).abs() < 1e-6);
        assert!(tensor[[0, 128, 128, 1]].abs() < 1e-6);
    }
}
