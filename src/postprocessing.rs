// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Post-processing for the two-stage pose pipeline.
//!
//! Decodes the person detector output against its SSD anchors, derives the
//! rotated region of interest the landmark model looks at, and maps landmark
//! model output back into image coordinates.

#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::suboptimal_flops
)]

use std::f32::consts::PI;

use crate::error::{LandmarkError, Result};
use crate::joints::BODY_LANDMARK_COUNT;
use crate::landmark::{PoseLandmarks, RawLandmark};
use crate::preprocessing::{DETECTOR_INPUT_SIZE, LANDMARK_INPUT_SIZE, Letterbox};

// ================================================================================================
// Constants
// ================================================================================================

/// Feature map strides of the detector, one per anchor layer.
const ANCHOR_STRIDES: [u32; 5] = [8, 16, 32, 32, 32];

/// Anchors per layer per cell: one unit anchor plus one interpolated scale.
const ANCHORS_PER_LAYER: usize = 2;

/// Number of anchors produced for a 224x224 detector input.
pub const NUM_ANCHORS: usize = 2254;

/// Values per anchor in the detector regressor output: box (4) + 4 keypoints (x, y).
pub const DETECTOR_COORDS: usize = 12;

/// Number of keypoints the detector predicts per person.
const DETECTOR_KEYPOINTS: usize = 4;

/// Raw detector scores are clipped to this magnitude before the sigmoid.
const SCORE_CLIPPING_THRESH: f32 = 100.0;

/// Enlargement applied to the keypoint-derived region of interest.
const ROI_SCALE: f32 = 1.25;

/// Values per landmark in the landmark model output: x, y, z, visibility, presence.
pub const LANDMARK_VALUES: usize = 5;

/// Landmarks in the landmark model output, including the auxiliary ROI points.
pub const LANDMARK_MODEL_POINTS: usize = 39;

// ================================================================================================
// Types
// ================================================================================================

/// Center of an SSD anchor in normalized detector input coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    /// Horizontal center.
    pub x_center: f32,
    /// Vertical center.
    pub y_center: f32,
}

/// Best person candidate from the detector.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonDetection {
    /// Sigmoid score of the candidate.
    pub score: f32,
    /// Keypoints in detector input pixels. Keypoint 0 is the hip midpoint,
    /// keypoint 1 a point above the head that fixes scale and rotation.
    pub keypoints: [(f32, f32); DETECTOR_KEYPOINTS],
}

/// Rotated square region of interest in image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Roi {
    /// Horizontal center.
    pub center_x: f32,
    /// Vertical center.
    pub center_y: f32,
    /// Side length.
    pub size: f32,
    /// Clockwise rotation in radians, within `[-PI, PI)`.
    pub rotation: f32,
}

impl Roi {
    /// Derive the region from the hip midpoint and the scale keypoint, both in image pixels.
    ///
    /// The region is centered on the hip, twice as wide as the hip-to-head distance
    /// (then enlarged by 25%), and rotated so the person stands upright in the crop.
    #[must_use]
    pub fn from_keypoints(hip: (f32, f32), head: (f32, f32)) -> Self {
        let (dx, dy) = (head.0 - hip.0, head.1 - hip.1);
        let size = 2.0 * dx.hypot(dy) * ROI_SCALE;
        let rotation = normalize_radians(PI / 2.0 - (-dy).atan2(dx));
        Self {
            center_x: hip.0,
            center_y: hip.1,
            size,
            rotation,
        }
    }

    /// Map a normalized crop position (`0..1` on both axes) to image pixels.
    #[must_use]
    pub fn to_image(&self, u: f32, v: f32) -> (f32, f32) {
        let (sin, cos) = self.rotation.sin_cos();
        let dx = (u - 0.5) * self.size;
        let dy = (v - 0.5) * self.size;
        (
            self.center_x + dx * cos - dy * sin,
            self.center_y + dx * sin + dy * cos,
        )
    }
}

// ================================================================================================
// Functions
// ================================================================================================

/// Logistic sigmoid.
#[must_use]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Wrap an angle into `[-PI, PI)`.
#[must_use]
pub fn normalize_radians(angle: f32) -> f32 {
    angle - 2.0 * PI * ((angle + PI) / (2.0 * PI)).floor()
}

/// Generate the detector's SSD anchors.
///
/// Consecutive layers sharing a stride are merged into one feature map, each
/// contributing two anchors per cell. With a fixed anchor size only centers matter.
#[must_use]
pub fn generate_anchors() -> Vec<Anchor> {
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);
    let mut layer = 0;
    while layer < ANCHOR_STRIDES.len() {
        let stride = ANCHOR_STRIDES[layer];
        let mut last_same = layer;
        let mut per_cell = 0;
        while last_same < ANCHOR_STRIDES.len() && ANCHOR_STRIDES[last_same] == stride {
            per_cell += ANCHORS_PER_LAYER;
            last_same += 1;
        }

        let feature_map = DETECTOR_INPUT_SIZE.div_ceil(stride);
        for y in 0..feature_map {
            for x in 0..feature_map {
                let anchor = Anchor {
                    x_center: (x as f32 + 0.5) / feature_map as f32,
                    y_center: (y as f32 + 0.5) / feature_map as f32,
                };
                anchors.extend(std::iter::repeat_n(anchor, per_cell));
            }
        }
        layer = last_same;
    }
    anchors
}

/// Decode the highest-scoring person candidate.
///
/// Returns `Ok(None)` when no candidate has a finite score.
///
/// # Errors
///
/// Returns [`LandmarkError::InferenceError`] if the output lengths do not
/// match the anchor count.
pub fn decode_best_detection(
    regressors: &[f32],
    scores: &[f32],
    anchors: &[Anchor],
) -> Result<Option<PersonDetection>> {
    if scores.len() != anchors.len() || regressors.len() != anchors.len() * DETECTOR_COORDS {
        return Err(LandmarkError::InferenceError(format!(
            "detector output mismatch: {} scores and {} regressors for {} anchors",
            scores.len(),
            regressors.len(),
            anchors.len()
        )));
    }

    let best = scores
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.is_nan())
        .max_by(|a, b| a.1.total_cmp(b.1));
    let Some((index, &raw)) = best else {
        return Ok(None);
    };

    let anchor = anchors[index];
    let scale = DETECTOR_INPUT_SIZE as f32;
    let row = &regressors[index * DETECTOR_COORDS..(index + 1) * DETECTOR_COORDS];
    let mut keypoints = [(0.0, 0.0); DETECTOR_KEYPOINTS];
    for (k, keypoint) in keypoints.iter_mut().enumerate() {
        let offset = 4 + k * 2;
        *keypoint = (
            (row[offset] / scale + anchor.x_center) * scale,
            (row[offset + 1] / scale + anchor.y_center) * scale,
        );
    }

    Ok(Some(PersonDetection {
        score: sigmoid(raw.clamp(-SCORE_CLIPPING_THRESH, SCORE_CLIPPING_THRESH)),
        keypoints,
    }))
}

/// Build the landmark region of interest from a detection.
#[must_use]
pub fn detection_to_roi(detection: &PersonDetection, letterbox: &Letterbox) -> Roi {
    let hip = letterbox.to_original(detection.keypoints[0]);
    let head = letterbox.to_original(detection.keypoints[1]);
    Roi::from_keypoints(hip, head)
}

/// Map landmark model output back to normalized image coordinates.
///
/// Only the 33 body landmarks are returned; the auxiliary points the model
/// appends are dropped. Visibility and presence logits go through a sigmoid.
///
/// # Errors
///
/// Returns [`LandmarkError::InferenceError`] if fewer than
/// `33 * LANDMARK_VALUES` values are supplied.
pub fn decode_landmarks(values: &[f32], roi: &Roi, width: u32, height: u32) -> Result<PoseLandmarks> {
    let needed = BODY_LANDMARK_COUNT * LANDMARK_VALUES;
    if values.len() < needed {
        return Err(LandmarkError::InferenceError(format!(
            "landmark output has {} values, expected at least {needed}",
            values.len()
        )));
    }

    let crop = LANDMARK_INPUT_SIZE as f32;
    let (w, h) = (width as f32, height as f32);
    Ok(values[..needed]
        .chunks_exact(LANDMARK_VALUES)
        .map(|lm| {
            let (px, py) = roi.to_image(lm[0] / crop, lm[1] / crop);
            RawLandmark::from_f32(px / w, py / h, sigmoid(lm[3]), sigmoid(lm[4]))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::Scalar;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_anchor_count_and_layout() {
        let anchors = generate_anchors();
        assert_eq!(anchors.len(), NUM_ANCHORS);
        assert!(approx(anchors[0].x_center, 1.0 / 56.0));
        assert!(approx(anchors[0].y_center, 1.0 / 56.0));
        // stride 8 layer: two anchors per cell on a 28x28 map
        assert_eq!(anchors[0], anchors[1]);
        assert!(approx(anchors[2].x_center, 1.5 / 28.0));
        // last six anchors share the bottom-right cell of the 7x7 map
        let last = anchors[NUM_ANCHORS - 1];
        assert!(approx(last.x_center, 6.5 / 7.0));
        assert!(anchors[NUM_ANCHORS - 6..].iter().all(|a| *a == last));
    }

    #[test]
    fn test_sigmoid() {
        assert!(approx(sigmoid(0.0), 0.5));
        assert!(sigmoid(10.0) > 0.999);
        assert!(sigmoid(-10.0) < 0.001);
    }

    #[test]
    fn test_normalize_radians() {
        assert!(approx(normalize_radians(0.0), 0.0));
        assert!(approx(normalize_radians(3.0 * PI / 2.0), -PI / 2.0));
        assert!(approx(normalize_radians(-3.0 * PI / 2.0), PI / 2.0));
        assert!(approx(normalize_radians(PI), -PI));
    }

    #[test]
    fn test_roi_upright_person() {
        // scale keypoint straight above the hip
        let roi = Roi::from_keypoints((100.0, 200.0), (100.0, 120.0));
        assert!(approx(roi.rotation, 0.0));
        assert!(approx(roi.size, 2.0 * 80.0 * 1.25));
        assert_eq!((roi.center_x, roi.center_y), (100.0, 200.0));

        let (x, y) = roi.to_image(0.5, 0.5);
        assert!(approx(x, 100.0) && approx(y, 200.0));
        let (x, y) = roi.to_image(0.0, 0.0);
        assert!(approx(x, 0.0) && approx(y, 100.0));
    }

    #[test]
    fn test_roi_lying_person() {
        // head to the right of the hip: crop must rotate a quarter turn
        let roi = Roi::from_keypoints((100.0, 100.0), (150.0, 100.0));
        assert!(approx(roi.rotation, PI / 2.0));
        // top of the crop maps toward the head
        let (x, y) = roi.to_image(0.5, 0.0);
        assert!(approx(x, 100.0 + roi.size / 2.0));
        assert!(approx(y, 100.0));
    }

    #[test]
    fn test_decode_best_detection() {
        let anchors = generate_anchors();
        let mut scores = vec![-5.0; NUM_ANCHORS];
        let mut regressors = vec![0.0; NUM_ANCHORS * DETECTOR_COORDS];
        scores[10] = 2.0;
        // keypoint 1 offset by (+8, -16) pixels
        regressors[10 * DETECTOR_COORDS + 6] = 8.0;
        regressors[10 * DETECTOR_COORDS + 7] = -16.0;

        let detection = decode_best_detection(&regressors, &scores, &anchors)
            .unwrap()
            .unwrap();
        assert!(approx(detection.score, sigmoid(2.0)));
        let anchor = anchors[10];
        assert!(approx(detection.keypoints[0].0, anchor.x_center * 224.0));
        assert!(approx(detection.keypoints[1].0, anchor.x_center * 224.0 + 8.0));
        assert!(approx(detection.keypoints[1].1, anchor.y_center * 224.0 - 16.0));
    }

    #[test]
    fn test_decode_best_detection_rejects_bad_shapes() {
        let anchors = generate_anchors();
        let result = decode_best_detection(&[0.0; 12], &[0.0], &anchors);
        assert!(matches!(result, Err(LandmarkError::InferenceError(_))));
    }

    #[test]
    fn test_decode_best_detection_all_nan() {
        let anchors = vec![Anchor { x_center: 0.5, y_center: 0.5 }];
        let result = decode_best_detection(&[0.0; 12], &[f32::NAN], &anchors).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_decode_landmarks_projects_through_roi() {
        let roi = Roi {
            center_x: 320.0,
            center_y: 240.0,
            size: 256.0,
            rotation: 0.0,
        };
        let mut values = vec![0.0; LANDMARK_MODEL_POINTS * LANDMARK_VALUES];
        // landmark 23 at the crop center, fully visible
        values[23 * 5] = 128.0;
        values[23 * 5 + 1] = 128.0;
        values[23 * 5 + 3] = 20.0;
        values[23 * 5 + 4] = -20.0;

        let landmarks = decode_landmarks(&values, &roi, 640, 480).unwrap();
        assert_eq!(landmarks.len(), BODY_LANDMARK_COUNT);
        let hip = &landmarks[23];
        assert!((hip.x.coerce() - 0.5).abs() < 1e-6);
        assert!((hip.y.coerce() - 0.5).abs() < 1e-6);
        assert!(hip.visibility.coerce() > 0.99);
        assert!(hip.presence.coerce() < 0.01);
        assert!(matches!(hip.x, Scalar::F32(_)));
    }

    #[test]
    fn test_decode_landmarks_too_short() {
        let roi = Roi {
            center_x: 0.0,
            center_y: 0.0,
            size: 1.0,
            rotation: 0.0,
        };
        assert!(decode_landmarks(&[0.0; 20], &roi, 10, 10).is_err());
    }
}
