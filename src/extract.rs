// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Joint extraction from raw landmarks.

use std::time::Instant;

use crate::engine::PoseEngine;
use crate::error::{LandmarkError, Result};
use crate::joints::Joint;
use crate::landmark::RawLandmark;
use crate::results::{Detection, ExtractionResult, JointPoint};
use crate::session::SessionHandle;
use crate::source::DecodedImage;

/// Minimum landmark count that contains every named joint.
const REQUIRED_LANDMARKS: usize = 29;

/// Run one inference pass and reduce the first person to the named joints.
///
/// People after the first are ignored. Nothing is retried.
///
/// # Errors
///
/// Returns [`LandmarkError::InferenceError`] if the engine fails or returns a
/// landmark set too short to hold every joint.
pub fn detect<E: PoseEngine>(image: &DecodedImage, session: &SessionHandle<E>) -> Result<Detection> {
    let start = Instant::now();
    let poses = session.engine().infer(image)?;
    tracing::debug!(
        people = poses.len(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "pose inference"
    );

    let Some(first) = poses.first() else {
        return Ok(Detection::NotDetected);
    };
    extract_joints(first, image.width(), image.height()).map(Detection::Detected)
}

/// Select the named joints from a landmark set and convert them to pixels.
///
/// Each field is coerced with [`Scalar::coerce`](crate::landmark::Scalar::coerce):
/// unreadable values become `0.0`. Positions are `x * width` and `y * height`
/// without clipping; visibility and presence pass through.
///
/// # Errors
///
/// Returns [`LandmarkError::InferenceError`] if `landmarks` has fewer than 29
/// entries.
pub fn extract_joints(landmarks: &[RawLandmark], width: u32, height: u32) -> Result<ExtractionResult> {
    if landmarks.len() < REQUIRED_LANDMARKS {
        return Err(LandmarkError::InferenceError(format!(
            "pose has {} landmarks, expected at least {REQUIRED_LANDMARKS}",
            landmarks.len()
        )));
    }

    let (w, h) = (f64::from(width), f64::from(height));
    let points = Joint::ALL.map(|joint| {
        let lm = &landmarks[joint.landmark_index()];
        JointPoint::new(
            finite(lm.x.coerce() * w),
            finite(lm.y.coerce() * h),
            lm.visibility.coerce(),
            lm.presence.coerce(),
        )
    });
    Ok(ExtractionResult::new(points))
}

/// Keep a scaled coordinate finite when the product overflows to infinity.
fn finite(v: f64) -> f64 {
    v.clamp(f64::MIN, f64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::Scalar;

    fn landmarks(n: usize) -> Vec<RawLandmark> {
        (0..n)
            .map(|i| {
                let t = i as f32 / 40.0;
                RawLandmark::from_f32(t, 1.0 - t, 0.9, 0.95)
            })
            .collect()
    }

    #[test]
    fn test_extract_scales_to_pixels() {
        let mut lms = landmarks(33);
        lms[23] = RawLandmark::from_f32(0.4, 0.6, 0.91, 0.97);
        let result = extract_joints(&lms, 640, 480).unwrap();

        let hip = result[Joint::LeftHip];
        assert!((hip.x - 256.0).abs() < 1e-4);
        assert!((hip.y - 288.0).abs() < 1e-4);
        assert!((hip.v - f64::from(0.91_f32)).abs() < f64::EPSILON);
        assert!((hip.pr - f64::from(0.97_f32)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_extract_exact_midpoint() {
        let mut lms = landmarks(33);
        lms[16] = RawLandmark {
            x: Scalar::F64(0.5),
            y: Scalar::F64(0.5),
            ..RawLandmark::default()
        };
        let result = extract_joints(&lms, 200, 100).unwrap();
        assert_eq!(result[Joint::RightWrist].x, 100.0);
        assert_eq!(result[Joint::RightWrist].y, 50.0);
    }

    #[test]
    fn test_extract_coerces_bad_fields() {
        let mut lms = landmarks(33);
        lms[27] = RawLandmark {
            x: Scalar::from("0.25"),
            y: Scalar::Absent,
            visibility: Scalar::from("visible"),
            presence: Scalar::F64(f64::NAN),
        };
        let ankle = extract_joints(&lms, 400, 300).unwrap()[Joint::LeftAnkle];
        assert_eq!(ankle, JointPoint::new(100.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn test_extract_keeps_values_finite() {
        let mut lms = landmarks(33);
        lms[24].x = Scalar::F64(f64::MAX);
        let result = extract_joints(&lms, 640, 480).unwrap();
        assert!(result[Joint::RightHip].x.is_finite());
    }

    #[test]
    fn test_extract_uses_only_named_indices() {
        // 29 landmarks reach the right ankle; anything shorter fails
        assert!(extract_joints(&landmarks(29), 10, 10).is_ok());
        assert!(matches!(
            extract_joints(&landmarks(28), 10, 10),
            Err(LandmarkError::InferenceError(_))
        ));
        assert!(extract_joints(&[], 10, 10).is_err());
    }
}
