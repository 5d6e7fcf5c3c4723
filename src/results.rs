// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Extraction results.
//!
//! An [`ExtractionResult`] always holds all eight [`Joint`]s. A call that cannot
//! produce every joint fails instead of returning a partial result, so callers
//! never need to check for missing keys.

use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{LandmarkError, Result};
use crate::joints::Joint;

/// A joint position in image pixels with its confidence signals.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize)]
pub struct JointPoint {
    /// Horizontal position in pixels.
    pub x: f64,
    /// Vertical position in pixels.
    pub y: f64,
    /// Visibility probability as reported by the model.
    pub v: f64,
    /// Presence probability as reported by the model.
    pub pr: f64,
}

impl JointPoint {
    /// Create a new joint point.
    #[must_use]
    pub const fn new(x: f64, y: f64, v: f64, pr: f64) -> Self {
        Self { x, y, v, pr }
    }

    /// Whether the point lies within an image of the given size, edges included.
    #[must_use]
    pub fn is_within(&self, width: u32, height: u32) -> bool {
        (0.0..=f64::from(width)).contains(&self.x) && (0.0..=f64::from(height)).contains(&self.y)
    }
}

/// The eight named joints of one person.
///
/// Serializes as a map keyed by joint name (`leftHip`, `rightHip`, ...), each
/// value an object with `x`, `y`, `v` and `pr` fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    points: [JointPoint; Joint::COUNT],
}

impl ExtractionResult {
    /// Build a result from points given in [`Joint::ALL`] order.
    #[must_use]
    pub const fn new(points: [JointPoint; Joint::COUNT]) -> Self {
        Self { points }
    }

    /// Point of a joint.
    #[must_use]
    pub const fn get(&self, joint: Joint) -> &JointPoint {
        &self.points[joint.ordinal()]
    }

    /// Iterate over `(joint, point)` pairs in [`Joint::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Joint, &JointPoint)> {
        Joint::ALL.into_iter().zip(self.points.iter())
    }

    /// Number of joints, always eight.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.points.len()
    }

    /// Always `false`. Present for API symmetry with `len`.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Copy into a map keyed by serialized joint name.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<&'static str, JointPoint> {
        self.iter().map(|(joint, point)| (joint.as_str(), *point)).collect()
    }
}

impl std::ops::Index<Joint> for ExtractionResult {
    type Output = JointPoint;

    fn index(&self, joint: Joint) -> &Self::Output {
        self.get(joint)
    }
}

impl Serialize for ExtractionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (joint, point) in self.iter() {
            map.serialize_entry(joint.as_str(), point)?;
        }
        map.end()
    }
}

/// Outcome of a detection call.
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    /// A person was found and all joints were extracted.
    Detected(ExtractionResult),
    /// The model found no person in the image.
    NotDetected,
}

impl Detection {
    /// Whether a person was found.
    #[must_use]
    pub const fn is_detected(&self) -> bool {
        matches!(self, Self::Detected(_))
    }

    /// The extraction result, if any.
    #[must_use]
    pub fn ok(self) -> Option<ExtractionResult> {
        match self {
            Self::Detected(result) => Some(result),
            Self::NotDetected => None,
        }
    }

    /// Convert into a `Result`, treating a missing person as an error.
    ///
    /// # Errors
    ///
    /// Returns [`LandmarkError::NoPoseDetected`] for [`Detection::NotDetected`].
    pub fn into_result(self) -> Result<ExtractionResult> {
        self.ok().ok_or(LandmarkError::NoPoseDetected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ExtractionResult {
        let mut points = [JointPoint::default(); Joint::COUNT];
        for (i, point) in points.iter_mut().enumerate() {
            let i = i as f64;
            *point = JointPoint::new(10.0 * i, 20.0 * i, 0.9, 0.8);
        }
        ExtractionResult::new(points)
    }

    #[test]
    fn test_get_by_joint() {
        let result = sample();
        assert_eq!(result.len(), 8);
        assert!((result.get(Joint::LeftHip).x - 0.0).abs() < f64::EPSILON);
        assert!((result[Joint::RightHip].y - 20.0).abs() < f64::EPSILON);
        assert!((result[Joint::RightWrist].x - 70.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_serialize_uses_joint_names() {
        let json = serde_json::to_value(sample()).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 8);
        for joint in Joint::ALL {
            let point = &object[joint.as_str()];
            for field in ["x", "y", "v", "pr"] {
                assert!(point.get(field).is_some(), "{joint} missing {field}");
            }
        }
        assert_eq!(object["leftKnee"]["x"], 20.0);
    }

    #[test]
    fn test_to_map_has_all_joints() {
        let map = sample().to_map();
        assert_eq!(map.len(), 8);
        assert!(map.contains_key("rightAnkle"));
    }

    #[test]
    fn test_is_within() {
        assert!(JointPoint::new(0.0, 480.0, 1.0, 1.0).is_within(640, 480));
        assert!(!JointPoint::new(-1.0, 10.0, 1.0, 1.0).is_within(640, 480));
        assert!(!JointPoint::new(10.0, 481.0, 1.0, 1.0).is_within(640, 480));
    }

    #[test]
    fn test_detection_into_result() {
        assert!(matches!(
            Detection::NotDetected.into_result(),
            Err(LandmarkError::NoPoseDetected)
        ));
        let detected = Detection::Detected(sample());
        assert!(detected.is_detected());
        assert_eq!(detected.into_result().unwrap(), sample());
    }
}
