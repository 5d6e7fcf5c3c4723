// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Named joints extracted from the 33-point body landmark layout.
//!
//! The pose model emits landmarks in the BlazePose topology (nose = 0 through
//! right foot index = 32). Only the eight joints used for garment fitting are
//! exposed: hips, knees, ankles and wrists.

use std::fmt;
use std::str::FromStr;

/// Number of landmarks in the BlazePose body topology.
pub const BODY_LANDMARK_COUNT: usize = 33;

/// A joint reported in every extraction result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Joint {
    /// Left hip, landmark 23.
    LeftHip,
    /// Right hip, landmark 24.
    RightHip,
    /// Left knee, landmark 25.
    LeftKnee,
    /// Right knee, landmark 26.
    RightKnee,
    /// Left ankle, landmark 27.
    LeftAnkle,
    /// Right ankle, landmark 28.
    RightAnkle,
    /// Left wrist, landmark 15.
    LeftWrist,
    /// Right wrist, landmark 16.
    RightWrist,
}

impl Joint {
    /// All joints in output order.
    pub const ALL: [Self; 8] = [
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
        Self::LeftWrist,
        Self::RightWrist,
    ];

    /// Number of named joints.
    pub const COUNT: usize = Self::ALL.len();

    /// Index of the joint in the 33-point landmark layout.
    #[must_use]
    pub const fn landmark_index(&self) -> usize {
        match self {
            Self::LeftWrist => 15,
            Self::RightWrist => 16,
            Self::LeftHip => 23,
            Self::RightHip => 24,
            Self::LeftKnee => 25,
            Self::RightKnee => 26,
            Self::LeftAnkle => 27,
            Self::RightAnkle => 28,
        }
    }

    /// Position of the joint in [`Joint::ALL`].
    #[must_use]
    pub const fn ordinal(&self) -> usize {
        *self as usize
    }

    /// Name used in serialized results.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LeftHip => "leftHip",
            Self::RightHip => "rightHip",
            Self::LeftKnee => "leftKnee",
            Self::RightKnee => "rightKnee",
            Self::LeftAnkle => "leftAnkle",
            Self::RightAnkle => "rightAnkle",
            Self::LeftWrist => "leftWrist",
            Self::RightWrist => "rightWrist",
        }
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Joint {
    type Err = JointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();
        Self::ALL
            .into_iter()
            .find(|joint| joint.as_str().to_lowercase() == normalized)
            .ok_or_else(|| JointParseError(s.to_string()))
    }
}

/// Error returned when parsing an unknown joint name.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid joint '{0}', expected one of: {names}", names = joint_names())]
pub struct JointParseError(String);

fn joint_names() -> String {
    Joint::ALL.map(|j| j.as_str()).join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_indices() {
        assert_eq!(Joint::LeftWrist.landmark_index(), 15);
        assert_eq!(Joint::RightWrist.landmark_index(), 16);
        assert_eq!(Joint::LeftHip.landmark_index(), 23);
        assert_eq!(Joint::RightHip.landmark_index(), 24);
        assert_eq!(Joint::LeftKnee.landmark_index(), 25);
        assert_eq!(Joint::RightKnee.landmark_index(), 26);
        assert_eq!(Joint::LeftAnkle.landmark_index(), 27);
        assert_eq!(Joint::RightAnkle.landmark_index(), 28);
        assert!(Joint::ALL
            .iter()
            .all(|j| j.landmark_index() < BODY_LANDMARK_COUNT));
    }

    #[test]
    fn test_ordinal_matches_all() {
        for (i, joint) in Joint::ALL.iter().enumerate() {
            assert_eq!(joint.ordinal(), i);
        }
    }

    #[test]
    fn test_joint_from_str() {
        assert_eq!("leftHip".parse::<Joint>().unwrap(), Joint::LeftHip);
        assert_eq!("right_ankle".parse::<Joint>().unwrap(), Joint::RightAnkle);
        assert_eq!("Left Wrist".parse::<Joint>().unwrap(), Joint::LeftWrist);
        let err = "nose".parse::<Joint>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid joint 'nose', expected one of: leftHip, rightHip, leftKnee, rightKnee, \
             leftAnkle, rightAnkle, leftWrist, rightWrist"
        );
    }

    #[test]
    fn test_joint_display() {
        assert_eq!(Joint::RightKnee.to_string(), "rightKnee");
    }
}
