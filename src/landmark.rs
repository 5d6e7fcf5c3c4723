// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Raw landmarks as they come out of a pose engine.
//!
//! Engines do not agree on the numeric type of a landmark field: some report
//! `f32`, some `f64`, and bridged runtimes may hand back text or nothing at
//! all. [`Scalar`] captures those shapes at the engine boundary and
//! [`Scalar::coerce`] turns any of them into a finite `f64`.

use std::fmt;

/// One numeric field of a landmark in whatever form the engine produced it.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Scalar {
    /// Single precision value.
    F32(f32),
    /// Double precision value.
    F64(f64),
    /// Textual value, parsed on coercion.
    Text(String),
    /// The engine did not provide the field or its accessor failed.
    #[default]
    Absent,
}

impl Scalar {
    /// Wrap the result of a fallible field accessor. Errors become [`Scalar::Absent`].
    pub fn from_accessor<T, E>(value: std::result::Result<T, E>) -> Self
    where
        T: Into<Self>,
    {
        value.map_or(Self::Absent, Into::into)
    }

    /// Numeric value if the field holds one, before any clamping.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::F32(v) => Some(f64::from(*v)),
            Self::F64(v) => Some(*v),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
            Self::Absent => None,
        }
    }

    /// Convert to a finite `f64`.
    ///
    /// Missing, unparseable and NaN values become `0.0`. Infinities clamp to
    /// the largest finite `f64` of the same sign.
    #[must_use]
    pub fn coerce(&self) -> f64 {
        match self.as_f64() {
            Some(v) if v.is_nan() => 0.0,
            Some(v) => v.clamp(f64::MIN, f64::MAX),
            None => 0.0,
        }
    }
}

impl From<f32> for Scalar {
    fn from(value: f32) -> Self {
        Self::F32(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::F64(value)
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl<T: Into<Self>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::F32(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Absent => write!(f, "<absent>"),
        }
    }
}

/// A single landmark in normalized image coordinates.
///
/// `x` and `y` are fractions of the image width and height. They may fall
/// slightly outside `[0, 1]` for joints the model extrapolates beyond the frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawLandmark {
    /// Normalized horizontal position.
    pub x: Scalar,
    /// Normalized vertical position.
    pub y: Scalar,
    /// Probability that the landmark is visible.
    pub visibility: Scalar,
    /// Probability that the landmark is present in the pose.
    pub presence: Scalar,
}

impl RawLandmark {
    /// Landmark with all fields set from `f32` values, the native engine output.
    #[must_use]
    pub const fn from_f32(x: f32, y: f32, visibility: f32, presence: f32) -> Self {
        Self {
            x: Scalar::F32(x),
            y: Scalar::F32(y),
            visibility: Scalar::F32(visibility),
            presence: Scalar::F32(presence),
        }
    }
}

/// Landmarks of one detected person, in body topology order.
pub type PoseLandmarks = Vec<RawLandmark>;
