// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Error types for pose landmark extraction.

use thiserror::Error;

/// Result type alias for landmark operations.
pub type Result<T> = std::result::Result<T, LandmarkError>;

/// Main error type for the landmarker.
#[derive(Debug, Error)]
pub enum LandmarkError {
    /// The model session could not be created. Retryable: the next call tries again.
    #[error("Initialization error: {0}")]
    InitializationError(String),
    /// The input image could not be decoded or is empty.
    #[error("Image decode error: {0}")]
    ImageDecodeError(String),
    /// Inference ran but found no person in the image.
    #[error("No pose detected")]
    NoPoseDetected,
    /// The inference engine failed or produced malformed output.
    #[error("Inference error: {0}")]
    InferenceError(String),
    /// Invalid configuration provided.
    #[error("Config error: {0}")]
    ConfigError(String),
}

impl LandmarkError {
    /// Short error code reported to callers of the command-line bridge.
    ///
    /// `ARG` for bad arguments, `IMG` for undecodable images and `POSE` for
    /// everything that happens once the model is involved.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => "ARG",
            Self::ImageDecodeError(_) => "IMG",
            Self::InitializationError(_) | Self::NoPoseDetected | Self::InferenceError(_) => {
                "POSE"
            }
        }
    }

    /// Whether repeating the same call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::InitializationError(_))
    }
}

impl From<image::ImageError> for LandmarkError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageDecodeError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LandmarkError::InitializationError("missing asset".to_string());
        assert_eq!(err.to_string(), "Initialization error: missing asset");
        assert_eq!(LandmarkError::NoPoseDetected.to_string(), "No pose detected");
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(LandmarkError::ConfigError(String::new()).code(), "ARG");
        assert_eq!(LandmarkError::ImageDecodeError(String::new()).code(), "IMG");
        assert_eq!(LandmarkError::NoPoseDetected.code(), "POSE");
        assert_eq!(LandmarkError::InferenceError(String::new()).code(), "POSE");
        assert_eq!(LandmarkError::InitializationError(String::new()).code(), "POSE");
    }

    #[test]
    fn test_only_initialization_is_retryable() {
        assert!(LandmarkError::InitializationError(String::new()).is_retryable());
        assert!(!LandmarkError::NoPoseDetected.is_retryable());
        assert!(!LandmarkError::InferenceError(String::new()).is_retryable());
    }
}
