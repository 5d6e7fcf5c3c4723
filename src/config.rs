// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Landmarker configuration.
//!
//! This module defines [`LandmarkerOptions`], the fixed configuration a pose model
//! session is created with, and [`ModelAsset`], which locates the model files on disk.
//! Options are built in code with the `with_*` builder methods or read from
//! `POSE_*` environment variables with [`LandmarkerOptions::from_env`].

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::device::Device;
use crate::error::{LandmarkError, Result};

/// Default model asset, a directory holding the lite pose model pair.
pub const DEFAULT_MODEL_ASSET: &str = "pose_landmarker_lite";

/// File name of the person detector inside a model asset.
pub const DETECTOR_MODEL_FILE: &str = "pose_detector.onnx";

/// File name of the landmark regressor inside a model asset.
pub const LANDMARKS_MODEL_FILE: &str = "pose_landmarks_detector.onnx";

/// Default threshold for detection, presence and tracking confidence.
///
/// Permissive on purpose so that partially occluded lower bodies still yield a pose.
pub const DEFAULT_CONFIDENCE: f32 = 0.3;

/// Location of a pose model asset.
///
/// An asset is a directory containing [`DETECTOR_MODEL_FILE`] and
/// [`LANDMARKS_MODEL_FILE`], the same pair a MediaPipe `pose_landmarker_*.task`
/// bundle ships, exported to ONNX.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelAsset {
    root: PathBuf,
}

impl ModelAsset {
    /// Create an asset locator for the given directory.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// The asset directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the person detector model.
    #[must_use]
    pub fn detector_path(&self) -> PathBuf {
        self.root.join(DETECTOR_MODEL_FILE)
    }

    /// Path of the landmark model.
    #[must_use]
    pub fn landmarks_path(&self) -> PathBuf {
        self.root.join(LANDMARKS_MODEL_FILE)
    }
}

impl Default for ModelAsset {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_ASSET)
    }
}

impl fmt::Display for ModelAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root.display())
    }
}

/// How the session consumes input. Only still images are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunningMode {
    /// One independent inference per call, no state carried between images.
    #[default]
    Image,
}

/// Configuration for a pose landmarker session.
///
/// # Example
///
/// ```rust
/// use pose_landmarker::LandmarkerOptions;
///
/// let options = LandmarkerOptions::new()
///     .with_asset("models/pose_landmarker_full")
///     .with_detection_confidence(0.5)
///     .with_threads(4);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkerOptions {
    /// Where the model files live.
    pub asset: ModelAsset,
    /// Input mode, fixed to single images.
    pub running_mode: RunningMode,
    /// Maximum number of people to detect. Only `1` is accepted.
    pub num_poses: usize,
    /// Minimum person detector score (0.0 to 1.0).
    pub min_pose_detection_confidence: f32,
    /// Minimum landmark model pose flag (0.0 to 1.0).
    pub min_pose_presence_confidence: f32,
    /// Minimum tracking confidence (0.0 to 1.0). Has no effect in image mode.
    pub min_tracking_confidence: f32,
    /// Number of intra-op threads for ONNX Runtime. `0` lets the runtime decide.
    pub num_threads: usize,
    /// Execution device.
    pub device: Device,
}

impl Default for LandmarkerOptions {
    fn default() -> Self {
        Self {
            asset: ModelAsset::default(),
            running_mode: RunningMode::Image,
            num_poses: 1,
            min_pose_detection_confidence: DEFAULT_CONFIDENCE,
            min_pose_presence_confidence: DEFAULT_CONFIDENCE,
            min_tracking_confidence: DEFAULT_CONFIDENCE,
            num_threads: 0,
            device: Device::Cpu,
        }
    }
}

impl LandmarkerOptions {
    /// Create options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from `POSE_*` environment variables, falling back to defaults.
    ///
    /// Recognized variables are `POSE_MODEL_ASSET`, `POSE_DEVICE`, `POSE_NUM_THREADS`,
    /// `POSE_MIN_DETECTION_CONFIDENCE`, `POSE_MIN_PRESENCE_CONFIDENCE` and
    /// `POSE_MIN_TRACKING_CONFIDENCE`. Values that fail to parse are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|s| s.trim().parse::<f32>().ok());

        let device = match lookup("POSE_DEVICE") {
            Some(value) => value.parse().unwrap_or_else(|e| {
                tracing::warn!("ignoring POSE_DEVICE: {e}");
                defaults.device
            }),
            None => defaults.device,
        };

        Self {
            asset: lookup("POSE_MODEL_ASSET").map_or(defaults.asset, ModelAsset::new),
            device,
            num_threads: lookup("POSE_NUM_THREADS")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.num_threads),
            min_pose_detection_confidence: parsed("POSE_MIN_DETECTION_CONFIDENCE")
                .unwrap_or(defaults.min_pose_detection_confidence),
            min_pose_presence_confidence: parsed("POSE_MIN_PRESENCE_CONFIDENCE")
                .unwrap_or(defaults.min_pose_presence_confidence),
            min_tracking_confidence: parsed("POSE_MIN_TRACKING_CONFIDENCE")
                .unwrap_or(defaults.min_tracking_confidence),
            ..defaults
        }
    }

    /// Set the model asset directory.
    #[must_use]
    pub fn with_asset<P: AsRef<Path>>(mut self, root: P) -> Self {
        self.asset = ModelAsset::new(root);
        self
    }

    /// Set the minimum person detection confidence.
    #[must_use]
    pub const fn with_detection_confidence(mut self, threshold: f32) -> Self {
        self.min_pose_detection_confidence = threshold;
        self
    }

    /// Set the minimum pose presence confidence.
    #[must_use]
    pub const fn with_presence_confidence(mut self, threshold: f32) -> Self {
        self.min_pose_presence_confidence = threshold;
        self
    }

    /// Set the minimum tracking confidence.
    #[must_use]
    pub const fn with_tracking_confidence(mut self, threshold: f32) -> Self {
        self.min_tracking_confidence = threshold;
        self
    }

    /// Set the number of intra-op threads. `0` lets ONNX Runtime decide.
    #[must_use]
    pub const fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = threads;
        self
    }

    /// Set the execution device.
    #[must_use]
    pub const fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Check that the options describe a session this crate can create.
    ///
    /// # Errors
    ///
    /// Returns [`LandmarkError::ConfigError`] if a threshold is outside `[0, 1]`
    /// or `num_poses` is anything other than `1`.
    pub fn validate(&self) -> Result<()> {
        if self.num_poses != 1 {
            return Err(LandmarkError::ConfigError(format!(
                "num_poses must be 1, got {}",
                self.num_poses
            )));
        }
        for (name, value) in [
            ("min_pose_detection_confidence", self.min_pose_detection_confidence),
            ("min_pose_presence_confidence", self.min_pose_presence_confidence),
            ("min_tracking_confidence", self.min_tracking_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(LandmarkError::ConfigError(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_options_default() {
        let options = LandmarkerOptions::default();
        assert_eq!(options.num_poses, 1);
        assert_eq!(options.running_mode, RunningMode::Image);
        assert!((options.min_pose_detection_confidence - 0.3).abs() < f32::EPSILON);
        assert!((options.min_pose_presence_confidence - 0.3).abs() < f32::EPSILON);
        assert!((options.min_tracking_confidence - 0.3).abs() < f32::EPSILON);
        assert_eq!(options.asset.root(), Path::new(DEFAULT_MODEL_ASSET));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_options_builder() {
        let options = LandmarkerOptions::new()
            .with_asset("/models/full")
            .with_detection_confidence(0.5)
            .with_presence_confidence(0.6)
            .with_tracking_confidence(0.7)
            .with_threads(4)
            .with_device(Device::Cuda(1));

        assert_eq!(options.asset.detector_path(), Path::new("/models/full/pose_detector.onnx"));
        assert_eq!(
            options.asset.landmarks_path(),
            Path::new("/models/full/pose_landmarks_detector.onnx")
        );
        assert!((options.min_pose_detection_confidence - 0.5).abs() < f32::EPSILON);
        assert!((options.min_pose_presence_confidence - 0.6).abs() < f32::EPSILON);
        assert!((options.min_tracking_confidence - 0.7).abs() < f32::EPSILON);
        assert_eq!(options.num_threads, 4);
        assert_eq!(options.device, Device::Cuda(1));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(LandmarkerOptions::new().with_detection_confidence(1.5).validate().is_err());
        assert!(LandmarkerOptions::new().with_presence_confidence(-0.1).validate().is_err());
        assert!(LandmarkerOptions::new().with_tracking_confidence(f32::NAN).validate().is_err());

        let options = LandmarkerOptions {
            num_poses: 2,
            ..LandmarkerOptions::default()
        };
        assert!(matches!(options.validate(), Err(LandmarkError::ConfigError(_))));
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("POSE_MODEL_ASSET", "/opt/pose"),
            ("POSE_DEVICE", "cuda:2"),
            ("POSE_NUM_THREADS", "8"),
            ("POSE_MIN_DETECTION_CONFIDENCE", "0.55"),
            ("POSE_MIN_PRESENCE_CONFIDENCE", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let options = LandmarkerOptions::from_lookup(|key| vars.get(key).map(ToString::to_string));
        assert_eq!(options.asset, ModelAsset::new("/opt/pose"));
        assert_eq!(options.device, Device::Cuda(2));
        assert_eq!(options.num_threads, 8);
        assert!((options.min_pose_detection_confidence - 0.55).abs() < f32::EPSILON);
        // unparseable values keep the default
        assert!((options.min_pose_presence_confidence - 0.3).abs() < f32::EPSILON);
        assert_eq!(options.num_poses, 1);
    }

    #[test]
    fn test_from_lookup_ignores_bad_device() {
        let options = LandmarkerOptions::from_lookup(|key| {
            (key == "POSE_DEVICE").then(|| "quantum".to_string())
        });
        assert_eq!(options.device, Device::Cpu);
    }
}
