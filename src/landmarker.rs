// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! High-level pose landmarker.
//!
//! [`PoseLandmarker`] pairs a [`SessionManager`] with the extraction step: each
//! call makes sure the session is ready, runs inference once and returns the
//! eight named joints of the first person found.

use std::path::Path;

use crate::config::LandmarkerOptions;
use crate::engine::{EngineLoader, OrtEngineLoader};
use crate::error::Result;
use crate::extract;
use crate::results::{Detection, ExtractionResult};
use crate::session::{SessionHandle, SessionManager, SessionState};
use crate::source::{DecodedImage, load_image};

/// Pose landmark extractor with a lazily created model session.
///
/// The model is not loaded until the first detection. A landmarker can be
/// shared across threads; concurrent first calls load the model once.
///
/// # Example
///
/// ```no_run
/// use pose_landmarker::{Joint, LandmarkerOptions, PoseLandmarker};
///
/// let landmarker = PoseLandmarker::new(LandmarkerOptions::new().with_asset("pose_landmarker_lite"));
/// let joints = landmarker.detect_path("person.jpg")?;
/// println!("left hip at {:?}", joints[Joint::LeftHip]);
/// # Ok::<(), pose_landmarker::LandmarkError>(())
/// ```
pub struct PoseLandmarker<L: EngineLoader = OrtEngineLoader> {
    sessions: SessionManager<L>,
}

impl PoseLandmarker<OrtEngineLoader> {
    /// Create a landmarker backed by ONNX Runtime.
    #[must_use]
    pub const fn new(options: LandmarkerOptions) -> Self {
        Self::with_loader(OrtEngineLoader, options)
    }
}

impl<L: EngineLoader> PoseLandmarker<L> {
    /// Create a landmarker that builds its engine with `loader`.
    pub const fn with_loader(loader: L, options: LandmarkerOptions) -> Self {
        Self {
            sessions: SessionManager::new(loader, options),
        }
    }

    /// Make sure the model session exists and return it.
    ///
    /// # Errors
    ///
    /// Returns [`LandmarkError::InitializationError`](crate::LandmarkError::InitializationError)
    /// if the model cannot be loaded. The next call retries.
    pub fn ensure_ready(&self) -> Result<SessionHandle<L::Engine>> {
        self.sessions.ensure_ready(&self.sessions.options().asset)
    }

    /// Detect the first person in `image`.
    ///
    /// # Errors
    ///
    /// Returns an initialization error if the session cannot be created and an
    /// inference error if the engine fails. No person is
    /// [`Detection::NotDetected`], not an error.
    pub fn detect(&self, image: &DecodedImage) -> Result<Detection> {
        let session = self.ensure_ready()?;
        extract::detect(image, &session)
    }

    /// Detect the first person in `image`, failing if there is none.
    ///
    /// # Errors
    ///
    /// Same as [`detect`](Self::detect), plus
    /// [`LandmarkError::NoPoseDetected`](crate::LandmarkError::NoPoseDetected)
    /// when nobody is found.
    pub fn detect_joints(&self, image: &DecodedImage) -> Result<ExtractionResult> {
        self.detect(image)?.into_result()
    }

    /// Load an image file and detect the first person in it.
    ///
    /// The image is decoded before the session is touched, so an unreadable
    /// file never triggers a model load.
    ///
    /// # Errors
    ///
    /// [`LandmarkError::ImageDecodeError`](crate::LandmarkError::ImageDecodeError)
    /// if the file cannot be decoded, otherwise as [`detect_joints`](Self::detect_joints).
    pub fn detect_path<P: AsRef<Path>>(&self, path: P) -> Result<ExtractionResult> {
        let image = load_image(path)?;
        self.detect_joints(&image)
    }

    /// Drop the model session. The next detection loads it again.
    pub fn release(&self) -> bool {
        self.sessions.release()
    }

    /// Lifecycle state of the model session.
    pub fn state(&self) -> SessionState {
        self.sessions.state()
    }

    /// Options the session is created with.
    pub const fn options(&self) -> &LandmarkerOptions {
        self.sessions.options()
    }
}

impl<L: EngineLoader> std::fmt::Debug for PoseLandmarker<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoseLandmarker")
            .field("sessions", &self.sessions)
            .finish()
    }
}
