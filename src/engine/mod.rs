// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Pose inference engines.
//!
//! A [`PoseEngine`] turns a decoded image into the raw landmark sets of the
//! people it found. An [`EngineLoader`] builds an engine from a model asset and
//! is what a [`SessionManager`](crate::session::SessionManager) calls, at most
//! once, when the first detection needs a session.
//!
//! [`OrtPoseEngine`] is the ONNX Runtime implementation. Other engines, such as
//! test doubles, only need to implement the two traits. Any closure
//! `Fn(&LandmarkerOptions) -> Result<E>` is a loader.

mod onnx;

pub use onnx::{OrtEngineLoader, OrtPoseEngine};

use crate::config::LandmarkerOptions;
use crate::error::Result;
use crate::landmark::PoseLandmarks;
use crate::source::DecodedImage;

/// Single-pass pose inference on one image.
pub trait PoseEngine: Send + Sync {
    /// Run inference once.
    ///
    /// Returns one landmark set per detected person, in body topology order.
    /// An empty vector means nobody was found.
    ///
    /// # Errors
    ///
    /// Returns [`LandmarkError::InferenceError`](crate::LandmarkError::InferenceError)
    /// if the runtime fails.
    fn infer(&self, image: &DecodedImage) -> Result<Vec<PoseLandmarks>>;
}

/// Builds a [`PoseEngine`] from landmarker options.
pub trait EngineLoader: Send + Sync {
    /// Engine produced by this loader.
    type Engine: PoseEngine;

    /// Load the model asset named in `options` and build an engine.
    ///
    /// # Errors
    ///
    /// Returns [`LandmarkError::InitializationError`](crate::LandmarkError::InitializationError)
    /// if the asset cannot be loaded.
    fn load(&self, options: &LandmarkerOptions) -> Result<Self::Engine>;
}

impl<F, E> EngineLoader for F
where
    F: Fn(&LandmarkerOptions) -> Result<E> + Send + Sync,
    E: PoseEngine,
{
    type Engine = E;

    fn load(&self, options: &LandmarkerOptions) -> Result<E> {
        self(options)
    }
}
