// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

#![allow(clippy::multiple_crate_versions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Pose Landmarker
//!
//! Single-image body pose landmark extraction on [ONNX Runtime](https://onnxruntime.ai).
//!
//! Given a photograph, the landmarker finds one person and reports eight joints
//! (hips, knees, ankles and wrists) in image pixels, each with the model's
//! visibility and presence probabilities. It runs the BlazePose model pair
//! (person detector and 33-point landmark regressor) exported to ONNX.
//!
//! ## Features
//!
//! - **Lazy model session** - loaded on first use, exactly once, even under concurrent calls
//! - **Retryable initialization** - a failed model load is retried on the next call
//! - **Total results** - every successful call yields all eight joints, never a partial set
//! - **Defensive parsing** - engine values of any numeric or textual form are coerced to finite `f64`
//! - **Pluggable engines** - implement [`PoseEngine`] and [`EngineLoader`] to swap the backend
//!
//! ## Quick Start (Library)
//!
//! ```no_run
//! use pose_landmarker::{Detection, Joint, LandmarkerOptions, PoseLandmarker, load_image};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let landmarker = PoseLandmarker::new(
//!         LandmarkerOptions::new().with_asset("models/pose_landmarker_lite"),
//!     );
//!
//!     let image = load_image("person.jpg")?;
//!     match landmarker.detect(&image)? {
//!         Detection::Detected(joints) => {
//!             for (joint, point) in joints.iter() {
//!                 println!("{joint}: ({:.1}, {:.1}) v={:.2}", point.x, point.y, point.v);
//!             }
//!             println!("left knee y = {}", joints[Joint::LeftKnee].y);
//!         }
//!         Detection::NotDetected => println!("nobody in the picture"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! # Print the joints of the person in an image as JSON
//! pose-landmarker detect --image person.jpg
//!
//! # Use another model asset and a stricter detector
//! pose-landmarker detect -i person.jpg -m models/pose_landmarker_full --min-detection-confidence 0.5
//!
//! # List the reported joints
//! pose-landmarker joints
//! ```
//!
//! Output maps joint names to pixel positions and confidences:
//!
//! ```json
//! {"leftHip":{"x":256.0,"y":288.0,"v":0.98,"pr":0.99}, "rightHip":{...}, ...}
//! ```
//!
//! ## Model Asset
//!
//! A model asset is a directory holding `pose_detector.onnx` and
//! `pose_landmarks_detector.onnx`, the two networks of a MediaPipe
//! `pose_landmarker_*.task` bundle converted to ONNX.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`landmarker`] | High-level API ([`PoseLandmarker`]) |
//! | [`session`] | Lazy shared model session ([`SessionManager`]) |
//! | [`extract`] | Joint selection and pixel conversion ([`detect`], [`extract_joints`]) |
//! | [`engine`] | Inference backends ([`PoseEngine`], [`OrtPoseEngine`]) |
//! | [`landmark`] | Engine boundary values ([`Scalar`], [`RawLandmark`]) |
//! | [`results`] | Output types ([`ExtractionResult`], [`JointPoint`], [`Detection`]) |
//! | [`joints`] | Named joints ([`Joint`]) |
//! | [`config`] | Options ([`LandmarkerOptions`], [`ModelAsset`]) |
//! | [`source`] | Image decoding ([`DecodedImage`], [`load_image`]) |
//! | [`error`] | Error types ([`LandmarkError`], [`Result`]) |
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `cuda` | NVIDIA CUDA acceleration |
//! | `coreml` | Apple `CoreML` (macOS/iOS) |
//! | `directml` | `DirectML` (Windows) |

// Modules
pub mod cli;
pub mod config;
pub mod device;
pub mod engine;
pub mod error;
pub mod extract;
pub mod joints;
pub mod landmark;
pub mod landmarker;
pub mod postprocessing;
pub mod preprocessing;
pub mod results;
pub mod session;
pub mod source;

// Re-export main types for convenience
pub use config::{LandmarkerOptions, ModelAsset, RunningMode};
pub use device::Device;
pub use engine::{EngineLoader, OrtEngineLoader, OrtPoseEngine, PoseEngine};
pub use error::{LandmarkError, Result};
pub use extract::{detect, extract_joints};
pub use joints::{BODY_LANDMARK_COUNT, Joint};
pub use landmark::{PoseLandmarks, RawLandmark, Scalar};
pub use landmarker::PoseLandmarker;
pub use results::{Detection, ExtractionResult, JointPoint};
pub use session::{SessionHandle, SessionManager, SessionState};
pub use source::{DecodedImage, decode_image, load_image};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
