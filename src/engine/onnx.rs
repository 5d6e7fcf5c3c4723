// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! ONNX Runtime pose engine.
//!
//! Runs the BlazePose pair exported to ONNX: a person detector on the
//! letterboxed image, then a landmark model on the rotated crop around the
//! best detection.

use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use ndarray::Array4;
#[cfg(feature = "coreml")]
use ort::execution_providers::CoreMLExecutionProvider;
#[cfg(feature = "cuda")]
use ort::execution_providers::CUDAExecutionProvider;
#[cfg(feature = "directml")]
use ort::execution_providers::DirectMLExecutionProvider;
use ort::session::Session;
use ort::session::builder::SessionBuilder;
use ort::value::TensorRef;

use crate::config::LandmarkerOptions;
use crate::device::Device;
use crate::engine::{EngineLoader, PoseEngine};
use crate::error::{LandmarkError, Result};
use crate::landmark::PoseLandmarks;
use crate::postprocessing::{
    Anchor, DETECTOR_COORDS, LANDMARK_MODEL_POINTS, LANDMARK_VALUES, NUM_ANCHORS, Roi,
    decode_best_detection, decode_landmarks, detection_to_roi, generate_anchors,
};
use crate::preprocessing::{Letterbox, preprocess_detector, preprocess_landmarks};
use crate::source::DecodedImage;

/// One ONNX model with its resolved input and output names.
struct OnnxModel {
    session: Session,
    input_name: String,
    output_names: Vec<String>,
}

impl OnnxModel {
    fn load(path: &Path, options: &LandmarkerOptions) -> Result<Self> {
        if !path.exists() {
            return Err(LandmarkError::InitializationError(format!(
                "Model file not found: {}",
                path.display()
            )));
        }

        let builder = Session::builder().map_err(|e| {
            LandmarkError::InitializationError(format!("Failed to create session builder: {e}"))
        })?;
        let builder = with_device(builder, options.device)?;

        let session = builder
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
            .map_err(|e| {
                LandmarkError::InitializationError(format!("Failed to set optimization level: {e}"))
            })?
            .with_intra_threads(options.num_threads)
            .map_err(|e| {
                LandmarkError::InitializationError(format!("Failed to set intra-thread count: {e}"))
            })?
            .commit_from_file(path)
            .map_err(|e| {
                LandmarkError::InitializationError(format!(
                    "Failed to load model {}: {e}",
                    path.display()
                ))
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| {
                LandmarkError::InitializationError(format!(
                    "Model {} has no inputs",
                    path.display()
                ))
            })?;
        let output_names = session.outputs.iter().map(|o| o.name.clone()).collect();

        Ok(Self {
            session,
            input_name,
            output_names,
        })
    }

    /// Run the model and return every output flattened, in declaration order.
    fn run(&mut self, input: &Array4<f32>) -> Result<Vec<Vec<f32>>> {
        let input_contiguous = input.as_standard_layout();
        let input_tensor = TensorRef::from_array_view(&input_contiguous).map_err(|e| {
            LandmarkError::InferenceError(format!("Failed to create input tensor: {e}"))
        })?;

        let inputs = ort::inputs![&self.input_name => input_tensor];
        let outputs = self
            .session
            .run(inputs)
            .map_err(|e| LandmarkError::InferenceError(format!("Inference failed: {e}")))?;

        self.output_names
            .iter()
            .map(|name| {
                let output = outputs.get(name.as_str()).ok_or_else(|| {
                    LandmarkError::InferenceError(format!("Output '{name}' not found"))
                })?;
                let (_shape, data) = output.try_extract_tensor::<f32>().map_err(|e| {
                    LandmarkError::InferenceError(format!("Failed to extract output '{name}': {e}"))
                })?;
                Ok(data.to_vec())
            })
            .collect()
    }
}

/// Register the execution provider for `device`, falling back to CPU when it
/// is not compiled in.
fn with_device(builder: SessionBuilder, device: Device) -> Result<SessionBuilder> {
    match device {
        Device::Cpu => Ok(builder),
        #[cfg(feature = "cuda")]
        Device::Cuda(id) => builder
            .with_execution_providers([CUDAExecutionProvider::default()
                .with_device_id(i32::try_from(id).unwrap_or(0))
                .build()])
            .map_err(|e| {
                LandmarkError::InitializationError(format!("Failed to register CUDA EP: {e}"))
            }),
        #[cfg(feature = "coreml")]
        Device::CoreMl => builder
            .with_execution_providers([CoreMLExecutionProvider::default()
                .with_subgraphs(true)
                .build()])
            .map_err(|e| {
                LandmarkError::InitializationError(format!("Failed to register CoreML EP: {e}"))
            }),
        #[cfg(feature = "directml")]
        Device::DirectMl(id) => builder
            .with_execution_providers([DirectMLExecutionProvider::default()
                .with_device_id(i32::try_from(id).unwrap_or(0))
                .build()])
            .map_err(|e| {
                LandmarkError::InitializationError(format!("Failed to register DirectML EP: {e}"))
            }),
        #[allow(unreachable_patterns)]
        other => {
            tracing::warn!("device {other} is not compiled into this build, using cpu");
            Ok(builder)
        }
    }
}

/// Find the output holding exactly `len` values.
fn select_output<'a>(outputs: &'a [Vec<f32>], len: usize, what: &str) -> Result<&'a [f32]> {
    outputs
        .iter()
        .find(|o| o.len() == len)
        .map(Vec::as_slice)
        .ok_or_else(|| {
            let sizes: Vec<usize> = outputs.iter().map(Vec::len).collect();
            LandmarkError::InferenceError(format!(
                "no {what} output with {len} values, got sizes {sizes:?}"
            ))
        })
}

struct Stages {
    detector: OnnxModel,
    landmarks: OnnxModel,
}

/// Decodes raw model outputs and applies the two confidence gates.
///
/// Holds no sessions, so each stage can be fed synthetic outputs.
#[derive(Debug, Clone)]
struct PoseDecoder {
    anchors: Vec<Anchor>,
    min_detection_confidence: f32,
    min_presence_confidence: f32,
}

impl PoseDecoder {
    fn new(options: &LandmarkerOptions) -> Self {
        Self {
            anchors: generate_anchors(),
            min_detection_confidence: options.min_pose_detection_confidence,
            min_presence_confidence: options.min_pose_presence_confidence,
        }
    }

    /// Region of interest of the best person, or `None` below the detection threshold.
    fn person_roi(&self, outputs: &[Vec<f32>], letterbox: &Letterbox) -> Result<Option<Roi>> {
        let scores = select_output(outputs, NUM_ANCHORS, "detector score")?;
        let regressors = select_output(outputs, NUM_ANCHORS * DETECTOR_COORDS, "detector box")?;

        let Some(detection) = decode_best_detection(regressors, scores, &self.anchors)? else {
            return Ok(None);
        };
        tracing::debug!(score = detection.score, "person detector");
        if detection.score < self.min_detection_confidence {
            return Ok(None);
        }
        Ok(Some(detection_to_roi(&detection, letterbox)))
    }

    /// Landmarks in normalized image coordinates, or `None` below the presence threshold.
    fn landmarks(
        &self,
        outputs: &[Vec<f32>],
        roi: &Roi,
        width: u32,
        height: u32,
    ) -> Result<Option<PoseLandmarks>> {
        let flag = select_output(outputs, 1, "pose flag")?[0];
        let values = select_output(
            outputs,
            LANDMARK_MODEL_POINTS * LANDMARK_VALUES,
            "landmark",
        )?;
        tracing::debug!(pose_flag = flag, "landmark model");
        if flag < self.min_presence_confidence {
            return Ok(None);
        }
        decode_landmarks(values, roi, width, height).map(Some)
    }
}

/// BlazePose engine on ONNX Runtime.
///
/// Both model sessions sit behind one mutex, so concurrent calls on the same
/// engine run one after another.
pub struct OrtPoseEngine {
    stages: Mutex<Stages>,
    decoder: PoseDecoder,
}

impl OrtPoseEngine {
    /// Load both models of the asset named in `options`.
    ///
    /// # Errors
    ///
    /// Returns [`LandmarkError::InitializationError`] if either model file is
    /// missing or ONNX Runtime rejects it.
    pub fn load(options: &LandmarkerOptions) -> Result<Self> {
        let detector_path = options.asset.detector_path();
        let landmarks_path = options.asset.landmarks_path();
        tracing::info!(
            detector = %detector_path.display(),
            landmarks = %landmarks_path.display(),
            device = %options.device,
            "loading pose models"
        );

        let detector = OnnxModel::load(&detector_path, options)?;
        let landmarks = OnnxModel::load(&landmarks_path, options)?;

        Ok(Self {
            stages: Mutex::new(Stages {
                detector,
                landmarks,
            }),
            decoder: PoseDecoder::new(options),
        })
    }
}

impl PoseEngine for OrtPoseEngine {
    fn infer(&self, image: &DecodedImage) -> Result<Vec<PoseLandmarks>> {
        let mut stages = self
            .stages
            .lock()
            .map_err(|_| LandmarkError::InferenceError("engine lock poisoned".to_string()))?;

        let start = Instant::now();
        let input = preprocess_detector(image.pixels());
        let outputs = stages.detector.run(&input.tensor)?;
        let roi = self.decoder.person_roi(&outputs, &input.letterbox)?;
        tracing::debug!(
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "detector stage"
        );
        let Some(roi) = roi else {
            return Ok(Vec::new());
        };

        let start = Instant::now();
        let crop = preprocess_landmarks(image.pixels(), &roi);
        let outputs = stages.landmarks.run(&crop)?;
        let landmarks = self
            .decoder
            .landmarks(&outputs, &roi, image.width(), image.height())?;
        tracing::debug!(
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "landmark stage"
        );
        Ok(landmarks.into_iter().collect())
    }
}

impl std::fmt::Debug for OrtPoseEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtPoseEngine")
            .field("anchors", &self.decoder.anchors.len())
            .field("min_detection_confidence", &self.decoder.min_detection_confidence)
            .field("min_presence_confidence", &self.decoder.min_presence_confidence)
            .finish_non_exhaustive()
    }
}

/// Loader that builds an [`OrtPoseEngine`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OrtEngineLoader;

impl EngineLoader for OrtEngineLoader {
    type Engine = OrtPoseEngine;

    fn load(&self, options: &LandmarkerOptions) -> Result<OrtPoseEngine> {
        OrtPoseEngine::load(options)
    }
}
