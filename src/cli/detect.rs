// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::time::Instant;

use crate::cli::args::DetectArgs;
use crate::cli::logging::{set_verbose, setup_logging};
use crate::{
    BODY_LANDMARK_COUNT, Joint, LandmarkError, LandmarkerOptions, PoseLandmarker, Result, VERSION,
};
use crate::{error, verbose, warn};

/// Run the `detect` command and return the process exit code.
///
/// Prints the joint mapping as JSON on stdout. Failures print the error code
/// (`ARG`, `IMG` or `POSE`) and message on stderr and return `1`.
pub fn run_detect(args: &DetectArgs) -> i32 {
    set_verbose(args.verbose);
    setup_logging(args.verbose);
    verbose!("pose-landmarker {VERSION}");

    let start = Instant::now();
    match detect_to_json(args) {
        Ok(json) => {
            println!("{json}");
            verbose!("done in {:.1}ms", start.elapsed().as_secs_f64() * 1000.0);
            0
        }
        Err(e) => {
            error!(e.code(), "{e}");
            1
        }
    }
}

/// Print the reported joints with their body landmark indices.
pub fn run_joints() -> i32 {
    println!("{:<12} index (of {BODY_LANDMARK_COUNT})", "joint");
    for joint in Joint::ALL {
        println!("{:<12} {}", joint.as_str(), joint.landmark_index());
    }
    0
}

fn detect_to_json(args: &DetectArgs) -> Result<String> {
    let image = args
        .image
        .as_ref()
        .ok_or_else(|| LandmarkError::ConfigError("image path missing, pass --image".to_string()))?;
    let options = build_options(args, LandmarkerOptions::from_env())?;
    options.validate()?;
    if !options.device.is_compiled() {
        warn!(
            "device {} requested but not compiled in, running on cpu",
            options.device
        );
    }
    verbose!("model: {}", options.asset);
    verbose!("image: {}", image.display());

    let landmarker = PoseLandmarker::new(options);
    let joints = landmarker.detect_path(image)?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&joints)
    } else {
        serde_json::to_string(&joints)
    };
    json.map_err(|e| LandmarkError::InferenceError(format!("failed to serialize result: {e}")))
}

/// Apply command-line overrides on top of `base`.
fn build_options(args: &DetectArgs, base: LandmarkerOptions) -> Result<LandmarkerOptions> {
    let mut options = base;
    if let Some(model) = &args.model {
        options = options.with_asset(model);
    }
    if let Some(device) = &args.device {
        options = options.with_device(device.parse()?);
    }
    if let Some(conf) = args.min_detection_confidence {
        options = options.with_detection_confidence(conf);
    }
    if let Some(conf) = args.min_presence_confidence {
        options = options.with_presence_confidence(conf);
    }
    if let Some(conf) = args.min_tracking_confidence {
        options = options.with_tracking_confidence(conf);
    }
    if let Some(threads) = args.threads {
        options = options.with_threads(threads);
    }
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Device;
    use std::path::PathBuf;

    fn args() -> DetectArgs {
        DetectArgs {
            image: Some(PathBuf::from("person.jpg")),
            model: None,
            device: None,
            min_detection_confidence: None,
            min_presence_confidence: None,
            min_tracking_confidence: None,
            threads: None,
            pretty: false,
            verbose: false,
        }
    }

    #[test]
    fn test_build_options_overrides() {
        let args = DetectArgs {
            model: Some(PathBuf::from("models/full")),
            device: Some("cuda:1".to_string()),
            min_presence_confidence: Some(0.8),
            threads: Some(3),
            ..args()
        };
        let base = LandmarkerOptions::new().with_detection_confidence(0.4);
        let options = build_options(&args, base).unwrap();
        assert_eq!(options.asset.root(), std::path::Path::new("models/full"));
        assert_eq!(options.device, Device::Cuda(1));
        assert!((options.min_pose_detection_confidence - 0.4).abs() < f32::EPSILON);
        assert!((options.min_pose_presence_confidence - 0.8).abs() < f32::EPSILON);
        assert_eq!(options.num_threads, 3);
    }

    #[test]
    fn test_build_options_bad_device() {
        let args = DetectArgs {
            device: Some("abacus".to_string()),
            ..args()
        };
        let err = build_options(&args, LandmarkerOptions::default()).unwrap_err();
        assert_eq!(err.code(), "ARG");
    }

    #[test]
    fn test_missing_image_argument() {
        let args = DetectArgs {
            image: None,
            ..args()
        };
        assert_eq!(detect_to_json(&args).unwrap_err().code(), "ARG");
    }

    #[test]
    fn test_undecodable_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();
        let args = DetectArgs {
            image: Some(path),
            ..args()
        };
        assert_eq!(detect_to_json(&args).unwrap_err().code(), "IMG");
    }

    #[test]
    fn test_missing_model_is_pose_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("person.png");
        image::RgbImage::new(16, 16).save(&path).unwrap();
        let args = DetectArgs {
            image: Some(path),
            model: Some(dir.path().join("no_models_here")),
            ..args()
        };
        let err = detect_to_json(&args).unwrap_err();
        assert!(matches!(err, LandmarkError::InitializationError(_)));
        assert_eq!(err.code(), "POSE");
    }
}
