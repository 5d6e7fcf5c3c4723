// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// CLI arguments parser.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = r#"Detect Options:
    --image, -i <IMAGE>                  Image file to analyse
    --model, -m <DIR>                    Model asset directory [default: pose_landmarker_lite]
    --device <DEVICE>                    Device (cpu, cuda:0, coreml, directml:0)
    --min-detection-confidence <CONF>    Person detector threshold [default: 0.3]
    --min-presence-confidence <CONF>     Pose presence threshold [default: 0.3]
    --min-tracking-confidence <CONF>     Tracking threshold, unused for images [default: 0.3]
    --threads <N>                        ONNX Runtime intra-op threads, 0 = auto
    --pretty                             Pretty-print the JSON result
    --verbose                            Show verbose output

Environment:
    POSE_MODEL_ASSET, POSE_DEVICE, POSE_NUM_THREADS and POSE_MIN_*_CONFIDENCE
    set defaults; command-line flags override them.

Exit status is 1 on failure, with the error code ARG, IMG or POSE on stderr.

Examples:
    pose-landmarker detect --image person.jpg
    pose-landmarker detect -i person.jpg -m models/pose_landmarker_full --pretty
    pose-landmarker detect -i person.jpg --device cuda:0 --min-detection-confidence 0.5"#)]
pub struct Cli {
    #[command(subcommand)]
    /// Subcommand to execute.
    pub command: Commands,
}

/// Commands for the CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract hip, knee, ankle and wrist positions from an image
    Detect(DetectArgs),
    /// List the reported joints and their body landmark indices
    Joints,
}

/// Arguments for the detect command.
#[derive(Args, Debug)]
pub struct DetectArgs {
    /// Image file to analyse
    #[arg(short, long)]
    pub image: Option<PathBuf>,

    /// Model asset directory holding `pose_detector.onnx` and `pose_landmarks_detector.onnx`
    #[arg(short, long)]
    pub model: Option<PathBuf>,

    /// Device to use (cpu, cuda:0, coreml, directml:0)
    #[arg(long)]
    pub device: Option<String>,

    /// Minimum person detection confidence
    #[arg(long)]
    pub min_detection_confidence: Option<f32>,

    /// Minimum pose presence confidence
    #[arg(long)]
    pub min_presence_confidence: Option<f32>,

    /// Minimum tracking confidence
    #[arg(long)]
    pub min_tracking_confidence: Option<f32>,

    /// ONNX Runtime intra-op threads (0 = auto)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Pretty-print the JSON result
    #[arg(long, default_value_t = false)]
    pub pretty: bool,

    /// Show verbose output
    #[arg(long, default_value_t = false)]
    pub verbose: bool,
}
