// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::process;

use clap::Parser;

use pose_landmarker::cli::args::{Cli, Commands};
use pose_landmarker::cli::detect::{run_detect, run_joints};

fn main() {
    let cli = Cli::parse();

    let code = match &cli.command {
        Commands::Detect(args) => run_detect(args),
        Commands::Joints => run_joints(),
    };
    process::exit(code);
}
