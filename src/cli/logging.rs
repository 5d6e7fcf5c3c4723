// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Console output and tracing setup for the command-line tool.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Global verbosity flag.
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Set the global verbosity flag.
pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

/// Check if verbose output is enabled.
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// Install the tracing subscriber, writing to stderr so stdout stays machine readable.
///
/// `RUST_LOG` wins when set. Otherwise library events at `debug` and above are
/// shown in verbose mode and `warn` and above otherwise.
pub fn setup_logging(verbose: bool) {
    let default_level = if verbose { "pose_landmarker=debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into());

    // A second call (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

/// Macro for warning messages.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        use colored::Colorize;
        eprintln!("{} {}", "WARNING ⚠️".yellow().bold(), format!($($arg)*));
    }
}

/// Macro for error messages, prefixed with the bridge error code.
#[macro_export]
macro_rules! error {
    ($code:expr, $($arg:tt)*) => {
        use colored::Colorize;
        eprintln!("{} {}", format!("Error [{}]:", $code).red().bold(), format!($($arg)*));
    }
}

/// Macro for verbose messages. Goes to stderr to keep stdout for results.
#[macro_export]
macro_rules! verbose {
    ($($arg:tt)*) => {
        if $crate::cli::logging::is_verbose() {
            eprintln!("{}", format!($($arg)*));
        }
    }
}
