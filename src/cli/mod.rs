// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! CLI module for running pose landmark extraction.
//!
//! This module contains the command-line interface logic, including argument parsing,
//! console output and the `detect` command implementation.

// Modules
/// CLI arguments.
pub mod args;

/// Detection command.
pub mod detect;

/// Console output and tracing setup.
pub mod logging;
