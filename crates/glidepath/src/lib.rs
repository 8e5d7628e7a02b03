//! Command-line front end for the glidepath retirement engine
//!
//! Loads household parameters from YAML or JSON, runs Monte Carlo batches
//! on a worker pool and prints results as JSON. The `worker` command speaks
//! the line-delimited task protocol on stdin/stdout.

pub mod cli;
pub mod commands;
pub mod loader;
mod logging;

pub use logging::init_logging;
