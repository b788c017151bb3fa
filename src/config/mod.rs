//! Configuration module: `cluely_config.json` loading and CLI parsing.

#[allow(clippy::module_inception)]
mod config;

pub use config::{AppConfig, Cli, Command, VisionConfig, SAMPLE_RATE};
