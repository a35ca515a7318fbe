//! CLI command handlers
//!
//! # Modules
//!
//! - `classify`: Classify image files as Real or Fake
//! - `stored`: Classify an image under the configured files directory
//! - `ela`: Write the ELA image of a file for inspection
//! - `status`: Report whether the classifier loads

pub mod classify;
pub mod ela;
pub mod status;
pub mod stored;

use std::path::Path;

use clap::ValueEnum;
use deepfake_ela_core::{DetectError, Detector, DetectorConfig};
use tracing::info;

/// Output format for verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// One human-readable line per image
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Load the config file (if any), apply `DEEPFAKE_*` overrides and validate.
pub fn load_config(path: Option<&Path>) -> Result<DetectorConfig, DetectError> {
    let config = match path {
        Some(path) => {
            info!("Loading config from {}", path.display());
            DetectorConfig::from_file(path)?
        }
        None => DetectorConfig::default(),
    }
    .with_env_overrides();

    config.validate()?;
    Ok(config)
}

/// Build the detector once for the whole command.
pub fn load_detector(config_path: Option<&Path>) -> Result<Detector, DetectError> {
    let config = load_config(config_path)?;
    Detector::from_config(&config)
}
