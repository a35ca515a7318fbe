//! Report whether the classifier loads.
//!
//! Initializes the process-wide detector the way a server would at startup,
//! then prints its status.
//!
//! ```bash
//! deepfake-ela status && deepfake-ela classify photo.jpg
//! ```
//!
//! # Exit Codes
//!
//! - 0: Model loaded
//! - 1: Configuration error
//! - 2: Model not available

use std::path::PathBuf;

use clap::Args;
use deepfake_ela_core::{detector_status_message, initialize_global_detector, is_detector_ready};
use tracing::{error, info};

use super::load_config;
use crate::error::{exit_code_for_error, CliExitCode};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print the effective configuration as TOML
    #[arg(long)]
    pub show_config: bool,
}

pub async fn handle_status(args: StatusArgs, config: Option<PathBuf>) -> i32 {
    let config = match load_config(config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {}", e);
            return exit_code_for_error(&e) as i32;
        }
    };

    if args.show_config {
        match config.to_toml_string() {
            Ok(text) => println!("{}", text),
            Err(e) => {
                error!("Failed to render config: {}", e);
                return exit_code_for_error(&e) as i32;
            }
        }
    }

    info!("Loading model from {}", config.model.path.display());
    let init = tokio::task::spawn_blocking(move || {
        initialize_global_detector(&config).map(|_| ())
    })
    .await;

    match init {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!("Detector initialization failed: {}", e);
            return exit_code_for_error(&e) as i32;
        }
        Err(e) => {
            error!("Initialization task failed: {}", e);
            return CliExitCode::Failed as i32;
        }
    }

    println!("{}", detector_status_message());
    if is_detector_ready() {
        CliExitCode::Success as i32
    } else {
        CliExitCode::ModelUnavailable as i32
    }
}
