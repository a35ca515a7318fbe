//! Write the ELA image of a file.
//!
//! Useful for eyeballing what the classifier sees. The output format follows
//! the output file extension.
//!
//! ```bash
//! deepfake-ela ela suspicious.jpg suspicious-ela.png
//! ```

use std::path::PathBuf;

use clap::Args;
use deepfake_ela_core::detector::read_image_file;
use deepfake_ela_core::{DetectError, Detector};
use tracing::{error, info};

use super::load_config;
use crate::error::{exit_code_for_error, CliExitCode};

#[derive(Args, Debug)]
pub struct ElaArgs {
    /// Source image
    pub input: PathBuf,

    /// Where to write the ELA image
    pub output: PathBuf,
}

pub async fn handle_ela(args: ElaArgs, config: Option<PathBuf>) -> i32 {
    let config = match load_config(config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {}", e);
            return exit_code_for_error(&e) as i32;
        }
    };

    let result = tokio::task::spawn_blocking(move || -> Result<(u32, u32, u8), DetectError> {
        // ELA needs no weights
        let detector = Detector::unavailable("not needed for ela export", &config)?;
        let bytes = read_image_file(&args.input)?;
        let name = args.input.display().to_string();
        let ela = detector.ela_image(&bytes, &name)?;
        ela.save(&args.output)
            .map_err(|e| DetectError::IoError(std::io::Error::other(e)))?;
        Ok((ela.width(), ela.height(), ela.max_diff()))
    })
    .await;

    match result {
        Ok(Ok((width, height, max_diff))) => {
            info!("Wrote {}x{} ELA image (max diff {})", width, height, max_diff);
            CliExitCode::Success as i32
        }
        Ok(Err(e)) => {
            error!("{}", e);
            exit_code_for_error(&e) as i32
        }
        Err(e) => {
            error!("ELA task failed: {}", e);
            CliExitCode::Failed as i32
        }
    }
}
