//! Classify an image stored under the configured files directory.
//!
//! # Usage
//!
//! ```bash
//! # Classifies <files_dir>/batch-7/IMG_0042.jpg
//! deepfake-ela stored --folder batch-7 IMG_0042.jpg
//! ```

use std::path::PathBuf;

use clap::Args;
use deepfake_ela_core::Detector;
use tracing::{error, info};

use super::classify::print_verdict;
use super::{load_config, OutputFormat};
use crate::error::{exit_code_for_error, CliExitCode};

#[derive(Args, Debug)]
pub struct StoredArgs {
    /// Folder under the files directory
    #[arg(long)]
    pub folder: String,

    /// File name inside the folder
    pub filename: String,

    /// Override the configured files directory
    #[arg(long)]
    pub files_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

pub async fn handle_stored(args: StoredArgs, config: Option<PathBuf>) -> i32 {
    let config = match load_config(config.as_deref()) {
        Ok(mut config) => {
            if let Some(dir) = args.files_dir.clone() {
                config.storage.files_dir = dir;
            }
            config
        }
        Err(e) => {
            error!("Failed to load config: {}", e);
            return exit_code_for_error(&e) as i32;
        }
    };

    let result = tokio::task::spawn_blocking(move || {
        let detector = Detector::from_config(&config)?;
        info!(
            "Looking up {}/{} under {}",
            args.folder,
            args.filename,
            detector.files_dir().display()
        );
        detector.classify_stored(&args.folder, &args.filename)
    })
    .await;

    match result {
        Ok(Ok(verdict)) => {
            print_verdict(&verdict, args.format);
            CliExitCode::Success as i32
        }
        Ok(Err(e)) => {
            error!("{}", e);
            exit_code_for_error(&e) as i32
        }
        Err(e) => {
            error!("Classification task failed: {}", e);
            CliExitCode::Failed as i32
        }
    }
}
