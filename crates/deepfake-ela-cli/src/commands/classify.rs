//! Classify image files.
//!
//! # Usage
//!
//! ```bash
//! deepfake-ela classify photo.jpg scan.png
//! deepfake-ela classify --format json uploads/*.jpg
//! ```
//!
//! Files are classified concurrently on the blocking thread pool; results are
//! printed in argument order.

use std::path::PathBuf;

use clap::Args;
use deepfake_ela_core::{DetectResult, VerdictRecord};
use tracing::{error, info};

use super::{load_detector, OutputFormat};
use crate::error::{exit_code_for_error, CliExitCode};

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Image files to classify
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

pub async fn handle_classify(args: ClassifyArgs, config: Option<PathBuf>) -> i32 {
    let detector = match load_detector(config.as_deref()) {
        Ok(detector) => detector,
        Err(e) => {
            error!("Failed to set up detector: {}", e);
            return exit_code_for_error(&e) as i32;
        }
    };

    if !detector.is_ready() {
        error!("{}", detector.status_message());
        return CliExitCode::ModelUnavailable as i32;
    }

    info!("Classifying {} file(s)", args.files.len());

    let handles: Vec<_> = args
        .files
        .iter()
        .cloned()
        .map(|path| {
            let detector = detector.clone();
            tokio::task::spawn_blocking(move || detector.classify_file(&path))
        })
        .collect();

    let mut exit = CliExitCode::Success;
    for (path, handle) in args.files.iter().zip(handles) {
        let result: DetectResult<VerdictRecord> = match handle.await {
            Ok(result) => result,
            Err(e) => {
                error!("{}: classification task failed: {}", path.display(), e);
                exit = exit.worst(CliExitCode::Failed);
                continue;
            }
        };

        match result {
            Ok(verdict) => print_verdict(&verdict, args.format),
            Err(e) => {
                error!("{}: {}", path.display(), e);
                exit = exit.worst(exit_code_for_error(&e));
            }
        }
    }

    exit as i32
}

pub(crate) fn print_verdict(verdict: &VerdictRecord, format: OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", verdict),
        OutputFormat::Json => match serde_json::to_string(verdict) {
            Ok(line) => println!("{}", line),
            Err(e) => error!("Failed to serialize verdict for {}: {}", verdict.file, e),
        },
    }
}
