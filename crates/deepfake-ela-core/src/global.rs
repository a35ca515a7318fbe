//! Process-wide detector, initialized once at startup.
//!
//! # Usage
//!
//! ```rust,ignore
//! // At startup (HTTP server, CLI, etc.)
//! initialize_global_detector(&DetectorConfig::default().with_env_overrides())?;
//!
//! // In request handlers
//! let verdict = global_detector()?.classify(&bytes, &filename)?;
//! ```
//!
//! # Behavior
//!
//! - The first successful `initialize_global_detector` call wins; later calls
//!   return the existing detector unchanged.
//! - A missing model does not fail initialization. The detector is installed
//!   with `is_ready() == false` and classifications report `ModelUnavailable`.
//! - The slot is a `OnceLock<Detector>`: written once, then only read. No lock
//!   is taken on the classification path.

use std::sync::OnceLock;

use crate::config::DetectorConfig;
use crate::detector::Detector;
use crate::error::{DetectError, DetectResult};

static GLOBAL_DETECTOR: OnceLock<Detector> = OnceLock::new();

/// Build and install the process-wide detector.
///
/// # Errors
/// - Configuration errors from [`Detector::from_config`]. Nothing is
///   installed in that case and a later call may try again.
pub fn initialize_global_detector(config: &DetectorConfig) -> DetectResult<&'static Detector> {
    if let Some(existing) = GLOBAL_DETECTOR.get() {
        tracing::debug!("Global detector already initialized, skipping");
        return Ok(existing);
    }

    let detector = Detector::from_config(config)?;
    if !detector.is_ready() {
        tracing::warn!(
            "Global detector installed without a classifier: {}",
            detector.status_message()
        );
    }
    Ok(install_global_detector(detector))
}

/// Install a pre-built detector. Returns whichever detector ended up installed.
pub fn install_global_detector(detector: Detector) -> &'static Detector {
    GLOBAL_DETECTOR.get_or_init(|| detector)
}

/// Get the process-wide detector.
///
/// # Errors
/// - `ModelUnavailable` if no detector has been installed yet
pub fn global_detector() -> DetectResult<&'static Detector> {
    GLOBAL_DETECTOR
        .get()
        .ok_or_else(|| DetectError::ModelUnavailable {
            reason: "detector not initialized; call initialize_global_detector() at startup"
                .to_string(),
        })
}

/// True only when a detector is installed and its classifier is loaded.
pub fn is_detector_ready() -> bool {
    GLOBAL_DETECTOR
        .get()
        .map(Detector::is_ready)
        .unwrap_or(false)
}

pub fn detector_status_message() -> String {
    match GLOBAL_DETECTOR.get() {
        None => "Not initialized".to_string(),
        Some(detector) => detector.status_message(),
    }
}
