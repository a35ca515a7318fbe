//! Error type for every failure the detection pipeline can report.
//!
//! # Error Categories
//!
//! | Category | Variants | Caller Response |
//! |----------|----------|-----------------|
//! | Model | ModelUnavailable, ModelLoad | Server-side failure, report and keep serving |
//! | Input | Decode, FileNotFound, InvalidPath | Client-side failure, reject the request |
//! | Processing | Processing | Server-side failure, report with stage context |
//! | Configuration | ConfigError, InvalidQuality | Fix configuration |
//! | Infrastructure | IoError | Report |
//!
//! # Design Principles
//!
//! - **NO FALLBACKS**: a failed classification is reported, never replaced by a guess
//! - **FAIL FAST**: a missing classifier rejects the call before any image work
//! - **CONTEXTUAL**: input and processing failures carry the offending filename

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Pipeline stage in which a [`DetectError::Processing`] occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Resampling the ELA image to the classifier input size.
    Resize,
    /// Converting pixels to the normalized input tensor.
    Normalize,
    /// Running the classifier or reading its output.
    Inference,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Resize => "resize",
            Stage::Normalize => "normalize",
            Stage::Inference => "inference",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable, machine-readable error category for the serving layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ModelUnavailable,
    Decode,
    Processing,
    NotFound,
    Config,
    Io,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ModelUnavailable => "model_unavailable",
            ErrorKind::Decode => "decode",
            ErrorKind::Processing => "processing",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Config => "config",
            ErrorKind::Io => "io",
        }
    }
}

#[derive(Debug, Error)]
pub enum DetectError {
    // === Model Errors ===
    /// The classifier failed to load at startup or was never loaded.
    #[error("Model unavailable: {reason}")]
    ModelUnavailable { reason: String },

    /// The classifier artifact exists but could not be turned into a model.
    #[error("Model load failed for {}: {source}", path.display())]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // === Input Errors ===
    /// Input bytes are not a decodable image, or the recompression round trip failed.
    #[error("Failed to decode image '{filename}': {message}")]
    Decode { filename: String, message: String },

    /// A stored image does not exist under the configured files directory.
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// A stored-image lookup tried to escape the files directory.
    #[error("Invalid path component: {component}")]
    InvalidPath { component: String },

    // === Processing Errors ===
    /// Resize, normalization or classifier invocation failed.
    #[error("Error processing image '{filename}' during {stage}: {message}")]
    Processing {
        filename: String,
        stage: Stage,
        message: String,
    },

    // === Configuration Errors ===
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// JPEG quality outside 1..=100.
    #[error("Invalid JPEG quality {quality}: must be between 1 and 100")]
    InvalidQuality { quality: u8 },

    // === Infrastructure Errors ===
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DetectError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DetectError::ModelUnavailable { .. } | DetectError::ModelLoad { .. } => {
                ErrorKind::ModelUnavailable
            }
            DetectError::Decode { .. } => ErrorKind::Decode,
            DetectError::FileNotFound { .. } | DetectError::InvalidPath { .. } => {
                ErrorKind::NotFound
            }
            DetectError::Processing { .. } => ErrorKind::Processing,
            DetectError::ConfigError { .. } | DetectError::InvalidQuality { .. } => {
                ErrorKind::Config
            }
            DetectError::IoError(_) => ErrorKind::Io,
        }
    }

    /// True when the request itself is at fault rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::Decode | ErrorKind::NotFound)
    }

    /// Filename of the image the error refers to, when known.
    pub fn filename(&self) -> Option<&str> {
        match self {
            DetectError::Decode { filename, .. } | DetectError::Processing { filename, .. } => {
                Some(filename)
            }
            _ => None,
        }
    }

    pub(crate) fn processing(filename: &str, stage: Stage, message: impl fmt::Display) -> Self {
        DetectError::Processing {
            filename: filename.to_string(),
            stage,
            message: message.to_string(),
        }
    }

    pub(crate) fn decode(filename: &str, message: impl fmt::Display) -> Self {
        DetectError::Decode {
            filename: filename.to_string(),
            message: message.to_string(),
        }
    }
}

/// Result type alias for detection operations.
pub type DetectResult<T> = Result<T, DetectError>;
