//! Root configuration for the detection pipeline.
//!
//! # Loading Configuration
//!
//! ```rust,ignore
//! use deepfake_ela_core::DetectorConfig;
//!
//! // Load from file
//! let config = DetectorConfig::from_file("detector.toml")?;
//!
//! // Or use defaults with environment overrides
//! let config = DetectorConfig::default().with_env_overrides();
//! ```
//!
//! # TOML Structure
//!
//! ```toml
//! [model]
//! path = "model/best_model.safetensors"
//! device = "cpu"
//! serialize_inference = false
//!
//! [ela]
//! quality = 95
//! scratch = "memory"
//!
//! [preprocess]
//! target_size = 128
//! filter = "catmull_rom"
//!
//! [storage]
//! files_dir = "file_dir"
//! ```
//!
//! Invalid values are reported by [`DetectorConfig::validate`], never silently
//! replaced.

use std::env;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::error::{DetectError, DetectResult};

// ============================================================================
// MODEL CONFIG
// ============================================================================

/// Compute device for the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    #[default]
    Cpu,
    /// First CUDA device; falls back to CPU when unavailable.
    Cuda,
}

impl DeviceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Cpu => "cpu",
            DeviceKind::Cuda => "cuda",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "cpu" => Some(DeviceKind::Cpu),
            "cuda" | "gpu" => Some(DeviceKind::Cuda),
            _ => None,
        }
    }
}

/// Where and how the frozen classifier is loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Safetensors weights file. An optional `config.json` in the same
    /// directory overrides the layer sizes.
    #[serde(default = "default_model_path")]
    pub path: PathBuf,

    #[serde(default)]
    pub device: DeviceKind,

    /// Serialize `predict` calls behind a mutex for runtimes that are not
    /// safe to call from several threads at once.
    #[serde(default)]
    pub serialize_inference: bool,
}

fn default_model_path() -> PathBuf {
    PathBuf::from("model").join("best_model.safetensors")
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            device: DeviceKind::default(),
            serialize_inference: false,
        }
    }
}

impl ModelConfig {
    /// # Errors
    /// - `DetectError::ConfigError` if the model path is empty
    pub fn validate(&self) -> DetectResult<()> {
        if self.path.as_os_str().is_empty() {
            return Err(DetectError::ConfigError {
                message: "model path cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// ELA CONFIG
// ============================================================================

/// Backing store for the recompressed copy made during ELA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScratchMode {
    /// Encode into a call-local byte buffer.
    #[default]
    Memory,
    /// Encode into a uniquely named temporary file, removed on drop.
    Disk,
}

impl ScratchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScratchMode::Memory => "memory",
            ScratchMode::Disk => "disk",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "memory" => Some(ScratchMode::Memory),
            "disk" => Some(ScratchMode::Disk),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElaConfig {
    /// JPEG quality used for the recompressed copy (1-100).
    #[serde(default = "default_quality")]
    pub quality: u8,

    #[serde(default)]
    pub scratch: ScratchMode,

    /// Directory for disk scratch files. `None` uses the system temp dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,
}

/// Quality the classifier was trained against.
pub const DEFAULT_ELA_QUALITY: u8 = 95;

fn default_quality() -> u8 {
    DEFAULT_ELA_QUALITY
}

impl Default for ElaConfig {
    fn default() -> Self {
        Self {
            quality: default_quality(),
            scratch: ScratchMode::default(),
            scratch_dir: None,
        }
    }
}

impl ElaConfig {
    /// # Errors
    /// - `DetectError::InvalidQuality` if quality is outside 1..=100
    pub fn validate(&self) -> DetectResult<()> {
        if !(1..=100).contains(&self.quality) {
            return Err(DetectError::InvalidQuality {
                quality: self.quality,
            });
        }
        Ok(())
    }
}

// ============================================================================
// PREPROCESS CONFIG
// ============================================================================

/// Resampling filter for the classifier input resize.
///
/// Must match the filter used when the classifier was trained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    /// Bicubic resampling.
    #[default]
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl ResizeFilter {
    pub fn all() -> &'static [ResizeFilter] {
        &[
            ResizeFilter::Nearest,
            ResizeFilter::Triangle,
            ResizeFilter::CatmullRom,
            ResizeFilter::Gaussian,
            ResizeFilter::Lanczos3,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResizeFilter::Nearest => "nearest",
            ResizeFilter::Triangle => "triangle",
            ResizeFilter::CatmullRom => "catmull_rom",
            ResizeFilter::Gaussian => "gaussian",
            ResizeFilter::Lanczos3 => "lanczos3",
        }
    }
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Side length of the square classifier input.
    #[serde(default = "default_target_size")]
    pub target_size: u32,

    #[serde(default)]
    pub filter: ResizeFilter,
}

/// Classifier input side length.
pub const DEFAULT_TARGET_SIZE: u32 = 128;

fn default_target_size() -> u32 {
    DEFAULT_TARGET_SIZE
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            target_size: default_target_size(),
            filter: ResizeFilter::default(),
        }
    }
}

impl PreprocessConfig {
    /// # Errors
    /// - `DetectError::ConfigError` if target_size is zero
    pub fn validate(&self) -> DetectResult<()> {
        if self.target_size == 0 {
            return Err(DetectError::ConfigError {
                message: "target_size must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// STORAGE CONFIG
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for classifying previously stored images by
    /// folder and filename.
    #[serde(default = "default_files_dir")]
    pub files_dir: PathBuf,
}

fn default_files_dir() -> PathBuf {
    PathBuf::from("file_dir")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            files_dir: default_files_dir(),
        }
    }
}

// ============================================================================
// ROOT CONFIG
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub ela: ElaConfig,

    #[serde(default)]
    pub preprocess: PreprocessConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

impl DetectorConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// - `DetectError::ConfigError` if the file cannot be read or parsed
    pub fn from_file(path: impl AsRef<Path>) -> DetectResult<Self> {
        let path = path.as_ref();

        let contents = std::fs::read_to_string(path).map_err(|e| DetectError::ConfigError {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        toml::from_str(&contents).map_err(|e| DetectError::ConfigError {
            message: format!("Failed to parse TOML in '{}': {}", path.display(), e),
        })
    }

    /// Validate all sections, returning the first error found.
    pub fn validate(&self) -> DetectResult<()> {
        self.model.validate().map_err(|e| DetectError::ConfigError {
            message: format!("[model] {}", e),
        })?;

        self.ela.validate().map_err(|e| DetectError::ConfigError {
            message: format!("[ela] {}", e),
        })?;

        self.preprocess.validate().map_err(|e| DetectError::ConfigError {
            message: format!("[preprocess] {}", e),
        })?;

        Ok(())
    }

    /// Apply environment variable overrides. Prefix: `DEEPFAKE_`
    ///
    /// | Variable | Config Path | Type |
    /// |----------|-------------|------|
    /// | `DEEPFAKE_MODEL_PATH` | `model.path` | path |
    /// | `DEEPFAKE_DEVICE` | `model.device` | cpu / cuda |
    /// | `DEEPFAKE_SERIALIZE_INFERENCE` | `model.serialize_inference` | bool |
    /// | `DEEPFAKE_ELA_QUALITY` | `ela.quality` | u8 |
    /// | `DEEPFAKE_SCRATCH` | `ela.scratch` | memory / disk |
    /// | `DEEPFAKE_FILES_DIR` | `storage.files_dir` | path |
    ///
    /// Unparseable values are ignored with a warning.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = env::var("DEEPFAKE_MODEL_PATH") {
            self.model.path = PathBuf::from(val);
        }
        if let Ok(val) = env::var("DEEPFAKE_DEVICE") {
            match DeviceKind::parse(&val) {
                Some(device) => self.model.device = device,
                None => tracing::warn!("Ignoring DEEPFAKE_DEVICE={:?}: expected cpu or cuda", val),
            }
        }
        if let Ok(val) = env::var("DEEPFAKE_SERIALIZE_INFERENCE") {
            match val.parse::<bool>() {
                Ok(b) => self.model.serialize_inference = b,
                Err(_) => tracing::warn!(
                    "Ignoring DEEPFAKE_SERIALIZE_INFERENCE={:?}: expected true or false",
                    val
                ),
            }
        }

        if let Ok(val) = env::var("DEEPFAKE_ELA_QUALITY") {
            match val.parse::<u8>() {
                Ok(q) => self.ela.quality = q,
                Err(_) => tracing::warn!("Ignoring DEEPFAKE_ELA_QUALITY={:?}: not a u8", val),
            }
        }
        if let Ok(val) = env::var("DEEPFAKE_SCRATCH") {
            match ScratchMode::parse(&val) {
                Some(mode) => self.ela.scratch = mode,
                None => tracing::warn!("Ignoring DEEPFAKE_SCRATCH={:?}: expected memory or disk", val),
            }
        }

        if let Ok(val) = env::var("DEEPFAKE_FILES_DIR") {
            self.storage.files_dir = PathBuf::from(val);
        }

        self
    }

    /// # Errors
    /// - `DetectError::ConfigError` if TOML parsing fails
    pub fn from_toml_str(toml: &str) -> DetectResult<Self> {
        toml::from_str(toml).map_err(|e| DetectError::ConfigError {
            message: format!("Failed to parse TOML: {}", e),
        })
    }

    /// # Errors
    /// - `DetectError::ConfigError` if serialization fails
    pub fn to_toml_string(&self) -> DetectResult<String> {
        toml::to_string_pretty(self).map_err(|e| DetectError::ConfigError {
            message: format!("Failed to serialize to TOML: {}", e),
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
