//! Deepfake detection by Error Level Analysis.
//!
//! An uploaded image is recompressed as JPEG, the recompression error is
//! amplified into an ELA image, and a frozen CNN classifies that ELA image as
//! `Real` or `Fake`.
//!
//! # Architecture
//!
//! - **ela**: JPEG round trip, absolute difference, brightness stretch
//! - **preprocess**: 128x128 resize and [0, 1] normalization
//! - **classifier**: `Classifier` trait and the candle ELA CNN
//! - **verdict**: probabilities, label and confidence
//! - **detector**: the pipeline and its shared classifier handle
//! - **global**: write-once process-wide detector for servers
//!
//! # Example
//!
//! ```rust,ignore
//! use deepfake_ela_core::{Detector, DetectorConfig};
//!
//! let detector = Detector::from_config(&DetectorConfig::default().with_env_overrides())?;
//! if detector.is_ready() {
//!     let verdict = detector.classify(&std::fs::read("photo.jpg")?, "photo.jpg")?;
//!     println!("{}", serde_json::to_string(&verdict)?);
//! }
//! ```

pub mod classifier;
pub mod config;
pub mod detector;
pub mod ela;
pub mod error;
pub mod global;
pub mod preprocess;
pub mod verdict;

pub use classifier::{Classifier, ClassifierError, ElaCnnClassifier, ElaCnnConfig, ExclusiveClassifier};
pub use config::{
    DetectorConfig, DeviceKind, ElaConfig, ModelConfig, PreprocessConfig, ResizeFilter,
    ScratchMode, StorageConfig, DEFAULT_ELA_QUALITY, DEFAULT_TARGET_SIZE,
};
pub use detector::Detector;
pub use ela::{ElaImage, ElaTransform};
pub use error::{DetectError, DetectResult, ErrorKind, Stage};
pub use global::{
    detector_status_message, global_detector, initialize_global_detector,
    install_global_detector, is_detector_ready,
};
pub use preprocess::{NormalizedTensor, Preprocessor};
pub use verdict::{ClassProbabilities, Label, VerdictRecord};
