//! Image-to-verdict pipeline.
//!
//! ```text
//! bytes -> decode -> ELA (q=95) -> resize 128x128 -> /255 -> predict -> verdict
//! ```
//!
//! A [`Detector`] owns a shared, read-only handle to the classifier. It is
//! cheap to clone and every clone points at the same loaded model, so one
//! detector built at startup can be handed to any number of worker threads.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, instrument, warn};

use crate::classifier::{select_device, Classifier, ElaCnnClassifier, ExclusiveClassifier};
use crate::config::DetectorConfig;
use crate::ela::{decode_source, ElaImage, ElaTransform};
use crate::error::{DetectError, DetectResult, Stage};
use crate::preprocess::Preprocessor;
use crate::verdict::{ClassProbabilities, VerdictRecord};

/// Either the loaded classifier or the reason it is missing.
#[derive(Clone)]
enum ModelSlot {
    Ready(Arc<dyn Classifier>),
    Unavailable(Arc<str>),
}

#[derive(Clone)]
pub struct Detector {
    model: ModelSlot,
    ela: ElaTransform,
    preprocessor: Preprocessor,
    files_dir: PathBuf,
}

impl std::fmt::Debug for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Detector")
            .field("ready", &self.is_ready())
            .field("ela", &self.ela)
            .field("preprocessor", &self.preprocessor)
            .field("files_dir", &self.files_dir)
            .finish()
    }
}

impl Detector {
    /// Build a detector, loading the classifier named in `config.model`.
    ///
    /// A missing or unloadable model does not fail construction: the detector
    /// comes up with `is_ready() == false` and every classification returns
    /// `DetectError::ModelUnavailable`.
    ///
    /// # Errors
    /// - `DetectError::ConfigError` / `DetectError::InvalidQuality` for an
    ///   invalid configuration
    pub fn from_config(config: &DetectorConfig) -> DetectResult<Self> {
        config.validate()?;

        let path = &config.model.path;
        if !path.is_file() {
            let reason = format!("model artifact not found at {}", path.display());
            warn!("{}; serving without a classifier", reason);
            return Self::unavailable(reason, config);
        }

        let device = select_device(config.model.device);
        match ElaCnnClassifier::load(path, device) {
            Ok(model) => {
                let classifier: Arc<dyn Classifier> = if config.model.serialize_inference {
                    Arc::new(ExclusiveClassifier::new(model))
                } else {
                    Arc::new(model)
                };
                Self::with_classifier(classifier, config)
            }
            Err(e) => {
                error!("Error loading model: {}", e);
                Self::unavailable(e.to_string(), config)
            }
        }
    }

    /// Build a detector around an already loaded classifier.
    pub fn with_classifier(
        classifier: Arc<dyn Classifier>,
        config: &DetectorConfig,
    ) -> DetectResult<Self> {
        info!("Detector ready with classifier '{}'", classifier.name());
        Self::build(ModelSlot::Ready(classifier), config)
    }

    /// Build a detector with no classifier.
    pub fn unavailable(reason: impl Into<String>, config: &DetectorConfig) -> DetectResult<Self> {
        let reason: String = reason.into();
        Self::build(ModelSlot::Unavailable(Arc::from(reason)), config)
    }

    fn build(model: ModelSlot, config: &DetectorConfig) -> DetectResult<Self> {
        config.validate()?;
        let ela = ElaTransform::from_config(&config.ela).map_err(|e| DetectError::ConfigError {
            message: format!("[ela] {}", e),
        })?;
        Ok(Self {
            model,
            ela,
            preprocessor: Preprocessor::from_config(&config.preprocess),
            files_dir: config.storage.files_dir.clone(),
        })
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.model, ModelSlot::Ready(_))
    }

    /// Human-readable readiness, for health endpoints and the CLI.
    pub fn status_message(&self) -> String {
        match &self.model {
            ModelSlot::Ready(classifier) => format!("Ready (classifier '{}')", classifier.name()),
            ModelSlot::Unavailable(reason) => format!("Model not loaded: {}", reason),
        }
    }

    pub fn files_dir(&self) -> &Path {
        &self.files_dir
    }

    fn classifier(&self) -> DetectResult<&Arc<dyn Classifier>> {
        match &self.model {
            ModelSlot::Ready(classifier) => Ok(classifier),
            ModelSlot::Unavailable(reason) => Err(DetectError::ModelUnavailable {
                reason: reason.to_string(),
            }),
        }
    }

    /// Classify raw image bytes.
    ///
    /// # Errors
    /// - `ModelUnavailable` before any decoding when no classifier is loaded
    /// - `Decode` if the bytes are not an image or recompression fails
    /// - `Processing` if resize, normalization or inference fails
    #[instrument(skip(self, image_bytes), fields(len = image_bytes.len()))]
    pub fn classify(&self, image_bytes: &[u8], filename: &str) -> DetectResult<VerdictRecord> {
        let classifier = self.classifier()?;
        let start = Instant::now();

        let ela = self.ela_image(image_bytes, filename)?;

        let resized = self
            .preprocessor
            .resize(ela.as_rgb())
            .map_err(|e| DetectError::processing(filename, Stage::Resize, e))?;
        let input = self
            .preprocessor
            .normalize(&resized)
            .map_err(|e| DetectError::processing(filename, Stage::Normalize, e))?;

        let rows = classifier
            .predict(&input)
            .map_err(|e| DetectError::processing(filename, Stage::Inference, e))?;
        let row = rows.first().ok_or_else(|| {
            DetectError::processing(filename, Stage::Inference, "classifier returned no rows")
        })?;
        let probabilities = ClassProbabilities::from_row(row)
            .map_err(|message| DetectError::processing(filename, Stage::Inference, message))?;

        let verdict = VerdictRecord::new(filename, probabilities);
        debug!(
            prediction = %verdict.prediction,
            confidence = verdict.confidence,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Classification complete"
        );
        Ok(verdict)
    }

    /// Decode `image_bytes` and run only the ELA transform.
    ///
    /// Does not need a loaded classifier.
    pub fn ela_image(&self, image_bytes: &[u8], filename: &str) -> DetectResult<ElaImage> {
        let source = decode_source(image_bytes).map_err(|e| DetectError::decode(filename, e))?;
        self.ela
            .apply(&source)
            .map_err(|e| DetectError::decode(filename, e))
    }

    /// Read and classify a file, reporting it under its file name.
    pub fn classify_file(&self, path: impl AsRef<Path>) -> DetectResult<VerdictRecord> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        self.classifier()?;
        let bytes = read_image_file(path)?;
        self.classify(&bytes, &filename)
    }

    /// Classify `<files_dir>/<folder>/<filename>`.
    ///
    /// Both components must be single plain path segments; anything that
    /// could step outside `files_dir` is rejected.
    ///
    /// # Errors
    /// - `InvalidPath` for `..`, absolute, or multi-segment components
    /// - `FileNotFound` if the file does not exist
    /// - anything [`Detector::classify`] returns
    pub fn classify_stored(&self, folder: &str, filename: &str) -> DetectResult<VerdictRecord> {
        let path = self.stored_path(folder, filename)?;
        if !path.is_file() {
            warn!("File not found: {}", path.display());
            return Err(DetectError::FileNotFound { path });
        }
        let bytes = read_image_file(&path)?;
        self.classify(&bytes, filename)
    }

    /// Resolve a stored image path under `files_dir`.
    pub fn stored_path(&self, folder: &str, filename: &str) -> DetectResult<PathBuf> {
        Ok(self
            .files_dir
            .join(plain_segment(folder)?)
            .join(plain_segment(filename)?))
    }
}

fn plain_segment(component: &str) -> DetectResult<&str> {
    let mut components = Path::new(component).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(component),
        _ => Err(DetectError::InvalidPath {
            component: component.to_string(),
        }),
    }
}

/// Read an image file, mapping a missing file to [`DetectError::FileNotFound`].
pub fn read_image_file(path: &Path) -> DetectResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DetectError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => DetectError::IoError(e),
    })
}
