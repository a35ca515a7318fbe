//! Frozen binary classifier behind a narrow trait.
//!
//! # Thread Safety
//!
//! Implementations are `Send + Sync` and called through `&self`, so a single
//! `Arc<dyn Classifier>` is shared by every concurrent classification. A
//! runtime that cannot tolerate concurrent calls is wrapped in
//! [`ExclusiveClassifier`], which serializes `predict` and nothing else.

mod cnn;
mod device;

pub use cnn::{ElaCnnClassifier, ElaCnnConfig};
pub use device::select_device;

use parking_lot::Mutex;
use thiserror::Error;

use crate::preprocess::NormalizedTensor;

#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Input tensor does not have the shape the model was built for.
    #[error("input shape {actual:?} does not match expected {expected:?}")]
    InvalidInput {
        expected: [usize; 4],
        actual: [usize; 4],
    },

    /// The inference backend rejected the input or failed mid-forward.
    #[error("inference backend error: {message}")]
    Backend { message: String },

    /// The backend returned something other than one probability row.
    #[error("unexpected classifier output: {message}")]
    InvalidOutput { message: String },
}

/// `predict(float32[1, H, W, 3]) -> float32[1, 2]`, as rows.
pub trait Classifier: Send + Sync {
    /// Run the model once. Each returned row is a probability distribution
    /// over `[real, fake]`.
    fn predict(&self, input: &NormalizedTensor) -> Result<Vec<Vec<f32>>, ClassifierError>;

    /// Short identifier for logs and status output.
    fn name(&self) -> &str {
        "classifier"
    }
}

/// Serializes `predict` on an inner classifier behind a mutex.
pub struct ExclusiveClassifier<C> {
    inner: Mutex<C>,
}

impl<C> ExclusiveClassifier<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner: Mutex::new(inner),
        }
    }

    pub fn into_inner(self) -> C {
        self.inner.into_inner()
    }
}

impl<C: Classifier> Classifier for ExclusiveClassifier<C> {
    fn predict(&self, input: &NormalizedTensor) -> Result<Vec<Vec<f32>>, ClassifierError> {
        self.inner.lock().predict(input)
    }

    fn name(&self) -> &str {
        "exclusive"
    }
}
