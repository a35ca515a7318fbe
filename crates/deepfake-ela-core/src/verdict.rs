//! Turning classifier probabilities into a verdict.
//!
//! Serialized form:
//!
//! ```json
//! {
//!   "file": "photo.jpg",
//!   "prediction": "Real",
//!   "confidence": 90.0,
//!   "probabilities": { "real": 90.0, "fake": 10.0 }
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Allowed drift of `real + fake` away from 100.
pub const PROBABILITY_SUM_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Real,
    Fake,
}

impl Label {
    /// `Fake` only when the fake score is strictly greater; ties are `Real`.
    pub fn from_scores(real: f64, fake: f64) -> Self {
        if fake > real {
            Label::Fake
        } else {
            Label::Real
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Real => "Real",
            Label::Fake => "Fake",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Class probabilities as percentages in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub real: f64,
    pub fake: f64,
}

impl ClassProbabilities {
    /// Scale one classifier output row `[p_real, p_fake]` to percentages.
    ///
    /// Scaling happens in `f32`, so `0.9` reports as exactly `90.0`.
    /// Rows with fewer or more than two entries, or with non-finite values,
    /// are rejected.
    pub fn from_row(row: &[f32]) -> Result<Self, String> {
        let [p_real, p_fake] = row else {
            return Err(format!("expected 2 class scores, got {}", row.len()));
        };
        if !p_real.is_finite() || !p_fake.is_finite() {
            return Err(format!("non-finite class scores [{}, {}]", p_real, p_fake));
        }
        Ok(Self {
            real: f64::from(*p_real * 100.0),
            fake: f64::from(*p_fake * 100.0),
        })
    }

    pub fn label(&self) -> Label {
        Label::from_scores(self.real, self.fake)
    }

    pub fn confidence(&self) -> f64 {
        self.real.max(self.fake)
    }

    /// Whether both percentages are in range and sum to 100.
    pub fn is_distribution(&self) -> bool {
        (0.0..=100.0).contains(&self.real)
            && (0.0..=100.0).contains(&self.fake)
            && ((self.real + self.fake) - 100.0).abs() <= PROBABILITY_SUM_TOLERANCE
    }
}

/// Result of classifying one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictRecord {
    /// Caller-supplied filename, unmodified.
    pub file: String,
    pub prediction: Label,
    /// The larger of the two percentages.
    pub confidence: f64,
    pub probabilities: ClassProbabilities,
}

impl VerdictRecord {
    pub fn new(file: impl Into<String>, probabilities: ClassProbabilities) -> Self {
        Self {
            file: file.into(),
            prediction: probabilities.label(),
            confidence: probabilities.confidence(),
            probabilities,
        }
    }

    pub fn is_fake(&self) -> bool {
        self.prediction == Label::Fake
    }
}

impl fmt::Display for VerdictRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({:.2}% confidence; real {:.2}%, fake {:.2}%)",
            self.file,
            self.prediction,
            self.confidence,
            self.probabilities.real,
            self.probabilities.fake
        )
    }
}
