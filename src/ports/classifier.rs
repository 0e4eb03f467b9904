//! Classifier port: Trait for binary risk classifiers.
//!
//! This trait abstracts the model runtime from the application logic, so the
//! prediction service can run against a loaded artifact or a test double.

use std::path::PathBuf;

use crate::domain::PatientRecord;

/// Default probability above which the positive label is predicted.
pub const DEFAULT_DECISION_THRESHOLD: f64 = 0.5;

/// The model artifact could not be made ready at startup.
///
/// Fatal: no prediction may be served without a loaded classifier.
#[derive(Debug, thiserror::Error)]
pub enum ModelUnavailableError {
    #[error("Model artifact not found at {0:?}")]
    NotFound(PathBuf),

    #[error("Failed to read model artifact {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed model artifact: {0}")]
    Malformed(String),

    #[error("Model artifact is incompatible with the patient schema: {0}")]
    Incompatible(String),

    #[error("Model signature verification failed: {0}")]
    Signature(String),
}

/// A record could not be scored by the loaded classifier.
///
/// Caused by the input, so it is surfaced rather than retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("{field} value '{value}' was not seen when the model was trained")]
    UnseenCategory { field: String, value: String },

    #[error("Record does not match the model feature schema: {0}")]
    SchemaMismatch(String),

    #[error("Classifier returned an invalid probability: {0}")]
    InvalidOutput(f64),
}

/// Trait for binary classifiers scoring a patient record.
///
/// Implementations must be safe for concurrent read-only invocation:
/// inference takes `&self` and has no side effects.
pub trait BinaryClassifier: Send + Sync {
    /// Probability of the positive class (heart disease), in [0, 1].
    ///
    /// # Errors
    /// Returns `InferenceError` if the record cannot be encoded for this model.
    fn predict_proba(&self, record: &PatientRecord) -> Result<f64, InferenceError>;

    /// Probability above which `predict` returns the positive label.
    fn decision_threshold(&self) -> f64 {
        DEFAULT_DECISION_THRESHOLD
    }

    /// Predicted label and positive-class probability.
    ///
    /// # Errors
    /// Returns `InferenceError` if the record cannot be encoded for this model.
    fn predict(&self, record: &PatientRecord) -> Result<(u8, f64), InferenceError> {
        let probability = self.predict_proba(record)?;
        let label = u8::from(probability > self.decision_threshold());
        Ok((label, probability))
    }
}

