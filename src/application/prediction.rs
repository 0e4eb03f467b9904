//! Prediction service: Orchestrates the record -> classifier -> tier pipeline.
//!
//! The classifier is injected once at construction and shared read-only for
//! the lifetime of the service.

use std::path::Path;
use std::sync::Arc;

use crate::adapters::{ArtifactClassifier, LoadOptions};
use crate::domain::{PatientRecord, PredictionResult, RawPatientInput};
use crate::ports::{BinaryClassifier, InferenceError, ModelUnavailableError};
use crate::HeartwiseError;

/// Service for running risk predictions.
pub struct PredictionService<C>
where
    C: BinaryClassifier,
{
    classifier: Arc<C>,
}

impl<C> Clone for PredictionService<C>
where
    C: BinaryClassifier,
{
    fn clone(&self) -> Self {
        Self {
            classifier: Arc::clone(&self.classifier),
        }
    }
}

impl PredictionService<ArtifactClassifier> {
    /// Load the model artifact and build a service around it.
    ///
    /// Call once at startup. Failure here is fatal for the process: there is
    /// no degraded mode without a classifier.
    ///
    /// # Errors
    /// Returns `ModelUnavailableError` if the artifact cannot be loaded.
    pub fn bootstrap(
        model_path: &Path,
        options: &LoadOptions,
    ) -> Result<Self, ModelUnavailableError> {
        tracing::info!("Initializing prediction service...");
        let classifier = ArtifactClassifier::load(model_path, options)?;
        Ok(Self::new(Arc::new(classifier)))
    }
}

impl<C> PredictionService<C>
where
    C: BinaryClassifier,
{
    /// Create a new prediction service around a loaded classifier.
    pub fn new(classifier: Arc<C>) -> Self {
        Self { classifier }
    }

    /// The classifier this service scores with.
    #[must_use]
    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Score a validated record.
    ///
    /// # Errors
    /// Returns `HeartwiseError::Inference` if the classifier rejects the
    /// record or produces a non-finite probability.
    pub fn predict(&self, record: &PatientRecord) -> Result<PredictionResult, HeartwiseError> {
        tracing::debug!("Running classifier...");
        let (label, probability) = self.classifier.predict(record)?;

        if !probability.is_finite() {
            return Err(InferenceError::InvalidOutput(probability).into());
        }

        let result = PredictionResult::from_probability(probability, label);
        tracing::info!(
            "Prediction complete: label={}, probability={:.2}%, tier={}",
            result.label,
            result.probability,
            result.risk_tier
        );
        Ok(result)
    }

    /// Validate raw input, then score it.
    ///
    /// Invalid input never reaches the classifier.
    ///
    /// # Errors
    /// Returns `HeartwiseError::Validation` for out-of-domain input, or any
    /// error from [`PredictionService::predict`].
    pub fn predict_raw(&self, raw: &RawPatientInput) -> Result<PredictionResult, HeartwiseError> {
        tracing::debug!("Building patient record...");
        let record = PatientRecord::build(raw)?;
        self.predict(&record)
    }
}
