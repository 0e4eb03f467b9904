//! Model artifact adapter: Implementation of `BinaryClassifier` backed by a
//! JSON model artifact.
//!
//! The artifact is read once at startup, optionally verified against a
//! signed manifest, and kept immutable afterwards. Inference is pure
//! arithmetic on `&self`, so one loaded classifier can serve concurrent
//! callers without locking.

mod encoding;
mod estimator;
pub mod signature;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};

pub use encoding::FeatureEncoder;
pub use estimator::{Estimator, GradientBoosting, LogisticRegression, Node, StandardScaler, Tree};
pub use signature::SignaturePolicy;

use crate::domain::PatientRecord;
use crate::ports::{
    BinaryClassifier, InferenceError, ModelUnavailableError, DEFAULT_DECISION_THRESHOLD,
};

/// Artifact format understood by this loader.
pub const FORMAT_VERSION: u32 = 1;

fn default_decision_threshold() -> f64 {
    DEFAULT_DECISION_THRESHOLD
}

/// On-disk model artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Encoded columns, in the order the estimator consumes them.
    pub feature_columns: Vec<String>,
    /// Labels seen during training, per categorical feature.
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<String>>,
    /// Ordinal codes for categorical features encoded as a single column.
    #[serde(default)]
    pub ordinal: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(default = "default_decision_threshold")]
    pub decision_threshold: f64,
    pub estimator: Estimator,
}

/// How to load and verify an artifact.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub signature_policy: SignaturePolicy,
    pub verifying_key: Option<VerifyingKey>,
}

/// Summary of a loaded model, for inspection output.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub path: Option<PathBuf>,
    pub name: Option<String>,
    pub kind: &'static str,
    pub feature_columns: Vec<String>,
    pub decision_threshold: f64,
    pub signed: bool,
}

/// A loaded, validated model artifact.
#[derive(Debug, Clone)]
pub struct ArtifactClassifier {
    artifact: ModelArtifact,
    encoder: FeatureEncoder,
    path: Option<PathBuf>,
    signed: bool,
}

impl ArtifactClassifier {
    /// Load, verify and validate the artifact at `path`.
    ///
    /// # Errors
    /// Returns `ModelUnavailableError` if the file is missing, unreadable,
    /// fails signature verification, or does not fit the patient schema.
    pub fn load(path: &Path, options: &LoadOptions) -> Result<Self, ModelUnavailableError> {
        if !path.is_file() {
            return Err(ModelUnavailableError::NotFound(path.to_path_buf()));
        }
        let bytes = std::fs::read(path).map_err(|source| ModelUnavailableError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let manifest = signature::verify_artifact(
            path,
            &bytes,
            options.signature_policy,
            options.verifying_key.as_ref(),
        )?;

        let artifact: ModelArtifact = serde_json::from_slice(&bytes)
            .map_err(|e| ModelUnavailableError::Malformed(e.to_string()))?;

        let mut classifier = Self::from_artifact(artifact)?;
        classifier.path = Some(path.to_path_buf());
        classifier.signed = manifest.is_some();

        tracing::info!(
            "Loaded model from {:?} (kind={}, n_features={}, signed={})",
            path,
            classifier.artifact.estimator.kind(),
            classifier.encoder.width(),
            classifier.signed
        );

        Ok(classifier)
    }

    /// Validate an in-memory artifact.
    ///
    /// # Errors
    /// Returns `ModelUnavailableError` if the artifact is inconsistent.
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, ModelUnavailableError> {
        if artifact.format_version != FORMAT_VERSION {
            return Err(ModelUnavailableError::Malformed(format!(
                "unsupported format_version {}",
                artifact.format_version
            )));
        }
        let threshold = artifact.decision_threshold;
        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(ModelUnavailableError::Malformed(format!(
                "decision_threshold {threshold} must be in (0, 1)"
            )));
        }

        let encoder = FeatureEncoder::resolve(
            &artifact.feature_columns,
            &artifact.categories,
            &artifact.ordinal,
        )?;
        artifact
            .estimator
            .validate(encoder.width())
            .map_err(ModelUnavailableError::Malformed)?;

        Ok(Self {
            artifact,
            encoder,
            path: None,
            signed: false,
        })
    }

    #[must_use]
    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            path: self.path.clone(),
            name: self.artifact.name.clone(),
            kind: self.artifact.estimator.kind(),
            feature_columns: self.artifact.feature_columns.clone(),
            decision_threshold: self.artifact.decision_threshold,
            signed: self.signed,
        }
    }
}

impl BinaryClassifier for ArtifactClassifier {
    fn predict_proba(&self, record: &PatientRecord) -> Result<f64, InferenceError> {
        let x = self.encoder.encode(record)?;
        Ok(self.artifact.estimator.predict_proba(&x))
    }

    fn decision_threshold(&self) -> f64 {
        self.artifact.decision_threshold
    }
}
