//! # Heartwise
//!
//! Heart disease risk prediction from eleven clinical measurements.
//!
//! This crate provides:
//! - Validation of raw patient input into an immutable, fixed-schema record
//! - A narrow classifier interface and a JSON model-artifact runtime
//! - Banding of the predicted probability into LOW / MEDIUM / HIGH risk
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (PatientRecord, PredictionResult, RiskTier)
//! - `ports`: Trait definitions for the classifier boundary
//! - `adapters`: Concrete implementations (model artifacts, log sanitizing)
//! - `application`: The prediction use case
//! - `cli` / `config`: Command-line host and runtime settings

pub mod adapters;
pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::PredictionService;
pub use domain::{PatientRecord, PredictionResult, RawPatientInput, RiskTier, ValidationError};
pub use ports::{BinaryClassifier, InferenceError, ModelUnavailableError};

/// Result type for Heartwise operations
pub type Result<T> = std::result::Result<T, HeartwiseError>;

/// Main error type for Heartwise
#[derive(Debug, thiserror::Error)]
pub enum HeartwiseError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(#[from] ModelUnavailableError),

    #[error("Inference failed: {0}")]
    Inference(#[from] InferenceError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl HeartwiseError {
    /// Process exit code for this error class.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Inference(_) => 3,
            Self::ModelUnavailable(_) => 4,
            _ => 1,
        }
    }
}
