//! Domain layer: Core business types and logic.
//!
//! Pure Rust types with no I/O. Records are validated on construction and
//! immutable afterwards.

mod patient;
mod prediction;

pub use patient::{
    ChestPainType, ExerciseAngina, FieldIssue, FieldValue, PatientRecord, RawPatientInput,
    RestingEcg, Sex, StSlope, ValidationError, CATEGORICAL_FEATURES, FEATURE_NAMES,
};
pub use prediction::{
    tier, PredictionResult, RiskTier, HIGH_RISK_THRESHOLD, MEDIUM_RISK_THRESHOLD,
};

#[cfg(test)]
pub(crate) use patient::sample_input;
