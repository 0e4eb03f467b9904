//! Adapters layer: Concrete implementations of ports.
//!
//! - `model`: JSON model artifacts (logistic regression, gradient boosting)
//!   with signed-manifest verification
//! - `sanitize`: clinical value and identifier filtering for logs

pub mod model;
pub mod sanitize;

pub use model::{ArtifactClassifier, LoadOptions, SignaturePolicy};
