//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundary
//! between the prediction pipeline and the model runtime.

mod classifier;

pub use classifier::{
    BinaryClassifier, InferenceError, ModelUnavailableError, DEFAULT_DECISION_THRESHOLD,
};
