//! Application layer: Use cases and services.
//!
//! Orchestrates domain logic with ports to implement the prediction
//! use case.

mod prediction;

pub use prediction::PredictionService;
