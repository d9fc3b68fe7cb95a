//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the prediction use case over a loaded artifact bundle.

pub mod attribution;
pub(crate) mod bundle;
pub mod pipeline;
mod prediction;

pub use bundle::ArtifactBundle;
pub use prediction::{Health, PredictionService};
