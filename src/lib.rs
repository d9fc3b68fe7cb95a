//! # Ovasense
//!
//! PCOS risk prediction service: a deterministic feature pipeline, tree-ensemble
//! inference and per-feature attribution over an immutable artifact bundle.
//!
//! This crate provides:
//! - Feature vectorization against the bundle's declared schema
//! - Standardization and feature selection with the fitted training statistics
//! - Gradient-boosted tree inference with calibrated class probabilities
//! - Three interchangeable attribution strategies (scaled impact, global
//!   importance, TreeSHAP local attribution)
//! - An HTTP surface (`/predict`, `/health`)
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (feature schema, model parameters, prediction results)
//! - `ports`: Trait definitions for the model, attribution and artifact seams
//! - `adapters`: Concrete implementations (bundle directory, HTTP, SVG rendering)
//! - `application`: The bundle and the prediction pipeline orchestrating the stages

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::{ArtifactBundle, PredictionService};
pub use domain::{ArtifactError, AttributionStrategy, Label, PredictionError, PredictionResult};

/// Result type for Ovasense operations
pub type Result<T> = std::result::Result<T, OvasenseError>;

/// Main error type for Ovasense
#[derive(Debug, thiserror::Error)]
pub enum OvasenseError {
    #[error("Artifact load failure: {0}")]
    Artifact(#[from] domain::ArtifactError),

    #[error("Prediction failed: {0}")]
    Prediction(#[from] domain::PredictionError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
