//! Domain layer: Core business types and logic.
//!
//! Pure data and arithmetic: the feature schema, fitted preprocessing
//! statistics, exported model parameters and the prediction result types.
//! All types are serializable and validated when an artifact is parsed.

mod artifact;
mod error;
mod features;
pub mod model;
mod prediction;
mod preprocessing;

pub use artifact::{ArtifactError, ArtifactKind};
pub use error::{ErrorKind, PredictionError};
pub use features::{FeatureSchema, FeatureValue, FeatureVector, PredictionInput, PCOS_FEATURES};
pub use model::{GradientBoostedTrees, LogisticModel, ModelArtifact, Tree, TreeNode};
pub use prediction::{
    Attribution, AttributionStrategy, ClassProbabilities, FeatureScore, Label, PredictionResult,
};
pub use preprocessing::{FeatureSelector, StandardScaler};
