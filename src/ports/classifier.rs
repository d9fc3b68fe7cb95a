//! Classifier port: the capabilities the pipeline needs from a fitted model.
//!
//! `predict` and `predict_proba` are required. Global importances and tree
//! structure are optional capabilities, checked explicitly by the attribution
//! strategies that need them.

use crate::domain::{ClassProbabilities, GradientBoostedTrees, Label, PredictionError};

/// A fitted binary classifier over the selected-feature vector.
pub trait Classifier: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Input width the model was trained on (K).
    fn n_features(&self) -> usize;

    /// Class probabilities for one selected-feature vector.
    ///
    /// # Errors
    /// Returns `PredictionError::DimensionMismatch` if `x.len() != n_features()`.
    fn predict_proba(&self, x: &[f64]) -> Result<ClassProbabilities, PredictionError>;

    /// Argmax decision for one selected-feature vector.
    ///
    /// # Errors
    /// Returns `PredictionError::DimensionMismatch` if `x.len() != n_features()`.
    fn predict(&self, x: &[f64]) -> Result<Label, PredictionError> {
        Ok(self.predict_proba(x)?.label())
    }

    /// Training-time global importances aligned to the selected features.
    fn feature_importances(&self) -> Option<&[f64]> {
        None
    }

    /// Tree structure for model-aware local attribution.
    fn tree_ensemble(&self) -> Option<&GradientBoostedTrees> {
        None
    }

    /// Reject vectors whose width differs from the model's.
    ///
    /// # Errors
    /// Returns `PredictionError::DimensionMismatch` on width mismatch.
    fn check_width(&self, x: &[f64]) -> Result<(), PredictionError> {
        if x.len() == self.n_features() {
            Ok(())
        } else {
            Err(PredictionError::DimensionMismatch {
                expected: self.n_features(),
                got: x.len(),
            })
        }
    }
}
