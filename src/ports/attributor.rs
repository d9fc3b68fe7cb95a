//! Attributor port: one interface over the interchangeable explanation
//! strategies.

use crate::domain::{Attribution, AttributionStrategy, Label, PredictionError};
use crate::ports::Classifier;

/// Computes per-feature scores for one prediction.
///
/// Implementations must be reentrant: a single instance serves every
/// concurrent request.
pub trait Attributor: Send + Sync {
    /// Which strategy this is.
    fn strategy(&self) -> AttributionStrategy;

    /// Score every selected feature and rank them.
    ///
    /// # Arguments
    /// * `x` - Scaled-and-selected vector (length K)
    /// * `model` - The fitted classifier
    /// * `names` - Selected feature names, aligned to `x`
    /// * `predicted` - Label the model assigned to `x`
    ///
    /// # Errors
    /// Returns `PredictionError::AttributionUnavailable` when the model lacks
    /// the capability this strategy needs.
    fn compute(
        &self,
        x: &[f64],
        model: &dyn Classifier,
        names: &[String],
        predicted: Label,
    ) -> Result<Attribution, PredictionError>;
}
