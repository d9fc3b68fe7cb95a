//! Attribution strategies.
//!
//! Three interchangeable implementations of [`Attributor`], chosen once at
//! startup:
//! - [`ScaledImpact`]: standardized value × global importance (signed)
//! - [`GlobalImportance`]: the model's global importance, input-invariant
//! - [`TreeShap`]: exact Shapley contributions on the log-odds scale

mod global_importance;
mod scaled_impact;
mod tree_shap;

use std::sync::Arc;

pub use global_importance::GlobalImportance;
pub use scaled_impact::ScaledImpact;
pub use tree_shap::TreeShap;

use crate::domain::{AttributionStrategy, FeatureScore, PredictionError};
use crate::ports::{Attributor, Classifier};

/// Construct the attributor for `strategy`.
#[must_use]
pub fn attributor_for(strategy: AttributionStrategy) -> Arc<dyn Attributor> {
    match strategy {
        AttributionStrategy::ScaledImpact => Arc::new(ScaledImpact),
        AttributionStrategy::GlobalImportance => Arc::new(GlobalImportance),
        AttributionStrategy::TreeShap => Arc::new(TreeShap),
    }
}

/// Sort descending by signed score, or by magnitude when `by_magnitude`.
///
/// The sort is stable: equal keys keep `selected_features` order.
#[must_use]
pub(crate) fn rank(scores: &[FeatureScore], by_magnitude: bool) -> Vec<FeatureScore> {
    let mut ranked = scores.to_vec();
    if by_magnitude {
        ranked.sort_by(|a, b| b.score.abs().total_cmp(&a.score.abs()));
    } else {
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    }
    ranked
}

/// Global importances, or `AttributionUnavailable` when the model has none.
pub(crate) fn required_importances(
    model: &dyn Classifier,
    k: usize,
) -> Result<&[f64], PredictionError> {
    let importances = model.feature_importances().ok_or_else(|| {
        PredictionError::AttributionUnavailable(format!(
            "model '{}' exposes no global feature importances",
            model.name()
        ))
    })?;
    if importances.len() != k {
        return Err(PredictionError::DimensionMismatch {
            expected: importances.len(),
            got: k,
        });
    }
    Ok(importances)
}

/// Pair names with scores, checking that both match the vector width.
pub(crate) fn zip_scores(
    names: &[String],
    scores: impl ExactSizeIterator<Item = f64>,
) -> Result<Vec<FeatureScore>, PredictionError> {
    if scores.len() != names.len() {
        return Err(PredictionError::DimensionMismatch {
            expected: names.len(),
            got: scores.len(),
        });
    }
    Ok(names
        .iter()
        .zip(scores)
        .map(|(name, score)| FeatureScore::new(name.clone(), score))
        .collect())
}
