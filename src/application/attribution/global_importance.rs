//! Global-importance pass-through.
//!
//! Reports the model's training-time importances unchanged. The result is the
//! same for every request served by one model: it describes the model, not
//! the instance.

use super::{rank, required_importances, zip_scores};
use crate::domain::{Attribution, AttributionStrategy, Label, PredictionError};
use crate::ports::{Attributor, Classifier};

#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalImportance;

impl Attributor for GlobalImportance {
    fn strategy(&self) -> AttributionStrategy {
        AttributionStrategy::GlobalImportance
    }

    fn compute(
        &self,
        x: &[f64],
        model: &dyn Classifier,
        names: &[String],
        _predicted: Label,
    ) -> Result<Attribution, PredictionError> {
        let importances = required_importances(model, x.len())?;
        let scores = zip_scores(names, importances.iter().copied())?;
        let ranking = rank(&scores, false);

        Ok(Attribution {
            strategy: self.strategy(),
            scores,
            ranking,
            base_value: None,
        })
    }
}
