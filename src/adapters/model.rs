//! Classifier implementations for the exported model parameters.

use crate::domain::model::sigmoid;
use crate::domain::{
    ClassProbabilities, GradientBoostedTrees, LogisticModel, ModelArtifact, PredictionError,
};
use crate::ports::Classifier;

impl Classifier for GradientBoostedTrees {
    fn name(&self) -> &'static str {
        "gradient_boosting"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, x: &[f64]) -> Result<ClassProbabilities, PredictionError> {
        self.check_width(x)?;
        Ok(ClassProbabilities::from_positive(sigmoid(self.raw_output(x))))
    }

    fn feature_importances(&self) -> Option<&[f64]> {
        self.feature_importances.as_deref()
    }

    fn tree_ensemble(&self) -> Option<&GradientBoostedTrees> {
        Some(self)
    }
}

impl Classifier for LogisticModel {
    fn name(&self) -> &'static str {
        "logistic"
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict_proba(&self, x: &[f64]) -> Result<ClassProbabilities, PredictionError> {
        self.check_width(x)?;
        Ok(ClassProbabilities::from_positive(sigmoid(self.raw_output(x))))
    }
}

impl ModelArtifact {
    /// Erase the concrete model behind the classifier port.
    #[must_use]
    pub fn into_classifier(self) -> Box<dyn Classifier> {
        match self {
            Self::GradientBoosting(m) => Box::new(m),
            Self::Logistic(m) => Box::new(m),
        }
    }
}
