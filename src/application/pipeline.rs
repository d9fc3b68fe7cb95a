//! Pipeline stages: scale and select, then infer.
//!
//! Each stage is a pure function of the bundle and its input vector.

use crate::application::ArtifactBundle;
use crate::domain::{ClassProbabilities, FeatureVector, Label, PredictionError};
use crate::ports::Classifier;

/// Standardized vector projected onto the selected features (length K).
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedVector(Vec<f64>);

impl SelectedVector {
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Standardize every declared feature, then keep the selected ones in
/// `selected_features` order.
///
/// Entry i of the result is the scaled value of `selected_features[i]`, looked
/// up through the name-resolved positions computed when the bundle was built.
///
/// # Errors
/// Returns `PredictionError::DimensionMismatch` if `raw` does not match the
/// bundle's schema width, and `PredictionError::InvalidFeatureValue` if a
/// selected feature standardizes to a non-finite value.
pub fn scale_and_select(
    bundle: &ArtifactBundle,
    raw: &FeatureVector,
) -> Result<SelectedVector, PredictionError> {
    let expected = bundle.schema().len();
    if raw.len() != expected {
        return Err(PredictionError::DimensionMismatch {
            expected,
            got: raw.len(),
        });
    }

    let scaled = bundle.scaler().transform(raw.as_slice());
    bundle
        .selected_positions()
        .iter()
        .map(|&pos| {
            let value = scaled[pos];
            if value.is_finite() {
                Ok(value)
            } else {
                Err(PredictionError::InvalidFeatureValue {
                    feature: bundle.feature_names()[pos].clone(),
                    reason: "value is out of range after scaling".into(),
                })
            }
        })
        .collect::<Result<_, _>>()
        .map(SelectedVector)
}

/// Output of the inference stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inference {
    pub label: Label,
    pub probabilities: ClassProbabilities,
}

/// Run the classifier on the selected vector.
///
/// # Errors
/// Returns `PredictionError::DimensionMismatch` if the vector width differs
/// from the model's.
pub fn infer(model: &dyn Classifier, x: &SelectedVector) -> Result<Inference, PredictionError> {
    let label = model.predict(x.as_slice())?;
    let probabilities = model.predict_proba(x.as_slice())?;
    Ok(Inference {
        label,
        probabilities,
    })
}
