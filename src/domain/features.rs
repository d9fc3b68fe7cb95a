//! Feature schema and vectorization.
//!
//! The bundle's `feature_names` artifact is the input contract. A request is an
//! unordered mapping from feature name to value; vectorization turns it into a
//! [`FeatureVector`] whose i-th entry belongs to `feature_names[i]`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::PredictionError;

/// The 19 non-invasive measurements collected by the intake form.
///
/// Order matches the training export. The runtime contract is always the
/// loaded bundle's own `feature_names`; this list documents the shipped model.
pub const PCOS_FEATURES: [&str; 19] = [
    "Age (yrs)",
    "Weight (Kg)",
    "Height(Cm)",
    "BMI",
    "Pulse rate(bpm)",
    "RR (breaths/min)",
    "Hb(g/dl)",
    "Cycle(R/I)",
    "Cycle length(days)",
    "Marraige Status (Yrs)",
    "Pregnant(Y/N)",
    "No. of abortions",
    "Weight gain(Y/N)",
    "hair growth(Y/N)",
    "Skin darkening (Y/N)",
    "Hair loss(Y/N)",
    "Pimples(Y/N)",
    "Fast food (Y/N)",
    "Reg.Exercise(Y/N)",
];

/// A raw value as sent by the caller.
///
/// Numbers are taken as-is; yes/no flags and numeric strings are coerced.
/// Anything else is kept so the vectorizer can name the offending feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Flag(bool),
    Text(String),
    Other(serde_json::Value),
}

impl FeatureValue {
    /// Coerce to a finite number.
    ///
    /// # Errors
    /// Returns a human-readable reason when the value is not numeric.
    pub fn as_number(&self) -> Result<f64, String> {
        let value = match self {
            Self::Number(v) => *v,
            Self::Flag(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("'{s}' is not a number"))?,
            Self::Other(v) => return Err(format!("expected a number, got {}", json_type(v))),
        };

        if value.is_finite() {
            Ok(value)
        } else {
            Err("value must be finite".to_string())
        }
    }
}

fn json_type(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Unordered request payload: feature name to raw value.
///
/// Extra keys are allowed and ignored by vectorization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PredictionInput(pub HashMap<String, FeatureValue>);

impl PredictionInput {
    /// Build an input from name/number pairs.
    #[must_use]
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), FeatureValue::Number(v)))
                .collect(),
        )
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.0.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Ordered list of every feature a request must supply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Build a schema from the declared feature order.
    ///
    /// # Errors
    /// Returns the first duplicated name.
    pub fn new(names: Vec<String>) -> Result<Self, String> {
        let mut positions = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if positions.insert(name.clone(), i).is_some() {
                return Err(format!("duplicate feature name '{name}'"));
            }
        }
        Ok(Self { names, positions })
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Position of `name` in the declared order.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Map an unordered input onto the declared order.
    ///
    /// Walks `names` in order and fails on the first absent key, so the
    /// reported feature is always the earliest missing one.
    ///
    /// # Errors
    /// `MissingFeature` for the first absent name, `InvalidFeatureValue` for
    /// the first value that cannot be coerced.
    pub fn vectorize(&self, input: &PredictionInput) -> Result<FeatureVector, PredictionError> {
        let mut values = Vec::with_capacity(self.names.len());
        for name in &self.names {
            let raw = input
                .get(name)
                .ok_or_else(|| PredictionError::MissingFeature(name.clone()))?;
            let value = raw
                .as_number()
                .map_err(|reason| PredictionError::InvalidFeatureValue {
                    feature: name.clone(),
                    reason,
                })?;
            values.push(value);
        }

        let ignored = input.len().saturating_sub(self.names.len());
        if ignored > 0 {
            tracing::debug!(ignored, "Ignoring keys outside the feature schema");
        }

        Ok(FeatureVector(values))
    }
}

/// Raw feature values in schema order (length F).
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(names: &[&str]) -> FeatureSchema {
        FeatureSchema::new(names.iter().map(|s| (*s).to_string()).collect())
            .expect("valid schema")
    }

    #[test]
    fn test_vectorize_follows_declared_order() {
        let schema = schema(&["a", "b", "c"]);
        let input = PredictionInput::from_pairs([("c", -1.0), ("a", 2.0), ("b", 5.0)]);

        let v = schema.vectorize(&input).expect("Should vectorize");
        assert_eq!(v.as_slice(), &[2.0, 5.0, -1.0]);
    }

    #[test]
    fn test_vectorize_ignores_insertion_order() {
        let schema = schema(&["a", "b", "c"]);
        let forward = PredictionInput::from_pairs([("a", 1.5), ("b", 2.5), ("c", 3.5)]);
        let reversed = PredictionInput::from_pairs([("c", 3.5), ("b", 2.5), ("a", 1.5)]);

        assert_eq!(
            schema.vectorize(&forward).expect("forward"),
            schema.vectorize(&reversed).expect("reversed")
        );
    }

    #[test]
    fn test_vectorize_reports_first_missing_in_declared_order() {
        let schema = schema(&["a", "b", "c", "d"]);
        let input = PredictionInput::from_pairs([("a", 1.0), ("c", 1.0)]);

        let err = schema.vectorize(&input).expect_err("must fail");
        assert_eq!(err, PredictionError::MissingFeature("b".into()));
    }

    #[test]
    fn test_vectorize_ignores_extra_keys() {
        let schema = schema(&["a"]);
        let input = PredictionInput::from_pairs([("a", 4.0), ("unused", 9.0)]);

        let v = schema.vectorize(&input).expect("Should vectorize");
        assert_eq!(v.as_slice(), &[4.0]);
    }

    #[test]
    fn test_vectorize_coerces_flags_and_numeric_strings() {
        let schema = schema(&["Pimples(Y/N)", "BMI"]);
        let input: PredictionInput =
            serde_json::from_str(r#"{"Pimples(Y/N)": true, "BMI": " 27.5 "}"#).expect("json");

        let v = schema.vectorize(&input).expect("Should vectorize");
        assert_eq!(v.as_slice(), &[1.0, 27.5]);
    }

    #[test]
    fn test_vectorize_rejects_non_numeric_values() {
        let schema = schema(&["BMI", "Hb(g/dl)"]);
        let input: PredictionInput =
            serde_json::from_str(r#"{"BMI": null, "Hb(g/dl)": "high"}"#).expect("json");

        match schema.vectorize(&input) {
            Err(PredictionError::InvalidFeatureValue { feature, reason }) => {
                assert_eq!(feature, "BMI");
                assert!(reason.contains("null"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_non_finite_strings_rejected() {
        assert!(FeatureValue::Text("NaN".into()).as_number().is_err());
        assert!(FeatureValue::Text("inf".into()).as_number().is_err());
    }

    #[test]
    fn test_schema_rejects_duplicates() {
        let err = FeatureSchema::new(vec!["BMI".into(), "BMI".into()]).expect_err("dup");
        assert!(err.contains("BMI"));
    }

    #[test]
    fn test_pcos_feature_list_is_a_valid_schema() {
        let schema = FeatureSchema::new(PCOS_FEATURES.iter().map(|s| (*s).to_string()).collect())
            .expect("valid schema");
        assert_eq!(schema.len(), 19);
        assert_eq!(schema.position("BMI"), Some(3));
    }
}
