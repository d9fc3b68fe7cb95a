//! Prediction result types.
//!
//! Represents the output of one pass through the pipeline: label,
//! probabilities and the per-feature attribution.

use serde::ser::{SerializeMap, SerializeTuple};
use serde::{Serialize, Serializer};

/// Binary classification outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    /// No PCOS indicated
    NoPcos,
    /// PCOS indicated
    Pcos,
}

impl Label {
    /// Class index (0 = negative, 1 = positive).
    #[must_use]
    pub fn index(&self) -> u8 {
        match self {
            Self::NoPcos => 0,
            Self::Pcos => 1,
        }
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.index())
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoPcos => write!(f, "NO_PCOS"),
            Self::Pcos => write!(f, "PCOS"),
        }
    }
}

/// Two-class probability distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassProbabilities {
    pub no_pcos: f64,
    pub pcos: f64,
}

impl ClassProbabilities {
    /// Build the distribution from the positive-class probability.
    #[must_use]
    pub fn from_positive(pcos: f64) -> Self {
        let pcos = pcos.clamp(0.0, 1.0);
        Self {
            no_pcos: 1.0 - pcos,
            pcos,
        }
    }

    /// Argmax; ties resolve to the negative class.
    #[must_use]
    pub fn label(&self) -> Label {
        if self.pcos > self.no_pcos {
            Label::Pcos
        } else {
            Label::NoPcos
        }
    }

    /// Probability assigned to `label`.
    #[must_use]
    pub fn of(&self, label: Label) -> f64 {
        match label {
            Label::NoPcos => self.no_pcos,
            Label::Pcos => self.pcos,
        }
    }
}

/// How per-feature scores are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttributionStrategy {
    /// Standardized value times global importance.
    ScaledImpact,
    /// Global importance, identical for every request.
    GlobalImportance,
    /// Exact TreeSHAP contributions for the predicted class.
    TreeShap,
}

impl AttributionStrategy {
    pub const ALL: [AttributionStrategy; 3] =
        [Self::ScaledImpact, Self::GlobalImportance, Self::TreeShap];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScaledImpact => "scaled-impact",
            Self::GlobalImportance => "global-importance",
            Self::TreeShap => "tree-shap",
        }
    }

    /// Ranking length used when none is configured.
    #[must_use]
    pub fn default_top_n(&self) -> usize {
        match self {
            Self::ScaledImpact => 15,
            Self::GlobalImportance | Self::TreeShap => 5,
        }
    }

    /// Whether the ranking orders by magnitude rather than signed value.
    #[must_use]
    pub fn ranks_by_magnitude(&self) -> bool {
        matches!(self, Self::TreeShap)
    }
}

impl std::fmt::Display for AttributionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AttributionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s.trim())
            .ok_or_else(|| {
                format!(
                    "unknown attribution strategy '{s}' (expected one of: scaled-impact, global-importance, tree-shap)"
                )
            })
    }
}

/// A feature paired with its score. Serializes as `[name, score]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureScore {
    pub feature: String,
    pub score: f64,
}

impl FeatureScore {
    pub fn new(feature: impl Into<String>, score: f64) -> Self {
        Self {
            feature: feature.into(),
            score,
        }
    }
}

impl Serialize for FeatureScore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tup = serializer.serialize_tuple(2)?;
        tup.serialize_element(&self.feature)?;
        tup.serialize_element(&self.score)?;
        tup.end()
    }
}

/// Per-feature attribution for one prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribution {
    pub strategy: AttributionStrategy,
    /// Scores in `selected_features` order.
    pub scores: Vec<FeatureScore>,
    /// Every score, sorted by the strategy's key (descending).
    pub ranking: Vec<FeatureScore>,
    /// Reference output for additive strategies.
    pub base_value: Option<f64>,
}

impl Attribution {
    /// Score for `feature`, if it is a selected feature.
    #[must_use]
    pub fn score(&self, feature: &str) -> Option<f64> {
        self.scores
            .iter()
            .find(|s| s.feature == feature)
            .map(|s| s.score)
    }

    /// First `n` ranked entries.
    #[must_use]
    pub fn top(&self, n: usize) -> &[FeatureScore] {
        &self.ranking[..n.min(self.ranking.len())]
    }

    /// Sum of all scores.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.scores.iter().map(|s| s.score).sum()
    }
}

/// Complete result handed to the caller and to the report assembler.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResult {
    #[serde(rename = "prediction")]
    pub label: Label,

    pub probabilities: ClassProbabilities,

    pub strategy: AttributionStrategy,

    /// Selected feature to score, in selected order.
    #[serde(serialize_with = "serialize_score_map")]
    pub attributions: Vec<FeatureScore>,

    /// Ranked top-N `(feature, score)` pairs.
    #[serde(rename = "top_features")]
    pub ranked: Vec<FeatureScore>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_value: Option<f64>,

    /// Waterfall rendering of a local attribution (SVG bytes).
    #[serde(
        rename = "waterfall_plot",
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_base64"
    )]
    pub waterfall: Option<Vec<u8>>,

    /// Media type of `waterfall`, present only alongside it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waterfall_content_type: Option<&'static str>,

    pub generated_at: chrono::DateTime<chrono::Utc>,
}

fn serialize_score_map<S: Serializer>(scores: &[FeatureScore], s: S) -> Result<S::Ok, S::Error> {
    let mut map = s.serialize_map(Some(scores.len()))?;
    for entry in scores {
        map.serialize_entry(&entry.feature, &entry.score)?;
    }
    map.end()
}

fn serialize_base64<S: Serializer>(bytes: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
    use base64::Engine;
    match bytes {
        Some(b) => s.serialize_str(&base64::engine::general_purpose::STANDARD.encode(b)),
        None => s.serialize_none(),
    }
}
