//! Scaled-impact heuristic: `scaled_value[i] * global_importance[i]`.

use super::{rank, required_importances, zip_scores};
use crate::domain::{Attribution, AttributionStrategy, Label, PredictionError};
use crate::ports::{Attributor, Classifier};

/// How far this instance's standardized value pushes along each feature's
/// global weight. Signed; ranked by signed value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScaledImpact;

impl Attributor for ScaledImpact {
    fn strategy(&self) -> AttributionStrategy {
        AttributionStrategy::ScaledImpact
    }

    fn compute(
        &self,
        x: &[f64],
        model: &dyn Classifier,
        names: &[String],
        _predicted: Label,
    ) -> Result<Attribution, PredictionError> {
        let importances = required_importances(model, x.len())?;
        let scores = zip_scores(names, x.iter().zip(importances).map(|(v, w)| v * w))?;
        let ranking = rank(&scores, false);

        Ok(Attribution {
            strategy: self.strategy(),
            scores,
            ranking,
            base_value: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GradientBoostedTrees, LogisticModel, Tree, TreeNode};

    fn model(importances: Vec<f64>) -> GradientBoostedTrees {
        GradientBoostedTrees {
            n_features: importances.len(),
            learning_rate: 0.1,
            init_raw: 0.0,
            trees: vec![Tree {
                nodes: vec![TreeNode::Leaf {
                    value: 0.0,
                    cover: 1.0,
                }],
            }],
            feature_importances: Some(importances),
        }
    }

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_scores_and_ranking() {
        let attribution = ScaledImpact
            .compute(&[-1.0, 2.0], &model(vec![0.3, 0.7]), &names(&["c", "a"]), Label::Pcos)
            .expect("attribution");

        assert!((attribution.score("c").expect("c") - (-0.3)).abs() < 1e-12);
        assert!((attribution.score("a").expect("a") - 1.4).abs() < 1e-12);
        assert_eq!(attribution.ranking[0].feature, "a");
        assert_eq!(attribution.ranking[1].feature, "c");
        assert!(attribution.base_value.is_none());
    }

    #[test]
    fn test_linear_in_scaled_value() {
        let m = model(vec![0.2, 0.5, 0.3]);
        let n = names(&["p", "q", "r"]);
        let once = ScaledImpact
            .compute(&[0.4, -1.3, 2.0], &m, &n, Label::NoPcos)
            .expect("attribution");
        let doubled = ScaledImpact
            .compute(&[0.4, -2.6, 2.0], &m, &n, Label::NoPcos)
            .expect("attribution");

        assert_eq!(doubled.score("q"), once.score("q").map(|s| s * 2.0));
        assert_eq!(doubled.score("p"), once.score("p"));
        assert_eq!(doubled.score("r"), once.score("r"));
    }

    #[test]
    fn test_unavailable_without_importances() {
        let logistic = LogisticModel {
            coefficients: vec![1.0],
            intercept: 0.0,
        };
        let err = ScaledImpact
            .compute(&[1.0], &logistic, &names(&["a"]), Label::Pcos)
            .expect_err("no importances");
        assert!(matches!(err, PredictionError::AttributionUnavailable(_)));
    }
}
