//! Exported classifier parameters.
//!
//! The training job exports the fitted classifier as JSON tagged by `kind`.
//! Trees follow the scikit-learn layout: node ids are assigned depth-first so
//! children always have larger ids than their parent, and `x[feature] <=
//! threshold` descends left.

use serde::{Deserialize, Serialize};

/// Fitted classifier as exported by the training job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    GradientBoosting(GradientBoostedTrees),
    Logistic(LogisticModel),
}

impl ModelArtifact {
    /// Input width expected by the model.
    #[must_use]
    pub fn n_features(&self) -> usize {
        match self {
            Self::GradientBoosting(m) => m.n_features,
            Self::Logistic(m) => m.coefficients.len(),
        }
    }

    /// Structural checks run once at load time.
    ///
    /// # Errors
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::GradientBoosting(m) => m.validate(),
            Self::Logistic(m) => m.validate(),
        }
    }
}

/// Binary gradient-boosted regression trees on the log-odds scale.
///
/// `raw(x) = init_raw + learning_rate * sum(tree(x))`, `P(pcos) = sigmoid(raw)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    pub n_features: usize,
    pub learning_rate: f64,
    pub init_raw: f64,
    pub trees: Vec<Tree>,
    /// Training-time impurity importances, one per selected feature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_importances: Option<Vec<f64>>,
}

impl GradientBoostedTrees {
    /// Log-odds of the positive class.
    #[must_use]
    pub fn raw_output(&self, x: &[f64]) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict(x)).sum();
        self.init_raw + self.learning_rate * sum
    }

    /// Cover-weighted mean of `raw_output` over the training distribution.
    #[must_use]
    pub fn expected_raw_output(&self) -> f64 {
        let sum: f64 = self.trees.iter().map(Tree::expected_value).sum();
        self.init_raw + self.learning_rate * sum
    }

    /// # Errors
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.n_features == 0 {
            return Err("n_features must be positive".into());
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(format!("invalid learning_rate {}", self.learning_rate));
        }
        if !self.init_raw.is_finite() {
            return Err("init_raw is not finite".into());
        }
        if self.trees.is_empty() {
            return Err("ensemble has no trees".into());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|e| format!("tree {i}: {e}"))?;
        }
        if let Some(importances) = &self.feature_importances {
            if importances.len() != self.n_features {
                return Err(format!(
                    "feature_importances has {} entries, expected {}",
                    importances.len(),
                    self.n_features
                ));
            }
            if let Some(i) = importances.iter().position(|v| !v.is_finite() || *v < 0.0) {
                return Err(format!("feature_importances[{i}] must be finite and >= 0"));
            }
        }
        Ok(())
    }
}

/// Relative slack allowed between a split's cover and its children's.
const COVER_TOLERANCE: f64 = 1e-6;

/// One regression tree; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

/// A tree node. `cover` is the weighted training sample count reaching it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        cover: f64,
    },
    Leaf {
        value: f64,
        cover: f64,
    },
}

impl TreeNode {
    #[must_use]
    pub fn cover(&self) -> f64 {
        match self {
            Self::Split { cover, .. } | Self::Leaf { cover, .. } => *cover,
        }
    }
}

impl Tree {
    /// Leaf value reached by `x`.
    #[must_use]
    pub fn predict(&self, x: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                TreeNode::Leaf { value, .. } => return value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if x[feature] <= threshold { left } else { right };
                }
            }
        }
    }

    /// Expected leaf value when every split is averaged by child cover.
    #[must_use]
    pub fn expected_value(&self) -> f64 {
        self.node_expectation(0)
    }

    fn node_expectation(&self, idx: usize) -> f64 {
        match self.nodes[idx] {
            TreeNode::Leaf { value, .. } => value,
            TreeNode::Split {
                left, right, cover, ..
            } => {
                let l = &self.nodes[left];
                let r = &self.nodes[right];
                (l.cover() * self.node_expectation(left) + r.cover() * self.node_expectation(right))
                    / cover
            }
        }
    }

    /// # Errors
    /// Returns a description of the first problem found.
    pub fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".into());
        }
        let mut parents = vec![0usize; self.nodes.len()];
        for (i, node) in self.nodes.iter().enumerate() {
            let cover = node.cover();
            if !cover.is_finite() || cover <= 0.0 {
                return Err(format!("node {i} has non-positive cover"));
            }
            match *node {
                TreeNode::Leaf { value, .. } => {
                    if !value.is_finite() {
                        return Err(format!("node {i} has a non-finite value"));
                    }
                }
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if feature >= n_features {
                        return Err(format!(
                            "node {i} splits on feature {feature}, model has {n_features}"
                        ));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {i} has a NaN threshold"));
                    }
                    // Forward-only children rule out cycles.
                    for child in [left, right] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(format!("node {i} has invalid child {child}"));
                        }
                        parents[child] += 1;
                        if parents[child] > 1 {
                            return Err(format!("node {child} has more than one parent"));
                        }
                    }
                    // Children partition the parent's samples.
                    let children = self.nodes[left].cover() + self.nodes[right].cover();
                    if (children - cover).abs() > COVER_TOLERANCE * cover {
                        return Err(format!(
                            "node {i} has cover {cover}, children sum to {children}"
                        ));
                    }
                }
            }
        }
        if let Some(orphan) = parents.iter().skip(1).position(|&n| n == 0) {
            return Err(format!("node {} is unreachable", orphan + 1));
        }
        Ok(())
    }
}

/// Plain logistic regression. Exposes no global importance and no tree
/// structure, so only inference is available for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LogisticModel {
    #[must_use]
    pub fn raw_output(&self, x: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(x)
                .map(|(w, v)| w * v)
                .sum::<f64>()
    }

    /// # Errors
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.coefficients.is_empty() {
            return Err("logistic model has no coefficients".into());
        }
        if self.coefficients.iter().any(|w| !w.is_finite()) || !self.intercept.is_finite() {
            return Err("logistic model has non-finite parameters".into());
        }
        Ok(())
    }
}

/// Numerically stable logistic function.
#[must_use]
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
