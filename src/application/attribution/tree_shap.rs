//! Exact TreeSHAP for gradient-boosted trees.
//!
//! Path-dependent Shapley values in polynomial time (Lundberg, Erion & Lee,
//! "Consistent Individualized Feature Attribution for Tree Ensembles",
//! Algorithm 2). Contributions are on the log-odds scale and satisfy
//!
//! ```text
//! base_value + sum(phi) == raw_output(x)
//! ```
//!
//! for the positive class. When the predicted class is the negative one both
//! sides are negated, so the explanation always reads "towards the predicted
//! class".

use super::{rank, zip_scores};
use crate::domain::{
    Attribution, AttributionStrategy, GradientBoostedTrees, Label, PredictionError, Tree, TreeNode,
};
use crate::ports::{Attributor, Classifier};

#[derive(Debug, Clone, Copy, Default)]
pub struct TreeShap;

impl Attributor for TreeShap {
    fn strategy(&self) -> AttributionStrategy {
        AttributionStrategy::TreeShap
    }

    fn compute(
        &self,
        x: &[f64],
        model: &dyn Classifier,
        names: &[String],
        predicted: Label,
    ) -> Result<Attribution, PredictionError> {
        let ensemble = model.tree_ensemble().ok_or_else(|| {
            PredictionError::AttributionUnavailable(format!(
                "model '{}' is not a tree ensemble",
                model.name()
            ))
        })?;
        if x.len() != ensemble.n_features {
            return Err(PredictionError::DimensionMismatch {
                expected: ensemble.n_features,
                got: x.len(),
            });
        }

        let (mut phi, mut base) = ensemble_shap(ensemble, x);
        if predicted == Label::NoPcos {
            phi.iter_mut().for_each(|v| *v = -*v);
            base = -base;
        }

        let scores = zip_scores(names, phi.into_iter())?;
        let ranking = rank(&scores, true);
        Ok(Attribution {
            strategy: self.strategy(),
            scores,
            ranking,
            base_value: Some(base),
        })
    }
}

/// Positive-class contributions and expected raw output.
pub(crate) fn ensemble_shap(model: &GradientBoostedTrees, x: &[f64]) -> (Vec<f64>, f64) {
    let mut phi = vec![0.0; x.len()];
    for tree in &model.trees {
        let mut tree_phi = vec![0.0; x.len()];
        TreeWalk {
            tree,
            x,
            phi: &mut tree_phi,
        }
        .recurse(0, &[], 1.0, 1.0, None);
        for (total, v) in phi.iter_mut().zip(tree_phi) {
            *total += model.learning_rate * v;
        }
    }
    (phi, model.expected_raw_output())
}

/// One element of the feature path from the root to the current node.
#[derive(Debug, Clone, Copy)]
struct PathElement {
    /// `None` only for the root placeholder.
    feature: Option<usize>,
    /// Fraction of "feature absent" paths that flow through this split.
    zero_fraction: f64,
    /// 1 if `x` follows this split, else 0.
    one_fraction: f64,
    /// Proportion of subsets of a given cardinality that reach here.
    pweight: f64,
}

struct TreeWalk<'a> {
    tree: &'a Tree,
    x: &'a [f64],
    phi: &'a mut [f64],
}

impl TreeWalk<'_> {
    fn recurse(
        &mut self,
        node: usize,
        parent_path: &[PathElement],
        zero_fraction: f64,
        one_fraction: f64,
        feature: Option<usize>,
    ) {
        // Each level owns its copy of the path.
        let mut path = parent_path.to_vec();
        extend_path(&mut path, zero_fraction, one_fraction, feature);

        match self.tree.nodes[node] {
            TreeNode::Leaf { value, .. } => {
                for i in 1..path.len() {
                    let weight = unwound_path_sum(&path, i);
                    let el = path[i];
                    if let Some(f) = el.feature {
                        self.phi[f] += weight * (el.one_fraction - el.zero_fraction) * value;
                    }
                }
            }
            TreeNode::Split {
                feature: split,
                threshold,
                left,
                right,
                cover,
            } => {
                let (hot, cold) = if self.x[split] <= threshold {
                    (left, right)
                } else {
                    (right, left)
                };

                let mut incoming_zero = 1.0;
                let mut incoming_one = 1.0;
                if let Some(k) = (1..path.len()).find(|&k| path[k].feature == Some(split)) {
                    incoming_zero = path[k].zero_fraction;
                    incoming_one = path[k].one_fraction;
                    unwind_path(&mut path, k);
                }

                let hot_zero = self.tree.nodes[hot].cover() / cover;
                let cold_zero = self.tree.nodes[cold].cover() / cover;
                self.recurse(
                    hot,
                    &path,
                    hot_zero * incoming_zero,
                    incoming_one,
                    Some(split),
                );
                self.recurse(cold, &path, cold_zero * incoming_zero, 0.0, Some(split));
            }
        }
    }
}

fn extend_path(
    path: &mut Vec<PathElement>,
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        pweight: if depth == 0 { 1.0 } else { 0.0 },
    });
    let denom = (depth + 1) as f64;
    for i in (0..depth).rev() {
        path[i + 1].pweight += one_fraction * path[i].pweight * (i + 1) as f64 / denom;
        path[i].pweight = zero_fraction * path[i].pweight * (depth - i) as f64 / denom;
    }
}

/// Undo the extension for `path[index]` and drop it.
fn unwind_path(path: &mut Vec<PathElement>, index: usize) {
    let depth = path.len() - 1;
    let one = path[index].one_fraction;
    let zero = path[index].zero_fraction;
    let denom = (depth + 1) as f64;
    let mut next_one_portion = path[depth].pweight;

    for i in (0..depth).rev() {
        if one != 0.0 {
            let tmp = path[i].pweight;
            path[i].pweight = next_one_portion * denom / ((i + 1) as f64 * one);
            next_one_portion = tmp - path[i].pweight * zero * (depth - i) as f64 / denom;
        } else {
            path[i].pweight = path[i].pweight * denom / (zero * (depth - i) as f64);
        }
    }

    // pweights stay in place; only the split descriptors shift down.
    for i in index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

/// Total pweight the path would have with `path[index]` unwound.
fn unwound_path_sum(path: &[PathElement], index: usize) -> f64 {
    let depth = path.len() - 1;
    let one = path[index].one_fraction;
    let zero = path[index].zero_fraction;
    let denom = (depth + 1) as f64;
    let mut next_one_portion = path[depth].pweight;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        if one != 0.0 {
            let tmp = next_one_portion * denom / ((i + 1) as f64 * one);
            total += tmp;
            next_one_portion = path[i].pweight - tmp * zero * (depth - i) as f64 / denom;
        } else if zero != 0.0 {
            total += path[i].pweight / zero / ((depth - i) as f64 / denom);
        }
    }
    total
}
