//! Fitted preprocessing: standardization and feature selection.

use serde::{Deserialize, Serialize};

/// Per-feature standardization statistics captured at training time.
///
/// Both vectors are aligned to the bundle's `feature_names`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Number of features the scaler was fitted on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Check the fitted statistics before first use.
    ///
    /// # Errors
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.mean.len() != self.scale.len() {
            return Err(format!(
                "mean has {} entries but scale has {}",
                self.mean.len(),
                self.scale.len()
            ));
        }
        if let Some(i) = self.mean.iter().position(|m| !m.is_finite()) {
            return Err(format!("mean[{i}] is not finite"));
        }
        if let Some(i) = self
            .scale
            .iter()
            .position(|s| !s.is_finite() || *s == 0.0)
        {
            return Err(format!("scale[{i}] must be finite and non-zero"));
        }
        Ok(())
    }

    /// `(raw[i] - mean[i]) / scale[i]` for every feature.
    ///
    /// The caller guarantees `raw.len() == n_features()`.
    #[must_use]
    pub fn transform(&self, raw: &[f64]) -> Vec<f64> {
        raw.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| (x - mean) / scale)
            .collect()
    }
}

/// Feature-selection support mask aligned to `feature_names`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSelector {
    pub support: Vec<bool>,
}

impl FeatureSelector {
    /// Number of retained features.
    #[must_use]
    pub fn n_selected(&self) -> usize {
        self.support.iter().filter(|s| **s).count()
    }

    /// Indices (in declared order) the mask retains.
    #[must_use]
    pub fn selected_indices(&self) -> Vec<usize> {
        self.support
            .iter()
            .enumerate()
            .filter_map(|(i, keep)| keep.then_some(i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_uses_fitted_statistics() {
        let scaler = StandardScaler {
            mean: vec![10.0, 0.0, -2.0],
            scale: vec![2.0, 1.0, 0.5],
        };
        assert!(scaler.validate().is_ok());
        assert_eq!(scaler.transform(&[14.0, 3.0, -1.0]), vec![2.0, 3.0, 2.0]);
    }

    #[test]
    fn test_validate_rejects_zero_scale() {
        let scaler = StandardScaler {
            mean: vec![0.0, 0.0],
            scale: vec![1.0, 0.0],
        };
        let err = scaler.validate().expect_err("zero scale");
        assert!(err.contains("scale[1]"));
    }

    #[test]
    fn test_validate_rejects_length_mismatch() {
        let scaler = StandardScaler {
            mean: vec![0.0],
            scale: vec![1.0, 1.0],
        };
        assert!(scaler.validate().is_err());
    }

    #[test]
    fn test_selector_indices() {
        let selector = FeatureSelector {
            support: vec![true, false, true, false],
        };
        assert_eq!(selector.n_selected(), 2);
        assert_eq!(selector.selected_indices(), vec![0, 2]);
    }
}
