//! The artifact bundle: everything the offline training job produced.
//!
//! Loaded once at startup, cross-validated, and shared read-only (behind an
//! `Arc`) by every request for the lifetime of the process.

use serde::de::DeserializeOwned;

use crate::domain::{
    ArtifactError, ArtifactKind, FeatureSchema, FeatureSelector, ModelArtifact, StandardScaler,
};
use crate::ports::{ArtifactSource, Classifier};

/// Immutable, validated set of training artifacts.
pub struct ArtifactBundle {
    schema: FeatureSchema,
    selected_features: Vec<String>,
    /// Position in `schema` of each selected feature, in selected order.
    selected_positions: Vec<usize>,
    scaler: StandardScaler,
    model: Box<dyn Classifier>,
}

impl std::fmt::Debug for ArtifactBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactBundle")
            .field("n_features", &self.schema.len())
            .field("selected_features", &self.selected_features)
            .field("model", &self.model.name())
            .finish()
    }
}

fn parse<T: DeserializeOwned>(
    source: &dyn ArtifactSource,
    artifact: ArtifactKind,
) -> Result<T, ArtifactError> {
    let bytes = source.read(artifact)?;
    serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Malformed { artifact, source })
}

impl ArtifactBundle {
    /// Load and validate every artifact from `source`.
    ///
    /// Artifacts are read in [`ArtifactKind::LOAD_ORDER`]; the first one that
    /// is missing or fails to deserialize is the one reported.
    ///
    /// # Errors
    /// Returns `ArtifactError` naming the failing artifact.
    pub fn load(source: &dyn ArtifactSource) -> Result<Self, ArtifactError> {
        tracing::info!("Loading artifact bundle from {}", source.describe());

        let model: ModelArtifact = parse(source, ArtifactKind::Model)?;
        model
            .validate()
            .map_err(|e| ArtifactError::inconsistent(ArtifactKind::Model, e))?;
        let scaler: StandardScaler = parse(source, ArtifactKind::Scaler)?;
        let selector: FeatureSelector = parse(source, ArtifactKind::Selector)?;
        let selected_features: Vec<String> = parse(source, ArtifactKind::SelectedFeatures)?;
        let feature_names: Vec<String> = parse(source, ArtifactKind::FeatureNames)?;

        let bundle = Self::new(
            feature_names,
            selected_features,
            scaler,
            selector,
            model.into_classifier(),
        )?;

        tracing::info!(
            "Loaded bundle (model={}, n_features={}, n_selected={})",
            bundle.model.name(),
            bundle.schema.len(),
            bundle.selected_features.len()
        );
        Ok(bundle)
    }

    /// Assemble a bundle from already-parsed parts and check every
    /// cross-artifact invariant.
    ///
    /// # Errors
    /// Returns `ArtifactError::Inconsistent` naming the artifact at fault.
    pub fn new(
        feature_names: Vec<String>,
        selected_features: Vec<String>,
        scaler: StandardScaler,
        selector: FeatureSelector,
        model: Box<dyn Classifier>,
    ) -> Result<Self, ArtifactError> {
        use ArtifactKind as K;

        if feature_names.is_empty() {
            return Err(ArtifactError::inconsistent(K::FeatureNames, "no features declared"));
        }
        let schema = FeatureSchema::new(feature_names)
            .map_err(|e| ArtifactError::inconsistent(K::FeatureNames, e))?;
        let f = schema.len();

        scaler
            .validate()
            .map_err(|e| ArtifactError::inconsistent(K::Scaler, e))?;
        if scaler.n_features() != f {
            return Err(ArtifactError::inconsistent(
                K::Scaler,
                format!("fitted on {} features, bundle declares {f}", scaler.n_features()),
            ));
        }

        if selected_features.is_empty() {
            return Err(ArtifactError::inconsistent(
                K::SelectedFeatures,
                "no features selected",
            ));
        }
        let mut selected_positions = Vec::with_capacity(selected_features.len());
        for name in &selected_features {
            let pos = schema.position(name).ok_or_else(|| {
                ArtifactError::inconsistent(
                    K::SelectedFeatures,
                    format!("'{name}' is not a declared feature"),
                )
            })?;
            if selected_positions.contains(&pos) {
                return Err(ArtifactError::inconsistent(
                    K::SelectedFeatures,
                    format!("'{name}' is selected twice"),
                ));
            }
            selected_positions.push(pos);
        }

        if selector.support.len() != f {
            return Err(ArtifactError::inconsistent(
                K::Selector,
                format!("support mask has {} entries, expected {f}", selector.support.len()),
            ));
        }
        let mut from_mask = selector.selected_indices();
        let mut from_names = selected_positions.clone();
        from_mask.sort_unstable();
        from_names.sort_unstable();
        if from_mask != from_names {
            return Err(ArtifactError::inconsistent(
                K::Selector,
                "support mask does not match selected_features",
            ));
        }

        let k = selected_features.len();
        if model.n_features() != k {
            return Err(ArtifactError::inconsistent(
                K::Model,
                format!("model expects {} inputs, {k} features are selected", model.n_features()),
            ));
        }
        if let Some(importances) = model.feature_importances() {
            if importances.len() != k {
                return Err(ArtifactError::inconsistent(
                    K::Model,
                    format!("{} importances for {k} selected features", importances.len()),
                ));
            }
        }

        Ok(Self {
            schema,
            selected_features,
            selected_positions,
            scaler,
            model,
        })
    }

    /// Full input contract, in declared order.
    #[must_use]
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        self.schema.names()
    }

    /// Selected features in the selector's output order.
    #[must_use]
    pub fn selected_features(&self) -> &[String] {
        &self.selected_features
    }

    /// Schema position of each selected feature, aligned to `selected_features`.
    #[must_use]
    pub fn selected_positions(&self) -> &[usize] {
        &self.selected_positions
    }

    #[must_use]
    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    #[must_use]
    pub fn model(&self) -> &dyn Classifier {
        self.model.as_ref()
    }
}
