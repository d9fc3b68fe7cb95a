//! Prediction service: Orchestrates one pass through the pipeline.
//!
//! This service coordinates:
//! - Vectorizing the request against the bundle's schema
//! - Scaling and selecting
//! - Inference
//! - Attribution with the strategy chosen at startup
//! - Optional waterfall rendering for additive attributions

use std::sync::Arc;

use serde::Serialize;

use crate::application::pipeline::{infer, scale_and_select};
use crate::application::ArtifactBundle;
use crate::domain::{AttributionStrategy, PredictionError, PredictionInput, PredictionResult};
use crate::ports::{Attributor, ExplanationRenderer};

/// Liveness payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub message: &'static str,
}

/// Service for running the prediction pipeline.
///
/// Holds only shared, immutable state: one instance serves every concurrent
/// request without locking. Stages run in order and the first failure
/// short-circuits the rest.
#[derive(Clone)]
pub struct PredictionService {
    bundle: Arc<ArtifactBundle>,
    attributor: Arc<dyn Attributor>,
    renderer: Option<Arc<dyn ExplanationRenderer>>,
    top_n: usize,
}

impl std::fmt::Debug for PredictionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionService")
            .field("bundle", &self.bundle)
            .field("strategy", &self.attributor.strategy())
            .field("renders_waterfall", &self.renderer.is_some())
            .field("top_n", &self.top_n)
            .finish()
    }
}

impl PredictionService {
    /// Create a new prediction service.
    pub fn new(bundle: Arc<ArtifactBundle>, attributor: Arc<dyn Attributor>, top_n: usize) -> Self {
        Self {
            bundle,
            attributor,
            renderer: None,
            top_n,
        }
    }

    /// Attach a waterfall renderer, used for attributions that carry a base
    /// value.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn ExplanationRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    #[must_use]
    pub fn strategy(&self) -> AttributionStrategy {
        self.attributor.strategy()
    }

    #[must_use]
    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Liveness. Always healthy: a service only exists once its bundle has
    /// loaded.
    #[must_use]
    pub fn health(&self) -> Health {
        Health {
            status: "healthy",
            message: "ML service is running",
        }
    }

    /// Run the full pipeline on one request.
    ///
    /// Performs:
    /// 1. Vectorize against the declared feature names
    /// 2. Standardize and select
    /// 3. Infer label and probabilities
    /// 4. Attribute and rank
    /// 5. Render the waterfall (additive strategies only, best effort)
    ///
    /// # Errors
    /// Returns the first stage failure; no partial result is produced.
    pub fn predict(&self, input: &PredictionInput) -> Result<PredictionResult, PredictionError> {
        let bundle = self.bundle.as_ref();

        tracing::debug!("Step 1: Vectorizing {} input fields...", input.len());
        let raw = bundle.schema().vectorize(input)?;

        tracing::debug!("Step 2: Scaling and selecting {} features...", raw.len());
        let selected = scale_and_select(bundle, &raw)?;

        tracing::debug!("Step 3: Running {} inference...", bundle.model().name());
        let inference = infer(bundle.model(), &selected)?;

        tracing::debug!("Step 4: Computing {} attribution...", self.strategy());
        let attribution = self.attributor.compute(
            selected.as_slice(),
            bundle.model(),
            bundle.selected_features(),
            inference.label,
        )?;

        let waterfall = match (&self.renderer, attribution.base_value) {
            (Some(renderer), Some(_)) => {
                tracing::debug!("Step 5: Rendering waterfall...");
                match renderer.render_waterfall(&attribution) {
                    Ok(bytes) => Some((bytes, renderer.content_type())),
                    Err(e) => {
                        tracing::warn!("Waterfall rendering failed, omitting image: {}", e);
                        None
                    }
                }
            }
            _ => None,
        };

        tracing::info!(
            "Prediction complete: prediction={}, confidence={:.2}%, strategy={}",
            inference.label,
            inference.probabilities.of(inference.label) * 100.0,
            attribution.strategy
        );

        Ok(PredictionResult {
            label: inference.label,
            probabilities: inference.probabilities,
            strategy: attribution.strategy,
            ranked: attribution.top(self.top_n).to_vec(),
            base_value: attribution.base_value,
            attributions: attribution.scores,
            waterfall_content_type: waterfall.as_ref().map(|(_, content_type)| *content_type),
            waterfall: waterfall.map(|(bytes, _)| bytes),
            generated_at: chrono::Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::attribution::attributor_for;
    use crate::application::bundle::tests::abc_source;
    use crate::domain::{ArtifactKind, Attribution, FeatureScore, FeatureValue, Label};
    use crate::ports::RenderError;

    struct FixedRenderer(Result<Vec<u8>, ()>);

    impl ExplanationRenderer for FixedRenderer {
        fn content_type(&self) -> &'static str {
            "image/svg+xml"
        }

        fn render_waterfall(&self, _: &Attribution) -> Result<Vec<u8>, RenderError> {
            self.0
                .clone()
                .map_err(|()| RenderError::Drawing("backend unavailable".into()))
        }
    }

    fn service(strategy: AttributionStrategy, top_n: usize) -> PredictionService {
        let bundle = ArtifactBundle::load(&abc_source()).expect("Bundle should load");
        PredictionService::new(Arc::new(bundle), attributor_for(strategy), top_n)
    }

    fn abc_input() -> PredictionInput {
        PredictionInput::from_pairs([("a", 2.0), ("b", 5.0), ("c", -1.0)])
    }

    #[test]
    fn test_end_to_end_scaled_impact() {
        let result = service(AttributionStrategy::ScaledImpact, 15)
            .predict(&abc_input())
            .expect("Should predict");

        assert_eq!(result.label, Label::Pcos);
        assert_eq!(result.attributions.len(), 2);
        assert_eq!(result.attributions[0].feature, "c");
        assert!((result.attributions[0].score - (-0.3)).abs() < 1e-12);
        assert_eq!(result.attributions[1].feature, "a");
        assert!((result.attributions[1].score - 1.4).abs() < 1e-12);

        let order: Vec<_> = result.ranked.iter().map(|s| s.feature.as_str()).collect();
        assert_eq!(order, ["a", "c"]);
        assert!(result.base_value.is_none());
        assert!(result.waterfall.is_none());
    }

    #[test]
    fn test_shared_service_across_threads() {
        let service = Arc::new(
            service(AttributionStrategy::TreeShap, 5)
                .with_renderer(Arc::new(FixedRenderer(Ok(b"<svg/>".to_vec())))),
        );
        let summary = |r: PredictionResult| {
            (
                r.label,
                r.probabilities,
                r.attributions,
                r.ranked,
                r.base_value,
                r.waterfall,
            )
        };
        let expected = summary(service.predict(&abc_input()).expect("Should predict"));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = Arc::clone(&service);
                std::thread::spawn(move || {
                    (0..25)
                        .map(|_| service.predict(&abc_input()).expect("Should predict"))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for handle in handles {
            for result in handle.join().expect("worker thread") {
                assert_eq!(summary(result), expected);
            }
        }
    }

    #[test]
    fn test_probabilities_and_label_agree() {
        let service = service(AttributionStrategy::GlobalImportance, 5);
        for (a, c) in [(-3.0, 1.0), (0.0, 0.0), (0.1, -2.0), (4.0, 4.0)] {
            let input = PredictionInput::from_pairs([("a", a), ("b", 0.0), ("c", c)]);
            let result = service.predict(&input).expect("Should predict");
            let p = result.probabilities;
            assert!((p.no_pcos + p.pcos - 1.0).abs() < 1e-6);
            assert!((0.0..=1.0).contains(&p.pcos));
            assert_eq!(result.label, p.label());
        }
    }

    #[test]
    fn test_missing_feature_short_circuits() {
        let input = PredictionInput::from_pairs([("b", 1.0)]);
        let err = service(AttributionStrategy::ScaledImpact, 15)
            .predict(&input)
            .expect_err("must fail");
        assert_eq!(err, PredictionError::MissingFeature("a".into()));
    }

    #[test]
    fn test_extra_and_coerced_values_are_accepted() {
        let mut input = abc_input();
        input.0.insert("unused".into(), FeatureValue::Flag(true));
        input.0.insert("b".into(), FeatureValue::Text(" 5 ".into()));

        let with_extra = service(AttributionStrategy::ScaledImpact, 15)
            .predict(&input)
            .expect("Should predict");
        let plain = service(AttributionStrategy::ScaledImpact, 15)
            .predict(&abc_input())
            .expect("Should predict");
        assert_eq!(with_extra.attributions, plain.attributions);
    }

    #[test]
    fn test_top_n_truncates_ranking_only() {
        let result = service(AttributionStrategy::ScaledImpact, 1)
            .predict(&abc_input())
            .expect("Should predict");
        assert_eq!(result.ranked, vec![FeatureScore::new("a", 1.4)]);
        assert_eq!(result.attributions.len(), 2);
    }

    #[test]
    fn test_tree_shap_carries_base_value_and_waterfall() {
        let service = service(AttributionStrategy::TreeShap, 5)
            .with_renderer(Arc::new(FixedRenderer(Ok(b"<svg/>".to_vec()))));
        let result = service.predict(&abc_input()).expect("Should predict");

        let base = result.base_value.expect("local attribution has a base value");
        let total: f64 = result.attributions.iter().map(|s| s.score).sum();
        // raw = 0.1 + 0.5 * 1.5
        assert!((base + total - 0.85).abs() < 1e-9);
        assert_eq!(result.waterfall.as_deref(), Some(&b"<svg/>"[..]));
        assert_eq!(result.waterfall_content_type, Some("image/svg+xml"));
    }

    #[test]
    fn test_render_failure_omits_image() {
        let service = service(AttributionStrategy::TreeShap, 5)
            .with_renderer(Arc::new(FixedRenderer(Err(()))));
        let result = service.predict(&abc_input()).expect("Should predict");
        assert!(result.waterfall.is_none());
        assert!(result.waterfall_content_type.is_none());
        assert!(result.base_value.is_some());
    }

    #[test]
    fn test_renderer_unused_without_base_value() {
        let service = service(AttributionStrategy::ScaledImpact, 5)
            .with_renderer(Arc::new(FixedRenderer(Ok(b"<svg/>".to_vec()))));
        let result = service.predict(&abc_input()).expect("Should predict");
        assert!(result.waterfall.is_none());
    }

    #[test]
    fn test_attribution_unavailable_for_logistic_model() {
        let source = abc_source().with(
            ArtifactKind::Model,
            serde_json::json!({"kind": "logistic", "coefficients": [0.5, -0.5], "intercept": 0.0}),
        );
        let bundle = Arc::new(ArtifactBundle::load(&source).expect("Bundle should load"));

        for strategy in AttributionStrategy::ALL {
            let service = PredictionService::new(Arc::clone(&bundle), attributor_for(strategy), 5);
            let err = service.predict(&abc_input()).expect_err("must fail");
            assert!(matches!(err, PredictionError::AttributionUnavailable(_)));
        }
    }

    #[test]
    fn test_health() {
        let health = service(AttributionStrategy::ScaledImpact, 5).health();
        assert_eq!(health.status, "healthy");
    }
}
