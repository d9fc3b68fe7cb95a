//! Per-request error taxonomy.
//!
//! Every failure inside the prediction pipeline is one of these variants. They
//! are permanent for the request that raised them (bad input or a broken
//! artifact) and are translated to a wire response once, at the HTTP boundary.

use serde::Serialize;

/// Errors raised while running the prediction pipeline for one request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictionError {
    #[error("Missing feature: {0}")]
    MissingFeature(String),

    #[error("Invalid value for feature {feature}: {reason}")]
    InvalidFeatureValue { feature: String, reason: String },

    #[error("Dimension mismatch: model expects {expected} values, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Attribution unavailable: {0}")]
    AttributionUnavailable(String),
}

/// Stable error kind reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    MissingFeature,
    InvalidFeatureValue,
    DimensionMismatch,
    AttributionUnavailable,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingFeature => "MissingFeature",
            Self::InvalidFeatureValue => "InvalidFeatureValue",
            Self::DimensionMismatch => "DimensionMismatch",
            Self::AttributionUnavailable => "AttributionUnavailable",
        }
    }
}

impl PredictionError {
    /// The stable kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingFeature(_) => ErrorKind::MissingFeature,
            Self::InvalidFeatureValue { .. } => ErrorKind::InvalidFeatureValue,
            Self::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            Self::AttributionUnavailable(_) => ErrorKind::AttributionUnavailable,
        }
    }

    /// Variant payload without the message prefix.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::MissingFeature(name) => name.clone(),
            Self::InvalidFeatureValue { feature, reason } => format!("{feature}: {reason}"),
            Self::DimensionMismatch { expected, got } => format!("expected {expected}, got {got}"),
            Self::AttributionUnavailable(reason) => reason.clone(),
        }
    }

    /// Whether the caller sent a request that can never succeed as written.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingFeature(_) | Self::InvalidFeatureValue { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_feature_message_names_feature() {
        let err = PredictionError::MissingFeature("BMI".into());
        assert_eq!(err.to_string(), "Missing feature: BMI");
        assert_eq!(err.kind(), ErrorKind::MissingFeature);
        assert_eq!(err.detail(), "BMI");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_artifact_side_errors_are_not_client_errors() {
        let mismatch = PredictionError::DimensionMismatch {
            expected: 15,
            got: 14,
        };
        assert!(!mismatch.is_client_error());
        assert_eq!(mismatch.detail(), "expected 15, got 14");

        let unavailable = PredictionError::AttributionUnavailable("no importances".into());
        assert_eq!(unavailable.kind(), ErrorKind::AttributionUnavailable);
    }
}
