//! Artifact identities and load failures.

use std::path::PathBuf;

/// One of the serialized objects exported by the training job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Model,
    Scaler,
    Selector,
    SelectedFeatures,
    FeatureNames,
}

impl ArtifactKind {
    /// Order in which a bundle is loaded; the first failure is the one reported.
    pub const LOAD_ORDER: [ArtifactKind; 5] = [
        Self::Model,
        Self::Scaler,
        Self::Selector,
        Self::SelectedFeatures,
        Self::FeatureNames,
    ];

    /// Logical artifact name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Scaler => "scaler",
            Self::Selector => "selector",
            Self::SelectedFeatures => "selected_features",
            Self::FeatureNames => "feature_names",
        }
    }

    /// File name inside a bundle directory.
    #[must_use]
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Model => "model.json",
            Self::Scaler => "scaler.json",
            Self::Selector => "selector.json",
            Self::SelectedFeatures => "selected_features.json",
            Self::FeatureNames => "feature_names.json",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Startup failure while loading the artifact bundle.
///
/// Any of these prevents the process from serving traffic.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("artifact '{artifact}' not found at {path:?}")]
    Missing { artifact: ArtifactKind, path: PathBuf },

    #[error("artifact '{artifact}' could not be read: {source}")]
    Unreadable {
        artifact: ArtifactKind,
        #[source]
        source: std::io::Error,
    },

    #[error("artifact '{artifact}' failed to deserialize: {source}")]
    Malformed {
        artifact: ArtifactKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("artifact '{artifact}' is inconsistent: {detail}")]
    Inconsistent { artifact: ArtifactKind, detail: String },

    #[error("artifact '{artifact}' does not match the signed manifest")]
    Tampered { artifact: ArtifactKind },

    #[error("bundle integrity check failed: {0}")]
    Integrity(String),
}

impl ArtifactError {
    /// The artifact this failure is attributed to, if any.
    #[must_use]
    pub fn artifact(&self) -> Option<ArtifactKind> {
        match self {
            Self::Missing { artifact, .. }
            | Self::Unreadable { artifact, .. }
            | Self::Malformed { artifact, .. }
            | Self::Inconsistent { artifact, .. }
            | Self::Tampered { artifact } => Some(*artifact),
            Self::Integrity(_) => None,
        }
    }

    pub(crate) fn inconsistent(artifact: ArtifactKind, detail: impl Into<String>) -> Self {
        Self::Inconsistent {
            artifact,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names_are_distinct() {
        let mut names: Vec<_> = ArtifactKind::LOAD_ORDER.iter().map(|k| k.file_name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ArtifactKind::LOAD_ORDER.len());
    }

    #[test]
    fn test_error_names_artifact() {
        let err = ArtifactError::Missing {
            artifact: ArtifactKind::Scaler,
            path: PathBuf::from("ml_model/scaler.json"),
        };
        assert_eq!(err.artifact(), Some(ArtifactKind::Scaler));
        assert!(err.to_string().contains("'scaler'"));
        assert_eq!(ArtifactError::Integrity("x".into()).artifact(), None);
    }
}
