//! Artifact source port: where the serialized training outputs come from.

use crate::domain::{ArtifactError, ArtifactKind};

/// Read access to the serialized artifacts of one bundle.
pub trait ArtifactSource: Send + Sync {
    /// Raw bytes of one artifact.
    ///
    /// # Errors
    /// Returns `ArtifactError::Missing` when the artifact does not exist, or
    /// another `ArtifactError` when it cannot be read or fails verification.
    fn read(&self, artifact: ArtifactKind) -> Result<Vec<u8>, ArtifactError>;

    /// Where the bundle lives, for logs.
    fn describe(&self) -> String;
}
