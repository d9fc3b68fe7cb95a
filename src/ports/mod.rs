//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the pipeline and its collaborators: the fitted classifier, the
//! attribution strategy, the artifact store and the explanation renderer.

mod artifact_source;
mod attributor;
mod classifier;
mod renderer;

pub use artifact_source::ArtifactSource;
pub use attributor::Attributor;
pub use classifier::Classifier;
pub use renderer::{ExplanationRenderer, RenderError};
