//! Explanation renderer port: auxiliary images for the report assembler.

use crate::domain::Attribution;

/// Error type for rendering.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("attribution has no base value to anchor a waterfall")]
    MissingBaseValue,

    #[error("drawing failed: {0}")]
    Drawing(String),
}

/// Renders an additive attribution as an image.
pub trait ExplanationRenderer: Send + Sync {
    /// Media type of the produced bytes.
    fn content_type(&self) -> &'static str;

    /// Waterfall from the base value to the model output.
    ///
    /// # Errors
    /// Returns `RenderError` if the attribution is not additive or drawing fails.
    fn render_waterfall(&self, attribution: &Attribution) -> Result<Vec<u8>, RenderError>;
}
