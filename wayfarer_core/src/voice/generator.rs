use std::future::Future;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioGenerationError {
    #[error("audio generation request failed: {0}")]
    Request(String),

    #[error("audio generation was cancelled")]
    Cancelled,

    #[error("audio generation timed out")]
    Timeout,

    #[error("expected {expected} audio urls, got {actual}")]
    Mismatch { expected: usize, actual: usize },
}

/// Text-to-speech service turning instruction texts into playable audio URLs.
pub trait AudioGenerator: Send + Sync + 'static {
    /// Generates audio for every text. The result is aligned with `texts`;
    /// `None` marks a text the service failed to render.
    fn generate_batch(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Option<String>>, AudioGenerationError>> + Send;

    fn generate(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<Option<String>, AudioGenerationError>> + Send;

    /// Best-effort cancellation of every outstanding batch request. Phrases
    /// requested through [`AudioGenerator::generate`] are not affected.
    fn cancel_all(&self);
}
