use std::future::Future;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info};
use wayfarer_core::voice::generator::{AudioGenerationError, AudioGenerator};

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("Invalid audio url {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Request cancelled")]
    Cancelled,
}

impl From<SpeechError> for AudioGenerationError {
    fn from(err: SpeechError) -> Self {
        match err {
            SpeechError::Cancelled => AudioGenerationError::Cancelled,
            other => AudioGenerationError::Request(other.to_string()),
        }
    }
}

pub struct SpeechClientParams {
    /// Base URL of the speech service, also used to resolve relative audio urls
    pub speech_url: String,
}

pub const SPEECH_AUDIOGEN_API_PATH: &str = "/api/audiogen";

#[derive(Serialize)]
struct AudioGenRequestBody<'a> {
    texts: &'a [String],
}

#[derive(Deserialize)]
struct AudioGenResponse {
    audio_urls: Vec<Option<String>>,
}

#[derive(Deserialize)]
struct AudioGenErrorResponse {
    error: String,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum RequestScope {
    /// Instruction batches, abandoned by [`SpeechClient::cancel_all`]
    Batch,
    /// One-off phrases, always awaited
    Phrase,
}

/// Client of the batch text-to-speech API.
///
/// [`SpeechClient::cancel_all`] abandons every batch in flight: callers get
/// [`SpeechError::Cancelled`] while the service may still finish the work.
pub struct SpeechClient {
    params: SpeechClientParams,
    client: reqwest::Client,
    cancel: watch::Sender<u64>,
}

impl SpeechClient {
    pub fn new(params: SpeechClientParams) -> Self {
        Self {
            params,
            client: reqwest::Client::new(),
            cancel: watch::Sender::new(0),
        }
    }

    /// Returns one audio url per text, in order. `None` marks texts the
    /// service could not render.
    pub async fn generate_audio(
        &self,
        texts: &[String],
    ) -> Result<Vec<Option<String>>, SpeechError> {
        self.scoped(RequestScope::Batch, self.request_audio(texts)).await
    }

    /// Generates a single phrase. Not affected by [`SpeechClient::cancel_all`].
    pub async fn generate_phrase(&self, text: &str) -> Result<Option<String>, SpeechError> {
        let texts = [text.to_string()];
        let urls = self
            .scoped(RequestScope::Phrase, self.request_audio(&texts))
            .await?;

        Ok(urls.into_iter().next().flatten())
    }

    pub fn cancel_all(&self) {
        self.cancel.send_modify(|epoch| *epoch += 1);
        debug!("SpeechClient: Cancelled batches in flight");
    }

    async fn request_audio(&self, texts: &[String]) -> Result<Vec<Option<String>>, SpeechError> {
        let mut url = self.params.speech_url.trim_end_matches('/').to_string();
        url.push_str(SPEECH_AUDIOGEN_API_PATH);

        let words: usize = texts.iter().map(|text| text.split(' ').count()).sum();
        info!(texts = texts.len(), words, "SpeechClient: Requesting audio");

        let response = self
            .client
            .post(url)
            .json(&AudioGenRequestBody { texts })
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            let message = match serde_json::from_slice::<AudioGenErrorResponse>(&bytes) {
                Ok(error) => error.error,
                Err(_) => String::from_utf8_lossy(&bytes).into_owned(),
            };
            return Err(SpeechError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let response: AudioGenResponse = serde_json::from_slice(&bytes)?;
        resolve_urls(&self.params.speech_url, response.audio_urls)
    }

    async fn scoped<T, F>(&self, scope: RequestScope, future: F) -> Result<T, SpeechError>
    where
        F: Future<Output = Result<T, SpeechError>>,
    {
        match scope {
            RequestScope::Batch => self.with_cancel(future).await,
            RequestScope::Phrase => future.await,
        }
    }

    /// Races `future` against the next call to [`SpeechClient::cancel_all`].
    async fn with_cancel<T, F>(&self, future: F) -> Result<T, SpeechError>
    where
        F: Future<Output = Result<T, SpeechError>>,
    {
        let mut cancelled = self.cancel.subscribe();
        let epoch = *cancelled.borrow_and_update();

        tokio::select! {
            result = future => result,
            _ = cancelled.wait_for(|current| *current != epoch) => Err(SpeechError::Cancelled),
        }
    }
}

/// Resolves service relative urls (`/audio/123.wav`) against the base url.
fn resolve_urls(
    base_url: &str,
    urls: Vec<Option<String>>,
) -> Result<Vec<Option<String>>, SpeechError> {
    let base = Url::parse(base_url).map_err(|err| SpeechError::InvalidUrl {
        url: base_url.to_string(),
        message: err.to_string(),
    })?;

    urls.into_iter()
        .map(|url| {
            url.map(|url| {
                base.join(&url)
                    .map(String::from)
                    .map_err(|err| SpeechError::InvalidUrl {
                        url,
                        message: err.to_string(),
                    })
            })
            .transpose()
        })
        .collect()
}

impl AudioGenerator for SpeechClient {
    async fn generate_batch(
        &self,
        texts: &[String],
    ) -> Result<Vec<Option<String>>, AudioGenerationError> {
        Ok(self.generate_audio(texts).await?)
    }

    async fn generate(&self, text: &str) -> Result<Option<String>, AudioGenerationError> {
        Ok(self.generate_phrase(text).await?)
    }

    fn cancel_all(&self) {
        SpeechClient::cancel_all(self);
    }
}
