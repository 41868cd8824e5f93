use std::{sync::Arc, time::Duration};

use fxhash::FxHashMap;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::route::{CueKind, ManeuverIdx};

use super::{
    audio_clip::AudioClip,
    cache::AudioCache,
    generator::{AudioGenerationError, AudioGenerator},
};

/// The cue slot an audio request fills once resolved.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct CueTarget {
    /// Generation of the route the maneuver belongs to
    pub generation: u64,
    pub maneuver: ManeuverIdx,
    pub kind: CueKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioRequest {
    pub text: String,
    pub target: CueTarget,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCue {
    pub target: CueTarget,
    pub clip: AudioClip,
}

/// Turns instruction texts into audio clips, generating each distinct text
/// at most once per process.
pub struct VoiceCuePipeline<G> {
    generator: Arc<G>,
    cache: Arc<Mutex<AudioCache>>,
    timeout: Duration,
}

impl<G> Clone for VoiceCuePipeline<G> {
    fn clone(&self) -> Self {
        VoiceCuePipeline {
            generator: Arc::clone(&self.generator),
            cache: Arc::clone(&self.cache),
            timeout: self.timeout,
        }
    }
}

impl<G> VoiceCuePipeline<G>
where
    G: AudioGenerator,
{
    pub fn new(generator: Arc<G>, timeout: Duration) -> Self {
        VoiceCuePipeline {
            generator,
            cache: Arc::new(Mutex::new(AudioCache::new())),
            timeout,
        }
    }

    pub fn cache(&self) -> &Arc<Mutex<AudioCache>> {
        &self.cache
    }

    /// Resolves a batch of cue requests.
    ///
    /// Cached texts resolve immediately. The remaining distinct texts go to the
    /// generator in a single request and each result is fanned out to every
    /// cue that asked for it. Texts the generator failed on are left out of
    /// the result.
    pub async fn prepare(&self, requests: Vec<AudioRequest>) -> Vec<ResolvedCue> {
        let mut resolved = Vec::with_capacity(requests.len());
        let mut unique_texts: Vec<String> = Vec::new();
        let mut waiting: FxHashMap<String, Vec<CueTarget>> = FxHashMap::default();

        {
            let cache = self.cache.lock();
            for request in requests {
                if let Some(clip) = cache.get(&request.text) {
                    resolved.push(ResolvedCue {
                        target: request.target,
                        clip,
                    });
                    continue;
                }

                waiting
                    .entry(request.text)
                    .or_insert_with_key(|text| {
                        unique_texts.push(text.clone());
                        Vec::new()
                    })
                    .push(request.target);
            }
        }

        if unique_texts.is_empty() {
            debug!(cached = resolved.len(), "All cue texts were cached");
            return resolved;
        }

        let total_words: usize = unique_texts
            .iter()
            .map(|text| text.split_whitespace().count())
            .sum();
        info!(
            texts = unique_texts.len(),
            words = total_words,
            cached = resolved.len(),
            "Generating cue audio"
        );

        let urls = match self.generate_batch(&unique_texts).await {
            Ok(urls) => urls,
            Err(err) => {
                error!("Failed to generate audio for {} texts: {err}", unique_texts.len());
                return resolved;
            }
        };

        let mut cache = self.cache.lock();
        for (text, url) in unique_texts.into_iter().zip(urls) {
            let Some(url) = url else {
                warn!(text, "Audio generation failed");
                continue;
            };

            let clip = AudioClip::new(url);
            for target in waiting.remove(&text).unwrap_or_default() {
                resolved.push(ResolvedCue {
                    target,
                    clip: AudioClip::new(clip.shared_source()),
                });
            }
            cache.insert(text, &clip);
        }
        debug!(cached = cache.len(), "Audio cache updated");

        resolved
    }

    /// Generates a one-off phrase, bypassing the cache.
    pub async fn phrase(&self, text: &str) -> Option<AudioClip> {
        let result = tokio::time::timeout(self.timeout, self.generator.generate(text)).await;

        match result {
            Ok(Ok(Some(url))) => Some(AudioClip::new(url)),
            Ok(Ok(None)) => {
                warn!(text, "Audio generation failed for phrase");
                None
            }
            Ok(Err(err)) => {
                error!(text, "Failed to generate phrase: {err}");
                None
            }
            Err(_) => {
                error!(text, "Phrase generation timed out");
                None
            }
        }
    }

    /// Abandons cue batches in flight. One-off phrases keep going.
    pub fn cancel_batches(&self) {
        self.generator.cancel_all();
    }

    async fn generate_batch(
        &self,
        texts: &[String],
    ) -> Result<Vec<Option<String>>, AudioGenerationError> {
        let urls = tokio::time::timeout(self.timeout, self.generator.generate_batch(texts))
            .await
            .map_err(|_| AudioGenerationError::Timeout)??;

        if urls.len() != texts.len() {
            return Err(AudioGenerationError::Mismatch {
                expected: texts.len(),
                actual: urls.len(),
            });
        }

        Ok(urls)
    }
}
