use std::sync::Arc;

/// A playable handle on generated speech.
///
/// Every cue gets its own clip, even when several cues share the same source:
/// players may keep per-handle state (position, loaded buffers) that must not
/// leak between cues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    source: Arc<str>,
}

impl AudioClip {
    pub fn new(source: impl Into<Arc<str>>) -> Self {
        AudioClip {
            source: source.into(),
        }
    }

    /// URL of the audio this clip plays
    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn shared_source(&self) -> Arc<str> {
        Arc::clone(&self.source)
    }
}
