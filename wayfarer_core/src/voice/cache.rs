use std::sync::Arc;

use fxhash::FxHashMap;

use super::audio_clip::AudioClip;

/// Generated audio keyed by the exact instruction text.
///
/// Entries are never invalidated: the same text is assumed to always produce
/// acceptable audio, so the cache lives as long as the process.
#[derive(Debug, Default)]
pub struct AudioCache {
    entries: FxHashMap<String, Arc<str>>,
}

impl AudioCache {
    pub fn new() -> Self {
        AudioCache::default()
    }

    /// A fresh clip bound to the cached source of `text`.
    pub fn get(&self, text: &str) -> Option<AudioClip> {
        self.entries
            .get(text)
            .map(|source| AudioClip::new(Arc::clone(source)))
    }

    pub fn insert(&mut self, text: String, clip: &AudioClip) {
        self.entries.insert(text, clip.shared_source());
    }

    #[cfg(test)]
    pub fn contains(&self, text: &str) -> bool {
        self.entries.contains_key(text)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_returns_fresh_clip_with_same_source() {
        let mut cache = AudioCache::new();
        cache.insert("Turn left".to_string(), &AudioClip::new("/audio/1.wav"));

        let first = cache.get("Turn left").unwrap();
        let second = cache.get("Turn left").unwrap();

        assert_eq!(first.source(), "/audio/1.wav");
        assert_eq!(first, second);
        assert!(cache.get("turn left").is_none());
        assert_eq!(cache.len(), 1);
    }
}
