use std::time::Duration;

use parking_lot::Mutex;
use tracing::{info, warn};
use wayfarer_core::{
    guidance::{session::TripState, surface::GuidanceSurface},
    route::Route,
    voice::{
        audio_clip::AudioClip,
        playback::{AudioPlayer, PlaybackError},
    },
};

/// Surface writing guidance to the log.
#[derive(Default)]
pub struct ConsoleSurface {
    last_instruction: Mutex<Option<String>>,
}

impl GuidanceSurface for ConsoleSurface {
    fn show_instruction(&self, text: &str) {
        let mut last = self.last_instruction.lock();
        if last.as_deref() != Some(text) {
            info!("{text}");
            *last = Some(text.to_string());
        }
    }

    fn show_progress(&self, line: &str) {
        info!("{line}");
    }

    fn alert(&self, message: &str) {
        warn!("{message}");
    }

    fn show_route(&self, route: &Route) {
        info!(
            maneuvers = route.maneuver_count(),
            "New route: {:.1} {}, {:.1} mins",
            route.summary().length,
            route.units().abbreviation(),
            route.summary().time / 60.0
        );
    }

    fn show_state(&self, state: TripState) {
        info!(%state, "Trip state");
    }
}

/// Stands in for a speaker: logs each clip and takes `clip_duration` to "play" it.
pub struct ConsolePlayer {
    clip_duration: Duration,
}

impl ConsolePlayer {
    pub fn new(clip_duration: Duration) -> Self {
        ConsolePlayer { clip_duration }
    }
}

impl AudioPlayer for ConsolePlayer {
    async fn play(&self, clip: &AudioClip) -> Result<(), PlaybackError> {
        info!(source = clip.source(), "Speaking");
        tokio::time::sleep(self.clip_duration).await;
        Ok(())
    }
}
