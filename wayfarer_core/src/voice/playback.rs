use std::{collections::VecDeque, future::Future, sync::Arc, time::Duration};

use parking_lot::Mutex;
use thiserror::Error;
use tokio::{
    sync::{Notify, mpsc},
    task::JoinHandle,
};
use tracing::{debug, warn};

use super::{audio_clip::AudioClip, pipeline::CueTarget};

#[derive(Debug, Error)]
#[error("failed to play {source_url}: {message}")]
pub struct PlaybackError {
    pub source_url: String,
    pub message: String,
}

/// Audio output. `play` resolves once the clip has finished playing.
pub trait AudioPlayer: Send + Sync + 'static {
    fn play(&self, clip: &AudioClip) -> impl Future<Output = Result<(), PlaybackError>> + Send;
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// A clip finished playing. `target` is set for route cues.
    Finished { target: Option<CueTarget> },
    Failed { target: Option<CueTarget> },
}

#[derive(Debug, Clone)]
struct PlaybackItem {
    clip: AudioClip,
    target: Option<CueTarget>,
    urgent: bool,
}

#[derive(Default)]
struct Shared {
    queue: Mutex<VecDeque<PlaybackItem>>,
    notify: Notify,
}

/// FIFO of clips played strictly one after the other.
///
/// A fixed gap separates consecutive clips; urgent clips jump the queue and
/// start without waiting for the gap.
#[derive(Clone)]
pub struct PlaybackQueue {
    shared: Arc<Shared>,
}

impl PlaybackQueue {
    /// Starts the playback worker on the current runtime.
    pub fn spawn<P>(
        player: Arc<P>,
        gap: Duration,
        events: mpsc::UnboundedSender<PlaybackEvent>,
    ) -> (PlaybackQueue, JoinHandle<()>)
    where
        P: AudioPlayer,
    {
        let shared = Arc::new(Shared::default());
        let worker = tokio::spawn(run_worker(Arc::clone(&shared), player, gap, events));

        (PlaybackQueue { shared }, worker)
    }

    pub fn enqueue(&self, clip: AudioClip, target: Option<CueTarget>) {
        self.shared.queue.lock().push_back(PlaybackItem {
            clip,
            target,
            urgent: false,
        });
        self.shared.notify.notify_one();
    }

    pub fn enqueue_urgent(&self, clip: AudioClip) {
        self.shared.queue.lock().push_front(PlaybackItem {
            clip,
            target: None,
            urgent: true,
        });
        self.shared.notify.notify_one();
    }

    /// Drops every queued route cue. Urgent phrases stay queued.
    pub fn clear_cues(&self) -> usize {
        let mut queue = self.shared.queue.lock();
        let before = queue.len();
        queue.retain(|item| item.urgent);
        before - queue.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.shared.queue.lock().len()
    }
}

async fn next_item(shared: &Shared) -> PlaybackItem {
    loop {
        let item = shared.queue.lock().pop_front();
        if let Some(item) = item {
            return item;
        }
        shared.notify.notified().await;
    }
}

async fn run_worker<P>(
    shared: Arc<Shared>,
    player: Arc<P>,
    gap: Duration,
    events: mpsc::UnboundedSender<PlaybackEvent>,
) where
    P: AudioPlayer,
{
    loop {
        let item = next_item(&shared).await;
        debug!(source = item.clip.source(), urgent = item.urgent, "Playing clip");

        let event = match player.play(&item.clip).await {
            Ok(()) => PlaybackEvent::Finished {
                target: item.target,
            },
            Err(err) => {
                warn!("{err}");
                PlaybackEvent::Failed {
                    target: item.target,
                }
            }
        };

        if events.send(event).is_err() {
            debug!("Playback listener gone, stopping worker");
            return;
        }

        let next_is_regular = shared
            .queue
            .lock()
            .front()
            .is_some_and(|next| !next.urgent);
        if next_is_regular {
            tokio::time::sleep(gap).await;
        }
    }
}
