use std::sync::Arc;

use tokio::{
    sync::{mpsc, watch},
    task::AbortHandle,
    time::MissedTickBehavior,
};
use tracing::{debug, info, warn};

use crate::{
    error::GuidanceError,
    geometry::GeoPoint,
    position::PositionSample,
    route::Route,
    routing::{RouteRequest, RoutingError, RoutingService},
    voice::{
        generator::AudioGenerator,
        pipeline::{AudioRequest, ResolvedCue, VoiceCuePipeline},
        playback::{AudioPlayer, PlaybackEvent, PlaybackQueue},
    },
};

use super::{
    guidance_params::GuidanceParams,
    session::{GuidanceEvent, GuidanceSession},
    surface::GuidanceSurface,
};

#[derive(Debug)]
enum Command {
    SetDestination(GeoPoint),
    ClearDestination,
    Shutdown,
}

/// Results of background work, delivered back to the scheduler loop.
enum Completion {
    Route {
        generation: u64,
        result: Result<Route, RoutingError>,
    },
    Cues {
        generation: u64,
        cues: Vec<ResolvedCue>,
    },
}

/// Cloneable entry point used by the position source and the user interface.
#[derive(Clone)]
pub struct GuidanceHandle {
    commands: mpsc::UnboundedSender<Command>,
    positions: Arc<watch::Sender<Option<PositionSample>>>,
}

impl GuidanceHandle {
    /// Publishes the latest position. Older samples that were not consumed
    /// yet are overwritten.
    pub fn update_position(&self, sample: PositionSample) -> Result<(), GuidanceError> {
        self.positions
            .send(Some(sample))
            .map_err(|_| GuidanceError::SchedulerStopped)
    }

    pub fn set_destination(&self, destination: GeoPoint) -> Result<(), GuidanceError> {
        self.send(Command::SetDestination(destination))
    }

    pub fn clear_destination(&self) -> Result<(), GuidanceError> {
        self.send(Command::ClearDestination)
    }

    pub fn shutdown(&self) -> Result<(), GuidanceError> {
        self.send(Command::Shutdown)
    }

    fn send(&self, command: Command) -> Result<(), GuidanceError> {
        self.commands
            .send(command)
            .map_err(|_| GuidanceError::SchedulerStopped)
    }
}

/// Drives a [`GuidanceSession`] on a fixed tick and performs the work its
/// events ask for: route requests, audio generation, playback and display.
///
/// All session mutations happen on the scheduler loop; background tasks only
/// report back through the completion channel.
pub struct GuidanceScheduler<R, G, P, S> {
    params: GuidanceParams,
    session: GuidanceSession,

    routing: Arc<R>,
    voice: VoiceCuePipeline<G>,
    player: Arc<P>,
    surface: S,

    commands: mpsc::UnboundedReceiver<Command>,
    positions: watch::Receiver<Option<PositionSample>>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,

    /// Cue preparation of the route with the given generation
    prepare_task: Option<(u64, AbortHandle)>,
}

impl<R, G, P, S> GuidanceScheduler<R, G, P, S>
where
    R: RoutingService,
    G: AudioGenerator,
    P: AudioPlayer,
    S: GuidanceSurface,
{
    pub fn new(
        params: GuidanceParams,
        routing: Arc<R>,
        generator: Arc<G>,
        player: Arc<P>,
        surface: S,
    ) -> (Self, GuidanceHandle) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (positions_tx, positions_rx) = watch::channel(None);
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        let scheduler = GuidanceScheduler {
            session: GuidanceSession::new(params.clone()),
            voice: VoiceCuePipeline::new(generator, params.audio_timeout),
            params,
            routing,
            player,
            surface,
            commands: commands_rx,
            positions: positions_rx,
            completions_tx,
            completions_rx,
            prepare_task: None,
        };

        let handle = GuidanceHandle {
            commands: commands_tx,
            positions: Arc::new(positions_tx),
        };

        (scheduler, handle)
    }

    /// Runs until [`GuidanceHandle::shutdown`] is called or every handle is
    /// dropped.
    pub async fn run(mut self) {
        let (playback_tx, mut playback_rx) = mpsc::unbounded_channel();
        let (playback, worker) =
            PlaybackQueue::spawn(Arc::clone(&self.player), self.params.cue_gap, playback_tx);

        let mut interval = tokio::time::interval(self.params.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(tick = ?self.params.tick_interval, "Guidance scheduler started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let events = self.session.tick();
                    self.dispatch(events, &playback);
                }
                changed = self.positions.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.absorb_position();
                }
                command = self.commands.recv() => {
                    match command {
                        Some(Command::SetDestination(destination)) => {
                            // A sample published right before the command must count
                            if self.positions.has_changed().unwrap_or(false) {
                                self.absorb_position();
                            }
                            match self.session.set_destination(destination) {
                                Ok(events) => self.dispatch(events, &playback),
                                Err(err) => self.surface.alert(&format!("Error: {err}")),
                            }
                        }
                        Some(Command::ClearDestination) => {
                            self.cancel_cues(&playback);
                            let events = self.session.clear_destination();
                            self.dispatch(events, &playback);
                        }
                        Some(Command::Shutdown) | None => break,
                    }
                }
                Some(completion) = self.completions_rx.recv() => {
                    self.complete(completion, &playback);
                }
                Some(event) = playback_rx.recv() => self.playback_finished(event),
            }
        }

        self.cancel_cues(&playback);
        worker.abort();
        info!("Guidance scheduler stopped");
    }

    fn absorb_position(&mut self) {
        let sample = *self.positions.borrow_and_update();
        if let Some(sample) = sample {
            self.session.update_position(sample);
        }
    }

    fn playback_finished(&mut self, event: PlaybackEvent) {
        match event {
            PlaybackEvent::Finished {
                target: Some(target),
            } => self.session.cue_played(&target),
            PlaybackEvent::Failed {
                target: Some(target),
            } => {
                warn!(
                    maneuver = target.maneuver,
                    kind = %target.kind,
                    "Cue playback failed"
                );
            }
            PlaybackEvent::Finished { target: None } | PlaybackEvent::Failed { target: None } => {}
        }
    }

    fn complete(&mut self, completion: Completion, playback: &PlaybackQueue) {
        match completion {
            Completion::Route { generation, result } => {
                let events = match result {
                    Ok(route) => self.session.route_resolved(generation, route),
                    Err(err) => self.session.route_failed(generation, &err),
                };
                self.dispatch(events, playback);
            }
            Completion::Cues { generation, cues } => {
                if self
                    .prepare_task
                    .as_ref()
                    .is_some_and(|(current, _)| *current == generation)
                {
                    self.prepare_task = None;
                }
                self.session.cue_audio_resolved(cues);
            }
        }
    }

    fn dispatch(&mut self, events: Vec<GuidanceEvent>, playback: &PlaybackQueue) {
        for event in events {
            match event {
                GuidanceEvent::RequestRoute(request) => self.request_route(request),
                GuidanceEvent::PrepareCues {
                    generation,
                    requests,
                } => self.prepare_cues(generation, requests, playback),
                GuidanceEvent::PlayCue { target, clip } => playback.enqueue(clip, Some(target)),
                GuidanceEvent::Announce(phrase) => self.announce(phrase, playback),
                GuidanceEvent::RouteInstalled(route) => self.surface.show_route(&route),
                GuidanceEvent::Matched(matched) => self.surface.show_match(&matched),
                GuidanceEvent::Instruction(text) => self.surface.show_instruction(&text),
                GuidanceEvent::Progress(report) => {
                    self.surface.show_progress(&report.to_string())
                }
                GuidanceEvent::Alert(message) => self.surface.alert(&message),
                GuidanceEvent::StateChanged(state) => self.surface.show_state(state),
            }
        }
    }

    fn request_route(&self, request: RouteRequest) {
        let routing = Arc::clone(&self.routing);
        let completions = self.completions_tx.clone();
        let timeout = self.params.route_timeout;

        debug!(generation = request.generation, "Requesting route");
        tokio::spawn(async move {
            let result = tokio::time::timeout(timeout, routing.route(&request))
                .await
                .unwrap_or(Err(RoutingError::Timeout));

            // The scheduler may have stopped in the meantime
            let _ = completions.send(Completion::Route {
                generation: request.generation,
                result,
            });
        });
    }

    fn prepare_cues(
        &mut self,
        generation: u64,
        requests: Vec<AudioRequest>,
        playback: &PlaybackQueue,
    ) {
        self.cancel_cues(playback);

        debug!(generation, cues = requests.len(), "Preparing cue audio");
        let voice = self.voice.clone();
        let completions = self.completions_tx.clone();
        let task = tokio::spawn(async move {
            let cues = voice.prepare(requests).await;
            let _ = completions.send(Completion::Cues { generation, cues });
        });

        self.prepare_task = Some((generation, task.abort_handle()));
    }

    /// Drops everything belonging to the previous route: pending generation
    /// batches and queued cues. Phrases being generated are left alone.
    fn cancel_cues(&mut self, playback: &PlaybackQueue) {
        if let Some((generation, task)) = self.prepare_task.take() {
            debug!(generation, "Aborting cue preparation");
            task.abort();
        }
        self.voice.cancel_batches();

        let dropped = playback.clear_cues();
        if dropped > 0 {
            debug!(dropped, remaining = playback.len(), "Dropped queued cues");
        }
    }

    fn announce(&self, phrase: String, playback: &PlaybackQueue) {
        let voice = self.voice.clone();
        let playback = playback.clone();

        tokio::spawn(async move {
            if let Some(clip) = voice.phrase(&phrase).await {
                playback.enqueue_urgent(clip);
            }
        });
    }
}
