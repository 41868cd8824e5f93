use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use jiff::Timestamp;
use parking_lot::Mutex;
use tokio::{sync::watch, time::Instant};

use crate::{
    geometry::{EARTH_RADIUS, GeoPoint, polyline_length},
    guidance::{session::TripState, surface::GuidanceSurface},
    position::PositionSample,
    route::{CueKind, CueSlot, DistanceUnit, Leg, Maneuver, Route, TripSummary},
    routing::{RouteRequest, RoutingError, RoutingService},
    voice::{
        audio_clip::AudioClip,
        generator::{AudioGenerationError, AudioGenerator},
        playback::{AudioPlayer, PlaybackError},
    },
};

const SEGMENTS_PER_MANEUVER: usize = 4;

/// Seconds per mile at 30 mph
const SECONDS_PER_MILE: f64 = 120.0;

pub fn test_maneuver(begin: usize, end: usize, length: f64) -> Maneuver {
    Maneuver {
        begin_shape_index: begin,
        end_shape_index: end,
        length,
        time: length * SECONDS_PER_MILE,
        instruction: None,
        verbal_pre_transition: None,
        verbal_post_transition: None,
    }
}

/// Route heading east along the equator, one maneuver per entry of `lengths`
/// (in miles), each made of four equal segments.
pub fn straight_route(lengths: &[f64]) -> Route {
    let degrees_per_meter = 1.0 / EARTH_RADIUS.to_radians();

    let mut shape = vec![GeoPoint::new(0.0, 0.0)];
    let mut maneuvers = Vec::with_capacity(lengths.len());
    let mut lng = 0.0;

    for (index, &length) in lengths.iter().enumerate() {
        let step = DistanceUnit::Miles.to_meters(length) / SEGMENTS_PER_MANEUVER as f64
            * degrees_per_meter;
        for _ in 0..SEGMENTS_PER_MANEUVER {
            lng += step;
            shape.push(GeoPoint::new(0.0, lng));
        }

        let begin = index * SEGMENTS_PER_MANEUVER;
        let mut maneuver = test_maneuver(begin, begin + SEGMENTS_PER_MANEUVER, length);
        maneuver.instruction = Some(CueSlot::new(format!("Instruction {index}")));
        maneuver.verbal_pre_transition = Some(CueSlot::new(format!("Pre {index}")));
        maneuver.verbal_post_transition = Some(CueSlot::new(format!("Post {index}")));
        maneuvers.push(maneuver);
    }

    let summary = TripSummary {
        length: lengths.iter().sum(),
        time: lengths.iter().sum::<f64>() * SECONDS_PER_MILE,
    };

    Route::new(
        shape,
        vec![Leg { maneuvers, summary }],
        summary,
        DistanceUnit::Miles,
    )
    .unwrap()
}

/// Single maneuver route over an arbitrary shape.
pub fn route_from_shape(shape: Vec<GeoPoint>, units: DistanceUnit) -> Route {
    let length = units.from_meters(polyline_length(&shape));
    let maneuver = test_maneuver(0, shape.len() - 1, length);
    let summary = TripSummary {
        length,
        time: maneuver.time,
    };

    Route::new(
        shape,
        vec![Leg {
            maneuvers: vec![maneuver],
            summary,
        }],
        summary,
        units,
    )
    .unwrap()
}

/// Point at `t` along the given shape segment.
pub fn point_along(route: &Route, segment: usize, t: f64) -> GeoPoint {
    let start = route.shape()[segment];
    let end = route.shape()[segment + 1];

    GeoPoint::new(
        start.lat + (end.lat - start.lat) * t,
        start.lng + (end.lng - start.lng) * t,
    )
}

pub fn sample_at(point: GeoPoint, accuracy: f64) -> PositionSample {
    PositionSample::new(point.lat, point.lng, accuracy, Timestamp::UNIX_EPOCH)
}

/// Attaches audio named after its text to every cue of the route.
pub fn with_audio(mut route: Route) -> Route {
    for index in 0..route.maneuver_count() {
        let Some(maneuver) = route.maneuver_mut(index) else {
            continue;
        };
        for kind in CueKind::ALL {
            if let Some(slot) = maneuver.cue_mut(kind) {
                let clip = AudioClip::new(format!("/audio/{}.wav", slot.text()));
                slot.set_audio(clip);
            }
        }
    }
    route
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
enum GeneratorMode {
    #[default]
    Available,
    Unavailable,
    Hanging,
}

/// Generator answering `/audio/{text}.wav` for every text.
///
/// `cancel_all` abandons batches in flight, single phrases always complete.
pub struct FakeGenerator {
    mode: GeneratorMode,
    failing: HashSet<String>,
    phrase_delay: Duration,
    batch_calls: AtomicUsize,
    single_calls: AtomicUsize,
    cancel_calls: AtomicUsize,
    cancel: watch::Sender<u64>,
    generated: Mutex<Vec<String>>,
}

impl Default for FakeGenerator {
    fn default() -> Self {
        FakeGenerator {
            mode: GeneratorMode::default(),
            failing: HashSet::new(),
            phrase_delay: Duration::ZERO,
            batch_calls: AtomicUsize::new(0),
            single_calls: AtomicUsize::new(0),
            cancel_calls: AtomicUsize::new(0),
            cancel: watch::Sender::new(0),
            generated: Mutex::new(Vec::new()),
        }
    }
}

impl FakeGenerator {
    pub fn failing_on(texts: &[&str]) -> Self {
        FakeGenerator {
            failing: texts.iter().map(|text| text.to_string()).collect(),
            ..FakeGenerator::default()
        }
    }

    pub fn unavailable() -> Self {
        FakeGenerator {
            mode: GeneratorMode::Unavailable,
            ..FakeGenerator::default()
        }
    }

    pub fn hanging() -> Self {
        FakeGenerator {
            mode: GeneratorMode::Hanging,
            ..FakeGenerator::default()
        }
    }

    pub fn with_phrase_delay(phrase_delay: Duration) -> Self {
        FakeGenerator {
            phrase_delay,
            ..FakeGenerator::default()
        }
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    pub fn single_calls(&self) -> usize {
        self.single_calls.load(Ordering::SeqCst)
    }

    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }

    pub fn generated_texts(&self) -> Vec<String> {
        self.generated.lock().clone()
    }

    async fn render(&self, text: &str) -> Result<Option<String>, AudioGenerationError> {
        match self.mode {
            GeneratorMode::Available => {}
            GeneratorMode::Unavailable => {
                return Err(AudioGenerationError::Request(
                    "service unavailable".to_string(),
                ));
            }
            GeneratorMode::Hanging => std::future::pending::<()>().await,
        }

        self.generated.lock().push(text.to_string());
        if self.failing.contains(text) {
            return Ok(None);
        }
        Ok(Some(format!("/audio/{text}.wav")))
    }
}

impl AudioGenerator for FakeGenerator {
    async fn generate_batch(
        &self,
        texts: &[String],
    ) -> Result<Vec<Option<String>>, AudioGenerationError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);

        let mut cancelled = self.cancel.subscribe();
        let epoch = *cancelled.borrow_and_update();
        let render = async {
            let mut urls = Vec::with_capacity(texts.len());
            for text in texts {
                urls.push(self.render(text).await?);
            }
            Ok::<_, AudioGenerationError>(urls)
        };

        tokio::select! {
            result = render => result,
            _ = cancelled.wait_for(|current| *current != epoch) => {
                Err(AudioGenerationError::Cancelled)
            }
        }
    }

    async fn generate(&self, text: &str) -> Result<Option<String>, AudioGenerationError> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.phrase_delay).await;
        self.render(text).await
    }

    fn cancel_all(&self) {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        self.cancel.send_modify(|epoch| *epoch += 1);
    }
}

/// Player taking a fixed time per clip and recording when each clip started.
pub struct FakePlayer {
    duration: Duration,
    failing: Option<String>,
    plays: Mutex<Vec<(String, Instant)>>,
    active: AtomicUsize,
    max_concurrent: AtomicUsize,
}

impl FakePlayer {
    pub fn new(duration: Duration) -> Self {
        FakePlayer {
            duration,
            failing: None,
            plays: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_concurrent: AtomicUsize::new(0),
        }
    }

    pub fn failing_on(duration: Duration, source: &str) -> Self {
        FakePlayer {
            failing: Some(source.to_string()),
            ..FakePlayer::new(duration)
        }
    }

    pub fn plays(&self) -> Vec<(String, Instant)> {
        self.plays.lock().clone()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent.load(Ordering::SeqCst)
    }
}

impl AudioPlayer for FakePlayer {
    async fn play(&self, clip: &AudioClip) -> Result<(), PlaybackError> {
        self.plays
            .lock()
            .push((clip.source().to_string(), Instant::now()));
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent.fetch_max(active, Ordering::SeqCst);

        tokio::time::sleep(self.duration).await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.failing.as_deref() == Some(clip.source()) {
            return Err(PlaybackError {
                source_url: clip.source().to_string(),
                message: "decoding failed".to_string(),
            });
        }
        Ok(())
    }
}

/// Routing service answering every request with the same route.
pub struct FakeRouting {
    route: Option<Route>,
    delay: Duration,
    requests: Mutex<Vec<RouteRequest>>,
}

impl FakeRouting {
    pub fn new(route: Route) -> Self {
        FakeRouting {
            route: Some(route),
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(route: Route, delay: Duration) -> Self {
        FakeRouting {
            delay,
            ..FakeRouting::new(route)
        }
    }

    /// Never answers.
    pub fn hanging() -> Self {
        FakeRouting {
            route: None,
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<RouteRequest> {
        self.requests.lock().clone()
    }
}

impl RoutingService for FakeRouting {
    async fn route(&self, request: &RouteRequest) -> Result<Route, RoutingError> {
        self.requests.lock().push(request.clone());
        tokio::time::sleep(self.delay).await;

        match &self.route {
            Some(route) => Ok(route.clone()),
            None => std::future::pending().await,
        }
    }
}

#[derive(Default, Clone)]
pub struct RecordingSurface {
    instructions: Arc<Mutex<Vec<String>>>,
    progress: Arc<Mutex<Vec<String>>>,
    alerts: Arc<Mutex<Vec<String>>>,
    states: Arc<Mutex<Vec<TripState>>>,
}

impl RecordingSurface {
    pub fn instructions(&self) -> Vec<String> {
        self.instructions.lock().clone()
    }

    pub fn progress(&self) -> Vec<String> {
        self.progress.lock().clone()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().clone()
    }

    pub fn states(&self) -> Vec<TripState> {
        self.states.lock().clone()
    }
}

impl GuidanceSurface for RecordingSurface {
    fn show_instruction(&self, text: &str) {
        self.instructions.lock().push(text.to_string());
    }

    fn show_progress(&self, line: &str) {
        self.progress.lock().push(line.to_string());
    }

    fn alert(&self, message: &str) {
        self.alerts.lock().push(message.to_string());
    }

    fn show_state(&self, state: TripState) {
        self.states.lock().push(state);
    }
}
