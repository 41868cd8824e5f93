use std::{fmt::Display, sync::Arc};

use tracing::{debug, info, warn};

use crate::{
    error::GuidanceError,
    geometry::GeoPoint,
    map_matcher::{MatchResult, match_route},
    position::{HeadingTracker, PositionSample},
    progress::{ProgressReport, ProgressState, ProgressTracker},
    reroute::ReroutePolicy,
    route::{CueKind, CueSlot, ManeuverIdx, Route},
    routing::{Heading, RouteRequest, RoutingError},
    voice::{
        audio_clip::AudioClip,
        pipeline::{AudioRequest, CueTarget, ResolvedCue},
    },
};

use super::guidance_params::GuidanceParams;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TripState {
    /// No route to follow
    Idle,
    /// A route is installed, tracking starts on the next tick with a position
    Routed,
    Tracking,
    /// Off route, a replacement route was requested
    Rerouting,
}

impl Display for TripState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                TripState::Idle => "idle",
                TripState::Routed => "routed",
                TripState::Tracking => "tracking",
                TripState::Rerouting => "rerouting",
            }
        )
    }
}

/// Work the session asks its driver to perform.
#[derive(Debug, Clone)]
pub enum GuidanceEvent {
    RequestRoute(RouteRequest),
    PrepareCues {
        generation: u64,
        requests: Vec<AudioRequest>,
    },
    PlayCue {
        target: CueTarget,
        clip: AudioClip,
    },
    /// One-off phrase to speak as soon as possible
    Announce(String),
    RouteInstalled(Arc<Route>),
    Matched(MatchResult),
    Instruction(String),
    Progress(ProgressReport),
    Alert(String),
    StateChanged(TripState),
}

/// All mutable state of one trip.
///
/// The session is synchronous and never performs I/O: every input returns the
/// events the driver has to act on. Route requests are stamped with a
/// generation and only a response carrying the latest generation is installed.
pub struct GuidanceSession {
    params: GuidanceParams,
    state: TripState,

    route: Option<Arc<Route>>,
    /// Destination of the installed route
    destination: Option<GeoPoint>,
    /// Destination of the latest route request, while it is in flight
    requested: Option<GeoPoint>,

    /// Generation of the latest route request
    generation: u64,
    /// Generation of the installed route
    route_generation: u64,

    position: Option<PositionSample>,
    heading: HeadingTracker,
    tracker: ProgressTracker,
    reroute: ReroutePolicy,
}

impl GuidanceSession {
    pub fn new(params: GuidanceParams) -> Self {
        GuidanceSession {
            heading: HeadingTracker::new(params.heading_min_displacement),
            reroute: ReroutePolicy::new(params.reroute.clone()),
            params,
            state: TripState::Idle,
            route: None,
            destination: None,
            requested: None,
            generation: 0,
            route_generation: 0,
            position: None,
            tracker: ProgressTracker::new(),
        }
    }

    pub fn state(&self) -> TripState {
        self.state
    }

    pub fn route(&self) -> Option<&Arc<Route>> {
        self.route.as_ref()
    }

    pub fn destination(&self) -> Option<&GeoPoint> {
        self.destination.as_ref()
    }

    pub fn position(&self) -> Option<&PositionSample> {
        self.position.as_ref()
    }

    pub fn progress(&self) -> &ProgressState {
        self.tracker.state()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_rerouting(&self) -> bool {
        self.reroute.is_rerouting()
    }

    pub fn update_position(&mut self, sample: PositionSample) {
        self.heading.update(sample.point());
        self.position = Some(sample);
    }

    /// Starts a trip from the current position to `destination`. The current
    /// route and destination stay in place until the new route arrives.
    pub fn set_destination(
        &mut self,
        destination: GeoPoint,
    ) -> Result<Vec<GuidanceEvent>, GuidanceError> {
        let start = self
            .position
            .as_ref()
            .map(PositionSample::point)
            .ok_or(GuidanceError::PositionUnavailable)?;

        info!(lat = destination.lat, lng = destination.lng, "Destination set");

        Ok(vec![GuidanceEvent::RequestRoute(
            self.next_request(start, destination),
        )])
    }

    /// Ends the trip. Responses to requests issued before are ignored.
    pub fn clear_destination(&mut self) -> Vec<GuidanceEvent> {
        self.destination = None;
        self.requested = None;
        self.route = None;
        self.generation += 1;
        self.tracker.reset();
        self.reroute.reset();

        self.transition(TripState::Idle).into_iter().collect()
    }

    pub fn route_resolved(&mut self, generation: u64, route: Route) -> Vec<GuidanceEvent> {
        if generation != self.generation {
            debug!(
                generation,
                latest = self.generation,
                "Discarding stale route response"
            );
            return vec![];
        }

        info!(
            generation,
            maneuvers = route.maneuver_count(),
            length = route.summary().length,
            units = %route.units(),
            "Installing route"
        );

        let requests = route
            .cue_texts()
            .into_iter()
            .map(|(maneuver, kind, text)| AudioRequest {
                text,
                target: CueTarget {
                    generation,
                    maneuver,
                    kind,
                },
            })
            .collect();

        let route = Arc::new(route);
        self.route = Some(Arc::clone(&route));
        self.route_generation = generation;
        if let Some(destination) = self.requested.take() {
            self.destination = Some(destination);
        }
        self.tracker.reset();
        self.reroute.reset();

        let next_state = match self.state {
            TripState::Idle | TripState::Routed => TripState::Routed,
            TripState::Tracking | TripState::Rerouting => TripState::Tracking,
        };

        let mut events = vec![
            GuidanceEvent::RouteInstalled(route),
            GuidanceEvent::PrepareCues {
                generation,
                requests,
            },
        ];
        events.extend(self.transition(next_state));
        events
    }

    /// A route request failed. The trip keeps its previous route and
    /// destination; after a failed reroute the latch holds until the user is
    /// back on route.
    pub fn route_failed(&mut self, generation: u64, error: &RoutingError) -> Vec<GuidanceEvent> {
        if generation != self.generation {
            debug!(generation, "Ignoring failure of a stale route request");
            return vec![];
        }

        warn!(generation, "Route request failed: {error}");
        self.requested = None;

        let mut events = vec![GuidanceEvent::Alert(format!("Error: {error}"))];
        if self.state == TripState::Rerouting {
            self.reroute.request_failed();
            events.extend(self.transition(TripState::Tracking));
        }
        events
    }

    /// Attaches generated audio to the cues of the installed route.
    pub fn cue_audio_resolved(&mut self, resolved: Vec<ResolvedCue>) {
        let mut attached = 0;
        for cue in resolved {
            if let Some(slot) = self.cue_slot_mut(&cue.target) {
                slot.set_audio(cue.clip);
                attached += 1;
            }
        }
        debug!(attached, "Cue audio attached");
    }

    pub fn cue_played(&mut self, target: &CueTarget) {
        if let Some(slot) = self.cue_slot_mut(target) {
            slot.mark_played();
        }
    }

    /// Runs one tracking step.
    pub fn tick(&mut self) -> Vec<GuidanceEvent> {
        if self.state == TripState::Idle {
            return vec![];
        }

        let Some(sample) = self.position else {
            return vec![];
        };
        let Some(route) = self.route.clone() else {
            return vec![];
        };
        let Some(matched) = match_route(&route, &sample.point()) else {
            return vec![];
        };

        let mut events = Vec::new();
        if self.state == TripState::Routed {
            events.extend(self.transition(TripState::Tracking));
        }

        let progress = *self.tracker.update(&route, &matched);
        events.push(GuidanceEvent::Matched(matched));

        let due = self.due_cues(&route, &progress);
        let instruction = route
            .maneuver(progress.maneuver_index)
            .map(|maneuver| maneuver.instruction_text().to_owned())
            .unwrap_or_default();
        let report = ProgressReport::new(&route, &progress);
        let noise = sample.noise_estimate(route.units());
        // Release the snapshot so marking cues does not copy the route
        drop(route);

        for (maneuver, kind) in due {
            if let Some(event) = self.queue_cue(maneuver, kind) {
                events.push(event);
            }
        }

        events.push(GuidanceEvent::Instruction(instruction));
        events.push(GuidanceEvent::Progress(report));

        // A single route request is in flight at a time
        if self.requested.is_none() && self.reroute.should_reroute(&progress, noise) {
            events.extend(self.start_reroute(&sample));
        }

        events
    }

    fn due_cues(&self, route: &Route, progress: &ProgressState) -> Vec<(ManeuverIdx, CueKind)> {
        let index = progress.maneuver_index;
        let fraction = progress.maneuver_fraction;
        let threshold = self.params.transition_threshold;

        let mut due = Vec::with_capacity(3);
        if route.is_first_in_leg(index) {
            if fraction < threshold {
                due.push((index, CueKind::PreTransition));
            }
            if fraction > threshold {
                due.push((index, CueKind::PostTransition));
            }
        } else if fraction < threshold {
            // The pre-transition cue was spoken while this was the next maneuver
            due.push((index, CueKind::PostTransition));
        }

        if index + 1 < route.maneuver_count() && fraction > self.params.next_maneuver_threshold {
            due.push((index + 1, CueKind::PreTransition));
        }

        due
    }

    fn queue_cue(&mut self, maneuver: ManeuverIdx, kind: CueKind) -> Option<GuidanceEvent> {
        let target = CueTarget {
            generation: self.route_generation,
            maneuver,
            kind,
        };

        let slot = self.cue_slot_mut(&target)?;
        if !slot.is_ready() {
            return None;
        }
        let clip = slot.audio()?.clone();
        slot.mark_queued();

        debug!(maneuver, %kind, "Queueing cue");
        Some(GuidanceEvent::PlayCue { target, clip })
    }

    fn start_reroute(&mut self, sample: &PositionSample) -> Vec<GuidanceEvent> {
        let Some(destination) = self.destination else {
            warn!("Off route without a destination, cannot reroute");
            return vec![];
        };

        info!(
            deviation = self.tracker.state().deviation,
            "Off route, requesting a new route"
        );

        let request = self.next_request(sample.point(), destination);
        let mut events = vec![
            GuidanceEvent::RequestRoute(request),
            GuidanceEvent::Announce(self.params.reroute_phrase.clone()),
        ];
        events.extend(self.transition(TripState::Rerouting));
        events
    }

    fn next_request(&mut self, start: GeoPoint, destination: GeoPoint) -> RouteRequest {
        self.generation += 1;
        self.requested = Some(destination);

        RouteRequest {
            generation: self.generation,
            start,
            destination,
            heading: self.heading.heading().map(|degrees| Heading {
                degrees,
                tolerance: self.params.heading_tolerance,
            }),
        }
    }

    fn cue_slot_mut(&mut self, target: &CueTarget) -> Option<&mut CueSlot> {
        if target.generation != self.route_generation {
            return None;
        }

        Arc::make_mut(self.route.as_mut()?)
            .maneuver_mut(target.maneuver)?
            .cue_mut(target.kind)
    }

    fn transition(&mut self, state: TripState) -> Option<GuidanceEvent> {
        if self.state == state {
            return None;
        }

        info!(from = %self.state, to = %state, "Trip state changed");
        self.state = state;
        Some(GuidanceEvent::StateChanged(state))
    }
}
