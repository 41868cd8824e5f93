use std::time::Duration;

use crate::reroute::ReroutePolicyParams;

#[derive(Clone, Debug)]
pub struct GuidanceParams {
    /// Cadence of the tracking tick
    pub tick_interval: Duration,

    /// Maneuver fraction splitting the pre- and post-transition cues
    pub transition_threshold: f64,

    /// Maneuver fraction after which the next maneuver is announced
    pub next_maneuver_threshold: f64,

    pub reroute: ReroutePolicyParams,

    /// Phrase spoken when a reroute is requested
    pub reroute_phrase: String,

    /// Tolerance sent with the heading of route requests, in degrees
    pub heading_tolerance: f64,

    /// Movement needed before a heading is derived, in meters
    pub heading_min_displacement: f64,

    pub route_timeout: Duration,
    pub audio_timeout: Duration,

    /// Silence between two consecutive cues
    pub cue_gap: Duration,
}

impl Default for GuidanceParams {
    fn default() -> Self {
        GuidanceParams {
            tick_interval: Duration::from_secs(1),
            transition_threshold: 0.1,
            next_maneuver_threshold: 0.8,
            reroute: ReroutePolicyParams::default(),
            reroute_phrase: String::from("Re-routing"),
            heading_tolerance: 45.0,
            heading_min_displacement: 10.0,
            route_timeout: Duration::from_secs(10),
            audio_timeout: Duration::from_secs(30),
            cue_gap: Duration::from_secs(1),
        }
    }
}
