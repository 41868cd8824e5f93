use std::fmt::Display;

use crate::{
    map_matcher::MatchResult,
    route::{DistanceUnit, ManeuverIdx, Route},
};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ProgressState {
    pub maneuver_index: ManeuverIdx,

    /// Distance based progress through the current maneuver. Nominally within
    /// [0, 1] but not clamped: it overshoots slightly near maneuver ends.
    pub maneuver_fraction: f64,

    /// Trip distance done, in the route's unit
    pub distance_done: f64,

    /// Trip time done, in seconds
    pub time_done: f64,

    /// Distance of the latest match, in the route's unit
    pub deviation: f64,

    /// Smallest match distance since the route was installed
    pub closest_distance_ever: f64,
}

impl Default for ProgressState {
    fn default() -> Self {
        ProgressState {
            maneuver_index: 0,
            maneuver_fraction: 0.0,
            distance_done: 0.0,
            time_done: 0.0,
            deviation: f64::INFINITY,
            closest_distance_ever: f64::INFINITY,
        }
    }
}

#[derive(Debug, Default)]
pub struct ProgressTracker {
    state: ProgressState,
}

impl ProgressTracker {
    pub fn new() -> Self {
        ProgressTracker::default()
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    /// Forgets everything about the previous route.
    pub fn reset(&mut self) {
        self.state = ProgressState::default();
    }

    pub fn update(&mut self, route: &Route, matched: &MatchResult) -> &ProgressState {
        // Near maneuver boundaries the lookup can miss; keep the last maneuver
        if let Some(index) = route.find_maneuver(matched.segment) {
            self.state.maneuver_index = index;
        }

        let maneuver_index = self.state.maneuver_index;
        let fraction = maneuver_fraction(route, maneuver_index, matched);

        let (mut distance_done, mut time_done) = (0.0, 0.0);
        for (index, maneuver) in route.maneuvers_iter().enumerate() {
            if index < maneuver_index {
                distance_done += maneuver.length;
                time_done += maneuver.time;
            } else if index == maneuver_index {
                distance_done += fraction * maneuver.length;
                time_done += fraction * maneuver.time;
            } else {
                break;
            }
        }

        self.state.maneuver_fraction = fraction;
        self.state.distance_done = distance_done;
        self.state.time_done = time_done;
        self.state.deviation = matched.distance;
        self.state.closest_distance_ever = self.state.closest_distance_ever.min(matched.distance);

        &self.state
    }
}

fn maneuver_fraction(route: &Route, maneuver_index: ManeuverIdx, matched: &MatchResult) -> f64 {
    let Some(maneuver) = route.maneuver(maneuver_index) else {
        return 0.0;
    };

    if maneuver.length <= 0.0 {
        return 0.0;
    }

    let shape = route.shape();
    let (start, end) = matched.segment;
    let (Some(segment_start), Some(segment_end)) = (shape.get(start), shape.get(end)) else {
        return 0.0;
    };

    let full_segments: f64 = (maneuver.begin_shape_index..start)
        .filter(|&i| i + 1 < shape.len())
        .map(|i| shape[i].haversine_distance(&shape[i + 1]))
        .sum();
    let partial = matched.t * segment_start.haversine_distance(segment_end);

    route.units().from_meters(full_segments + partial) / maneuver.length
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ProgressStats {
    pub done: f64,
    pub total: f64,
    pub percent: f64,
    pub remaining_minutes: f64,
}

impl ProgressStats {
    fn format(&self, unit: DistanceUnit) -> String {
        format!(
            "{:.1}/{:.1} {} ({:.1}%) {:.1} mins",
            self.done,
            self.total,
            unit.abbreviation(),
            self.percent,
            self.remaining_minutes
        )
    }
}

/// Display figures for the current maneuver and the whole trip.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ProgressReport {
    pub maneuver: ProgressStats,
    pub trip: ProgressStats,
    pub unit: DistanceUnit,
}

impl ProgressReport {
    pub fn new(route: &Route, state: &ProgressState) -> Self {
        let (length, time) = route
            .maneuver(state.maneuver_index)
            .map(|maneuver| (maneuver.length, maneuver.time))
            .unwrap_or_default();
        let fraction = state.maneuver_fraction;

        let summary = route.summary();
        let trip_percent = if summary.length > 0.0 {
            state.distance_done / summary.length * 100.0
        } else {
            0.0
        };

        ProgressReport {
            maneuver: ProgressStats {
                done: fraction * length,
                total: length,
                percent: fraction * 100.0,
                remaining_minutes: (time * (1.0 - fraction) / 60.0).max(0.0),
            },
            trip: ProgressStats {
                done: state.distance_done,
                total: summary.length,
                percent: trip_percent,
                remaining_minutes: ((summary.time - state.time_done) / 60.0).max(0.0),
            },
            unit: route.units(),
        }
    }
}

impl Display for ProgressReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Maneuver: {} | Trip: {}",
            self.maneuver.format(self.unit),
            self.trip.format(self.unit)
        )
    }
}
