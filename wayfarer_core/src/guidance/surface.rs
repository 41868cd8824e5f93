use crate::{map_matcher::MatchResult, route::Route};

use super::session::TripState;

/// Presentation layer fed by the scheduler.
///
/// Only the text lines are required; map rendering hooks default to no-ops.
pub trait GuidanceSurface: Send + 'static {
    /// Instruction text of the current maneuver
    fn show_instruction(&self, text: &str);

    fn show_progress(&self, line: &str);

    fn alert(&self, message: &str);

    fn show_route(&self, _route: &Route) {}

    fn show_match(&self, _matched: &MatchResult) {}

    fn show_state(&self, _state: TripState) {}
}
