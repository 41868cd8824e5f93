use tracing::debug;

use crate::progress::ProgressState;

#[derive(Debug, Clone)]
pub struct ReroutePolicyParams {
    /// Deviation above `off_route_factor * noise` means the user left the route
    pub off_route_factor: f64,

    /// The user must have been within `on_route_factor * noise` of the route
    /// at some point before leaving it counts
    pub on_route_factor: f64,
}

impl Default for ReroutePolicyParams {
    fn default() -> Self {
        ReroutePolicyParams {
            off_route_factor: 10.0,
            on_route_factor: 1.0,
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
enum Latch {
    #[default]
    Armed,
    /// A replacement route was requested
    Requested,
    /// The request failed, waiting for the user to come back on route
    Failed,
}

/// Hysteresis rule deciding when the current route must be replaced.
///
/// Once it fires the policy latches and stays silent until [`ReroutePolicy::reset`]
/// is called, which happens when the requested route is installed. After a
/// failed request the latch holds until the user is back within
/// `on_route_factor * noise` of the route.
#[derive(Debug, Default)]
pub struct ReroutePolicy {
    params: ReroutePolicyParams,
    latch: Latch,
}

impl ReroutePolicy {
    pub fn new(params: ReroutePolicyParams) -> Self {
        ReroutePolicy {
            params,
            latch: Latch::Armed,
        }
    }

    pub fn is_rerouting(&self) -> bool {
        self.latch != Latch::Armed
    }

    /// Evaluates the rule and latches when it fires. `noise` is in the same
    /// unit as the distances of `state`.
    pub fn should_reroute(&mut self, state: &ProgressState, noise: f64) -> bool {
        match self.latch {
            Latch::Requested => return false,
            Latch::Failed => {
                if state.deviation < self.params.on_route_factor * noise {
                    debug!(deviation = state.deviation, noise, "Back on route, reroute re-armed");
                    self.latch = Latch::Armed;
                }
                return false;
            }
            Latch::Armed => {}
        }

        let off_route = state.deviation > self.params.off_route_factor * noise;
        let was_on_route = state.closest_distance_ever < self.params.on_route_factor * noise;

        if off_route && was_on_route {
            debug!(
                deviation = state.deviation,
                closest = state.closest_distance_ever,
                noise,
                "Reroute triggered"
            );
            self.latch = Latch::Requested;
            return true;
        }

        false
    }

    /// The requested route could not be fetched.
    pub fn request_failed(&mut self) {
        if self.latch == Latch::Requested {
            self.latch = Latch::Failed;
        }
    }

    pub fn reset(&mut self) {
        self.latch = Latch::Armed;
    }
}
