use std::future::Future;

use thiserror::Error;

use crate::{
    geometry::GeoPoint,
    route::{Route, RouteValidationError},
};

/// Travel direction at the start of a route request.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Heading {
    /// Degrees clockwise from north
    pub degrees: f64,
    /// Accepted deviation from `degrees`, in degrees
    pub tolerance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    /// Token identifying this request; only the latest one issued may install a route
    pub generation: u64,
    pub start: GeoPoint,
    pub destination: GeoPoint,
    /// Omitted until a heading was derived from movement
    pub heading: Option<Heading>,
}

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("routing service error: {0}")]
    Service(String),

    #[error("routing request failed: {0}")]
    Transport(String),

    #[error("routing request timed out")]
    Timeout,

    #[error("invalid route: {0}")]
    InvalidRoute(#[from] RouteValidationError),
}

/// Service computing a route between two coordinates.
pub trait RoutingService: Send + Sync + 'static {
    fn route(
        &self,
        request: &RouteRequest,
    ) -> impl Future<Output = Result<Route, RoutingError>> + Send;
}
