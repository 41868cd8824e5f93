use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use wayfarer_core::{
    route::{DistanceUnit, Route, RouteValidationError},
    routing::{RouteRequest, RoutingError, RoutingService},
};

use crate::{
    polyline::PolylineError,
    response::{ErrorResponse, RouteResponse},
};

#[derive(Debug, Error)]
pub enum ValhallaError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("Invalid shape: {0}")]
    Polyline(#[from] PolylineError),

    #[error("Invalid route: {0}")]
    InvalidRoute(#[from] RouteValidationError),
}

impl From<ValhallaError> for RoutingError {
    fn from(err: ValhallaError) -> Self {
        match err {
            ValhallaError::Request(err) => RoutingError::Transport(err.to_string()),
            ValhallaError::Api { message, .. } => RoutingError::Service(message),
            ValhallaError::InvalidRoute(err) => RoutingError::InvalidRoute(err),
            other => RoutingError::Service(other.to_string()),
        }
    }
}

pub struct ValhallaClientParams {
    pub valhalla_url: String,
    /// Costing model, `auto` for cars
    pub costing: String,
    pub units: DistanceUnit,
}

impl ValhallaClientParams {
    pub fn new(valhalla_url: impl Into<String>) -> Self {
        ValhallaClientParams {
            valhalla_url: valhalla_url.into(),
            costing: "auto".to_string(),
            units: DistanceUnit::Miles,
        }
    }
}

pub const VALHALLA_ROUTE_API_PATH: &str = "/route";

#[derive(Debug, Serialize, PartialEq)]
pub struct RouteRequestBody {
    pub costing: String,
    pub locations: Vec<Location>,
    pub directions_options: DirectionsOptions,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,

    #[serde(rename = "type")]
    pub kind: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading_tolerance: Option<f64>,
}

impl Location {
    /// A `break` location, where the route may start, end or turn around.
    pub fn stop(point: impl Into<geo_types::Point>) -> Self {
        let point = point.into();

        Location {
            lat: point.y(),
            lon: point.x(),
            kind: "break",
            heading: None,
            heading_tolerance: None,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct DirectionsOptions {
    pub units: DistanceUnit,
}

pub struct ValhallaClient {
    params: ValhallaClientParams,
    client: reqwest::Client,
}

impl ValhallaClient {
    pub fn new(params: ValhallaClientParams) -> Self {
        Self {
            params,
            client: reqwest::Client::new(),
        }
    }

    pub fn request_body(&self, request: &RouteRequest) -> RouteRequestBody {
        let heading = request.heading;

        RouteRequestBody {
            costing: self.params.costing.clone(),
            locations: vec![
                Location {
                    heading: heading.map(|heading| heading.degrees),
                    heading_tolerance: heading.map(|heading| heading.tolerance),
                    ..Location::stop(&request.start)
                },
                Location::stop(&request.destination),
            ],
            directions_options: DirectionsOptions {
                units: self.params.units,
            },
        }
    }

    pub async fn fetch_route(&self, request: &RouteRequest) -> Result<Route, ValhallaError> {
        let mut url = self.params.valhalla_url.trim_end_matches('/').to_string();
        url.push_str(VALHALLA_ROUTE_API_PATH);

        let body = self.request_body(request);
        debug!(generation = request.generation, ?body, "ValhallaClient: Requesting route");

        let response = self.client.post(url).json(&body).send().await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            return Err(api_error(status.as_u16(), &bytes));
        }

        let response: RouteResponse = serde_json::from_slice(&bytes)?;
        response.trip.into_route()
    }
}

fn api_error(status: u16, body: &[u8]) -> ValhallaError {
    let message = match serde_json::from_slice::<ErrorResponse>(body) {
        Ok(error) => {
            debug!(status, error_code = error.error_code, "ValhallaClient: API error");
            error.error
        }
        Err(_) => String::from_utf8_lossy(body).into_owned(),
    };

    ValhallaError::Api { status, message }
}

impl RoutingService for ValhallaClient {
    async fn route(&self, request: &RouteRequest) -> Result<Route, RoutingError> {
        Ok(self.fetch_route(request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfarer_core::{geometry::GeoPoint, routing::Heading};

    fn request(heading: Option<Heading>) -> RouteRequest {
        RouteRequest {
            generation: 1,
            start: GeoPoint::new(36.7, -119.4),
            destination: GeoPoint::new(36.8, -119.3),
            heading,
        }
    }

    #[test]
    fn test_request_body_without_heading() {
        let client = ValhallaClient::new(ValhallaClientParams::new("http://localhost:8002"));

        let body = serde_json::to_value(client.request_body(&request(None))).unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "costing": "auto",
                "locations": [
                    { "lat": 36.7, "lon": -119.4, "type": "break" },
                    { "lat": 36.8, "lon": -119.3, "type": "break" },
                ],
                "directions_options": { "units": "miles" },
            })
        );
    }

    #[test]
    fn test_request_body_with_heading() {
        let client = ValhallaClient::new(ValhallaClientParams::new("http://localhost:8002"));

        let body = client.request_body(&request(Some(Heading {
            degrees: 270.0,
            tolerance: 45.0,
        })));

        assert_eq!(body.locations[0].heading, Some(270.0));
        assert_eq!(body.locations[0].heading_tolerance, Some(45.0));
        assert_eq!(body.locations[1].heading, None);
    }

    #[test]
    fn test_api_error_uses_service_message() {
        let body = serde_json::json!({
            "error_code": 442,
            "error": "No path could be found for input",
            "status_code": 400,
        })
        .to_string();

        let err = api_error(400, body.as_bytes());
        assert!(matches!(err, ValhallaError::Api { status: 400, .. }));

        let routing: RoutingError = err.into();
        assert_eq!(
            routing.to_string(),
            "routing service error: No path could be found for input"
        );
    }

    #[test]
    fn test_api_error_falls_back_to_raw_body() {
        let err = api_error(502, b"Bad Gateway");

        assert_eq!(err.to_string(), "API error: 502 - Bad Gateway");
    }
}
