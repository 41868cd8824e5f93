use serde::Deserialize;
use wayfarer_core::{
    geometry::GeoPoint,
    route::{CueSlot, DistanceUnit, Leg, Maneuver, Route, TripSummary},
};

use crate::{
    client::ValhallaError,
    polyline::{self, VALHALLA_PRECISION},
};

#[derive(Debug, Deserialize)]
pub struct RouteResponse {
    pub trip: Trip,
}

/// Error payload returned with non-success statuses
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_code: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct Trip {
    pub legs: Vec<TripLeg>,
    pub summary: Summary,
    #[serde(default)]
    pub units: DistanceUnit,
}

#[derive(Debug, Deserialize)]
pub struct TripLeg {
    /// Encoded polyline, 6 digits of precision
    pub shape: String,
    pub maneuvers: Vec<TripManeuver>,
    pub summary: Summary,
}

#[derive(Debug, Deserialize)]
pub struct TripManeuver {
    pub begin_shape_index: usize,
    pub end_shape_index: usize,
    pub length: f64,
    pub time: f64,
    pub instruction: Option<String>,
    pub verbal_pre_transition_instruction: Option<String>,
    pub verbal_post_transition_instruction: Option<String>,
}

#[derive(Debug, Copy, Clone, Deserialize)]
pub struct Summary {
    pub length: f64,
    pub time: f64,
}

impl From<Summary> for TripSummary {
    fn from(summary: Summary) -> Self {
        TripSummary {
            length: summary.length,
            time: summary.time,
        }
    }
}

impl TripManeuver {
    fn into_maneuver(self, offset: usize) -> Maneuver {
        Maneuver {
            begin_shape_index: self.begin_shape_index + offset,
            end_shape_index: self.end_shape_index + offset,
            length: self.length,
            time: self.time,
            instruction: self.instruction.map(CueSlot::new),
            verbal_pre_transition: self.verbal_pre_transition_instruction.map(CueSlot::new),
            verbal_post_transition: self.verbal_post_transition_instruction.map(CueSlot::new),
        }
    }
}

impl Trip {
    /// Builds a validated [`Route`].
    ///
    /// Leg shapes are concatenated into a single route shape. Consecutive legs
    /// share their boundary point, which is kept once; maneuver indices are
    /// shifted accordingly.
    pub fn into_route(self) -> Result<Route, ValhallaError> {
        let mut shape: Vec<GeoPoint> = Vec::new();
        let mut legs = Vec::with_capacity(self.legs.len());

        for leg in self.legs {
            let mut leg_shape: Vec<GeoPoint> = polyline::decode(&leg.shape, VALHALLA_PRECISION)?
                .points()
                .map(GeoPoint::from)
                .collect();

            let offset = match (shape.last(), leg_shape.first()) {
                (Some(last), Some(first)) if last == first => {
                    leg_shape.remove(0);
                    shape.len() - 1
                }
                _ => shape.len(),
            };
            shape.extend(leg_shape);

            legs.push(Leg {
                maneuvers: leg
                    .maneuvers
                    .into_iter()
                    .map(|maneuver| maneuver.into_maneuver(offset))
                    .collect(),
                summary: leg.summary.into(),
            });
        }

        Ok(Route::new(shape, legs, self.summary.into(), self.units)?)
    }
}
