use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::{geometry::GeoPoint, route::DistanceUnit};

/// A raw fix from the device geolocation source.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub lat: f64,
    #[serde(rename = "lon")]
    pub lng: f64,

    /// Radius of the 68% confidence circle, in meters
    #[serde(rename = "acc")]
    pub accuracy: f64,

    #[serde(rename = "time")]
    pub timestamp: Timestamp,
}

impl PositionSample {
    pub fn new(lat: f64, lng: f64, accuracy: f64, timestamp: Timestamp) -> Self {
        PositionSample {
            lat,
            lng,
            accuracy,
            timestamp,
        }
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }

    /// Half the reported accuracy, expressed in the route's unit.
    pub fn noise_estimate(&self, units: DistanceUnit) -> f64 {
        units.from_meters(self.accuracy / 2.0)
    }
}

/// Derives a travel heading from successive samples.
///
/// The heading only changes once the user moved further than
/// `min_displacement` meters from the last anchor, so jitter while standing
/// still does not produce random headings.
#[derive(Debug, Clone)]
pub struct HeadingTracker {
    min_displacement: f64,
    anchor: Option<GeoPoint>,
    heading: Option<f64>,
}

impl HeadingTracker {
    pub fn new(min_displacement: f64) -> Self {
        HeadingTracker {
            min_displacement,
            anchor: None,
            heading: None,
        }
    }

    pub fn update(&mut self, point: GeoPoint) -> Option<f64> {
        match self.anchor {
            None => self.anchor = Some(point),
            Some(anchor) => {
                if anchor.haversine_distance(&point) > self.min_displacement {
                    self.heading = Some(anchor.bearing(&point));
                    self.anchor = Some(point);
                }
            }
        }

        self.heading
    }

    pub fn heading(&self) -> Option<f64> {
        self.heading
    }

    pub fn reset(&mut self) {
        self.anchor = None;
        self.heading = None;
    }
}
