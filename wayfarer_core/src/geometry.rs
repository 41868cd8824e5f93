use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS: f64 = 6_371_000.0;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        GeoPoint { lat, lng }
    }

    /// Great-circle distance in meters.
    pub fn haversine_distance(&self, other: &GeoPoint) -> f64 {
        haversine_distance(self.lat, self.lng, other.lat, other.lng)
    }

    /// Initial bearing from `self` towards `other`, in degrees within [0, 360).
    pub fn bearing(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlng = (other.lng - self.lng).to_radians();

        let y = dlng.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlng.cos();

        (y.atan2(x).to_degrees() + 360.0) % 360.0
    }
}

impl From<&GeoPoint> for geo_types::Point {
    fn from(value: &GeoPoint) -> Self {
        geo_types::Point::new(value.lng, value.lat)
    }
}

impl From<geo_types::Point> for GeoPoint {
    fn from(value: geo_types::Point) -> Self {
        GeoPoint::new(value.y(), value.x())
    }
}

pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lon1_rad = lon1.to_radians();
    let lat2_rad = lat2.to_radians();
    let lon2_rad = lon2.to_radians();

    let delta_lat = lat2_rad - lat1_rad;
    let delta_lon = lon2_rad - lon1_rad;

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS * c
}

/// Result of projecting a point onto a segment.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Projection {
    pub point: GeoPoint,
    /// Position along the segment, clamped to [0, 1].
    pub t: f64,
    /// Great-circle distance in meters from the query point to `point`.
    pub distance: f64,
}

/// Projects `point` onto the segment `start -> end`.
///
/// The segment is flattened around the query latitude: longitudes are scaled by
/// `cos(latitude)` so that both axes are in comparable units. This is accurate
/// for the short segments a route shape is made of.
pub fn project_on_segment(point: &GeoPoint, start: &GeoPoint, end: &GeoPoint) -> Projection {
    let scale = point.lat.to_radians().cos();

    let ax = start.lng * scale;
    let ay = start.lat;
    let dx = end.lng * scale - ax;
    let dy = end.lat - ay;
    let px = point.lng * scale - ax;
    let py = point.lat - ay;

    let length_squared = dx * dx + dy * dy;
    let t = if length_squared == 0.0 {
        0.0
    } else {
        ((px * dx + py * dy) / length_squared).clamp(0.0, 1.0)
    };

    let projected = GeoPoint::new(
        start.lat + t * (end.lat - start.lat),
        start.lng + t * (end.lng - start.lng),
    );

    Projection {
        point: projected,
        t,
        distance: point.haversine_distance(&projected),
    }
}

/// Length in meters of the polyline through `points`.
pub fn polyline_length(points: &[GeoPoint]) -> f64 {
    points
        .windows(2)
        .map(|pair| pair[0].haversine_distance(&pair[1]))
        .sum()
}
