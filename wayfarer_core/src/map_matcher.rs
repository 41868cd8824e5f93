use crate::{
    geometry::{GeoPoint, Projection, project_on_segment},
    route::Route,
};

/// Where a raw position lands on the route geometry.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MatchResult {
    /// Closest point on the route
    pub point: GeoPoint,

    /// Shape indices `(i, i + 1)` of the segment containing `point`
    pub segment: (usize, usize),

    /// Position of `point` along the segment, within [0, 1]
    pub t: f64,

    /// Distance from the raw position to `point`, in the route's unit
    pub distance: f64,
}

fn closest_vertex_index(shape: &[GeoPoint], point: &GeoPoint) -> Option<usize> {
    shape
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            point
                .haversine_distance(a)
                .total_cmp(&point.haversine_distance(b))
        })
        .map(|(index, _)| index)
}

/// Matches `position` onto the route shape.
///
/// Returns `None` when the shape has fewer than two points, in which case
/// there is no route to follow.
pub fn match_route(route: &Route, position: &GeoPoint) -> Option<MatchResult> {
    let shape = route.shape();
    if shape.len() < 2 {
        return None;
    }

    let vertex = closest_vertex_index(shape, position)?;

    let previous = (vertex > 0).then(|| {
        (
            vertex - 1,
            project_on_segment(position, &shape[vertex - 1], &shape[vertex]),
        )
    });
    let next = (vertex + 1 < shape.len()).then(|| {
        (
            vertex,
            project_on_segment(position, &shape[vertex], &shape[vertex + 1]),
        )
    });

    let (start, mut projection): (usize, Projection) = match (previous, next) {
        (Some(previous), Some(next)) => {
            // Ties go to the later segment
            if next.1.distance <= previous.1.distance {
                next
            } else {
                previous
            }
        }
        (Some(only), None) | (None, Some(only)) => only,
        (None, None) => return None,
    };

    // The flattened projection can lose to the vertex itself by a rounding
    // error; the match is never allowed to be worse than the nearest vertex.
    let vertex_distance = position.haversine_distance(&shape[vertex]);
    if vertex_distance < projection.distance {
        projection = Projection {
            point: shape[vertex],
            t: if start == vertex { 0.0 } else { 1.0 },
            distance: vertex_distance,
        };
    }

    Some(MatchResult {
        point: projection.point,
        segment: (start, start + 1),
        t: projection.t,
        distance: route.units().from_meters(projection.distance),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        route::{DistanceUnit, Leg, Route, TripSummary},
        test_utils::{route_from_shape, straight_route, test_maneuver},
    };

    #[test]
    fn test_match_requires_two_points() {
        let route = Route::new(
            vec![GeoPoint::new(0.0, 0.0)],
            vec![Leg {
                maneuvers: vec![test_maneuver(0, 0, 0.0)],
                summary: TripSummary::default(),
            }],
            TripSummary::default(),
            DistanceUnit::Miles,
        )
        .unwrap();

        assert_eq!(match_route(&route, &GeoPoint::new(0.0, 0.0)), None);
    }

    #[test]
    fn test_match_on_first_vertex_uses_single_segment() {
        let route = straight_route(&[1.0]);
        let first = route.shape()[0];

        let result = match_route(&route, &GeoPoint::new(first.lat, first.lng - 0.01)).unwrap();

        assert_eq!(result.segment, (0, 1));
        assert_eq!(result.t, 0.0);
        assert_eq!(result.point, first);
    }

    #[test]
    fn test_match_on_last_vertex_uses_single_segment() {
        let route = straight_route(&[1.0]);
        let last_index = route.shape().len() - 1;
        let last = route.shape()[last_index];

        let result = match_route(&route, &GeoPoint::new(last.lat, last.lng + 0.01)).unwrap();

        assert_eq!(result.segment, (last_index - 1, last_index));
        assert_eq!(result.t, 1.0);
    }

    #[test]
    fn test_match_projects_onto_segment() {
        let route = straight_route(&[1.0]);
        let a = route.shape()[1];
        let b = route.shape()[2];
        let query = GeoPoint::new(0.0005, a.lng + (b.lng - a.lng) * 0.25);

        let result = match_route(&route, &query).unwrap();

        assert_eq!(result.segment, (1, 2));
        assert!((result.t - 0.25).abs() < 1e-6, "t = {}", result.t);
        let expected = DistanceUnit::Miles.from_meters(55.6);
        assert!((result.distance - expected).abs() < 1e-3);
    }

    #[test]
    fn test_exact_vertex_prefers_later_segment() {
        let route = straight_route(&[1.0]);
        let vertex = route.shape()[2];

        let result = match_route(&route, &vertex).unwrap();

        assert_eq!(result.segment, (2, 3));
        assert_eq!(result.t, 0.0);
        assert_eq!(result.distance, 0.0);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        /// Shapes of 2 to 12 points within about a kilometer of each other.
        fn shape() -> impl Strategy<Value = Vec<GeoPoint>> {
            prop::collection::vec((-0.01..0.01_f64, -0.01..0.01_f64), 2..12).prop_map(|offsets| {
                offsets
                    .into_iter()
                    .map(|(lat, lng)| GeoPoint::new(36.7 + lat, -119.4 + lng))
                    .collect()
            })
        }

        proptest! {
            #[test]
            fn test_match_lands_on_a_segment(
                shape in shape(),
                lat in 36.68..36.72_f64,
                lng in -119.42..-119.38_f64,
            ) {
                let route = route_from_shape(shape.clone(), DistanceUnit::Kilometers);
                let query = GeoPoint::new(lat, lng);

                let result = match_route(&route, &query);
                prop_assert!(result.is_some());
                let result = result.unwrap();

                let (start, end) = result.segment;
                prop_assert_eq!(end, start + 1);
                prop_assert!(start < shape.len() - 1);
                prop_assert!((0.0..=1.0).contains(&result.t), "t = {}", result.t);
            }

            #[test]
            fn test_match_is_never_worse_than_nearest_vertex(
                shape in shape(),
                lat in 36.68..36.72_f64,
                lng in -119.42..-119.38_f64,
            ) {
                let route = route_from_shape(shape.clone(), DistanceUnit::Kilometers);
                let query = GeoPoint::new(lat, lng);

                let result = match_route(&route, &query).unwrap();

                let nearest_vertex = shape
                    .iter()
                    .map(|point| query.haversine_distance(point))
                    .fold(f64::INFINITY, f64::min);
                let nearest_vertex = DistanceUnit::Kilometers.from_meters(nearest_vertex);
                prop_assert!(
                    result.distance <= nearest_vertex + 1e-9,
                    "projection {} worse than vertex {}",
                    result.distance,
                    nearest_vertex
                );
            }
        }
    }
}
