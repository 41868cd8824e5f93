use geo_types::{Coord, LineString};
use thiserror::Error;

/// Precision of the shapes returned by Valhalla
pub const VALHALLA_PRECISION: u32 = 6;

#[derive(Debug, Error, PartialEq)]
pub enum PolylineError {
    #[error("invalid character {character:?} at byte {position}")]
    InvalidCharacter { character: char, position: usize },

    #[error("polyline ends in the middle of a value")]
    Truncated,
}

/// Decodes an encoded polyline into a line string (`x` is the longitude).
///
/// `precision` is the number of decimal digits the coordinates were scaled by
/// before encoding: 5 for the classic format, 6 for Valhalla shapes.
pub fn decode(encoded: &str, precision: u32) -> Result<LineString<f64>, PolylineError> {
    let factor = 10_f64.powi(precision as i32);
    let bytes = encoded.as_bytes();

    let mut coords = Vec::with_capacity(bytes.len() / 4);
    let mut position = 0;
    let (mut lat, mut lng) = (0_i64, 0_i64);

    while position < bytes.len() {
        lat += next_value(bytes, &mut position)?;
        lng += next_value(bytes, &mut position)?;
        coords.push(Coord {
            x: lng as f64 / factor,
            y: lat as f64 / factor,
        });
    }

    Ok(LineString::new(coords))
}

fn next_value(bytes: &[u8], position: &mut usize) -> Result<i64, PolylineError> {
    let mut result = 0_i64;
    let mut shift = 0;

    loop {
        let Some(&byte) = bytes.get(*position) else {
            return Err(PolylineError::Truncated);
        };
        if !(63..127).contains(&byte) || shift > 56 {
            return Err(PolylineError::InvalidCharacter {
                character: byte as char,
                position: *position,
            });
        }
        *position += 1;

        let chunk = (byte - 63) as i64;
        result |= (chunk & 0x1f) << shift;
        shift += 5;

        if chunk < 0x20 {
            break;
        }
    }

    if result & 1 == 1 {
        Ok(!(result >> 1))
    } else {
        Ok(result >> 1)
    }
}

#[cfg(test)]
pub(crate) fn encode(points: &[wayfarer_core::geometry::GeoPoint], precision: u32) -> String {
    fn push_value(value: i64, out: &mut String) {
        let mut value = if value < 0 { !(value << 1) } else { value << 1 };
        while value >= 0x20 {
            out.push((((value & 0x1f) | 0x20) as u8 + 63) as char);
            value >>= 5;
        }
        out.push((value as u8 + 63) as char);
    }

    let factor = 10_f64.powi(precision as i32);
    let mut out = String::new();
    let (mut previous_lat, mut previous_lng) = (0_i64, 0_i64);

    for point in points {
        let lat = (point.lat * factor).round() as i64;
        let lng = (point.lng * factor).round() as i64;
        push_value(lat - previous_lat, &mut out);
        push_value(lng - previous_lng, &mut out);
        previous_lat = lat;
        previous_lng = lng;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfarer_core::geometry::GeoPoint;

    fn assert_close(actual: &LineString<f64>, expected: &[(f64, f64)]) {
        assert_eq!(actual.0.len(), expected.len());
        for (point, (lat, lng)) in actual.points().zip(expected) {
            assert!((point.y() - lat).abs() < 1e-9, "{point:?}");
            assert!((point.x() - lng).abs() < 1e-9, "{point:?}");
        }
    }

    #[test]
    fn test_decode_reference_polyline() {
        let points = decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@", 5).unwrap();

        assert_close(
            &points,
            &[(38.5, -120.2), (40.7, -120.95), (43.252, -126.453)],
        );
    }

    #[test]
    fn test_precision_scales_coordinates() {
        let points = decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@", VALHALLA_PRECISION).unwrap();

        assert_close(
            &points,
            &[(3.85, -12.02), (4.07, -12.095), (4.3252, -12.6453)],
        );
    }

    #[test]
    fn test_encoded_shape_decodes_back() {
        let shape = vec![
            GeoPoint::new(36.700_001, -119.400_002),
            GeoPoint::new(36.701_234, -119.398_765),
            GeoPoint::new(-12.5, 130.25),
        ];

        let decoded = decode(&encode(&shape, VALHALLA_PRECISION), VALHALLA_PRECISION).unwrap();

        assert_close(
            &decoded,
            &shape.iter().map(|p| (p.lat, p.lng)).collect::<Vec<_>>(),
        );
    }

    #[test]
    fn test_empty_polyline() {
        assert!(decode("", VALHALLA_PRECISION).unwrap().0.is_empty());
    }

    #[test]
    fn test_truncated_polyline() {
        // Latitude without longitude
        assert_eq!(decode("_p~iF", 5), Err(PolylineError::Truncated));
        // Continuation bit set on the last character
        assert_eq!(decode("_p~iF~ps|", 5), Err(PolylineError::Truncated));
    }

    #[test]
    fn test_invalid_character() {
        assert_eq!(
            decode("_p~iF ps|U", 5),
            Err(PolylineError::InvalidCharacter {
                character: ' ',
                position: 5
            })
        );
    }
}
