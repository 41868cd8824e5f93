use jiff::SpanRelativeTo;
use wayfarer_core::geometry::GeoPoint;

pub fn parse_duration(input: &str) -> Result<jiff::SignedDuration, String> {
    if let Ok(duration) = input.parse::<jiff::SignedDuration>() {
        return Ok(duration);
    }

    if let Ok(duration) = input
        .parse::<jiff::Span>()
        .and_then(|span| span.to_duration(SpanRelativeTo::days_are_24_hours()))
    {
        return Ok(duration);
    }

    if let Ok(seconds) = input.parse::<i64>() {
        return Ok(jiff::SignedDuration::from_secs(seconds.abs()));
    }

    Err(String::from("Invalid duration"))
}

/// Like [`parse_duration`], rejecting zero.
pub fn parse_positive_duration(input: &str) -> Result<jiff::SignedDuration, String> {
    let duration = parse_duration(input)?;
    if duration.is_zero() {
        return Err(String::from("Duration must be greater than zero"));
    }

    Ok(duration.abs())
}

pub const MIN_SPEED: f64 = 0.01;
pub const MAX_SPEED: f64 = 1000.0;

/// Replay speed multiplier, within [0.01, 1000].
pub fn parse_speed(input: &str) -> Result<f64, String> {
    let speed: f64 = input
        .trim()
        .parse()
        .map_err(|_| format!("Invalid speed \"{input}\""))?;

    if !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
        return Err(format!("Speed must be within [{MIN_SPEED}, {MAX_SPEED}], got {speed}"));
    }

    Ok(speed)
}

/// Parses `lat,lng` in decimal degrees.
pub fn parse_point(input: &str) -> Result<GeoPoint, String> {
    let Some((lat, lng)) = input.split_once(',') else {
        return Err(format!("Expected \"lat,lng\", got \"{input}\""));
    };

    let lat: f64 = lat.trim().parse().map_err(|_| format!("Invalid latitude \"{lat}\""))?;
    let lng: f64 = lng.trim().parse().map_err(|_| format!("Invalid longitude \"{lng}\""))?;

    if !(-90.0..=90.0).contains(&lat) {
        return Err(format!("Latitude {lat} is out of range"));
    }
    if !(-180.0..=180.0).contains(&lng) {
        return Err(format!("Longitude {lng} is out of range"));
    }

    Ok(GeoPoint::new(lat, lng))
}
