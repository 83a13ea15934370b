//! Duration parsing for query parameters and environment variables
//! (`spec.md` §4.D).
//!
//! Accepts Go-style duration strings (`"500ms"`, `"2s"`, `"1m30s"`) the way
//! the original httpbin-family tools do, plus a bare number interpreted as
//! a count of seconds (`"2.5"` -> 2.5s) since several endpoints (`/delay`,
//! `/drip`) accept either form. Negative and non-finite values are
//! rejected; callers needing an upper bound apply `bounded` themselves
//! against `Options::max_duration`.

use crate::error::Error;
use std::time::Duration;

const UNITS: &[(&str, f64)] = &[
    ("ns", 1e-9),
    ("us", 1e-6),
    ("\u{b5}s", 1e-6), // micro sign, in case a client sends it literally
    ("ms", 1e-3),
    ("s", 1.0),
    ("m", 60.0),
    ("h", 3600.0),
];

/// Parses a single numeric-magnitude + unit pair, e.g. `"250ms"`. Returns
/// the value in seconds.
fn parse_component(component: &str) -> Result<f64, Error> {
    let split_at = component
        .find(|c: char| !c.is_ascii_digit() && c != '.' && c != '-')
        .ok_or_else(|| Error::BadRequest(format!("invalid duration component: {component}")))?;
    let (magnitude, unit) = component.split_at(split_at);

    let value: f64 = magnitude
        .parse()
        .map_err(|_| Error::BadRequest(format!("invalid duration magnitude: {magnitude}")))?;

    let factor = UNITS
        .iter()
        .find(|(name, _)| *name == unit)
        .map(|(_, factor)| *factor)
        .ok_or_else(|| Error::BadRequest(format!("unknown duration unit: {unit}")))?;

    Ok(value * factor)
}

/// Parses a Go-style duration string, or a bare float/int as seconds.
pub fn parse_duration(input: &str) -> Result<Duration, Error> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::BadRequest("empty duration".into()));
    }

    if let Ok(seconds) = input.parse::<f64>() {
        return seconds_to_duration(seconds);
    }

    let mut total = 0.0;
    let mut rest = input;
    let mut matched_any = false;
    while !rest.is_empty() {
        let split_at = rest
            .find(|c: char| c.is_ascii_alphabetic() || c == '\u{b5}')
            .ok_or_else(|| Error::BadRequest(format!("invalid duration string: {input}")))?;
        let unit_end = rest[split_at..]
            .find(|c: char| c.is_ascii_digit() || c == '-')
            .map(|offset| split_at + offset)
            .unwrap_or(rest.len());
        let (component, remainder) = rest.split_at(unit_end);
        total += parse_component(component)?;
        matched_any = true;
        rest = remainder;
    }

    if !matched_any {
        return Err(Error::BadRequest(format!("invalid duration string: {input}")));
    }
    seconds_to_duration(total)
}

fn seconds_to_duration(seconds: f64) -> Result<Duration, Error> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(Error::BadRequest(format!(
            "duration must be a non-negative finite number of seconds, got {seconds}"
        )));
    }
    Ok(Duration::from_secs_f64(seconds))
}

/// Clamps `requested` to `max`, per the Drip/Delay/SSE Non-goal that lets
/// an operator cap how long any single request may hang.
pub fn bounded(requested: Duration, max: Duration) -> Duration {
    requested.min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_seconds() {
        assert_eq!(parse_duration("2.5").unwrap(), Duration::from_secs_f64(2.5));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parses_go_style_durations() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(
            parse_duration("1m30s").unwrap(),
            Duration::from_secs(90)
        );
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
    }

    #[test]
    fn rejects_negative_and_garbage() {
        assert!(parse_duration("-5s").is_err());
        assert!(parse_duration("banana").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn bounded_clamps_to_max() {
        let max = Duration::from_secs(10);
        assert_eq!(bounded(Duration::from_secs(20), max), max);
        assert_eq!(bounded(Duration::from_secs(5), max), Duration::from_secs(5));
    }
}
