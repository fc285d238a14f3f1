//! Coordinate extraction from loosely-shaped records.
//!
//! The backing services store coordinates under several conventions: flat
//! `latitude`/`longitude` columns, abbreviated `lat`/`lon` or `lat`/`lng`
//! pairs, nested `location` or `coords` objects, and coordinates on a nested
//! owning-account (`user`) object. The resolver probes these in a fixed
//! priority order; the first candidate where *both* components validate
//! wins. A candidate with one valid and one invalid component is rejected
//! whole and the probe continues.

use serde_json::{Map, Value};

/// Parse a single coordinate component.
///
/// Accepts a JSON number or a numeric string (trimmed, whole-string parse).
/// Null, booleans, empty strings, non-numeric strings, and non-finite
/// results are rejected rather than coerced to zero.
pub fn parse_coordinate(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|v| v.is_finite()),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
        }
        _ => None,
    }
}

/// Look up a key on a nested object field.
fn nested<'a>(fields: &'a Map<String, Value>, object: &str, key: &str) -> Option<&'a Value> {
    fields.get(object)?.as_object()?.get(key)
}

/// Extract a validated (latitude, longitude) pair from a record's fields.
///
/// Candidates are probed highest priority first; see the module docs for the
/// order. Pure and deterministic: no I/O, no side effects, never errors.
pub fn resolve_fields(fields: &Map<String, Value>) -> Option<(f64, f64)> {
    let candidates = [
        (fields.get("latitude"), fields.get("longitude")),
        (fields.get("lat"), fields.get("lon")),
        (fields.get("lat"), fields.get("lng")),
        (nested(fields, "location", "lat"), nested(fields, "location", "lon")),
        (nested(fields, "location", "lat"), nested(fields, "location", "lng")),
        (nested(fields, "coords", "lat"), nested(fields, "coords", "lng")),
        (nested(fields, "user", "latitude"), nested(fields, "user", "longitude")),
    ];

    for (latitude, longitude) in candidates {
        let latitude = latitude.and_then(parse_coordinate);
        let longitude = longitude.and_then(parse_coordinate);
        if let (Some(latitude), Some(longitude)) = (latitude, longitude) {
            return Some((latitude, longitude));
        }
    }

    None
}
