//! Validation of the persisted current interval.
//!
//! The stored payload may be stale, hand-edited or half written. Reading it
//! back never fails: the payload is either repaired into a usable
//! [`Interval`] or discarded as a whole.

use serde_json::{Map, Value};

use super::types::{Interval, IntervalType, Part, MAX_LENGTH_SECS};
use crate::storage::TimerSettings;

/// Outcome of reading back a persisted interval.
#[derive(Debug, Clone, PartialEq)]
pub enum Sanitized {
    Valid(Interval),
    Discarded(&'static str),
}

impl Sanitized {
    pub fn into_interval(self) -> Option<Interval> {
        match self {
            Sanitized::Valid(interval) => Some(interval),
            Sanitized::Discarded(_) => None,
        }
    }
}

/// Parse and sanitize a raw JSON payload.
pub fn parse_interval(raw: &str, settings: &TimerSettings, now: i64) -> Sanitized {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => sanitize_interval(&value, settings, now),
        Err(_) => Sanitized::Discarded("payload is not valid JSON"),
    }
}

/// Repair a decoded payload.
///
/// - an unknown `type` discards the record
/// - a non-positive `length` falls back to the configured default
/// - a fractional `length` is rounded to whole seconds, so one that rounds
///   to zero also falls back to the default; lengths above
///   [`MAX_LENGTH_SECS`] are capped
/// - parts without a usable `startedAt` are dropped; `pausedAt`/`endAt`
///   survive only when numeric and not before `startedAt`
/// - with no parts left, a single part starting at `now` is synthesized
pub fn sanitize_interval(value: &Value, settings: &TimerSettings, now: i64) -> Sanitized {
    let Some(obj) = value.as_object() else {
        return Sanitized::Discarded("payload is not an object");
    };

    let Some(interval_type) = obj
        .get("type")
        .and_then(Value::as_str)
        .and_then(IntervalType::from_wire)
    else {
        return Sanitized::Discarded("unknown interval type");
    };

    let length = number_like(obj.get("length"))
        .filter(|n| *n > 0.0)
        .map(|n| (n.round() as u64).min(MAX_LENGTH_SECS))
        .filter(|n| *n > 0)
        .unwrap_or_else(|| settings.default_length(interval_type));

    let mut parts: Vec<Part> = obj
        .get("parts")
        .and_then(Value::as_array)
        .map(|raw| raw.iter().filter_map(sanitize_part).collect())
        .unwrap_or_default();

    if parts.is_empty() {
        parts.push(Part::starting_at(now));
    }

    let id = number_like(obj.get("id"))
        .filter(|n| *n >= 0.0)
        .map(|n| n.min(u32::MAX as f64) as u32)
        .unwrap_or(0);

    let started_at = parse_timestamp(obj.get("startedAt")).unwrap_or(parts[0].started_at);

    Sanitized::Valid(Interval {
        id,
        interval_type,
        length,
        started_at,
        parts,
        tag: string_field(obj, "tag"),
        name: string_field(obj, "name"),
        note: string_field(obj, "note"),
        session_id: string_field(obj, "sessionId"),
    })
}

fn sanitize_part(raw: &Value) -> Option<Part> {
    let obj = raw.as_object()?;
    let started_at = parse_timestamp(obj.get("startedAt")).filter(|ts| *ts != 0)?;
    let paused_at = parse_timestamp(obj.get("pausedAt")).filter(|ts| *ts >= started_at);
    let end_at = parse_timestamp(obj.get("endAt")).filter(|ts| *ts >= started_at);
    Some(Part {
        started_at,
        paused_at,
        end_at,
    })
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Epoch-second timestamp from a JSON number or a string with a leading
/// integer (`"1700000000"`, `"1700000000.5"`).
pub(crate) fn parse_timestamp(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => parse_int_prefix(s),
        _ => None,
    }
}

fn parse_int_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, digits) = match s.as_bytes().first()? {
        b'-' => (-1, &s[1..]),
        b'+' => (1, &s[1..]),
        _ => (1, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

fn number_like(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}
