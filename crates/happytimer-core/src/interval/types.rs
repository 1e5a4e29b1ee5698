use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const FOCUS_TITLE: &str = "Focus";
pub const SHORT_BREAK_TITLE: &str = "Short Break";
pub const LONG_BREAK_TITLE: &str = "Long Break";

/// Longest accepted interval, so a length always fits signed second arithmetic.
pub const MAX_LENGTH_SECS: u64 = i64::MAX as u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntervalType {
    Focus,
    ShortBreak,
    LongBreak,
}

impl IntervalType {
    pub const ALL: [IntervalType; 3] = [
        IntervalType::Focus,
        IntervalType::ShortBreak,
        IntervalType::LongBreak,
    ];

    /// Wire name, as stored in the session log and the state store.
    pub fn as_str(&self) -> &'static str {
        match self {
            IntervalType::Focus => "focus",
            IntervalType::ShortBreak => "short-break",
            IntervalType::LongBreak => "long-break",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            IntervalType::Focus => FOCUS_TITLE,
            IntervalType::ShortBreak => SHORT_BREAK_TITLE,
            IntervalType::LongBreak => LONG_BREAK_TITLE,
        }
    }

    /// Parse a wire name. Unlike `FromStr` this never allocates an error.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "focus" => Some(IntervalType::Focus),
            "short-break" => Some(IntervalType::ShortBreak),
            "long-break" => Some(IntervalType::LongBreak),
            _ => None,
        }
    }
}

impl fmt::Display for IntervalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntervalType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_wire(s.trim()).ok_or_else(|| ValidationError::UnknownIntervalType(s.to_string()))
    }
}

/// A contiguous running span. Pausing closes a part, continuing opens a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub started_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_at: Option<i64>,
}

impl Part {
    pub fn starting_at(started_at: i64) -> Self {
        Self {
            started_at,
            paused_at: None,
            end_at: None,
        }
    }
}

/// The currently active timer. All timestamps are epoch seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interval {
    pub id: u32,
    #[serde(rename = "type")]
    pub interval_type: IntervalType,
    /// Target length in seconds.
    pub length: u64,
    pub started_at: i64,
    pub parts: Vec<Part>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl Interval {
    /// Pause-exclusive run time up to `now`. Parts whose stop point lies
    /// before their start are ignored.
    pub fn duration_at(&self, now: i64) -> i64 {
        self.parts
            .iter()
            .map(|part| {
                let stop = part.paused_at.unwrap_or(now);
                if stop < part.started_at {
                    0
                } else {
                    stop - part.started_at
                }
            })
            .sum()
    }

    /// Run time used when the interval is logged at `ended_at`. A pause
    /// timestamp earlier than its part's start is treated as absent.
    pub fn elapsed_until(&self, ended_at: i64) -> i64 {
        self.parts
            .iter()
            .map(|part| {
                let stop = match part.paused_at {
                    Some(paused) if paused >= part.started_at => paused,
                    _ => ended_at,
                };
                if stop < part.started_at {
                    0
                } else {
                    stop - part.started_at
                }
            })
            .sum()
    }

    /// Percentage of `length` already run, within `0.0..=100.0`.
    pub fn progress_at(&self, now: i64) -> f64 {
        if self.length == 0 {
            return 0.0;
        }
        let pct = self.duration_at(now) as f64 / self.length as f64 * 100.0;
        if !pct.is_finite() {
            return 0.0;
        }
        pct.clamp(0.0, 100.0)
    }

    /// `length` as signed seconds, saturating at `i64::MAX`.
    pub fn length_secs(&self) -> i64 {
        i64::try_from(self.length).unwrap_or(i64::MAX)
    }

    /// Seconds left before the interval reaches its length, never negative.
    pub fn remaining_at(&self, now: i64) -> i64 {
        self.length_secs().saturating_sub(self.duration_at(now)).max(0)
    }

    pub fn is_paused(&self) -> bool {
        self.parts
            .last()
            .map(|part| part.paused_at.is_some())
            .unwrap_or(false)
    }
}

/// Describes which interval should follow the one that just ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalExecutor {
    pub title: String,
    pub interval_type: IntervalType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_fresh_start: Option<bool>,
}

impl IntervalExecutor {
    pub(crate) fn new(interval_type: IntervalType, is_fresh_start: Option<bool>) -> Self {
        Self {
            title: interval_type.title().to_string(),
            interval_type,
            is_fresh_start,
        }
    }

    /// An omitted flag restarts the cycle counter.
    pub fn fresh_start(&self) -> bool {
        self.is_fresh_start.unwrap_or(true)
    }
}

/// Point-in-time view of an interval for status output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalSnapshot {
    pub id: u32,
    #[serde(rename = "type")]
    pub interval_type: IntervalType,
    pub title: String,
    pub length: u64,
    pub elapsed: i64,
    pub remaining: i64,
    pub progress: f64,
    pub paused: bool,
    pub started_at: i64,
    pub parts: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl IntervalSnapshot {
    pub fn at(interval: &Interval, now: i64) -> Self {
        Self {
            id: interval.id,
            interval_type: interval.interval_type,
            title: interval.interval_type.title().to_string(),
            length: interval.length,
            elapsed: interval.duration_at(now).min(interval.length_secs()),
            remaining: interval.remaining_at(now),
            progress: interval.progress_at(now),
            paused: interval.is_paused(),
            started_at: interval.started_at,
            parts: interval.parts.len(),
            tag: interval.tag.clone(),
            name: interval.name.clone(),
        }
    }
}
