//! Display helpers for durations and tags.

/// Render a second count as a countdown clock: `MM:SS`, or `H:MM:SS` once
/// the value reaches an hour. Negative input renders as `00:00`.
pub fn seconds_to_time(seconds: i64) -> String {
    let total = seconds.max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}

/// Compact duration used in the session log, e.g. `25m`, `1m 5s`.
pub fn format_duration(seconds: i64) -> String {
    if seconds <= 0 {
        return "0s".to_string();
    }
    let minutes = seconds / 60;
    let secs = seconds % 60;
    let mut parts = Vec::with_capacity(2);
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if secs > 0 {
        parts.push(format!("{secs}s"));
    }
    parts.join(" ")
}

/// Hash-prefixed tag label, or `None` for a blank tag.
pub fn tag_label(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.starts_with('#') {
        Some(trimmed.to_string())
    } else {
        Some(format!("#{trimmed}"))
    }
}

/// Trim a free-text field, mapping blank input to `None`.
pub fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
