//! Completed-session log.
//!
//! The log is a pretty-printed JSON array rewritten in full on every change.
//! A missing, unreadable or malformed file reads as an empty log. Entries
//! that do not read as a complete record are kept verbatim on rewrite.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{Result, StorageError};
use crate::format::trimmed;
use crate::interval::IntervalType;

pub const SESSIONS_FILENAME: &str = "sessions.json";

/// One finished interval.
///
/// Reading is lenient: a null or non-string `tag` reads as empty and
/// fractional seconds are rounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub tag: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub interval_type: String,
    #[serde(default, deserialize_with = "whole_seconds")]
    pub started_at: i64,
    #[serde(default, deserialize_with = "whole_seconds")]
    pub ended_at: i64,
    #[serde(default, deserialize_with = "whole_seconds")]
    pub duration_seconds: i64,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub note: Option<String>,
    /// Fields this version does not know, kept on rewrite.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    Ok(lenient_text(d)?.unwrap_or_default())
}

fn whole_seconds<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<i64, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(value
        .as_i64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|n| n.is_finite())
                .map(|n| n.round() as i64)
        })
        .unwrap_or(0))
}

/// A log entry as found on disk.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum LogEntry {
    Record(SessionRecord),
    Raw(Value),
}

impl LogEntry {
    fn parse(entry: Value) -> Self {
        match serde_json::from_value::<SessionRecord>(entry.clone()) {
            Ok(record) if is_complete(&record) => LogEntry::Record(record),
            Ok(record) => {
                debug!(id = %record.id, "keeping incomplete session record as is");
                LogEntry::Raw(entry)
            }
            Err(e) => {
                debug!(error = %e, "keeping unreadable session entry as is");
                LogEntry::Raw(entry)
            }
        }
    }
}

impl SessionRecord {
    pub fn kind(&self) -> Option<IntervalType> {
        IntervalType::from_wire(&self.interval_type)
    }
}

/// Partial update of a logged session. `Some` replaces the field (a blank
/// string clears it); `None` leaves it untouched.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub note: Option<String>,
    pub name: Option<String>,
}

/// Resolve where the session log lives.
///
/// The override may be absolute, `~`-relative or relative to `support_dir`.
/// An override without a file extension is treated as a directory holding
/// `sessions.json`.
pub fn resolve_sessions_path(support_dir: &Path, override_path: Option<&str>) -> PathBuf {
    let Some(raw) = override_path.map(str::trim).filter(|s| !s.is_empty()) else {
        return support_dir.join(SESSIONS_FILENAME);
    };

    let expanded = expand_home(raw);
    let base = if expanded.is_absolute() {
        expanded
    } else {
        support_dir.join(expanded)
    };

    if base.extension().is_some() {
        base
    } else {
        base.join(SESSIONS_FILENAME)
    }
}

fn expand_home(raw: &str) -> PathBuf {
    let home = || dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    if raw == "~" {
        home()
    } else if let Some(rest) = raw.strip_prefix("~/") {
        home().join(rest)
    } else {
        PathBuf::from(raw)
    }
}

pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store at the resolved location for a data directory and optional override.
    pub fn open(support_dir: &Path, override_path: Option<&str>) -> Self {
        Self::new(resolve_sessions_path(support_dir, override_path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every well-formed record in the log. Entries lacking an id or either
    /// timestamp are skipped.
    pub fn load_sessions(&self) -> Vec<SessionRecord> {
        self.read_entries()
            .into_iter()
            .filter_map(|entry| match entry {
                LogEntry::Record(record) => Some(record),
                LogEntry::Raw(_) => None,
            })
            .collect()
    }

    fn read_entries(&self) -> Vec<LogEntry> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %self.path.display(), error = %e, "session log unreadable");
                }
                return Vec::new();
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Array(entries)) => entries.into_iter().map(LogEntry::parse).collect(),
            Ok(_) => {
                warn!(path = %self.path.display(), "session log is not a JSON array");
                Vec::new()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "session log is malformed");
                Vec::new()
            }
        }
    }

    fn write_entries<T: Serialize>(&self, entries: &[T]) -> Result<()> {
        let write_failed = |source| StorageError::WriteFailed {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(write_failed)?;
        }
        let content = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, content).map_err(write_failed)?;
        Ok(())
    }

    /// Overwrite the log with `sessions`, creating parent directories.
    pub fn save_sessions(&self, sessions: &[SessionRecord]) -> Result<()> {
        self.write_entries(sessions)
    }

    /// Append `record`, leaving every existing entry in place.
    pub fn add_session(&self, record: SessionRecord) -> Result<SessionRecord> {
        let mut entries = self.read_entries();
        entries.push(LogEntry::Record(record.clone()));
        self.write_entries(&entries)?;
        Ok(record)
    }

    /// Apply a note/name update. Returns `None` when no record has `id`.
    pub fn update_session_record(
        &self,
        id: &str,
        update: SessionUpdate,
    ) -> Result<Option<SessionRecord>> {
        let mut entries = self.read_entries();
        let Some(existing) = entries.iter_mut().find_map(|entry| match entry {
            LogEntry::Record(record) if record.id == id => Some(record),
            _ => None,
        }) else {
            return Ok(None);
        };

        if let Some(note) = update.note.as_deref() {
            existing.note = trimmed(Some(note));
        }
        if let Some(name) = update.name.as_deref() {
            existing.name = trimmed(Some(name));
        }
        let updated = existing.clone();

        self.write_entries(&entries)?;
        Ok(Some(updated))
    }

    pub fn find_session(&self, id: &str) -> Option<SessionRecord> {
        self.load_sessions().into_iter().find(|s| s.id == id)
    }

    /// Distinct non-empty tags, sorted.
    pub fn get_known_tags(&self) -> Vec<String> {
        self.load_sessions()
            .into_iter()
            .map(|s| s.tag)
            .filter(|tag| !tag.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

fn is_complete(record: &SessionRecord) -> bool {
    !record.id.is_empty() && record.started_at != 0 && record.ended_at != 0
}
