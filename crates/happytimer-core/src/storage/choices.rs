//! Recently used timer configurations, newest first.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::state::StateStore;
use crate::error::Result;
use crate::format::trimmed;
use crate::interval::IntervalType;

pub const RECENT_CHOICES_KEY: &str = "recent-session-choices";
pub const MAX_RECENT_CHOICES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionChoice {
    pub interval_type: IntervalType,
    pub duration_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Epoch milliseconds.
    #[serde(default)]
    pub updated_at: i64,
}

impl SessionChoice {
    fn sanitized(&self) -> Self {
        Self {
            interval_type: self.interval_type,
            duration_seconds: self.duration_seconds,
            tag: trimmed(self.tag.as_deref()),
            name: trimmed(self.name.as_deref()),
            updated_at: self.updated_at,
        }
    }

    fn same_setup(&self, other: &SessionChoice) -> bool {
        self.interval_type == other.interval_type
            && self.duration_seconds == other.duration_seconds
            && self.tag == other.tag
            && self.name == other.name
    }
}

pub struct RecentChoiceStore<'a> {
    state: &'a dyn StateStore,
}

impl<'a> RecentChoiceStore<'a> {
    pub fn new(state: &'a dyn StateStore) -> Self {
        Self { state }
    }

    /// Remember `choice` as the most recent one. Zero-length choices are
    /// ignored; an identical setup moves to the front instead of repeating.
    pub fn save_recent_session_choice(&self, choice: &SessionChoice) -> Result<()> {
        if choice.duration_seconds == 0 {
            return Ok(());
        }
        let choice = choice.sanitized();

        let mut choices = self.get_recent_session_choices();
        choices.retain(|existing| !existing.same_setup(&choice));
        choices.insert(0, choice);
        choices.truncate(MAX_RECENT_CHOICES);

        let json = serde_json::to_string(&choices)?;
        self.state.set(RECENT_CHOICES_KEY, &json)
    }

    /// Stored choices, dropping any entry that no longer validates.
    pub fn get_recent_session_choices(&self) -> Vec<SessionChoice> {
        let raw = match self.state.get(RECENT_CHOICES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = %e, "failed to read recent session choices");
                return Vec::new();
            }
        };

        let entries = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(entries)) => entries,
            _ => {
                warn!("discarding malformed recent session choices");
                return Vec::new();
            }
        };

        entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value::<SessionChoice>(entry).ok())
            .filter(|choice| choice.duration_seconds > 0)
            .map(|choice| choice.sanitized())
            .take(MAX_RECENT_CHOICES)
            .collect()
    }

    pub fn get_latest_session_choice(&self) -> Option<SessionChoice> {
        self.get_recent_session_choices().into_iter().next()
    }
}
