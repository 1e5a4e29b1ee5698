//! Front-end timer commands.
//!
//! Thin wrappers over the machine that also remember the chosen setup and
//! ask the UI to refresh afterwards.

use tracing::warn;

use super::machine::{CreateOptions, IntervalMachine};
use super::types::{Interval, IntervalType};
use crate::error::Result;
use crate::storage::{RecentChoiceStore, SessionChoice, SessionRecord};

#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    /// Length in seconds; absent uses the configured default.
    pub duration: Option<u64>,
    pub tag: Option<String>,
    pub is_fresh_start: Option<bool>,
    pub name: Option<String>,
}

impl IntervalMachine {
    pub fn recent_choices(&self) -> RecentChoiceStore<'_> {
        RecentChoiceStore::new(self.state())
    }

    /// Start an interval and record its setup as the latest recent choice.
    pub fn start_timer(&self, interval_type: IntervalType, options: StartOptions) -> Result<Interval> {
        let interval = self.create_interval(
            interval_type,
            CreateOptions {
                is_fresh_start: options.is_fresh_start.unwrap_or(false),
                custom_duration: options.duration,
                tag: options.tag,
                name: options.name,
                started_at: None,
            },
        )?;

        let choice = SessionChoice {
            interval_type,
            duration_seconds: interval.length,
            tag: interval.tag.clone(),
            name: interval.name.clone(),
            updated_at: self.now_ms(),
        };
        if let Err(e) = self.recent_choices().save_recent_session_choice(&choice) {
            warn!(error = %e, "failed to remember session choice");
        }

        self.collaborators().handoff.request_refresh();
        Ok(interval)
    }

    pub fn pause_timer(&self) -> Result<Option<Interval>> {
        let interval = self.pause_interval()?;
        self.collaborators().handoff.request_refresh();
        Ok(interval)
    }

    pub fn continue_timer(&self) -> Result<Option<Interval>> {
        let interval = self.continue_interval()?;
        self.collaborators().handoff.request_refresh();
        Ok(interval)
    }

    /// Log and clear the current interval, then switch focus mode off.
    pub fn stop_timer(&self) -> Result<Option<SessionRecord>> {
        let record = self.reset_interval(false)?;
        self.set_focus_mode(false);
        self.collaborators().handoff.request_refresh();
        Ok(record)
    }
}
