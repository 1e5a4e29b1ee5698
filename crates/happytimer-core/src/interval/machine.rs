//! Interval state machine.
//!
//! The machine keeps no time of its own. The current interval is a record in
//! the injected [`StateStore`], and every query recomputes elapsed time from
//! the stored part timestamps against the injected [`Clock`].
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!   ^        |          |
//!   +--------+----------+   reset / completion
//! ```
//!
//! Completion is detected by the caller: poll [`IntervalMachine::poll`] (or
//! run [`check_completion`] yourself) and the machine logs the session and
//! hands off to the [`Handoff`](crate::bridge::Handoff) collaborator.

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::sanitize::{parse_interval, Sanitized};
use super::types::{
    Interval, IntervalExecutor, IntervalSnapshot, IntervalType, Part, MAX_LENGTH_SECS,
};
use crate::bridge::{Collaborators, CompletionContext, HandoffRoute};
use crate::clock::Clock;
use crate::error::Result;
use crate::format::{seconds_to_time, tag_label, trimmed};
use crate::storage::{SessionRecord, SessionStore, StateStore, TimerSettings};

pub const CURRENT_INTERVAL_KEY: &str = "current-interval/1.1";
pub const COMPLETED_COUNT_KEY: &str = "completed-count";
pub const INTERVAL_HISTORY_KEY: &str = "interval-history";

const SESSION_LOGGED_TITLE: &str = "Session logged";

#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    /// Restart the completed-cycle counter at zero.
    pub is_fresh_start: bool,
    /// Length in seconds; zero or absent uses the configured default.
    pub custom_duration: Option<u64>,
    pub tag: Option<String>,
    pub started_at: Option<i64>,
    pub name: Option<String>,
}

/// New details for the running interval. Name and tag are always replaced
/// (blank or absent clears them); the length only changes when a finite
/// duration that rounds to at least one second is given.
#[derive(Debug, Clone, Default)]
pub struct IntervalDetails {
    pub name: Option<String>,
    pub tag: Option<String>,
    pub duration_seconds: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Completion {
    Completed,
    StillRunning { remaining: i64 },
}

/// Whether `interval` has run its full length at `now`.
pub fn check_completion(interval: &Interval, now: i64) -> Completion {
    if interval.progress_at(now) >= 100.0 {
        Completion::Completed
    } else {
        Completion::StillRunning {
            remaining: interval.remaining_at(now),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOutcome {
    pub context: CompletionContext,
    pub route: HandoffRoute,
}

#[derive(Debug, Clone)]
pub enum PollOutcome {
    Idle,
    Running(IntervalSnapshot),
    Completed(CompletionOutcome),
}

pub struct IntervalMachine {
    state: Box<dyn StateStore>,
    sessions: SessionStore,
    settings: TimerSettings,
    clock: Box<dyn Clock>,
    collaborators: Collaborators,
}

impl IntervalMachine {
    pub fn new(
        state: Box<dyn StateStore>,
        sessions: SessionStore,
        settings: TimerSettings,
        clock: Box<dyn Clock>,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            state,
            sessions,
            settings,
            clock,
            collaborators,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn state(&self) -> &dyn StateStore {
        self.state.as_ref()
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    pub(crate) fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// The current interval, sanitized. A repaired payload is written back;
    /// an unusable one reads as no interval.
    pub fn current_interval(&self) -> Option<Interval> {
        let raw = match self.state.get(CURRENT_INTERVAL_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "failed to read current interval");
                return None;
            }
        };

        match parse_interval(&raw, &self.settings, self.now()) {
            Sanitized::Valid(interval) => {
                if let Err(e) = self.write_current(&interval) {
                    warn!(error = %e, "failed to write back sanitized interval");
                }
                Some(interval)
            }
            Sanitized::Discarded(reason) => {
                warn!(reason, "discarding stored current interval");
                None
            }
        }
    }

    pub fn snapshot(&self) -> Option<IntervalSnapshot> {
        self.current_interval()
            .map(|interval| IntervalSnapshot::at(&interval, self.now()))
    }

    pub fn duration(&self, interval: &Interval) -> i64 {
        interval.duration_at(self.now())
    }

    pub fn progress(&self, interval: &Interval) -> f64 {
        interval.progress_at(self.now())
    }

    pub fn is_paused(&self, interval: &Interval) -> bool {
        interval.is_paused()
    }

    /// Intervals created since the last fresh start. Unreadable values count as zero.
    pub fn completed_count(&self) -> u32 {
        match self.state.get(COMPLETED_COUNT_KEY) {
            Ok(Some(raw)) => raw.trim().parse().unwrap_or(0),
            Ok(None) => 0,
            Err(e) => {
                warn!(error = %e, "failed to read completed count");
                0
            }
        }
    }

    /// Audit trail of intervals, including ones still running.
    pub fn interval_history(&self) -> Vec<Interval> {
        let raw = match self.state.get(INTERVAL_HISTORY_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = %e, "failed to read interval history");
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<serde_json::Value>>(&raw) {
            Ok(entries) => entries
                .into_iter()
                .filter_map(|entry| serde_json::from_value(entry).ok())
                .collect(),
            Err(e) => {
                warn!(error = %e, "interval history is malformed");
                Vec::new()
            }
        }
    }

    /// Insert `interval` into the history, replacing an entry with the same id.
    pub fn save_interval_history(&self, interval: &Interval) -> Result<()> {
        let mut history = self.interval_history();
        match history.iter_mut().find(|i| i.id == interval.id) {
            Some(existing) => *existing = interval.clone(),
            None => history.push(interval.clone()),
        }
        let json = serde_json::to_string(&history)?;
        self.state.set(INTERVAL_HISTORY_KEY, &json)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a new interval and make it current.
    ///
    /// Unless `is_fresh_start` is set, the completed-cycle counter advances
    /// by one for every interval created, breaks included.
    pub fn create_interval(
        &self,
        interval_type: IntervalType,
        options: CreateOptions,
    ) -> Result<Interval> {
        let completed_count = if options.is_fresh_start {
            0
        } else {
            self.completed_count().saturating_add(1)
        };
        self.state
            .set(COMPLETED_COUNT_KEY, &completed_count.to_string())?;

        let started_at = options.started_at.unwrap_or_else(|| self.now());
        let length = options
            .custom_duration
            .filter(|secs| *secs > 0)
            .map(|secs| secs.min(MAX_LENGTH_SECS))
            .unwrap_or_else(|| self.settings.default_length(interval_type));

        let interval = Interval {
            id: completed_count,
            interval_type,
            length,
            started_at,
            parts: vec![Part::starting_at(started_at)],
            tag: options.tag,
            name: options.name,
            note: None,
            session_id: None,
        };

        self.write_current(&interval)?;
        self.save_interval_history(&interval)?;
        if interval_type == IntervalType::Focus {
            self.set_focus_mode(true);
        }
        info!(
            id = interval.id,
            interval_type = %interval_type,
            length = interval.length,
            "interval started"
        );
        Ok(interval)
    }

    /// Close the running part. Pausing an already paused interval changes nothing.
    pub fn pause_interval(&self) -> Result<Option<Interval>> {
        let Some(mut interval) = self.current_interval() else {
            return Ok(None);
        };
        if interval.is_paused() {
            return Ok(Some(interval));
        }

        let now = self.now();
        if let Some(last) = interval.parts.last_mut() {
            last.paused_at = Some(now);
        }
        self.write_current(&interval)?;
        if interval.interval_type == IntervalType::Focus {
            self.set_focus_mode(false);
        }
        debug!(id = interval.id, "interval paused");
        Ok(Some(interval))
    }

    /// Open a new part. Continuing a running interval changes nothing.
    pub fn continue_interval(&self) -> Result<Option<Interval>> {
        let Some(mut interval) = self.current_interval() else {
            return Ok(None);
        };
        if !interval.is_paused() {
            return Ok(Some(interval));
        }

        interval.parts.push(Part::starting_at(self.now()));
        self.write_current(&interval)?;
        if interval.interval_type == IntervalType::Focus {
            self.set_focus_mode(true);
        }
        debug!(id = interval.id, parts = interval.parts.len(), "interval continued");
        Ok(Some(interval))
    }

    /// End the current interval, logging it unless `skip_log` is set.
    ///
    /// The current interval is cleared on every path, including when
    /// writing the session log fails.
    pub fn reset_interval(&self, skip_log: bool) -> Result<Option<SessionRecord>> {
        let logged = if skip_log {
            Ok(None)
        } else {
            self.log_current_for_reset()
        };
        let cleared = self.state.remove(CURRENT_INTERVAL_KEY);

        let record = logged?;
        cleared?;
        Ok(record)
    }

    fn log_current_for_reset(&self) -> Result<Option<SessionRecord>> {
        let Some(mut interval) = self.current_interval() else {
            self.collaborators
                .notifier
                .notify(SESSION_LOGGED_TITLE, "No active session, nothing to record");
            return Ok(None);
        };

        let ended_at = self.now();
        if let Some(last) = interval.parts.last_mut() {
            let valid_end = last.end_at.is_some_and(|end| end >= last.started_at);
            if !valid_end {
                last.end_at = Some(ended_at);
            }
        }

        self.save_interval_history(&interval)?;
        let record = self.log_interval_session(&interval, ended_at)?;

        let mut details = Vec::with_capacity(3);
        if let Some(name) = record.name.clone().or_else(|| trimmed(interval.name.as_deref())) {
            details.push(name);
        }
        details.push(format!(
            "{} • {}",
            interval.interval_type.title(),
            seconds_to_time(record.duration_seconds)
        ));
        if let Some(tag) = tag_label(&record.tag) {
            details.push(tag);
        }
        self.collaborators
            .notifier
            .notify(SESSION_LOGGED_TITLE, &details.join(" • "));

        Ok(Some(record))
    }

    /// Start the current interval over with the same type, tag and name,
    /// continuing the cycle count.
    pub fn restart_interval(&self) -> Result<Option<Interval>> {
        let Some(current) = self.current_interval() else {
            return Ok(None);
        };
        if current.interval_type == IntervalType::Focus {
            self.set_focus_mode(true);
        }
        self.create_interval(
            current.interval_type,
            CreateOptions {
                is_fresh_start: false,
                tag: current.tag,
                name: current.name,
                ..CreateOptions::default()
            },
        )
        .map(Some)
    }

    /// Rename, retag or resize the running interval. A new length never
    /// drops below the time already run and is capped at [`MAX_LENGTH_SECS`].
    pub fn update_current_interval_details(
        &self,
        details: IntervalDetails,
    ) -> Result<Option<Interval>> {
        let Some(mut interval) = self.current_interval() else {
            return Ok(None);
        };

        interval.name = trimmed(details.name.as_deref());
        interval.tag = trimmed(details.tag.as_deref());

        if let Some(requested) = details
            .duration_seconds
            .filter(|secs| secs.is_finite() && secs.round() >= 1.0)
        {
            let elapsed = interval.duration_at(self.now()).max(0) as u64;
            let rounded = (requested.round() as u64).min(MAX_LENGTH_SECS);
            interval.length = rounded.max(elapsed);
        }

        self.write_current(&interval)?;
        self.save_interval_history(&interval)?;
        Ok(Some(interval))
    }

    /// Log a finished interval and hand off to the completion UI.
    ///
    /// The current interval is left in place; callers clear it after the
    /// handoff (see [`IntervalMachine::get_next_interval_executor`]).
    pub fn end_of_interval(&self, interval: &mut Interval) -> Result<CompletionOutcome> {
        let ended_at = self.now();
        if let Some(last) = interval.parts.last_mut() {
            last.end_at = Some(ended_at);
        }
        self.save_interval_history(interval)?;

        let record = self.log_interval_session(interval, ended_at)?;
        interval.session_id = Some(record.id.clone());
        interval.note = record.note.clone();
        if let Some(name) = &record.name {
            interval.name = Some(name.clone());
        }

        let context = CompletionContext {
            current_interval: interval.clone(),
            session_record: record,
        };
        let route = if interval.interval_type == IntervalType::Focus
            && self.settings.focus_mode_enabled
        {
            self.collaborators.focus_mode.try_set_focus_mode(false);
            HandoffRoute::AfterFocusModeOff
        } else {
            HandoffRoute::Direct
        };
        self.collaborators.handoff.request_handoff(&context, route);
        info!(
            id = interval.id,
            session_id = %context.session_record.id,
            "interval completed"
        );

        Ok(CompletionOutcome { context, route })
    }

    /// Check the current interval and finish it if it has run its length.
    pub fn poll(&self) -> Result<PollOutcome> {
        let Some(mut interval) = self.current_interval() else {
            return Ok(PollOutcome::Idle);
        };
        let now = self.now();
        match check_completion(&interval, now) {
            Completion::Completed => self
                .end_of_interval(&mut interval)
                .map(PollOutcome::Completed),
            Completion::StillRunning { .. } => {
                Ok(PollOutcome::Running(IntervalSnapshot::at(&interval, now)))
            }
        }
    }

    /// Clear the current interval (without logging) and decide what comes next.
    ///
    /// After a break the next interval is focus. After focus (or with no
    /// interval at all) it is a long break when the cycle count equals the
    /// configured threshold, otherwise a short break.
    pub fn get_next_interval_executor(&self) -> Result<IntervalExecutor> {
        let current = self.current_interval();
        self.reset_interval(true)?;

        let completed_count = self.completed_count();
        let executor = match current.map(|i| i.interval_type) {
            Some(IntervalType::ShortBreak) => {
                IntervalExecutor::new(IntervalType::Focus, Some(false))
            }
            Some(IntervalType::LongBreak) => IntervalExecutor::new(IntervalType::Focus, None),
            Some(IntervalType::Focus) | None => {
                if completed_count == self.settings.long_break_threshold {
                    IntervalExecutor::new(IntervalType::LongBreak, None)
                } else {
                    IntervalExecutor::new(IntervalType::ShortBreak, Some(false))
                }
            }
        };
        debug!(
            completed_count,
            next = %executor.interval_type,
            "next interval decided"
        );
        Ok(executor)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn write_current(&self, interval: &Interval) -> Result<()> {
        let json = serde_json::to_string(interval)?;
        self.state.set(CURRENT_INTERVAL_KEY, &json)
    }

    pub(crate) fn set_focus_mode(&self, enabled: bool) {
        if self.settings.focus_mode_enabled {
            self.collaborators.focus_mode.try_set_focus_mode(enabled);
        }
    }

    fn log_interval_session(&self, interval: &Interval, ended_at: i64) -> Result<SessionRecord> {
        let elapsed = interval.elapsed_until(ended_at);
        let duration_seconds = elapsed.clamp(0, interval.length_secs());

        let record = SessionRecord {
            id: generate_session_id(self.now_ms()),
            tag: interval.tag.clone().unwrap_or_default(),
            interval_type: interval.interval_type.as_str().to_string(),
            started_at: interval.started_at,
            ended_at,
            duration_seconds,
            name: trimmed(interval.name.as_deref()),
            note: trimmed(interval.note.as_deref()),
            extra: serde_json::Map::new(),
        };
        self.sessions.add_session(record)
    }
}

fn generate_session_id(now_ms: i64) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{now_ms}-{}", &suffix[..12])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{BridgeCall, RecordingBridge};
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;
    use tempfile::TempDir;

    const T0: i64 = 1_700_000_000;

    struct Harness {
        machine: IntervalMachine,
        clock: ManualClock,
        state: MemoryStore,
        recorder: RecordingBridge,
        _dir: TempDir,
    }

    fn harness_with(settings: TimerSettings) -> Harness {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::at(T0);
        let state = MemoryStore::new();
        let recorder = RecordingBridge::new();
        let machine = IntervalMachine::new(
            Box::new(state.clone()),
            SessionStore::new(dir.path().join("sessions.json")),
            settings,
            Box::new(clock.clone()),
            Collaborators::recording(&recorder),
        );
        Harness {
            machine,
            clock,
            state,
            recorder,
            _dir: dir,
        }
    }

    fn harness() -> Harness {
        harness_with(TimerSettings::default())
    }

    fn focus_mode_settings() -> TimerSettings {
        TimerSettings {
            focus_mode_enabled: true,
            ..TimerSettings::default()
        }
    }

    #[test]
    fn create_uses_default_length_and_one_part() {
        let h = harness();
        let iv = h
            .machine
            .create_interval(IntervalType::Focus, CreateOptions::default())
            .unwrap();
        assert_eq!(iv.length, 25 * 60);
        assert_eq!(iv.parts, vec![Part::starting_at(T0)]);
        assert_eq!(iv.started_at, T0);
        assert_eq!(h.machine.current_interval(), Some(iv.clone()));
        assert_eq!(h.machine.interval_history(), vec![iv]);
    }

    #[test]
    fn create_honours_custom_duration_and_start() {
        let h = harness();
        let iv = h
            .machine
            .create_interval(
                IntervalType::ShortBreak,
                CreateOptions {
                    custom_duration: Some(90),
                    started_at: Some(T0 - 30),
                    tag: Some("walk".into()),
                    ..CreateOptions::default()
                },
            )
            .unwrap();
        assert_eq!(iv.length, 90);
        assert_eq!(iv.started_at, T0 - 30);
        assert_eq!(iv.tag.as_deref(), Some("walk"));

        let iv = h
            .machine
            .create_interval(
                IntervalType::ShortBreak,
                CreateOptions {
                    custom_duration: Some(0),
                    ..CreateOptions::default()
                },
            )
            .unwrap();
        assert_eq!(iv.length, 5 * 60);
    }

    #[test]
    fn counter_resets_on_fresh_start_and_counts_every_creation() {
        let h = harness();
        let fresh = CreateOptions {
            is_fresh_start: true,
            ..CreateOptions::default()
        };
        assert_eq!(h.machine.create_interval(IntervalType::Focus, fresh.clone()).unwrap().id, 0);
        h.machine
            .create_interval(IntervalType::ShortBreak, CreateOptions::default())
            .unwrap();
        h.machine
            .create_interval(IntervalType::Focus, CreateOptions::default())
            .unwrap();
        assert_eq!(h.machine.completed_count(), 2);
        h.machine.create_interval(IntervalType::Focus, fresh).unwrap();
        assert_eq!(h.machine.completed_count(), 0);
    }

    #[test]
    fn pause_then_continue_adds_one_part() {
        let h = harness();
        h.machine
            .create_interval(IntervalType::Focus, CreateOptions::default())
            .unwrap();

        h.clock.advance(300);
        let paused = h.machine.pause_interval().unwrap().unwrap();
        assert!(paused.is_paused());
        assert_eq!(paused.parts.len(), 1);

        h.clock.advance(120);
        assert_eq!(h.machine.duration(&paused), 300);

        let resumed = h.machine.continue_interval().unwrap().unwrap();
        assert_eq!(resumed.parts.len(), 2);
        assert!(!resumed.is_paused());

        h.clock.advance(60);
        // 480s of wall time, 120s of it paused.
        assert_eq!(h.machine.duration(&resumed), 480 - 120);
    }

    #[test]
    fn double_pause_and_double_continue_are_idempotent() {
        let h = harness();
        h.machine
            .create_interval(IntervalType::Focus, CreateOptions::default())
            .unwrap();
        h.clock.advance(10);
        let first = h.machine.pause_interval().unwrap().unwrap();
        h.clock.advance(10);
        let second = h.machine.pause_interval().unwrap().unwrap();
        assert_eq!(first, second);

        h.machine.continue_interval().unwrap();
        let again = h.machine.continue_interval().unwrap().unwrap();
        assert_eq!(again.parts.len(), 2);
    }

    #[test]
    fn operations_without_interval_are_no_ops() {
        let h = harness();
        assert!(h.machine.pause_interval().unwrap().is_none());
        assert!(h.machine.continue_interval().unwrap().is_none());
        assert!(h.machine.restart_interval().unwrap().is_none());
        assert!(h
            .machine
            .update_current_interval_details(IntervalDetails::default())
            .unwrap()
            .is_none());
        assert!(matches!(h.machine.poll().unwrap(), PollOutcome::Idle));
    }

    #[test]
    fn reset_logs_pause_exclusive_duration() {
        let h = harness();
        h.machine
            .create_interval(
                IntervalType::Focus,
                CreateOptions {
                    tag: Some("writing".into()),
                    name: Some(" Chapter 3 ".into()),
                    ..CreateOptions::default()
                },
            )
            .unwrap();
        h.clock.advance(300);
        h.machine.pause_interval().unwrap();
        h.clock.advance(200);
        h.machine.continue_interval().unwrap();
        h.clock.advance(180);

        let record = h.machine.reset_interval(false).unwrap().unwrap();
        assert_eq!(record.duration_seconds, 480);
        assert_eq!(record.interval_type, "focus");
        assert_eq!(record.started_at, T0);
        assert_eq!(record.ended_at, T0 + 680);
        assert_eq!(record.name.as_deref(), Some("Chapter 3"));
        assert!(h.machine.current_interval().is_none());

        let (title, message) = h.recorder.notifications().pop().unwrap();
        assert_eq!(title, "Session logged");
        assert_eq!(message, "Chapter 3 • Focus • 08:00 • #writing");

        let history = h.machine.interval_history();
        assert_eq!(history[0].parts.last().unwrap().end_at, Some(T0 + 680));
    }

    #[test]
    fn reset_caps_duration_at_length() {
        let h = harness();
        h.machine
            .create_interval(
                IntervalType::ShortBreak,
                CreateOptions {
                    custom_duration: Some(60),
                    ..CreateOptions::default()
                },
            )
            .unwrap();
        h.clock.advance(500);
        let record = h.machine.reset_interval(false).unwrap().unwrap();
        assert_eq!(record.duration_seconds, 60);
    }

    #[test]
    fn reset_without_interval_reports_nothing_to_record() {
        let h = harness();
        assert!(h.machine.reset_interval(false).unwrap().is_none());
        let (_, message) = h.recorder.notifications().pop().unwrap();
        assert_eq!(message, "No active session, nothing to record");
    }

    #[test]
    fn reset_with_skip_log_clears_silently() {
        let h = harness();
        h.machine
            .create_interval(IntervalType::Focus, CreateOptions::default())
            .unwrap();
        assert!(h.machine.reset_interval(true).unwrap().is_none());
        assert!(h.machine.current_interval().is_none());
        assert!(h.recorder.notifications().is_empty());
        assert!(h.machine.sessions().load_sessions().is_empty());
    }

    #[test]
    fn reset_clears_even_when_log_write_fails() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let state = MemoryStore::new();
        let machine = IntervalMachine::new(
            Box::new(state.clone()),
            SessionStore::new(blocker.join("sessions.json")),
            TimerSettings::default(),
            Box::new(ManualClock::at(T0)),
            Collaborators::silent(),
        );
        machine
            .create_interval(IntervalType::Focus, CreateOptions::default())
            .unwrap();
        assert!(machine.reset_interval(false).is_err());
        assert!(state.get(CURRENT_INTERVAL_KEY).unwrap().is_none());
    }

    #[test]
    fn restart_keeps_metadata_and_continues_count() {
        let h = harness();
        h.machine
            .create_interval(
                IntervalType::Focus,
                CreateOptions {
                    is_fresh_start: true,
                    tag: Some("deep".into()),
                    name: Some("Spec".into()),
                    ..CreateOptions::default()
                },
            )
            .unwrap();
        h.clock.advance(100);
        let restarted = h.machine.restart_interval().unwrap().unwrap();
        assert_eq!(restarted.id, 1);
        assert_eq!(restarted.tag.as_deref(), Some("deep"));
        assert_eq!(restarted.name.as_deref(), Some("Spec"));
        assert_eq!(restarted.started_at, T0 + 100);
    }

    #[test]
    fn update_details_never_shrinks_below_elapsed() {
        let h = harness();
        h.machine
            .create_interval(IntervalType::Focus, CreateOptions::default())
            .unwrap();
        h.clock.advance(600);

        let updated = h
            .machine
            .update_current_interval_details(IntervalDetails {
                name: Some("  ".into()),
                tag: Some(" review ".into()),
                duration_seconds: Some(120.4),
            })
            .unwrap()
            .unwrap();
        assert_eq!(updated.length, 600);
        assert_eq!(updated.name, None);
        assert_eq!(updated.tag.as_deref(), Some("review"));

        let updated = h
            .machine
            .update_current_interval_details(IntervalDetails {
                duration_seconds: Some(2700.6),
                ..IntervalDetails::default()
            })
            .unwrap()
            .unwrap();
        assert_eq!(updated.length, 2701);
        assert_eq!(updated.tag, None);
    }

    #[test]
    fn oversized_custom_duration_still_resets_and_logs() {
        let h = harness();
        let iv = h
            .machine
            .create_interval(
                IntervalType::Focus,
                CreateOptions {
                    custom_duration: Some(u64::MAX),
                    ..CreateOptions::default()
                },
            )
            .unwrap();
        assert_eq!(iv.length, MAX_LENGTH_SECS);
        h.clock.advance(300);

        let record = h.machine.reset_interval(false).unwrap().unwrap();
        assert_eq!(record.duration_seconds, 300);
    }

    #[test]
    fn huge_requested_duration_is_capped() {
        let h = harness();
        h.machine
            .create_interval(IntervalType::Focus, CreateOptions::default())
            .unwrap();
        h.clock.advance(60);

        let updated = h
            .machine
            .update_current_interval_details(IntervalDetails {
                duration_seconds: Some(1e30),
                ..IntervalDetails::default()
            })
            .unwrap()
            .unwrap();
        assert_eq!(updated.length, MAX_LENGTH_SECS);

        let record = h.machine.reset_interval(false).unwrap().unwrap();
        assert_eq!(record.duration_seconds, 60);
    }

    #[test]
    fn update_details_ignores_non_positive_duration() {
        let h = harness();
        h.machine
            .create_interval(IntervalType::Focus, CreateOptions::default())
            .unwrap();
        let updated = h
            .machine
            .update_current_interval_details(IntervalDetails {
                duration_seconds: Some(-5.0),
                ..IntervalDetails::default()
            })
            .unwrap()
            .unwrap();
        assert_eq!(updated.length, 1500);

        let updated = h
            .machine
            .update_current_interval_details(IntervalDetails {
                duration_seconds: Some(0.4),
                ..IntervalDetails::default()
            })
            .unwrap()
            .unwrap();
        assert_eq!(updated.length, 1500);
    }

    #[test]
    fn stored_garbage_reads_as_idle() {
        let h = harness();
        h.state
            .set(CURRENT_INTERVAL_KEY, r#"{"type":"nap","length":5}"#)
            .unwrap();
        assert!(h.machine.current_interval().is_none());
    }

    #[test]
    fn sanitized_interval_is_written_back() {
        let h = harness();
        h.state
            .set(CURRENT_INTERVAL_KEY, r#"{"type":"focus","length":0,"parts":[]}"#)
            .unwrap();
        let iv = h.machine.current_interval().unwrap();
        assert_eq!(iv.length, 1500);
        let stored: Interval =
            serde_json::from_str(&h.state.get(CURRENT_INTERVAL_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored, iv);
    }

    #[test]
    fn check_completion_reports_remaining() {
        let iv = Interval {
            id: 0,
            interval_type: IntervalType::Focus,
            length: 100,
            started_at: 0,
            parts: vec![Part::starting_at(0)],
            tag: None,
            name: None,
            note: None,
            session_id: None,
        };
        assert_eq!(
            check_completion(&iv, 40),
            Completion::StillRunning { remaining: 60 }
        );
        assert_eq!(check_completion(&iv, 100), Completion::Completed);
    }

    #[test]
    fn poll_completes_and_hands_off() {
        let h = harness_with(focus_mode_settings());
        h.machine
            .create_interval(
                IntervalType::Focus,
                CreateOptions {
                    custom_duration: Some(60),
                    ..CreateOptions::default()
                },
            )
            .unwrap();

        h.clock.advance(30);
        assert!(matches!(h.machine.poll().unwrap(), PollOutcome::Running(_)));

        h.clock.advance(30);
        let PollOutcome::Completed(outcome) = h.machine.poll().unwrap() else {
            panic!("expected completion");
        };
        assert_eq!(outcome.route, HandoffRoute::AfterFocusModeOff);
        assert_eq!(outcome.context.session_record.duration_seconds, 60);
        assert_eq!(
            outcome.context.current_interval.session_id.as_deref(),
            Some(outcome.context.session_record.id.as_str())
        );
        assert_eq!(h.recorder.focus_mode_calls(), vec![true, false]);
        assert!(h.recorder.calls().contains(&BridgeCall::Handoff {
            session_id: outcome.context.session_record.id.clone(),
            route: HandoffRoute::AfterFocusModeOff,
        }));
        // Completion leaves the current interval for the caller to clear.
        assert!(h.machine.current_interval().is_some());
    }

    #[test]
    fn break_completion_hands_off_directly() {
        let h = harness_with(focus_mode_settings());
        let mut iv = h
            .machine
            .create_interval(IntervalType::ShortBreak, CreateOptions::default())
            .unwrap();
        h.clock.advance(300);
        let outcome = h.machine.end_of_interval(&mut iv).unwrap();
        assert_eq!(outcome.route, HandoffRoute::Direct);
        assert!(h.recorder.focus_mode_calls().is_empty());
    }

    #[test]
    fn focus_mode_follows_pause_and_continue_when_enabled() {
        let h = harness_with(focus_mode_settings());
        h.machine
            .create_interval(IntervalType::Focus, CreateOptions::default())
            .unwrap();
        h.machine.pause_interval().unwrap();
        h.machine.continue_interval().unwrap();
        assert_eq!(h.recorder.focus_mode_calls(), vec![true, false, true]);
    }

    #[test]
    fn focus_mode_untouched_when_disabled() {
        let h = harness();
        h.machine
            .create_interval(IntervalType::Focus, CreateOptions::default())
            .unwrap();
        h.machine.pause_interval().unwrap();
        assert!(h.recorder.focus_mode_calls().is_empty());
    }

    #[test]
    fn next_after_break_is_focus() {
        let h = harness();
        h.machine
            .create_interval(IntervalType::ShortBreak, CreateOptions::default())
            .unwrap();
        let exec = h.machine.get_next_interval_executor().unwrap();
        assert_eq!(exec.interval_type, IntervalType::Focus);
        assert_eq!(exec.is_fresh_start, Some(false));
        assert!(h.machine.current_interval().is_none());

        h.machine
            .create_interval(IntervalType::LongBreak, CreateOptions::default())
            .unwrap();
        let exec = h.machine.get_next_interval_executor().unwrap();
        assert_eq!(exec.interval_type, IntervalType::Focus);
        assert_eq!(exec.is_fresh_start, None);
    }

    #[test]
    fn next_after_focus_depends_on_threshold() {
        let h = harness();
        h.state.set(COMPLETED_COUNT_KEY, "3").unwrap();
        h.machine
            .create_interval(IntervalType::Focus, CreateOptions::default())
            .unwrap();
        assert_eq!(h.machine.completed_count(), 4);
        let exec = h.machine.get_next_interval_executor().unwrap();
        assert_eq!(exec.interval_type, IntervalType::LongBreak);
        assert_eq!(exec.title, "Long Break");

        h.state.set(COMPLETED_COUNT_KEY, "1").unwrap();
        h.machine
            .create_interval(IntervalType::Focus, CreateOptions::default())
            .unwrap();
        let exec = h.machine.get_next_interval_executor().unwrap();
        assert_eq!(exec.interval_type, IntervalType::ShortBreak);
        assert_eq!(exec.is_fresh_start, Some(false));
    }

    #[test]
    fn next_without_interval_uses_threshold() {
        let h = harness();
        h.state.set(COMPLETED_COUNT_KEY, "4").unwrap();
        let exec = h.machine.get_next_interval_executor().unwrap();
        assert_eq!(exec.interval_type, IntervalType::LongBreak);
    }

    #[test]
    fn history_upserts_by_id() {
        let h = harness();
        let iv = h
            .machine
            .create_interval(
                IntervalType::Focus,
                CreateOptions {
                    is_fresh_start: true,
                    ..CreateOptions::default()
                },
            )
            .unwrap();
        h.machine
            .update_current_interval_details(IntervalDetails {
                name: Some("Renamed".into()),
                ..IntervalDetails::default()
            })
            .unwrap();
        let history = h.machine.interval_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, iv.id);
        assert_eq!(history[0].name.as_deref(), Some("Renamed"));
    }

    #[test]
    fn session_ids_are_unique() {
        let a = generate_session_id(1);
        let b = generate_session_id(1);
        assert_ne!(a, b);
        assert!(a.starts_with("1-"));
        assert_eq!(a.len(), 2 + 12);
    }
}
