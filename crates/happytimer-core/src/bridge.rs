//! Side-effecting collaborators of the state machine.
//!
//! Every call here is best-effort. Implementations swallow their own
//! failures (logging them) so a broken focus-mode toggle or a missing UI
//! never blocks a timer operation.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::interval::Interval;
use crate::storage::SessionRecord;

/// Toggles the operating system's do-not-disturb / focus mode.
pub trait FocusMode {
    fn try_set_focus_mode(&self, enabled: bool);
}

/// Receives control once an interval has run to completion.
pub trait Handoff {
    fn request_handoff(&self, context: &CompletionContext, route: HandoffRoute);

    /// Ask the UI to re-render after a timer mutation.
    fn request_refresh(&self) {}
}

/// User-visible confirmation channel (toast).
pub trait Notifier {
    fn notify(&self, title: &str, message: &str);
}

/// Payload handed to whatever presents the end of an interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionContext {
    pub current_interval: Interval,
    pub session_record: SessionRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HandoffRoute {
    /// Focus mode was switched off before handing off.
    AfterFocusModeOff,
    Direct,
}

/// Collaborators wired into an [`IntervalMachine`](crate::IntervalMachine).
pub struct Collaborators {
    pub focus_mode: Box<dyn FocusMode>,
    pub handoff: Box<dyn Handoff>,
    pub notifier: Box<dyn Notifier>,
}

impl Collaborators {
    /// No focus-mode integration, handoffs and notifications only logged.
    pub fn silent() -> Self {
        Self {
            focus_mode: Box::new(NoFocusMode),
            handoff: Box::new(LogHandoff),
            notifier: Box::new(LogNotifier),
        }
    }

    /// Route all three channels into a shared recorder.
    pub fn recording(recorder: &RecordingBridge) -> Self {
        Self {
            focus_mode: Box::new(recorder.clone()),
            handoff: Box::new(recorder.clone()),
            notifier: Box::new(recorder.clone()),
        }
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::silent()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoFocusMode;

impl FocusMode for NoFocusMode {
    fn try_set_focus_mode(&self, _enabled: bool) {}
}

/// Opens a deeplink (e.g. a launcher's do-not-disturb extension URL) for
/// each toggle.
#[derive(Debug, Clone)]
pub struct DeeplinkFocusMode {
    on_url: String,
    off_url: String,
}

impl DeeplinkFocusMode {
    pub fn new(on_url: impl Into<String>, off_url: impl Into<String>) -> Self {
        Self {
            on_url: on_url.into(),
            off_url: off_url.into(),
        }
    }
}

impl FocusMode for DeeplinkFocusMode {
    fn try_set_focus_mode(&self, enabled: bool) {
        let url = if enabled { &self.on_url } else { &self.off_url };
        if url.trim().is_empty() {
            return;
        }
        if let Err(e) = open::that(url) {
            warn!(url = %url, error = %e, "failed to toggle focus mode");
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogHandoff;

impl Handoff for LogHandoff {
    fn request_handoff(&self, context: &CompletionContext, route: HandoffRoute) {
        info!(
            session_id = %context.session_record.id,
            interval_type = %context.current_interval.interval_type,
            route = ?route,
            "interval completed"
        );
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, message: &str) {
        info!(title = %title, body = %message, "notification");
    }
}

/// A single observed collaborator call.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeCall {
    FocusMode(bool),
    Handoff {
        session_id: String,
        route: HandoffRoute,
    },
    Refresh,
    Notify {
        title: String,
        message: String,
    },
}

/// In-memory collaborator that records every call. Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingBridge {
    calls: Rc<RefCell<Vec<BridgeCall>>>,
}

impl RecordingBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<BridgeCall> {
        self.calls.borrow().clone()
    }

    pub fn focus_mode_calls(&self) -> Vec<bool> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                BridgeCall::FocusMode(enabled) => Some(*enabled),
                _ => None,
            })
            .collect()
    }

    pub fn notifications(&self) -> Vec<(String, String)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                BridgeCall::Notify { title, message } => Some((title.clone(), message.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }
}

impl FocusMode for RecordingBridge {
    fn try_set_focus_mode(&self, enabled: bool) {
        self.calls.borrow_mut().push(BridgeCall::FocusMode(enabled));
    }
}

impl Handoff for RecordingBridge {
    fn request_handoff(&self, context: &CompletionContext, route: HandoffRoute) {
        self.calls.borrow_mut().push(BridgeCall::Handoff {
            session_id: context.session_record.id.clone(),
            route,
        });
    }

    fn request_refresh(&self) {
        self.calls.borrow_mut().push(BridgeCall::Refresh);
    }
}

impl Notifier for RecordingBridge {
    fn notify(&self, title: &str, message: &str) {
        self.calls.borrow_mut().push(BridgeCall::Notify {
            title: title.to_string(),
            message: message.to_string(),
        });
    }
}
