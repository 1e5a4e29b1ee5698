//! # Happy Timer Core Library
//!
//! Core logic for the Happy Timer Pomodoro timer. The `happytimer` CLI is a
//! thin front end over the same library.
//!
//! ## Architecture
//!
//! - **Interval machine**: a wall-clock state machine. Nothing ticks inside
//!   the core; the caller polls and elapsed time is recomputed from stored
//!   part timestamps on every query.
//! - **Storage**: SQLite key-value state, a JSON session log and TOML
//!   configuration.
//! - **Bridge**: focus-mode, completion handoff and notification
//!   collaborators injected into the machine.
//!
//! ## Key Components
//!
//! - [`IntervalMachine`]: create / pause / continue / reset / complete intervals
//! - [`SessionStore`]: the completed-session log
//! - [`RecentChoiceStore`]: the three most recent timer setups
//! - [`Config`]: application configuration management

pub mod bridge;
pub mod clock;
pub mod error;
pub mod format;
pub mod interval;
pub mod stats;
pub mod storage;

pub use bridge::{
    Collaborators, CompletionContext, DeeplinkFocusMode, FocusMode, Handoff, HandoffRoute,
    Notifier,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, StorageError, ValidationError};
pub use interval::{
    check_completion, Completion, CompletionOutcome, CreateOptions, Interval, IntervalDetails,
    IntervalExecutor, IntervalMachine, IntervalSnapshot, IntervalType, Part, PollOutcome,
    StartOptions,
};
pub use stats::{group_by_tag, SessionStats, TagGroup};
pub use storage::{
    Config, Database, MemoryStore, RecentChoiceStore, SessionChoice, SessionRecord,
    SessionStore, SessionUpdate, StateStore, TimerSettings,
};
