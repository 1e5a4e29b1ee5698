//! Interval model and the state machine that drives it.

mod machine;
mod sanitize;
mod timer;
mod types;

pub use machine::{
    check_completion, Completion, CompletionOutcome, CreateOptions, IntervalDetails,
    IntervalMachine, PollOutcome, COMPLETED_COUNT_KEY, CURRENT_INTERVAL_KEY,
    INTERVAL_HISTORY_KEY,
};
pub use sanitize::{parse_interval, sanitize_interval, Sanitized};
pub use timer::StartOptions;
pub use types::{
    Interval, IntervalExecutor, IntervalSnapshot, IntervalType, Part, FOCUS_TITLE,
    LONG_BREAK_TITLE, MAX_LENGTH_SECS, SHORT_BREAK_TITLE,
};
