mod choices;
mod config;
pub mod database;
mod sessions;
mod state;

pub use choices::{RecentChoiceStore, SessionChoice, MAX_RECENT_CHOICES, RECENT_CHOICES_KEY};
pub use config::{
    CompletionConfig, Config, CycleConfig, DurationsConfig, FocusModeConfig, MenuBarConfig,
    SessionsConfig, TimerSettings, BREAK_PRESETS_MIN, FOCUS_PRESETS_MIN,
};
pub use database::Database;
pub use sessions::{
    resolve_sessions_path, SessionRecord, SessionStore, SessionUpdate, SESSIONS_FILENAME,
};
pub use state::{MemoryStore, StateStore};

use std::path::PathBuf;

use crate::error::StorageError;

/// Returns the data directory, creating it if needed.
///
/// `HAPPYTIMER_DATA_DIR` wins when set; otherwise `~/.config/happytimer[-dev]/`
/// based on `HAPPYTIMER_ENV` (set it to `dev` for a development directory).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let dir = match std::env::var_os("HAPPYTIMER_DATA_DIR") {
        Some(custom) if !custom.is_empty() => PathBuf::from(custom),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("HAPPYTIMER_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("happytimer-dev")
            } else {
                base_dir.join("happytimer")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| StorageError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
