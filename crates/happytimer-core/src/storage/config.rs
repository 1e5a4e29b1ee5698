//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Default interval durations (minutes, from a fixed preset list)
//! - Long-break cadence
//! - Session log location override
//! - Focus-mode (do-not-disturb) integration
//! - Menu bar display and completion extras, used only by the front end
//!
//! Configuration is stored at `<data dir>/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::data_dir;
use crate::error::{ConfigError, Result};
use crate::interval::IntervalType;

pub const FOCUS_PRESETS_MIN: &[u32] = &[1, 3, 5, 10, 15, 20, 25, 30, 35, 40, 45, 50, 55, 60, 90];
pub const BREAK_PRESETS_MIN: &[u32] = &[1, 3, 5, 10, 15, 20, 25, 30, 35, 40, 45, 50, 55, 60];
const THRESHOLD_RANGE: std::ops::RangeInclusive<u32> = 2..=8;

/// Default interval durations in minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurationsConfig {
    #[serde(default = "default_focus_duration")]
    pub focus: u32,
    #[serde(default = "default_short_break")]
    pub short_break: u32,
    #[serde(default = "default_long_break")]
    pub long_break: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleConfig {
    /// Cycle count at which the next break is a long one.
    #[serde(default = "default_long_break_threshold")]
    pub long_break_threshold: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Override for the session log location. Absolute, `~`-relative or
    /// relative to the data directory; without an extension it names a
    /// directory. Blank means the default location.
    #[serde(default)]
    pub file_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusModeConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_focus_on_url")]
    pub on_url: String,
    #[serde(default = "default_focus_off_url")]
    pub off_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuBarConfig {
    #[serde(default = "default_true")]
    pub show_time: bool,
    #[serde(default)]
    pub hide_time_when_stopped: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// System sound name; blank for silence.
    #[serde(default)]
    pub sound: String,
    #[serde(default)]
    pub show_image: bool,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub show_quote: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data dir>/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub durations: DurationsConfig,
    #[serde(default)]
    pub cycle: CycleConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub focus_mode: FocusModeConfig,
    #[serde(default)]
    pub menu_bar: MenuBarConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
}

// Default functions
fn default_focus_duration() -> u32 {
    25
}
fn default_short_break() -> u32 {
    5
}
fn default_long_break() -> u32 {
    20
}
fn default_long_break_threshold() -> u32 {
    4
}
fn default_true() -> bool {
    true
}
fn default_focus_on_url() -> String {
    "raycast://extensions/yakitrak/do-not-disturb/on?launchType=background".into()
}
fn default_focus_off_url() -> String {
    "raycast://extensions/yakitrak/do-not-disturb/off?launchType=background".into()
}

impl Default for DurationsConfig {
    fn default() -> Self {
        Self {
            focus: default_focus_duration(),
            short_break: default_short_break(),
            long_break: default_long_break(),
        }
    }
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            long_break_threshold: default_long_break_threshold(),
        }
    }
}

impl Default for FocusModeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            on_url: default_focus_on_url(),
            off_url: default_focus_off_url(),
        }
    }
}

impl Default for MenuBarConfig {
    fn default() -> Self {
        Self {
            show_time: true,
            hide_time_when_stopped: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            durations: DurationsConfig::default(),
            cycle: CycleConfig::default(),
            sessions: SessionsConfig::default(),
            focus_mode: FocusModeConfig::default(),
            menu_bar: MenuBarConfig::default(),
            completion: CompletionConfig::default(),
        }
    }
}

/// The subset of configuration the interval state machine reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerSettings {
    pub focus_secs: u64,
    pub short_break_secs: u64,
    pub long_break_secs: u64,
    pub long_break_threshold: u32,
    pub focus_mode_enabled: bool,
}

impl TimerSettings {
    /// Configured length in seconds for an interval type.
    pub fn default_length(&self, interval_type: IntervalType) -> u64 {
        match interval_type {
            IntervalType::Focus => self.focus_secs,
            IntervalType::ShortBreak => self.short_break_secs,
            IntervalType::LongBreak => self.long_break_secs,
        }
    }
}

impl Default for TimerSettings {
    fn default() -> Self {
        Config::default().timer_settings()
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                    ),
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(invalid("cannot set a whole section".to_string()));
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing defaults when no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            warn!(error = %e, "falling back to default configuration");
            Self::default()
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving. The result must still
    /// pass [`Config::validate`].
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// or validated.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json)?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Check durations against the preset lists and the long-break
    /// threshold against its range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("durations.focus", self.durations.focus, FOCUS_PRESETS_MIN),
            ("durations.short_break", self.durations.short_break, BREAK_PRESETS_MIN),
            ("durations.long_break", self.durations.long_break, BREAK_PRESETS_MIN),
        ];
        for (key, minutes, presets) in checks {
            if !presets.contains(&minutes) {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("{minutes} is not one of {presets:?}"),
                });
            }
        }
        if !THRESHOLD_RANGE.contains(&self.cycle.long_break_threshold) {
            return Err(ConfigError::InvalidValue {
                key: "cycle.long_break_threshold".to_string(),
                message: format!(
                    "{} is outside {}..={}",
                    self.cycle.long_break_threshold,
                    THRESHOLD_RANGE.start(),
                    THRESHOLD_RANGE.end()
                ),
            });
        }
        Ok(())
    }

    /// Settings for the state machine. Zero durations and an out-of-range
    /// threshold fall back to their defaults.
    pub fn timer_settings(&self) -> TimerSettings {
        let minutes = |value: u32, fallback: u32| u64::from(if value > 0 { value } else { fallback }) * 60;
        let threshold = if THRESHOLD_RANGE.contains(&self.cycle.long_break_threshold) {
            self.cycle.long_break_threshold
        } else {
            default_long_break_threshold()
        };
        TimerSettings {
            focus_secs: minutes(self.durations.focus, default_focus_duration()),
            short_break_secs: minutes(self.durations.short_break, default_short_break()),
            long_break_secs: minutes(self.durations.long_break, default_long_break()),
            long_break_threshold: threshold,
            focus_mode_enabled: self.focus_mode.enabled,
        }
    }

    /// Trimmed session log override, if any.
    pub fn sessions_override(&self) -> Option<&str> {
        let trimmed = self.sessions.file_path.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.durations.focus, 25);
        assert_eq!(parsed.cycle.long_break_threshold, 4);
        assert!(!parsed.focus_mode.enabled);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[durations]\nfocus = 50\n").unwrap();
        assert_eq!(parsed.durations.focus, 50);
        assert_eq!(parsed.durations.long_break, 20);
        assert!(parsed.menu_bar.show_time);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("focus_mode.enabled").as_deref(), Some("false"));
        assert_eq!(cfg.get("durations.focus").as_deref(), Some("25"));
        assert_eq!(cfg.get("sessions.file_path").as_deref(), Some(""));
        assert!(cfg.get("durations.missing_key").is_none());
    }

    #[test]
    fn set_updates_values() {
        let mut cfg = Config::default();
        cfg.set("durations.focus", "50").unwrap();
        cfg.set("focus_mode.enabled", "true").unwrap();
        cfg.set("sessions.file_path", "~/logs").unwrap();
        assert_eq!(cfg.durations.focus, 50);
        assert!(cfg.focus_mode.enabled);
        assert_eq!(cfg.sessions_override(), Some("~/logs"));
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(cfg.set("durations.nap", "5").is_err());
        assert!(cfg.set("", "5").is_err());
    }

    #[test]
    fn set_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.set("focus_mode.enabled", "not_a_bool").is_err());
        assert!(cfg.set("durations", "5").is_err());
    }

    #[test]
    fn set_rejects_non_preset_duration() {
        let mut cfg = Config::default();
        assert!(cfg.set("durations.focus", "7").is_err());
        assert_eq!(cfg.durations.focus, 25);
        assert!(cfg.set("durations.focus", "90").is_ok());
        assert!(cfg.set("durations.short_break", "90").is_err());
    }

    #[test]
    fn set_rejects_threshold_out_of_range() {
        let mut cfg = Config::default();
        assert!(cfg.set("cycle.long_break_threshold", "9").is_err());
        assert!(cfg.set("cycle.long_break_threshold", "2").is_ok());
    }

    #[test]
    fn timer_settings_fall_back_on_invalid_values() {
        let mut cfg = Config::default();
        cfg.durations.focus = 0;
        cfg.cycle.long_break_threshold = 30;
        let settings = cfg.timer_settings();
        assert_eq!(settings.focus_secs, 25 * 60);
        assert_eq!(settings.long_break_threshold, 4);
        assert_eq!(settings.default_length(IntervalType::LongBreak), 20 * 60);
    }

    #[test]
    fn load_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.durations.short_break, 5);
        assert!(path.exists());
    }

    #[test]
    fn load_reports_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "durations = [").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
