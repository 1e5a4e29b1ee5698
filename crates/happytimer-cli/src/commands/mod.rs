pub mod config;
pub mod log;
pub mod recent;
pub mod stats;
pub mod timer;

use happytimer_core::bridge::NoFocusMode;
use happytimer_core::format::{seconds_to_time, tag_label};
use happytimer_core::storage::{data_dir, CompletionConfig};
use happytimer_core::{
    Collaborators, CompletionContext, Config, Database, DeeplinkFocusMode, FocusMode, Handoff,
    HandoffRoute, IntervalMachine, Notifier, SessionStore, SystemClock,
};
use tracing::debug;

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Prints confirmations to stderr so stdout stays machine-readable.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, title: &str, message: &str) {
        eprintln!("{title}: {message}");
    }
}

struct ConsoleHandoff {
    completion: CompletionConfig,
}

const FALLBACK_QUOTE: (&str, &str) = ("You did it!", "Unknown");

impl Handoff for ConsoleHandoff {
    fn request_handoff(&self, context: &CompletionContext, route: HandoffRoute) {
        let interval = &context.current_interval;
        let mut line = format!(
            "{} complete ({})",
            interval.interval_type.title(),
            seconds_to_time(context.session_record.duration_seconds)
        );
        if let Some(tag) = tag_label(&context.session_record.tag) {
            line.push_str(&format!(" {tag}"));
        }
        if route == HandoffRoute::AfterFocusModeOff {
            line.push_str(", focus mode off");
        }
        if !self.completion.sound.trim().is_empty() {
            eprint!("\x07");
        }
        eprintln!("{line}");

        let image_url = self.completion.image_url.trim();
        if self.completion.show_image && !image_url.is_empty() {
            eprintln!("{image_url}");
        }
        if self.completion.show_quote {
            let (content, author) = FALLBACK_QUOTE;
            eprintln!("> {content}\n> - {author}");
        }
    }
}

pub fn load_config() -> CliResult<Config> {
    Ok(Config::load()?)
}

pub fn sessions_store(config: &Config) -> CliResult<SessionStore> {
    Ok(SessionStore::open(&data_dir()?, config.sessions_override()))
}

/// Machine wired to the on-disk state database, the configured session log
/// and console collaborators.
pub fn open_machine(config: &Config) -> CliResult<IntervalMachine> {
    let focus_mode: Box<dyn FocusMode> = if config.focus_mode.enabled {
        Box::new(DeeplinkFocusMode::new(
            config.focus_mode.on_url.as_str(),
            config.focus_mode.off_url.as_str(),
        ))
    } else {
        Box::new(NoFocusMode)
    };
    let collaborators = Collaborators {
        focus_mode,
        handoff: Box::new(ConsoleHandoff {
            completion: config.completion.clone(),
        }),
        notifier: Box::new(ConsoleNotifier),
    };

    let sessions = sessions_store(config)?;
    debug!(sessions = %sessions.path().display(), "opening interval machine");

    Ok(IntervalMachine::new(
        Box::new(Database::open()?),
        sessions,
        config.timer_settings(),
        Box::new(SystemClock),
        collaborators,
    ))
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
