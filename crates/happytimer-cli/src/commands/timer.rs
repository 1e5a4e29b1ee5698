use std::io::Write;
use std::time::Duration;

use clap::Subcommand;
use happytimer_core::format::seconds_to_time;
use happytimer_core::{
    Config, IntervalDetails, IntervalExecutor, IntervalMachine, IntervalSnapshot, IntervalType,
    PollOutcome, SessionRecord, StartOptions, StateStore,
};
use serde::Serialize;

use super::{load_config, open_machine, print_json, CliResult};

/// Next interval chosen when the last one completed, kept until `timer next`
/// or a new start.
const PENDING_NEXT_KEY: &str = "cli/pending-next-interval";

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start an interval (focus, short-break or long-break)
    Start {
        interval_type: IntervalType,
        /// Length in minutes
        #[arg(long, conflicts_with = "seconds")]
        minutes: Option<u64>,
        /// Length in seconds
        #[arg(long)]
        seconds: Option<u64>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        name: Option<String>,
        /// Restart the long-break cycle count
        #[arg(long)]
        fresh: bool,
    },
    /// Pause the running interval
    Pause,
    /// Continue a paused interval
    Continue,
    /// Log the current interval and stop
    Stop,
    /// Start the current interval over
    Restart,
    /// Print current timer state as JSON (completes a finished interval)
    Status,
    /// Skip to the next interval in the cycle
    Next,
    /// Change the running interval's name, tag or length
    Edit {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        /// New total length in minutes
        #[arg(long)]
        minutes: Option<f64>,
    },
    /// Poll until the current interval completes
    Watch {
        /// Poll interval in seconds
        #[arg(long, default_value = "1")]
        interval: u64,
    },
    /// Menu bar title for the current state
    Title,
}

#[derive(Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
enum StatusView {
    Idle,
    Running(IntervalSnapshot),
    Paused(IntervalSnapshot),
    Completed {
        session: SessionRecord,
        next: IntervalExecutor,
    },
}

fn take_pending(machine: &IntervalMachine) -> CliResult<Option<IntervalExecutor>> {
    let state = machine.state();
    let pending = state
        .get(PENDING_NEXT_KEY)?
        .and_then(|raw| serde_json::from_str::<IntervalExecutor>(&raw).ok());
    state.remove(PENDING_NEXT_KEY)?;
    Ok(pending)
}

fn snapshot_view(snapshot: IntervalSnapshot) -> StatusView {
    if snapshot.paused {
        StatusView::Paused(snapshot)
    } else {
        StatusView::Running(snapshot)
    }
}

fn current_view(machine: &IntervalMachine) -> StatusView {
    machine
        .snapshot()
        .map(snapshot_view)
        .unwrap_or(StatusView::Idle)
}

/// Poll once. A completed interval is cleared and the next one remembered,
/// so the session is logged exactly once.
fn poll_view(machine: &IntervalMachine) -> CliResult<StatusView> {
    let view = match machine.poll()? {
        PollOutcome::Idle => StatusView::Idle,
        PollOutcome::Running(snapshot) => snapshot_view(snapshot),
        PollOutcome::Completed(outcome) => {
            let next = machine.get_next_interval_executor()?;
            machine
                .state()
                .set(PENDING_NEXT_KEY, &serde_json::to_string(&next)?)?;
            StatusView::Completed {
                session: outcome.context.session_record,
                next,
            }
        }
    };
    Ok(view)
}

fn menu_bar_title(config: &Config, machine: &IntervalMachine) -> String {
    match machine.snapshot() {
        None if config.menu_bar.hide_time_when_stopped => String::new(),
        None => "Idle".to_string(),
        Some(snapshot) => {
            let mut title = snapshot.title.clone();
            if config.menu_bar.show_time {
                title.push(' ');
                title.push_str(&seconds_to_time(snapshot.remaining));
            }
            if snapshot.paused {
                title.push_str(" (paused)");
            }
            title
        }
    }
}

pub fn run(action: TimerAction) -> CliResult {
    let config = load_config()?;
    let machine = open_machine(&config)?;

    match action {
        TimerAction::Start {
            interval_type,
            minutes,
            seconds,
            tag,
            name,
            fresh,
        } => {
            take_pending(&machine)?;
            let duration = minutes.map(|m| m.saturating_mul(60)).or(seconds);
            machine.start_timer(
                interval_type,
                StartOptions {
                    duration,
                    tag,
                    is_fresh_start: Some(fresh),
                    name,
                },
            )?;
            print_json(&current_view(&machine))?;
        }
        TimerAction::Pause => {
            machine.pause_timer()?;
            print_json(&current_view(&machine))?;
        }
        TimerAction::Continue => {
            machine.continue_timer()?;
            print_json(&current_view(&machine))?;
        }
        TimerAction::Stop => match machine.stop_timer()? {
            Some(record) => print_json(&record)?,
            None => print_json(&StatusView::Idle)?,
        },
        TimerAction::Restart => {
            if machine.restart_interval()?.is_none() {
                return Err("no active interval".into());
            }
            print_json(&current_view(&machine))?;
        }
        TimerAction::Status => {
            print_json(&poll_view(&machine)?)?;
        }
        TimerAction::Next => {
            let next = match take_pending(&machine)? {
                Some(next) => next,
                None => machine.get_next_interval_executor()?,
            };
            machine.start_timer(
                next.interval_type,
                StartOptions {
                    is_fresh_start: Some(next.fresh_start()),
                    ..StartOptions::default()
                },
            )?;
            print_json(&current_view(&machine))?;
        }
        TimerAction::Edit { name, tag, minutes } => {
            let Some(current) = machine.current_interval() else {
                return Err("no active interval".into());
            };
            machine.update_current_interval_details(IntervalDetails {
                name: name.or(current.name),
                tag: tag.or(current.tag),
                duration_seconds: minutes.map(|m| m * 60.0),
            })?;
            print_json(&current_view(&machine))?;
        }
        TimerAction::Watch { interval } => {
            let period = Duration::from_secs(interval.max(1));
            loop {
                match poll_view(&machine)? {
                    StatusView::Idle => {
                        eprintln!("no active interval");
                        break;
                    }
                    StatusView::Running(snapshot) | StatusView::Paused(snapshot) => {
                        let marker = if snapshot.paused { " (paused)" } else { "" };
                        print!(
                            "\r{} {}{marker}   ",
                            snapshot.title,
                            seconds_to_time(snapshot.remaining)
                        );
                        std::io::stdout().flush()?;
                    }
                    completed @ StatusView::Completed { .. } => {
                        println!();
                        print_json(&completed)?;
                        break;
                    }
                }
                std::thread::sleep(period);
            }
        }
        TimerAction::Title => {
            println!("{}", menu_bar_title(&config, &machine));
        }
    }
    Ok(())
}
