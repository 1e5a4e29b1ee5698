use clap::Subcommand;
use happytimer_core::format::{format_duration, tag_label};
use happytimer_core::StartOptions;

use super::{load_config, open_machine, print_json, CliResult};

#[derive(Subcommand)]
pub enum RecentAction {
    /// List recent timer setups, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start a recent setup again
    Start {
        /// 1-based position in `recent list`
        #[arg(default_value = "1")]
        index: usize,
    },
}

pub fn run(action: RecentAction) -> CliResult {
    let config = load_config()?;
    let machine = open_machine(&config)?;
    let choices = machine.recent_choices().get_recent_session_choices();

    match action {
        RecentAction::List { json } => {
            if json {
                print_json(&choices)?;
            } else if choices.is_empty() {
                println!("No recent sessions.");
            } else {
                for (i, choice) in choices.iter().enumerate() {
                    let mut line = format!(
                        "{}. {} {}",
                        i + 1,
                        choice.interval_type.title(),
                        format_duration(choice.duration_seconds as i64)
                    );
                    if let Some(tag) = choice.tag.as_deref().and_then(tag_label) {
                        line.push_str(&format!(" {tag}"));
                    }
                    if let Some(name) = &choice.name {
                        line.push_str(&format!(" {name}"));
                    }
                    println!("{line}");
                }
            }
        }
        RecentAction::Start { index } => {
            let Some(choice) = index.checked_sub(1).and_then(|i| choices.get(i)).cloned() else {
                return Err(format!(
                    "no recent session at position {index} ({} available)",
                    choices.len()
                )
                .into());
            };
            let interval = machine.start_timer(
                choice.interval_type,
                StartOptions {
                    duration: Some(choice.duration_seconds),
                    tag: choice.tag,
                    is_fresh_start: None,
                    name: choice.name,
                },
            )?;
            print_json(&interval)?;
        }
    }
    Ok(())
}
