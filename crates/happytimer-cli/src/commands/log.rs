use chrono::{Local, TimeZone};
use clap::Subcommand;
use happytimer_core::format::{format_duration, tag_label};
use happytimer_core::{group_by_tag, SessionRecord, SessionUpdate};

use super::{load_config, print_json, sessions_store, CliResult};

#[derive(Subcommand)]
pub enum LogAction {
    /// List logged sessions, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sessions grouped by tag
    Groups,
    /// Distinct tags used so far
    Tags,
    /// Print one session as JSON
    Show { id: String },
    /// Set or clear a session's note
    Note { id: String, text: String },
    /// Set or clear a session's name
    Rename { id: String, name: String },
    /// Print the session log location
    Path,
}

fn describe(record: &SessionRecord) -> String {
    let when = Local
        .timestamp_opt(record.ended_at, 0)
        .earliest()
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| record.ended_at.to_string());
    let kind = record
        .kind()
        .map(|k| k.title().to_string())
        .unwrap_or_else(|| record.interval_type.clone());

    let mut line = format!(
        "{}  {when}  {kind:<11}  {:>7}",
        record.id,
        format_duration(record.duration_seconds)
    );
    if let Some(tag) = tag_label(&record.tag) {
        line.push_str(&format!("  {tag}"));
    }
    if let Some(name) = &record.name {
        line.push_str(&format!("  {name}"));
    }
    if let Some(note) = &record.note {
        line.push_str(&format!("  \"{note}\""));
    }
    line
}

pub fn run(action: LogAction) -> CliResult {
    let config = load_config()?;
    let store = sessions_store(&config)?;

    match action {
        LogAction::List { json } => {
            let mut sessions = store.load_sessions();
            sessions.sort_by(|a, b| b.ended_at.cmp(&a.ended_at));
            if json {
                print_json(&sessions)?;
            } else if sessions.is_empty() {
                println!("No sessions logged yet.");
            } else {
                for record in &sessions {
                    println!("{}", describe(record));
                }
            }
        }
        LogAction::Groups => {
            print_json(&group_by_tag(&store.load_sessions()))?;
        }
        LogAction::Tags => {
            for tag in store.get_known_tags() {
                println!("{tag}");
            }
        }
        LogAction::Show { id } => match store.find_session(&id) {
            Some(record) => print_json(&record)?,
            None => return Err(format!("no session with id {id}").into()),
        },
        LogAction::Note { id, text } => {
            let update = SessionUpdate {
                note: Some(text),
                name: None,
            };
            match store.update_session_record(&id, update)? {
                Some(record) => print_json(&record)?,
                None => return Err(format!("no session with id {id}").into()),
            }
        }
        LogAction::Rename { id, name } => {
            let update = SessionUpdate {
                note: None,
                name: Some(name),
            };
            match store.update_session_record(&id, update)? {
                Some(record) => print_json(&record)?,
                None => return Err(format!("no session with id {id}").into()),
            }
        }
        LogAction::Path => {
            println!("{}", store.path().display());
        }
    }
    Ok(())
}
