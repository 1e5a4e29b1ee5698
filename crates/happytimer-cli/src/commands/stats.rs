use chrono::Utc;
use clap::Subcommand;
use happytimer_core::SessionStats;

use super::{load_config, print_json, sessions_store, CliResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Focus and break totals, including today and this week
    Show,
}

pub fn run(action: StatsAction) -> CliResult {
    let config = load_config()?;
    let store = sessions_store(&config)?;

    match action {
        StatsAction::Show => {
            let sessions = store.load_sessions();
            let stats = SessionStats::from_sessions(&sessions, Utc::now().timestamp());
            print_json(&stats)?;
        }
    }
    Ok(())
}
