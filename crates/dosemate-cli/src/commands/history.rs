use chrono::{DateTime, Utc};
use clap::Subcommand;
use dosemate_core::Database;

use super::{local_to_utc, parse_datetime};

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List a user's intake history, newest first
    List {
        #[arg(long)]
        user: i64,
        /// Earliest recorded instant to include, YYYY-MM-DDTHH:MM[:SS] local time
        #[arg(long)]
        since: Option<String>,
        /// Latest recorded instant to include; defaults to now
        #[arg(long)]
        until: Option<String>,
    },
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        HistoryAction::List { user, since, until } => {
            let rows = if since.is_none() && until.is_none() {
                db.history_for_user(user)?
            } else {
                let start = match &since {
                    Some(s) => local_to_utc(parse_datetime(s)?)?,
                    None => DateTime::<Utc>::MIN_UTC,
                };
                let end = match &until {
                    Some(s) => local_to_utc(parse_datetime(s)?)?,
                    None => Utc::now(),
                };
                db.history_since(user, start, end)?
            };
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }
    Ok(())
}
