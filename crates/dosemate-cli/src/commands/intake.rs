use chrono::Local;
use clap::Subcommand;
use dosemate_core::{intake, Database, HistorySource, NotificationHub};

#[derive(Subcommand)]
pub enum IntakeAction {
    /// Append an intake outcome to the history log
    Record {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        reminder: i64,
        /// Outcome: TAKEN, SKIPPED or MISSED
        #[arg(long)]
        status: String,
        /// MANUAL, PUSH or AUTO
        #[arg(long, default_value = "MANUAL")]
        source: String,
        #[arg(long)]
        notes: Option<String>,
    },
}

pub fn run(action: IntakeAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        IntakeAction::Record {
            user,
            reminder,
            status,
            source,
            notes,
        } => {
            let status = status.parse()?;
            let source: HistorySource = source.parse()?;
            // One-shot process: the hub has no subscribers, so the
            // INTAKE_RECORDED broadcast is dropped. A running `serve`
            // process only streams events from its own writes.
            let hub = NotificationHub::new();
            let record = intake::record_intake(
                &db,
                &hub,
                user,
                reminder,
                status,
                source,
                notes,
                Local::now().naive_local(),
            )?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }
    Ok(())
}
