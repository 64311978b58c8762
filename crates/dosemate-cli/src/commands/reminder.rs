use chrono::Local;
use clap::Subcommand;
use dosemate_core::reminders::{self, ReminderDraft};
use dosemate_core::{Database, NotificationHub};

use super::parse_datetime;

#[derive(Subcommand)]
pub enum ReminderAction {
    /// Create a reminder for a medicine at a specific instant
    Create {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        medicine: i64,
        /// Scheduled instant, YYYY-MM-DDTHH:MM[:SS] local time
        #[arg(long)]
        at: String,
    },
    /// All reminders for one medicine
    List {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        medicine: i64,
    },
    /// The user's pending reminders
    Pending {
        #[arg(long)]
        user: i64,
    },
    /// Pending reminders within the next 24 hours
    Upcoming {
        #[arg(long)]
        user: i64,
    },
    /// Manually resolve a reminder (TAKEN, SKIPPED, MISSED)
    Status {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        id: i64,
        #[arg(long)]
        status: String,
    },
    /// Push a reminder's scheduled time forward
    Snooze {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        id: i64,
        /// Minutes to snooze; defaults to the configured snooze duration
        #[arg(long)]
        minutes: Option<u32>,
    },
}

pub fn run(action: ReminderAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        ReminderAction::Create { user, medicine, at } => {
            let scheduled_at = parse_datetime(&at)?;
            let reminder =
                reminders::create(&db, user, medicine, scheduled_at, ReminderDraft::default())?;
            println!("{}", serde_json::to_string_pretty(&reminder)?);
        }
        ReminderAction::List { user, medicine } => {
            let list = reminders::by_medicine(&db, user, medicine)?;
            println!("{}", serde_json::to_string_pretty(&list)?);
        }
        ReminderAction::Pending { user } => {
            let list = reminders::pending(&db, user)?;
            println!("{}", serde_json::to_string_pretty(&list)?);
        }
        ReminderAction::Upcoming { user } => {
            let list = reminders::upcoming(&db, user, Local::now().naive_local())?;
            println!("{}", serde_json::to_string_pretty(&list)?);
        }
        ReminderAction::Status { user, id, status } => {
            let status = status.parse()?;
            // One-shot process: the hub has no subscribers, so the
            // INTAKE_RECORDED broadcast is dropped. A running `serve`
            // process only streams events from its own writes.
            let hub = NotificationHub::new();
            let reminder =
                reminders::update_status(&db, &hub, user, id, status, Local::now().naive_local())?;
            println!("{}", serde_json::to_string_pretty(&reminder)?);
        }
        ReminderAction::Snooze { user, id, minutes } => {
            let minutes = minutes
                .unwrap_or_else(|| dosemate_core::Config::load_or_default().engine.default_snooze_min);
            let reminder = reminders::snooze(&db, user, id, minutes)?;
            println!("{}", serde_json::to_string_pretty(&reminder)?);
        }
    }
    Ok(())
}
