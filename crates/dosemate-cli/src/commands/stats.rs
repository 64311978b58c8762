use chrono::Local;
use clap::Subcommand;
use dosemate_core::{stats, Database};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Overall adherence across all medicines
    Overall {
        #[arg(long)]
        user: i64,
    },
    /// Adherence for one medicine
    Medicine {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        id: i64,
    },
    /// Daily adherence for the last 7 days
    Weekly {
        #[arg(long)]
        user: i64,
    },
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        StatsAction::Overall { user } => {
            let summary = stats::overall(&db, user)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        StatsAction::Medicine { user, id } => {
            let summary = stats::by_medicine(&db, user, id)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        StatsAction::Weekly { user } => {
            let series = stats::weekly(&db, user, Local::now().date_naive())?;
            println!("{}", serde_json::to_string_pretty(&series)?);
        }
    }
    Ok(())
}
