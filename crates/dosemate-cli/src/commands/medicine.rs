use clap::Subcommand;
use dosemate_core::model::NewMedicine;
use dosemate_core::{reminders, Database};

#[derive(Subcommand)]
pub enum MedicineAction {
    /// Register a medicine with its daily reminder times
    Add {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        dosage: String,
        #[arg(long, default_value = "")]
        unit: String,
        /// Time of day as HH:mm; repeat for multiple doses
        #[arg(long = "time")]
        times: Vec<String>,
    },
    /// List a user's medicines
    List {
        #[arg(long)]
        user: i64,
    },
    /// Delete a medicine with its reminders and history
    Remove {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        id: i64,
    },
}

pub fn run(action: MedicineAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        MedicineAction::Add {
            user,
            name,
            dosage,
            unit,
            times,
        } => {
            let medicine = db.insert_medicine(&NewMedicine {
                user_id: user,
                name,
                dosage,
                unit,
                reminder_times: times,
                active: true,
            })?;
            println!("{}", serde_json::to_string_pretty(&medicine)?);
        }
        MedicineAction::List { user } => {
            let medicines = db.list_medicines(user)?;
            println!("{}", serde_json::to_string_pretty(&medicines)?);
        }
        MedicineAction::Remove { user, id } => {
            reminders::delete_medicine(&db, user, id)?;
            println!("deleted medicine {id}");
        }
    }
    Ok(())
}
