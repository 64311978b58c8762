use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "dosemate-cli", version, about = "DoseMate CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Medicine management
    Medicine {
        #[command(subcommand)]
        action: commands::medicine::MedicineAction,
    },
    /// Reminder queries and mutations
    Reminder {
        #[command(subcommand)]
        action: commands::reminder::ReminderAction,
    },
    /// Intake recording
    Intake {
        #[command(subcommand)]
        action: commands::intake::IntakeAction,
    },
    /// Intake history listing
    History {
        #[command(subcommand)]
        action: commands::history::HistoryAction,
    },
    /// Adherence statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Run the reminder engine and stream notification events
    Serve,
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Medicine { action } => commands::medicine::run(action),
        Commands::Reminder { action } => commands::reminder::run(action),
        Commands::Intake { action } => commands::intake::run(action),
        Commands::History { action } => commands::history::run(action),
        Commands::Stats { action } => commands::stats::run(action),
        Commands::Serve => commands::serve::run(),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
