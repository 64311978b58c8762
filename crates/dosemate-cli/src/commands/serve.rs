use std::sync::{Arc, Mutex};

use dosemate_core::{Config, Database, NotificationHub, ReminderEngine};
use tracing_subscriber::EnvFilter;

/// Run the reminder engine in the foreground, printing every broadcast
/// notification event as a JSON line until interrupted.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dosemate_core=info,dosemate_cli=info".into()),
        )
        .init();

    let config = Config::load_or_default();
    let db = Arc::new(Mutex::new(Database::open()?));
    let hub = Arc::new(NotificationHub::new());

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let engine = ReminderEngine::new(Arc::clone(&db), Arc::clone(&hub), config.engine.clone());
        let (schedule_task, dispatch_task) = engine.spawn();

        let (client, mut rx) = hub.subscribe();
        tracing::info!(
            materializer_period_secs = config.engine.materializer_period_secs,
            dispatch_period_secs = config.engine.dispatch_period_secs,
            "reminder engine running, ctrl-c to stop"
        );

        loop {
            tokio::select! {
                Some(event) = rx.recv() => println!("{event}"),
                _ = tokio::signal::ctrl_c() => break,
            }
        }

        hub.unsubscribe(client);
        schedule_task.abort();
        dispatch_task.abort();
        Ok::<(), Box<dyn std::error::Error>>(())
    })?;
    Ok(())
}
