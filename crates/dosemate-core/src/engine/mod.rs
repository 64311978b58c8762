//! Reminder lifecycle engine.
//!
//! Two independent repeating tasks drive the lifecycle:
//! - the schedule cycle (materializer + missed-dose sweep), reference 60s
//! - the dispatch cycle (due-reminder fan-out), reference 30s
//!
//! The tasks communicate with the rest of the system only through the
//! store's conditional-update API and the hub's broadcast API. A cycle
//! that fails is logged and isolated; it never halts future invocations.
//! The cycle functions take an explicit `now`, so tests drive them without
//! a clock.

pub mod detector;
pub mod dispatcher;
pub mod materializer;

use std::sync::{Arc, Mutex};

use chrono::{Duration, Local};
use tokio::task::JoinHandle;

use crate::hub::NotificationHub;
use crate::storage::{Database, EngineConfig};

/// Store handle shared between the background tasks and API callers.
/// Row-level atomicity comes from conditional SQL updates; the mutex only
/// serializes connection access.
pub type SharedDatabase = Arc<Mutex<Database>>;

/// Lock the shared store, recovering the guard from a poisoned mutex.
/// The store itself is never left in a torn state by a panicking holder.
pub fn lock_db(db: &SharedDatabase) -> std::sync::MutexGuard<'_, Database> {
    db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Owns the background tasks of the reminder lifecycle.
pub struct ReminderEngine {
    db: SharedDatabase,
    hub: Arc<NotificationHub>,
    config: EngineConfig,
}

impl ReminderEngine {
    pub fn new(db: SharedDatabase, hub: Arc<NotificationHub>, config: EngineConfig) -> Self {
        Self { db, hub, config }
    }

    /// Spawn the two periodic tasks on the current tokio runtime.
    ///
    /// The handles run until aborted; there is no user-facing cancellation.
    pub fn spawn(&self) -> (JoinHandle<()>, JoinHandle<()>) {
        let schedule_handle = {
            let db = Arc::clone(&self.db);
            let config = self.config.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(config.materializer_period());
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    run_schedule_cycle(&db, &config);
                }
            })
        };

        let dispatch_handle = {
            let db = Arc::clone(&self.db);
            let hub = Arc::clone(&self.hub);
            let config = self.config.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(config.dispatch_period());
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    run_dispatch_cycle(&db, &hub);
                }
            })
        };

        (schedule_handle, dispatch_handle)
    }
}

/// One materializer + missed-dose pass at the current wall clock.
pub fn run_schedule_cycle(db: &SharedDatabase, config: &EngineConfig) {
    let now = Local::now().naive_local();
    let db = lock_db(db);

    match materializer::materialize(&db, now, Duration::minutes(config.lookahead_min as i64)) {
        Ok(created) if created > 0 => tracing::info!(created, "materialized reminders"),
        Ok(_) => {}
        Err(e) => tracing::error!(error = %e, "materializer cycle failed"),
    }

    match detector::sweep_missed(&db, now, Duration::minutes(config.grace_min as i64)) {
        Ok(missed) if missed > 0 => tracing::info!(missed, "marked overdue reminders missed"),
        Ok(_) => {}
        Err(e) => tracing::error!(error = %e, "missed-dose sweep failed"),
    }
}

/// One dispatch pass at the current wall clock.
pub fn run_dispatch_cycle(db: &SharedDatabase, hub: &NotificationHub) {
    let now = Local::now().naive_local();
    let db = lock_db(db);

    match dispatcher::dispatch_due(&db, hub, now) {
        Ok(triggered) if triggered > 0 => tracing::info!(triggered, "dispatched due reminders"),
        Ok(_) => {}
        Err(e) => tracing::error!(error = %e, "dispatch cycle failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewMedicine, NewReminder, ReminderStatus};
    use chrono::NaiveDateTime;

    fn shared_db() -> SharedDatabase {
        Arc::new(Mutex::new(Database::open_memory().unwrap()))
    }

    #[test]
    fn schedule_cycle_survives_empty_store() {
        let db = shared_db();
        run_schedule_cycle(&db, &EngineConfig::default());
        run_dispatch_cycle(&db, &NotificationHub::new());
    }

    #[test]
    fn full_lifecycle_scenario() {
        // 07:58 materialize -> 08:00 trigger -> 08:31 untouched -> missed.
        let db = Database::open_memory().unwrap();
        let hub = NotificationHub::new();
        let (_id, mut rx) = hub.subscribe();

        let m = db
            .insert_medicine(&NewMedicine {
                user_id: 1,
                name: "Metformin".into(),
                dosage: "500".into(),
                unit: "mg".into(),
                reminder_times: vec!["08:00".into()],
                active: true,
            })
            .unwrap();

        let t = |h: u32, mi: u32, s: u32| -> NaiveDateTime {
            chrono::NaiveDate::from_ymd_opt(2026, 3, 1)
                .unwrap()
                .and_hms_opt(h, mi, s)
                .unwrap()
        };

        assert_eq!(
            materializer::materialize(&db, t(7, 58, 0), Duration::minutes(5)).unwrap(),
            1
        );
        let reminder = &db.reminders_for_medicine(m.id).unwrap()[0];
        assert_eq!(reminder.scheduled_at, t(8, 0, 0));

        assert_eq!(dispatcher::dispatch_due(&db, &hub, t(8, 0, 1)).unwrap(), 1);
        assert!(rx.try_recv().unwrap().contains("REMINDER_DUE"));
        assert_eq!(
            db.get_reminder(reminder.id).unwrap().unwrap().status,
            ReminderStatus::Triggered
        );

        // The triggered reminder is no longer PENDING and will not be
        // swept; model the untouched branch with a fresh reminder.
        let db2 = Database::open_memory().unwrap();
        let m2 = db2
            .insert_medicine(&NewMedicine {
                user_id: 1,
                name: "Metformin".into(),
                dosage: "500".into(),
                unit: "mg".into(),
                reminder_times: vec![],
                active: true,
            })
            .unwrap();
        let r2 = db2
            .insert_reminder(&NewReminder {
                medicine_id: m2.id,
                scheduled_at: t(8, 0, 0),
                zone_id: "UTC".into(),
                repeat_pattern: "daily".into(),
                delivery_channel: "app".into(),
            })
            .unwrap();
        assert_eq!(
            detector::sweep_missed(&db2, t(8, 31, 0), Duration::minutes(30)).unwrap(),
            1
        );
        assert_eq!(
            db2.get_reminder(r2.id).unwrap().unwrap().status,
            ReminderStatus::Missed
        );
    }
}
