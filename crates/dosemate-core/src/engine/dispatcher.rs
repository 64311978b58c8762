//! Due-reminder dispatcher.
//!
//! Finds PENDING reminders whose scheduled instant has arrived, broadcasts
//! a REMINDER_DUE event, then compare-and-sets the status to TRIGGERED.
//! The event goes out before the status commit, so delivery is
//! at-least-once; the status commit is idempotent across ticks because the
//! query only selects PENDING rows.

use chrono::NaiveDateTime;

use crate::events::NotificationEvent;
use crate::hub::NotificationHub;
use crate::model::ReminderStatus;
use crate::storage::{CasOutcome, Database};

/// Dispatch every due reminder: one REMINDER_DUE event and one attempted
/// PENDING -> TRIGGERED transition each. Returns how many were triggered.
///
/// A failure on one reminder is logged and does not abort the batch; a
/// reminder whose status commit failed stays PENDING and is re-evaluated
/// on the next tick.
pub fn dispatch_due(
    db: &Database,
    hub: &NotificationHub,
    now: NaiveDateTime,
) -> Result<usize, rusqlite::Error> {
    let mut triggered = 0;

    for reminder in db.due_reminders(now)? {
        let result = (|| -> Result<bool, rusqlite::Error> {
            let Some(medicine) = db.get_medicine(reminder.medicine_id)? else {
                tracing::warn!(
                    reminder_id = reminder.id,
                    medicine_id = reminder.medicine_id,
                    "due reminder references missing medicine"
                );
                return Ok(false);
            };

            hub.broadcast(&NotificationEvent::ReminderDue {
                reminder_id: reminder.id,
                medicine_id: medicine.id,
                medicine_name: medicine.name.clone(),
                dosage: medicine.dosage.clone(),
                unit: medicine.unit.clone(),
                scheduled_at: reminder.scheduled_at,
            });

            match db.cas_status(reminder.id, ReminderStatus::Pending, ReminderStatus::Triggered)? {
                CasOutcome::Committed => Ok(true),
                CasOutcome::Lost => {
                    // Event already went out; the other writer owns the row now.
                    tracing::debug!(reminder_id = reminder.id, "dispatch lost status race");
                    Ok(false)
                }
            }
        })();

        match result {
            Ok(true) => triggered += 1,
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(reminder_id = reminder.id, error = %e, "failed to dispatch reminder");
            }
        }
    }
    Ok(triggered)
}
