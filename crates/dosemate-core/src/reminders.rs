//! User-facing reminder operations.
//!
//! Every operation here is ownership-checked: the caller must own the
//! medicine the reminder belongs to. A failed mutation returns an error
//! with no partial state change.

use chrono::{Duration, NaiveDateTime};

use crate::error::{CoreError, Result};
use crate::hub::NotificationHub;
use crate::intake::record_outcome;
use crate::model::{HistorySource, Medicine, NewReminder, Reminder, ReminderStatus};
use crate::storage::{CasOutcome, Database};

/// Timezone label attached to new reminders. The engine operates on the
/// server's local wall clock; the label travels with the row for clients.
///
/// Reads the `TZ` environment variable, expected to hold an IANA name
/// such as `Europe/Rome`. When `TZ` is unset the literal `"local"` is
/// stored instead; it is not an IANA name, it marks the row as scheduled
/// in the server's local zone, whatever that was.
pub fn system_zone_id() -> String {
    std::env::var("TZ").unwrap_or_else(|_| "local".to_string())
}

/// Optional fields of a reminder creation request; unset fields fall back
/// to the same defaults the materializer uses.
#[derive(Debug, Clone, Default)]
pub struct ReminderDraft {
    pub repeat_pattern: Option<String>,
    pub zone_id: Option<String>,
    pub delivery_channel: Option<String>,
}

fn owned_medicine(db: &Database, user_id: i64, medicine_id: i64) -> Result<Medicine> {
    let medicine = db
        .get_medicine(medicine_id)?
        .ok_or(CoreError::NotFound("medicine"))?;
    if medicine.user_id != user_id {
        return Err(CoreError::Unauthorized);
    }
    Ok(medicine)
}

fn owned_reminder(db: &Database, user_id: i64, reminder_id: i64) -> Result<(Reminder, Medicine)> {
    let reminder = db
        .get_reminder(reminder_id)?
        .ok_or(CoreError::NotFound("reminder"))?;
    let medicine = owned_medicine(db, user_id, reminder.medicine_id)?;
    Ok((reminder, medicine))
}

/// Create a PENDING reminder for a medicine at a specific instant.
pub fn create(
    db: &Database,
    user_id: i64,
    medicine_id: i64,
    scheduled_at: NaiveDateTime,
    draft: ReminderDraft,
) -> Result<Reminder> {
    owned_medicine(db, user_id, medicine_id)?;
    let reminder = db.insert_reminder(&NewReminder {
        medicine_id,
        scheduled_at,
        zone_id: draft.zone_id.unwrap_or_else(system_zone_id),
        repeat_pattern: draft.repeat_pattern.unwrap_or_else(|| "daily".to_string()),
        delivery_channel: draft.delivery_channel.unwrap_or_else(|| "app".to_string()),
    })?;
    Ok(reminder)
}

/// All reminders for one of the caller's medicines.
pub fn by_medicine(db: &Database, user_id: i64, medicine_id: i64) -> Result<Vec<Reminder>> {
    owned_medicine(db, user_id, medicine_id)?;
    Ok(db.reminders_for_medicine(medicine_id)?)
}

/// The caller's PENDING reminders.
pub fn pending(db: &Database, user_id: i64) -> Result<Vec<Reminder>> {
    Ok(db.pending_for_user(user_id)?)
}

/// The caller's PENDING reminders scheduled within the next 24 hours.
pub fn upcoming(db: &Database, user_id: i64, now: NaiveDateTime) -> Result<Vec<Reminder>> {
    Ok(db.upcoming_for_user(user_id, now)?)
}

/// Manually resolve a reminder to a terminal outcome.
///
/// Updates the reminder row with a compare-and-set guarded on a
/// non-terminal current status, then appends exactly one MANUAL history
/// row and broadcasts the outcome. A reminder that already reached a
/// terminal state yields `Conflict` and no history row.
pub fn update_status(
    db: &Database,
    hub: &NotificationHub,
    user_id: i64,
    reminder_id: i64,
    status: ReminderStatus,
    now: NaiveDateTime,
) -> Result<Reminder> {
    let (reminder, medicine) = owned_reminder(db, user_id, reminder_id)?;
    if !status.is_terminal() {
        return Err(CoreError::InvalidArgument(format!(
            "cannot manually set status {status}"
        )));
    }

    match db.resolve_status(reminder_id, status)? {
        CasOutcome::Committed => {
            record_outcome(
                db,
                hub,
                &reminder,
                &medicine,
                status,
                HistorySource::Manual,
                None,
                now,
            )?;
            db.get_reminder(reminder_id)?
                .ok_or(CoreError::NotFound("reminder"))
        }
        CasOutcome::Lost => Err(CoreError::Conflict { reminder_id }),
    }
}

/// Shift a reminder's scheduled instant forward by `minutes` and bump its
/// snooze count. Status is untouched and no history row is written; there
/// is no upper bound on the snooze count.
pub fn snooze(db: &Database, user_id: i64, reminder_id: i64, minutes: u32) -> Result<Reminder> {
    let (reminder, _medicine) = owned_reminder(db, user_id, reminder_id)?;
    let new_at = reminder.scheduled_at + Duration::minutes(minutes as i64);
    db.apply_snooze(reminder_id, new_at)?;
    db.get_reminder(reminder_id)?
        .ok_or(CoreError::NotFound("reminder"))
}

/// Delete one of the caller's medicines along with its reminders and their
/// history rows, in that dependency order.
pub fn delete_medicine(db: &Database, user_id: i64, medicine_id: i64) -> Result<()> {
    owned_medicine(db, user_id, medicine_id)?;
    db.delete_medicine(medicine_id)?;
    Ok(())
}
