//! Intake recorder.
//!
//! Accepts a user-reported outcome for a reminder, computes response
//! latency, appends a history row and broadcasts an INTAKE_RECORDED event.
//!
//! This raw entry point never touches the reminder row itself; the
//! status-changing path lives in [`crate::reminders::update_status`] and
//! routes through the same [`record_outcome`] helper, so both append
//! exactly one history row per call.

use chrono::{NaiveDateTime, Utc};

use crate::error::{CoreError, Result};
use crate::events::NotificationEvent;
use crate::hub::NotificationHub;
use crate::model::{HistoryRecord, HistorySource, Medicine, NewHistory, Reminder, ReminderStatus};
use crate::storage::Database;

/// Record an intake outcome against a reminder the caller owns.
///
/// `now` is the caller's local wall clock, used for the latency
/// computation against the reminder's scheduled instant.
///
/// # Errors
/// `NotFound` when the reminder is absent, `Unauthorized` when the caller
/// does not own it, `InvalidArgument` for a non-terminal status.
pub fn record_intake(
    db: &Database,
    hub: &NotificationHub,
    user_id: i64,
    reminder_id: i64,
    status: ReminderStatus,
    source: HistorySource,
    notes: Option<String>,
    now: NaiveDateTime,
) -> Result<HistoryRecord> {
    let reminder = db
        .get_reminder(reminder_id)?
        .ok_or(CoreError::NotFound("reminder"))?;
    let medicine = db
        .get_medicine(reminder.medicine_id)?
        .ok_or(CoreError::NotFound("medicine"))?;
    if medicine.user_id != user_id {
        return Err(CoreError::Unauthorized);
    }
    if !status.is_terminal() {
        return Err(CoreError::InvalidArgument(format!(
            "cannot record intermediate status {status}"
        )));
    }

    record_outcome(db, hub, &reminder, &medicine, status, source, notes, now)
}

/// Append one history row attributing an outcome and broadcast it.
///
/// Latency is the signed number of seconds between the scheduled instant
/// and `now` (negative when the outcome was logged early).
#[allow(clippy::too_many_arguments)]
pub(crate) fn record_outcome(
    db: &Database,
    hub: &NotificationHub,
    reminder: &Reminder,
    medicine: &Medicine,
    status: ReminderStatus,
    source: HistorySource,
    notes: Option<String>,
    now: NaiveDateTime,
) -> Result<HistoryRecord> {
    let latency_seconds = Some((now - reminder.scheduled_at).num_seconds());
    let record = db.insert_history(&NewHistory {
        reminder_id: reminder.id,
        status,
        recorded_at: Utc::now(),
        source,
        latency_seconds,
        notes,
    })?;

    hub.broadcast(&NotificationEvent::IntakeRecorded {
        reminder_id: reminder.id,
        medicine_id: medicine.id,
        medicine_name: medicine.name.clone(),
        status,
        timestamp: record.recorded_at,
        latency_seconds: record.latency_seconds,
    });

    Ok(record)
}
