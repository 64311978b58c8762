//! Missed-dose detector.
//!
//! Sweeps PENDING reminders whose scheduled instant is older than the grace
//! window and resolves them to MISSED, one AUTO history row each. The sweep
//! and the dispatcher may race on the same reminder; the compare-and-set
//! keyed on PENDING makes whichever writer observes it first win, the other
//! a no-op.

use chrono::{Duration, NaiveDateTime, Utc};

use crate::model::{HistorySource, NewHistory, ReminderStatus};
use crate::storage::{CasOutcome, Database};

/// Transition overdue PENDING reminders to MISSED. Returns how many were
/// marked. Failures on one reminder do not block the others.
pub fn sweep_missed(
    db: &Database,
    now: NaiveDateTime,
    grace: Duration,
) -> Result<usize, rusqlite::Error> {
    let cutoff = now - grace;
    let mut missed = 0;

    for reminder in db.stale_pending(cutoff)? {
        let result = (|| -> Result<bool, rusqlite::Error> {
            match db.cas_status(reminder.id, ReminderStatus::Pending, ReminderStatus::Missed)? {
                CasOutcome::Committed => {
                    db.insert_history(&NewHistory {
                        reminder_id: reminder.id,
                        status: ReminderStatus::Missed,
                        recorded_at: Utc::now(),
                        source: HistorySource::Auto,
                        latency_seconds: None,
                        notes: None,
                    })?;
                    Ok(true)
                }
                CasOutcome::Lost => {
                    tracing::debug!(reminder_id = reminder.id, "missed sweep lost status race");
                    Ok(false)
                }
            }
        })();

        match result {
            Ok(true) => missed += 1,
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(reminder_id = reminder.id, error = %e, "failed to mark reminder missed");
            }
        }
    }
    Ok(missed)
}
