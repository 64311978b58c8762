//! Schedule materializer.
//!
//! Expands each active medicine's recurring times-of-day into concrete
//! PENDING reminders for the near-term window. Runs on a fixed period;
//! re-running without advancing time creates no duplicates because an
//! unresolved reminder already exists for the (medicine, instant) pair.

use chrono::{Duration, NaiveDateTime, NaiveTime};

use crate::model::NewReminder;
use crate::reminders::system_zone_id;
use crate::storage::Database;

/// Parse an `HH:mm` time-of-day string.
///
/// Returns `None` for anything that does not parse; malformed entries are
/// skipped by the materializer, never fatal.
pub fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 2 {
        return None;
    }
    let hour: u32 = parts[0].parse().ok()?;
    let minute: u32 = parts[1].parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Create reminders for every active medicine whose configured time-of-day
/// falls inside `(now, now + lookahead]` today. Returns how many were
/// created.
///
/// A failure on one medicine is logged and does not abort the others.
pub fn materialize(
    db: &Database,
    now: NaiveDateTime,
    lookahead: Duration,
) -> Result<usize, rusqlite::Error> {
    let window_end = now + lookahead;
    let mut created = 0;

    for medicine in db.list_active_medicines()? {
        let result = (|| -> Result<usize, rusqlite::Error> {
            let mut count = 0;
            for time in &medicine.reminder_times {
                let Some(tod) = parse_time_of_day(time) else {
                    tracing::warn!(
                        medicine_id = medicine.id,
                        time = %time,
                        "skipping malformed reminder time"
                    );
                    continue;
                };
                let scheduled = now.date().and_time(tod);
                if scheduled <= now || scheduled > window_end {
                    continue;
                }
                if db.has_open_reminder_at(medicine.id, scheduled)? {
                    continue;
                }
                db.insert_reminder(&NewReminder {
                    medicine_id: medicine.id,
                    scheduled_at: scheduled,
                    zone_id: system_zone_id(),
                    repeat_pattern: "daily".into(),
                    delivery_channel: "app".into(),
                })?;
                tracing::debug!(
                    medicine_id = medicine.id,
                    scheduled_at = %scheduled,
                    "materialized reminder"
                );
                count += 1;
            }
            Ok(count)
        })();

        match result {
            Ok(count) => created += count,
            Err(e) => {
                tracing::warn!(medicine_id = medicine.id, error = %e, "materializer failed for medicine");
            }
        }
    }
    Ok(created)
}
