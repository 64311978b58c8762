//! Adherence rate, latency and weekly-series computations.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::model::{HistoryRecord, ReminderStatus};
use crate::storage::Database;

/// Summary statistics over a set of history rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdherenceStats {
    /// Total history rows considered.
    pub total: u64,
    /// Rows whose outcome was TAKEN.
    pub taken: u64,
    /// Rows whose outcome was MISSED.
    pub missed: u64,
    /// taken / total * 100, 0 when there is no history.
    pub adherence_rate: f64,
    /// Mean latency over TAKEN rows carrying a latency, 0 when none do.
    pub avg_latency_seconds: f64,
}

/// Adherence summary for a single medicine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicineAdherence {
    pub medicine_id: i64,
    #[serde(flatten)]
    pub stats: AdherenceStats,
}

/// One day of the weekly adherence series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyAdherence {
    pub date: NaiveDate,
    pub total: u64,
    pub taken: u64,
    /// taken / total * 100, truncated to an integer; 0 for empty days.
    pub percentage: u64,
}

fn summarize(rows: &[HistoryRecord]) -> AdherenceStats {
    let total = rows.len() as u64;
    let taken = rows
        .iter()
        .filter(|h| h.status == ReminderStatus::Taken)
        .count() as u64;
    let missed = rows
        .iter()
        .filter(|h| h.status == ReminderStatus::Missed)
        .count() as u64;

    let adherence_rate = if total > 0 {
        taken as f64 * 100.0 / total as f64
    } else {
        0.0
    };

    let latencies: Vec<i64> = rows
        .iter()
        .filter(|h| h.status == ReminderStatus::Taken)
        .filter_map(|h| h.latency_seconds)
        .collect();
    let avg_latency_seconds = if latencies.is_empty() {
        0.0
    } else {
        latencies.iter().sum::<i64>() as f64 / latencies.len() as f64
    };

    AdherenceStats {
        total,
        taken,
        missed,
        adherence_rate,
        avg_latency_seconds,
    }
}

/// Overall adherence across all of the user's medicines.
pub fn overall(db: &Database, user_id: i64) -> Result<AdherenceStats> {
    let rows = db.history_for_user(user_id)?;
    Ok(summarize(&rows))
}

/// Adherence for one medicine the user owns.
pub fn by_medicine(db: &Database, user_id: i64, medicine_id: i64) -> Result<MedicineAdherence> {
    let medicine = db
        .get_medicine(medicine_id)?
        .ok_or(CoreError::NotFound("medicine"))?;
    if medicine.user_id != user_id {
        return Err(CoreError::Unauthorized);
    }
    let rows = db.history_for_medicine(user_id, medicine_id)?;
    Ok(MedicineAdherence {
        medicine_id,
        stats: summarize(&rows),
    })
}

/// Daily totals for the last 7 calendar days, oldest first, today
/// inclusive. Days without history are zero-filled.
pub fn weekly(db: &Database, user_id: i64, today: NaiveDate) -> Result<Vec<DailyAdherence>> {
    let rows = db.history_for_user(user_id)?;
    let mut series = Vec::with_capacity(7);

    for offset in (0..7).rev() {
        let date = today - chrono::Duration::days(offset);
        let day_rows: Vec<&HistoryRecord> = rows
            .iter()
            .filter(|h| h.recorded_at.with_timezone(&Local).date_naive() == date)
            .collect();
        let total = day_rows.len() as u64;
        let taken = day_rows
            .iter()
            .filter(|h| h.status == ReminderStatus::Taken)
            .count() as u64;
        series.push(DailyAdherence {
            date,
            total,
            taken,
            percentage: if total > 0 { taken * 100 / total } else { 0 },
        });
    }
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HistorySource, NewHistory, NewMedicine, NewReminder};
    use chrono::{DateTime, Duration, NaiveDate, Utc};

    fn setup(db: &Database, user_id: i64) -> i64 {
        let m = db
            .insert_medicine(&NewMedicine {
                user_id,
                name: "Metformin".into(),
                dosage: "500".into(),
                unit: "mg".into(),
                reminder_times: vec![],
                active: true,
            })
            .unwrap();
        db.insert_reminder(&NewReminder {
            medicine_id: m.id,
            scheduled_at: NaiveDate::from_ymd_opt(2026, 3, 1)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
            zone_id: "UTC".into(),
            repeat_pattern: "daily".into(),
            delivery_channel: "app".into(),
        })
        .unwrap();
        m.id
    }

    fn add_history(
        db: &Database,
        reminder_id: i64,
        status: ReminderStatus,
        recorded_at: DateTime<Utc>,
        latency: Option<i64>,
    ) {
        db.insert_history(&NewHistory {
            reminder_id,
            status,
            recorded_at,
            source: HistorySource::Manual,
            latency_seconds: latency,
            notes: None,
        })
        .unwrap();
    }

    #[test]
    fn six_of_ten_taken_is_sixty_percent() {
        let db = Database::open_memory().unwrap();
        let mid = setup(&db, 1);
        let rid = db.reminders_for_medicine(mid).unwrap()[0].id;

        let now = Utc::now();
        for i in 0..10 {
            let status = if i < 6 {
                ReminderStatus::Taken
            } else {
                ReminderStatus::Missed
            };
            add_history(&db, rid, status, now - Duration::days(i % 7), Some(60));
        }

        let stats = overall(&db, 1).unwrap();
        assert_eq!(stats.total, 10);
        assert_eq!(stats.taken, 6);
        assert_eq!(stats.missed, 4);
        assert!((stats.adherence_rate - 60.0).abs() < f64::EPSILON);
        assert!((stats.avg_latency_seconds - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_history_is_all_zeroes() {
        let db = Database::open_memory().unwrap();
        setup(&db, 1);
        let stats = overall(&db, 1).unwrap();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.adherence_rate, 0.0);
        assert_eq!(stats.avg_latency_seconds, 0.0);
    }

    #[test]
    fn latency_average_ignores_missed_and_null_rows() {
        let db = Database::open_memory().unwrap();
        let mid = setup(&db, 1);
        let rid = db.reminders_for_medicine(mid).unwrap()[0].id;
        let now = Utc::now();

        add_history(&db, rid, ReminderStatus::Taken, now, Some(30));
        add_history(&db, rid, ReminderStatus::Taken, now, Some(90));
        add_history(&db, rid, ReminderStatus::Taken, now, None);
        add_history(&db, rid, ReminderStatus::Missed, now, Some(100_000));

        let stats = overall(&db, 1).unwrap();
        assert!((stats.avg_latency_seconds - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn by_medicine_filters_and_checks_ownership() {
        let db = Database::open_memory().unwrap();
        let mine = setup(&db, 1);
        let theirs = setup(&db, 2);
        let my_rid = db.reminders_for_medicine(mine).unwrap()[0].id;
        let their_rid = db.reminders_for_medicine(theirs).unwrap()[0].id;

        add_history(&db, my_rid, ReminderStatus::Taken, Utc::now(), Some(10));
        add_history(&db, their_rid, ReminderStatus::Missed, Utc::now(), None);

        let mine_stats = by_medicine(&db, 1, mine).unwrap();
        assert_eq!(mine_stats.stats.total, 1);
        assert_eq!(mine_stats.stats.taken, 1);

        assert!(matches!(
            by_medicine(&db, 1, theirs),
            Err(CoreError::Unauthorized)
        ));
        assert!(matches!(
            by_medicine(&db, 1, 999),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn weekly_series_is_exactly_seven_days_oldest_first() {
        let db = Database::open_memory().unwrap();
        let mid = setup(&db, 1);
        let rid = db.reminders_for_medicine(mid).unwrap()[0].id;
        let today = Local::now().date_naive();
        let now = Utc::now();

        // Two rows today (one taken), one taken row three days ago.
        add_history(&db, rid, ReminderStatus::Taken, now, Some(5));
        add_history(&db, rid, ReminderStatus::Missed, now, None);
        add_history(&db, rid, ReminderStatus::Taken, now - Duration::days(3), Some(5));

        let series = weekly(&db, 1, today).unwrap();
        assert_eq!(series.len(), 7);
        assert_eq!(series[0].date, today - Duration::days(6));
        assert_eq!(series[6].date, today);

        assert_eq!(series[6].total, 2);
        assert_eq!(series[6].taken, 1);
        assert_eq!(series[6].percentage, 50);

        assert_eq!(series[3].date, today - Duration::days(3));
        assert_eq!(series[3].total, 1);
        assert_eq!(series[3].percentage, 100);

        // Untouched days are zero-filled.
        assert_eq!(series[1].total, 0);
        assert_eq!(series[1].percentage, 0);
    }

    #[test]
    fn weekly_series_truncates_percentage() {
        let db = Database::open_memory().unwrap();
        let mid = setup(&db, 1);
        let rid = db.reminders_for_medicine(mid).unwrap()[0].id;
        let today = Local::now().date_naive();
        let now = Utc::now();

        // 2 taken of 3 -> 66.67% truncated to 66.
        add_history(&db, rid, ReminderStatus::Taken, now, None);
        add_history(&db, rid, ReminderStatus::Taken, now, None);
        add_history(&db, rid, ReminderStatus::Missed, now, None);

        let series = weekly(&db, 1, today).unwrap();
        assert_eq!(series[6].percentage, 66);
    }
}
