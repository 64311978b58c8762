//! SQLite-backed reminder and history store.
//!
//! Provides persistent storage for:
//! - Medicines (the slice of the catalog the engine consumes)
//! - Reminders and their status transitions
//! - The immutable intake history log
//!
//! Status transitions are compare-and-set: a conditional `UPDATE` keyed on
//! the current stored status, scoped to a single row. Two writers racing on
//! the same reminder see exactly one `Committed` outcome; the loser gets
//! `Lost` and must treat it as a no-op.

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection};

use crate::model::{
    HistoryRecord, HistorySource, Medicine, NewHistory, NewMedicine, NewReminder, Reminder,
    ReminderStatus,
};

use super::data_dir;

/// Stored format for naive local date-times. Fixed-width, so string
/// comparison in SQL matches chronological order.
const NAIVE_FMT: &str = "%Y-%m-%dT%H:%M:%S";

/// Result of a conditional status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// This writer observed the expected status and committed the change.
    Committed,
    /// Another writer got there first; nothing was changed.
    Lost,
}

/// SQLite database for reminders, medicines and history.
pub struct Database {
    conn: Connection,
}

fn conversion_err(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, msg.into())
}

fn parse_naive(idx: usize, s: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, NAIVE_FMT)
        .map_err(|e| conversion_err(idx, format!("bad date-time '{s}': {e}")))
}

fn parse_utc(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, format!("bad timestamp '{s}': {e}")))
}

fn parse_status(idx: usize, s: &str) -> rusqlite::Result<ReminderStatus> {
    s.parse()
        .map_err(|_| conversion_err(idx, format!("bad status '{s}'")))
}

fn parse_source(idx: usize, s: &str) -> rusqlite::Result<HistorySource> {
    s.parse()
        .map_err(|_| conversion_err(idx, format!("bad history source '{s}'")))
}

fn medicine_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Medicine> {
    let times_json: String = row.get(5)?;
    let reminder_times = serde_json::from_str(&times_json)
        .map_err(|e| conversion_err(5, format!("bad reminder_times: {e}")))?;
    Ok(Medicine {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        dosage: row.get(3)?,
        unit: row.get(4)?,
        reminder_times,
        active: row.get(6)?,
    })
}

fn reminder_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Reminder> {
    Ok(Reminder {
        id: row.get(0)?,
        medicine_id: row.get(1)?,
        scheduled_at: parse_naive(2, &row.get::<_, String>(2)?)?,
        zone_id: row.get(3)?,
        repeat_pattern: row.get(4)?,
        status: parse_status(5, &row.get::<_, String>(5)?)?,
        delivery_channel: row.get(6)?,
        snooze_count: row.get(7)?,
        created_at: parse_utc(8, &row.get::<_, String>(8)?)?,
    })
}

fn history_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<HistoryRecord> {
    Ok(HistoryRecord {
        id: row.get(0)?,
        reminder_id: row.get(1)?,
        status: parse_status(2, &row.get::<_, String>(2)?)?,
        recorded_at: parse_utc(3, &row.get::<_, String>(3)?)?,
        source: parse_source(4, &row.get::<_, String>(4)?)?,
        latency_seconds: row.get(5)?,
        notes: row.get(6)?,
    })
}

const REMINDER_COLS: &str = "id, medicine_id, scheduled_at, zone_id, repeat_pattern, status, \
                             delivery_channel, snooze_count, created_at";
const HISTORY_COLS: &str = "id, reminder_id, status, recorded_at, source, latency_seconds, notes";

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/dosemate/dosemate.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        Self::open_at(&data_dir()?.join("dosemate.db"))
    }

    /// Open a database at an explicit path.
    pub fn open_at(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error>> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    #[cfg(test)]
    pub fn open_memory() -> Result<Self, Box<dyn std::error::Error>> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS medicines (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id        INTEGER NOT NULL,
                name           TEXT NOT NULL,
                dosage         TEXT NOT NULL DEFAULT '',
                unit           TEXT NOT NULL DEFAULT '',
                reminder_times TEXT NOT NULL DEFAULT '[]',
                active         INTEGER NOT NULL DEFAULT 1
            );

            CREATE TABLE IF NOT EXISTS reminders (
                id               INTEGER PRIMARY KEY AUTOINCREMENT,
                medicine_id      INTEGER NOT NULL REFERENCES medicines(id),
                scheduled_at     TEXT NOT NULL,
                zone_id          TEXT NOT NULL,
                repeat_pattern   TEXT NOT NULL DEFAULT 'daily',
                status           TEXT NOT NULL DEFAULT 'PENDING',
                delivery_channel TEXT NOT NULL DEFAULT 'app',
                snooze_count     INTEGER NOT NULL DEFAULT 0,
                created_at       TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS history (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                reminder_id     INTEGER NOT NULL REFERENCES reminders(id),
                status          TEXT NOT NULL,
                recorded_at     TEXT NOT NULL,
                source          TEXT NOT NULL,
                latency_seconds INTEGER,
                notes           TEXT
            );

            -- Indexes for the dispatcher/detector scans and history reads
            CREATE INDEX IF NOT EXISTS idx_reminders_status_scheduled
                ON reminders(status, scheduled_at);
            CREATE INDEX IF NOT EXISTS idx_reminders_medicine ON reminders(medicine_id);
            CREATE INDEX IF NOT EXISTS idx_history_reminder ON history(reminder_id);
            CREATE INDEX IF NOT EXISTS idx_history_recorded_at ON history(recorded_at);",
        )?;
        Ok(())
    }

    // ── Medicines ────────────────────────────────────────────────────

    pub fn insert_medicine(&self, m: &NewMedicine) -> Result<Medicine, rusqlite::Error> {
        let times_json = serde_json::to_string(&m.reminder_times)
            .map_err(|e| conversion_err(0, format!("bad reminder_times: {e}")))?;
        self.conn.execute(
            "INSERT INTO medicines (user_id, name, dosage, unit, reminder_times, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![m.user_id, m.name, m.dosage, m.unit, times_json, m.active],
        )?;
        Ok(Medicine {
            id: self.conn.last_insert_rowid(),
            user_id: m.user_id,
            name: m.name.clone(),
            dosage: m.dosage.clone(),
            unit: m.unit.clone(),
            reminder_times: m.reminder_times.clone(),
            active: m.active,
        })
    }

    pub fn get_medicine(&self, id: i64) -> Result<Option<Medicine>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, dosage, unit, reminder_times, active
             FROM medicines WHERE id = ?1",
        )?;
        match stmt.query_row(params![id], medicine_from_row) {
            Ok(m) => Ok(Some(m)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn list_medicines(&self, user_id: i64) -> Result<Vec<Medicine>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, dosage, unit, reminder_times, active
             FROM medicines WHERE user_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![user_id], medicine_from_row)?;
        rows.collect()
    }

    /// Active medicines across all users, for the materializer.
    pub fn list_active_medicines(&self) -> Result<Vec<Medicine>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, dosage, unit, reminder_times, active
             FROM medicines WHERE active = 1 ORDER BY id",
        )?;
        let rows = stmt.query_map([], medicine_from_row)?;
        rows.collect()
    }

    /// Delete a medicine and everything hanging off it.
    ///
    /// History rows go first, then the reminders, then the medicine, so a
    /// reminder is never left pointing at a deleted medicine. A failure
    /// deleting one reminder's history is logged and deletion proceeds;
    /// the medicine must not be left undeletable by stray history rows.
    pub fn delete_medicine(&self, id: i64) -> Result<(), rusqlite::Error> {
        let reminder_ids: Vec<i64> = {
            let mut stmt = self
                .conn
                .prepare("SELECT id FROM reminders WHERE medicine_id = ?1")?;
            let rows = stmt.query_map(params![id], |row| row.get(0))?;
            rows.collect::<Result<_, _>>()?
        };

        for rid in &reminder_ids {
            if let Err(e) = self
                .conn
                .execute("DELETE FROM history WHERE reminder_id = ?1", params![rid])
            {
                tracing::warn!(reminder_id = rid, error = %e, "failed to delete history rows");
            }
        }
        self.conn
            .execute("DELETE FROM reminders WHERE medicine_id = ?1", params![id])?;
        self.conn
            .execute("DELETE FROM medicines WHERE id = ?1", params![id])?;
        Ok(())
    }

    // ── Reminders ────────────────────────────────────────────────────

    pub fn insert_reminder(&self, r: &NewReminder) -> Result<Reminder, rusqlite::Error> {
        let created_at = Utc::now();
        self.conn.execute(
            "INSERT INTO reminders
                 (medicine_id, scheduled_at, zone_id, repeat_pattern, status,
                  delivery_channel, snooze_count, created_at)
             VALUES (?1, ?2, ?3, ?4, 'PENDING', ?5, 0, ?6)",
            params![
                r.medicine_id,
                r.scheduled_at.format(NAIVE_FMT).to_string(),
                r.zone_id,
                r.repeat_pattern,
                r.delivery_channel,
                created_at.to_rfc3339(),
            ],
        )?;
        Ok(Reminder {
            id: self.conn.last_insert_rowid(),
            medicine_id: r.medicine_id,
            scheduled_at: r.scheduled_at,
            zone_id: r.zone_id.clone(),
            repeat_pattern: r.repeat_pattern.clone(),
            status: ReminderStatus::Pending,
            delivery_channel: r.delivery_channel.clone(),
            snooze_count: 0,
            created_at,
        })
    }

    pub fn get_reminder(&self, id: i64) -> Result<Option<Reminder>, rusqlite::Error> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {REMINDER_COLS} FROM reminders WHERE id = ?1"))?;
        match stmt.query_row(params![id], reminder_from_row) {
            Ok(r) => Ok(Some(r)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn reminders_for_medicine(
        &self,
        medicine_id: i64,
    ) -> Result<Vec<Reminder>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REMINDER_COLS} FROM reminders
             WHERE medicine_id = ?1 ORDER BY scheduled_at"
        ))?;
        let rows = stmt.query_map(params![medicine_id], reminder_from_row)?;
        rows.collect()
    }

    /// All PENDING reminders belonging to one user's medicines.
    pub fn pending_for_user(&self, user_id: i64) -> Result<Vec<Reminder>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM reminders r
             JOIN medicines m ON m.id = r.medicine_id
             WHERE m.user_id = ?1 AND r.status = 'PENDING'
             ORDER BY r.scheduled_at",
            reminder_cols_qualified()
        ))?;
        let rows = stmt.query_map(params![user_id], reminder_from_row)?;
        rows.collect()
    }

    /// PENDING reminders for one user scheduled within the next 24 hours.
    pub fn upcoming_for_user(
        &self,
        user_id: i64,
        now: NaiveDateTime,
    ) -> Result<Vec<Reminder>, rusqlite::Error> {
        let end = now + chrono::Duration::hours(24);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM reminders r
             JOIN medicines m ON m.id = r.medicine_id
             WHERE m.user_id = ?1 AND r.status = 'PENDING'
               AND r.scheduled_at > ?2 AND r.scheduled_at < ?3
             ORDER BY r.scheduled_at",
            reminder_cols_qualified()
        ))?;
        let rows = stmt.query_map(
            params![
                user_id,
                now.format(NAIVE_FMT).to_string(),
                end.format(NAIVE_FMT).to_string()
            ],
            reminder_from_row,
        )?;
        rows.collect()
    }

    /// PENDING reminders whose scheduled instant has arrived
    /// (scheduled_at <= now + 1 second).
    pub fn due_reminders(&self, now: NaiveDateTime) -> Result<Vec<Reminder>, rusqlite::Error> {
        let cutoff = now + chrono::Duration::seconds(1);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REMINDER_COLS} FROM reminders
             WHERE status = 'PENDING' AND scheduled_at <= ?1
             ORDER BY scheduled_at"
        ))?;
        let rows = stmt.query_map(
            params![cutoff.format(NAIVE_FMT).to_string()],
            reminder_from_row,
        )?;
        rows.collect()
    }

    /// PENDING reminders scheduled before `cutoff` (now minus the grace
    /// window); candidates for the missed-dose sweep.
    pub fn stale_pending(&self, cutoff: NaiveDateTime) -> Result<Vec<Reminder>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REMINDER_COLS} FROM reminders
             WHERE status = 'PENDING' AND scheduled_at < ?1
             ORDER BY scheduled_at"
        ))?;
        let rows = stmt.query_map(
            params![cutoff.format(NAIVE_FMT).to_string()],
            reminder_from_row,
        )?;
        rows.collect()
    }

    /// Whether an unresolved (PENDING or TRIGGERED) reminder already exists
    /// for this medicine at this instant. Keeps the materializer idempotent.
    pub fn has_open_reminder_at(
        &self,
        medicine_id: i64,
        scheduled_at: NaiveDateTime,
    ) -> Result<bool, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT COUNT(*) FROM reminders
             WHERE medicine_id = ?1 AND scheduled_at = ?2
               AND status IN ('PENDING', 'TRIGGERED')",
        )?;
        let count: i64 = stmt.query_row(
            params![medicine_id, scheduled_at.format(NAIVE_FMT).to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Compare-and-set the status of one reminder.
    ///
    /// Commits only if the stored status still equals `from`; otherwise
    /// another writer won the race and this is a no-op.
    pub fn cas_status(
        &self,
        id: i64,
        from: ReminderStatus,
        to: ReminderStatus,
    ) -> Result<CasOutcome, rusqlite::Error> {
        let changed = self.conn.execute(
            "UPDATE reminders SET status = ?3 WHERE id = ?1 AND status = ?2",
            params![id, from.as_str(), to.as_str()],
        )?;
        Ok(if changed == 1 {
            CasOutcome::Committed
        } else {
            CasOutcome::Lost
        })
    }

    /// Move a reminder to a resolution status, provided it has not already
    /// reached a terminal state. Used by the user-facing status update.
    pub fn resolve_status(
        &self,
        id: i64,
        to: ReminderStatus,
    ) -> Result<CasOutcome, rusqlite::Error> {
        let changed = self.conn.execute(
            "UPDATE reminders SET status = ?2
             WHERE id = ?1 AND status IN ('PENDING', 'TRIGGERED')",
            params![id, to.as_str()],
        )?;
        Ok(if changed == 1 {
            CasOutcome::Committed
        } else {
            CasOutcome::Lost
        })
    }

    /// Shift a reminder's scheduled instant and bump its snooze count.
    /// Status is left untouched.
    pub fn apply_snooze(
        &self,
        id: i64,
        new_scheduled_at: NaiveDateTime,
    ) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "UPDATE reminders
             SET scheduled_at = ?2, snooze_count = snooze_count + 1
             WHERE id = ?1",
            params![id, new_scheduled_at.format(NAIVE_FMT).to_string()],
        )?;
        Ok(())
    }

    // ── History ──────────────────────────────────────────────────────

    pub fn insert_history(&self, h: &NewHistory) -> Result<HistoryRecord, rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO history (reminder_id, status, recorded_at, source, latency_seconds, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                h.reminder_id,
                h.status.as_str(),
                h.recorded_at.to_rfc3339(),
                h.source.as_str(),
                h.latency_seconds,
                h.notes,
            ],
        )?;
        Ok(HistoryRecord {
            id: self.conn.last_insert_rowid(),
            reminder_id: h.reminder_id,
            status: h.status,
            recorded_at: h.recorded_at,
            source: h.source,
            latency_seconds: h.latency_seconds,
            notes: h.notes.clone(),
        })
    }

    pub fn history_for_reminder(
        &self,
        reminder_id: i64,
    ) -> Result<Vec<HistoryRecord>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {HISTORY_COLS} FROM history
             WHERE reminder_id = ?1 ORDER BY recorded_at DESC"
        ))?;
        let rows = stmt.query_map(params![reminder_id], history_from_row)?;
        rows.collect()
    }

    /// All history rows for one user's medicines, newest first.
    pub fn history_for_user(&self, user_id: i64) -> Result<Vec<HistoryRecord>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM history h
             JOIN reminders r ON r.id = h.reminder_id
             JOIN medicines m ON m.id = r.medicine_id
             WHERE m.user_id = ?1
             ORDER BY h.recorded_at DESC",
            history_cols_qualified()
        ))?;
        let rows = stmt.query_map(params![user_id], history_from_row)?;
        rows.collect()
    }

    /// History rows for one medicine owned by `user_id`, newest first.
    pub fn history_for_medicine(
        &self,
        user_id: i64,
        medicine_id: i64,
    ) -> Result<Vec<HistoryRecord>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM history h
             JOIN reminders r ON r.id = h.reminder_id
             JOIN medicines m ON m.id = r.medicine_id
             WHERE m.user_id = ?1 AND m.id = ?2
             ORDER BY h.recorded_at DESC",
            history_cols_qualified()
        ))?;
        let rows = stmt.query_map(params![user_id, medicine_id], history_from_row)?;
        rows.collect()
    }

    /// History rows for one user recorded inside `[start, end]`, newest
    /// first. Both bounds are inclusive.
    pub fn history_since(
        &self,
        user_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HistoryRecord>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM history h
             JOIN reminders r ON r.id = h.reminder_id
             JOIN medicines m ON m.id = r.medicine_id
             WHERE m.user_id = ?1 AND h.recorded_at >= ?2 AND h.recorded_at <= ?3
             ORDER BY h.recorded_at DESC",
            history_cols_qualified()
        ))?;
        let rows = stmt.query_map(
            params![user_id, start.to_rfc3339(), end.to_rfc3339()],
            history_from_row,
        )?;
        rows.collect()
    }
}

fn reminder_cols_qualified() -> String {
    REMINDER_COLS
        .split(", ")
        .map(|c| format!("r.{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn history_cols_qualified() -> String {
    HISTORY_COLS
        .split(", ")
        .map(|c| format!("h.{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn naive(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn sample_medicine(db: &Database) -> Medicine {
        db.insert_medicine(&NewMedicine {
            user_id: 1,
            name: "Metformin".into(),
            dosage: "500".into(),
            unit: "mg".into(),
            reminder_times: vec!["08:00".into(), "20:00".into()],
            active: true,
        })
        .unwrap()
    }

    fn sample_reminder(db: &Database, medicine_id: i64, at: NaiveDateTime) -> Reminder {
        db.insert_reminder(&NewReminder {
            medicine_id,
            scheduled_at: at,
            zone_id: "UTC".into(),
            repeat_pattern: "daily".into(),
            delivery_channel: "app".into(),
        })
        .unwrap()
    }

    #[test]
    fn medicine_roundtrip() {
        let db = Database::open_memory().unwrap();
        let m = sample_medicine(&db);
        let loaded = db.get_medicine(m.id).unwrap().unwrap();
        assert_eq!(loaded.name, "Metformin");
        assert_eq!(loaded.reminder_times, vec!["08:00", "20:00"]);
        assert!(loaded.active);
        assert_eq!(db.list_active_medicines().unwrap().len(), 1);
    }

    #[test]
    fn reminder_roundtrip_and_queries() {
        let db = Database::open_memory().unwrap();
        let m = sample_medicine(&db);
        let r = sample_reminder(&db, m.id, naive(8, 0));

        let loaded = db.get_reminder(r.id).unwrap().unwrap();
        assert_eq!(loaded.status, ReminderStatus::Pending);
        assert_eq!(loaded.scheduled_at, naive(8, 0));
        assert_eq!(loaded.snooze_count, 0);

        // Due at 08:00:00 (cutoff is now + 1s).
        assert_eq!(db.due_reminders(naive(8, 0)).unwrap().len(), 1);
        assert_eq!(db.due_reminders(naive(7, 58)).unwrap().len(), 0);

        assert_eq!(db.pending_for_user(1).unwrap().len(), 1);
        assert_eq!(db.pending_for_user(2).unwrap().len(), 0);

        assert_eq!(db.upcoming_for_user(1, naive(7, 0)).unwrap().len(), 1);
        // Already past: not upcoming.
        assert_eq!(db.upcoming_for_user(1, naive(9, 0)).unwrap().len(), 0);
    }

    #[test]
    fn cas_commits_once() {
        let db = Database::open_memory().unwrap();
        let m = sample_medicine(&db);
        let r = sample_reminder(&db, m.id, naive(8, 0));

        assert_eq!(
            db.cas_status(r.id, ReminderStatus::Pending, ReminderStatus::Triggered)
                .unwrap(),
            CasOutcome::Committed
        );
        // Second writer expecting PENDING loses.
        assert_eq!(
            db.cas_status(r.id, ReminderStatus::Pending, ReminderStatus::Missed)
                .unwrap(),
            CasOutcome::Lost
        );
        let loaded = db.get_reminder(r.id).unwrap().unwrap();
        assert_eq!(loaded.status, ReminderStatus::Triggered);
    }

    #[test]
    fn resolve_rejects_terminal() {
        let db = Database::open_memory().unwrap();
        let m = sample_medicine(&db);
        let r = sample_reminder(&db, m.id, naive(8, 0));

        assert_eq!(
            db.resolve_status(r.id, ReminderStatus::Taken).unwrap(),
            CasOutcome::Committed
        );
        assert_eq!(
            db.resolve_status(r.id, ReminderStatus::Skipped).unwrap(),
            CasOutcome::Lost
        );
        let loaded = db.get_reminder(r.id).unwrap().unwrap();
        assert_eq!(loaded.status, ReminderStatus::Taken);
    }

    #[test]
    fn snooze_shifts_without_touching_status() {
        let db = Database::open_memory().unwrap();
        let m = sample_medicine(&db);
        let r = sample_reminder(&db, m.id, naive(8, 0));

        db.apply_snooze(r.id, naive(8, 10)).unwrap();
        let loaded = db.get_reminder(r.id).unwrap().unwrap();
        assert_eq!(loaded.scheduled_at, naive(8, 10));
        assert_eq!(loaded.snooze_count, 1);
        assert_eq!(loaded.status, ReminderStatus::Pending);
    }

    #[test]
    fn history_scoped_by_user() {
        let db = Database::open_memory().unwrap();
        let m = sample_medicine(&db);
        let other = db
            .insert_medicine(&NewMedicine {
                user_id: 2,
                name: "Lisinopril".into(),
                dosage: "10".into(),
                unit: "mg".into(),
                reminder_times: vec![],
                active: true,
            })
            .unwrap();
        let r1 = sample_reminder(&db, m.id, naive(8, 0));
        let r2 = sample_reminder(&db, other.id, naive(9, 0));

        for (rid, status) in [(r1.id, ReminderStatus::Taken), (r2.id, ReminderStatus::Missed)] {
            db.insert_history(&NewHistory {
                reminder_id: rid,
                status,
                recorded_at: Utc::now(),
                source: HistorySource::Manual,
                latency_seconds: Some(30),
                notes: None,
            })
            .unwrap();
        }

        let user1 = db.history_for_user(1).unwrap();
        assert_eq!(user1.len(), 1);
        assert_eq!(user1[0].status, ReminderStatus::Taken);
        assert_eq!(db.history_for_medicine(1, m.id).unwrap().len(), 1);
        assert_eq!(db.history_for_medicine(1, other.id).unwrap().len(), 0);
    }

    #[test]
    fn history_since_bounds_are_inclusive() {
        let db = Database::open_memory().unwrap();
        let m = sample_medicine(&db);
        let r = sample_reminder(&db, m.id, naive(8, 0));
        let day = |d: u32| Utc.with_ymd_and_hms(2026, 3, d, 8, 0, 0).unwrap();

        for d in 1..=4 {
            db.insert_history(&NewHistory {
                reminder_id: r.id,
                status: ReminderStatus::Taken,
                recorded_at: day(d),
                source: HistorySource::Manual,
                latency_seconds: None,
                notes: None,
            })
            .unwrap();
        }

        let rows = db.history_since(1, day(2), day(3)).unwrap();
        assert_eq!(rows.len(), 2);
        // Newest first, both bound days included.
        assert_eq!(rows[0].recorded_at, day(3));
        assert_eq!(rows[1].recorded_at, day(2));

        assert_eq!(db.history_since(1, day(1), day(4)).unwrap().len(), 4);
        assert!(db.history_since(2, day(1), day(4)).unwrap().is_empty());
    }

    #[test]
    fn delete_medicine_cascades() {
        let db = Database::open_memory().unwrap();
        let m = sample_medicine(&db);
        let mut reminder_ids = Vec::new();
        for h in [8, 12, 20] {
            reminder_ids.push(sample_reminder(&db, m.id, naive(h, 0)).id);
        }
        for rid in &reminder_ids {
            db.insert_history(&NewHistory {
                reminder_id: *rid,
                status: ReminderStatus::Taken,
                recorded_at: Utc::now(),
                source: HistorySource::Manual,
                latency_seconds: None,
                notes: None,
            })
            .unwrap();
        }

        db.delete_medicine(m.id).unwrap();
        assert!(db.get_medicine(m.id).unwrap().is_none());
        for rid in &reminder_ids {
            assert!(db.get_reminder(*rid).unwrap().is_none());
            assert!(db.history_for_reminder(*rid).unwrap().is_empty());
        }
    }

    #[test]
    fn rows_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dosemate.db");
        let id = {
            let db = Database::open_at(&path).unwrap();
            sample_medicine(&db).id
        };
        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.get_medicine(id).unwrap().unwrap().name, "Metformin");
    }

    #[test]
    fn open_reminder_dedupe_check() {
        let db = Database::open_memory().unwrap();
        let m = sample_medicine(&db);
        let r = sample_reminder(&db, m.id, naive(8, 0));

        assert!(db.has_open_reminder_at(m.id, naive(8, 0)).unwrap());
        assert!(!db.has_open_reminder_at(m.id, naive(20, 0)).unwrap());

        // Terminal reminders do not block a new cycle.
        db.resolve_status(r.id, ReminderStatus::Taken).unwrap();
        assert!(!db.has_open_reminder_at(m.id, naive(8, 0)).unwrap());
    }
}
