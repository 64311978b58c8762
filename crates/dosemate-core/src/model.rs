//! Data model: medicines, reminders and the intake history log.
//!
//! A `Reminder` is one scheduled occurrence of "take this medicine at this
//! instant". Its status moves monotonically along the state machine:
//!
//! ```text
//! PENDING -> TRIGGERED -> {TAKEN, SKIPPED}
//! PENDING -> {TAKEN, SKIPPED, MISSED}
//! ```
//!
//! TAKEN, SKIPPED and MISSED are terminal; a new cycle produces a new
//! reminder row, never reuses a resolved one. Every departure from PENDING
//! except the intermediate TRIGGERED marker is attributed by exactly one
//! `HistoryRecord`.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Medicine fields the reminder engine consumes. Catalog management
/// (stock, refills, images) lives outside this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medicine {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub dosage: String,
    pub unit: String,
    /// Times of day as `HH:mm` strings, e.g. `["08:00", "20:00"]`.
    pub reminder_times: Vec<String>,
    pub active: bool,
}

/// A new medicine row, before the store assigns an id.
#[derive(Debug, Clone)]
pub struct NewMedicine {
    pub user_id: i64,
    pub name: String,
    pub dosage: String,
    pub unit: String,
    pub reminder_times: Vec<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReminderStatus {
    Pending,
    Triggered,
    Taken,
    Skipped,
    Missed,
}

impl ReminderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReminderStatus::Pending => "PENDING",
            ReminderStatus::Triggered => "TRIGGERED",
            ReminderStatus::Taken => "TAKEN",
            ReminderStatus::Skipped => "SKIPPED",
            ReminderStatus::Missed => "MISSED",
        }
    }

    /// Terminal statuses end the reminder's lifecycle.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ReminderStatus::Taken | ReminderStatus::Skipped | ReminderStatus::Missed
        )
    }

    /// Whether `self -> next` is a legal transition of the state machine.
    pub fn can_transition_to(self, next: ReminderStatus) -> bool {
        match self {
            ReminderStatus::Pending => next != ReminderStatus::Pending,
            ReminderStatus::Triggered => {
                matches!(next, ReminderStatus::Taken | ReminderStatus::Skipped)
            }
            // Terminal states never move again.
            _ => false,
        }
    }
}

impl fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReminderStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ReminderStatus::Pending),
            "TRIGGERED" => Ok(ReminderStatus::Triggered),
            "TAKEN" => Ok(ReminderStatus::Taken),
            "SKIPPED" => Ok(ReminderStatus::Skipped),
            "MISSED" => Ok(ReminderStatus::Missed),
            other => Err(CoreError::InvalidArgument(format!(
                "unknown reminder status '{other}'"
            ))),
        }
    }
}

/// One scheduled occurrence of a medicine intake.
///
/// `scheduled_at` is a naive local date-time; together with `zone_id`
/// (an IANA timezone name) it defines an absolute instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: i64,
    pub medicine_id: i64,
    pub scheduled_at: NaiveDateTime,
    pub zone_id: String,
    pub repeat_pattern: String,
    pub status: ReminderStatus,
    pub delivery_channel: String,
    pub snooze_count: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReminder {
    pub medicine_id: i64,
    pub scheduled_at: NaiveDateTime,
    pub zone_id: String,
    pub repeat_pattern: String,
    pub delivery_channel: String,
}

/// Where an intake outcome came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistorySource {
    Manual,
    Push,
    Auto,
}

impl HistorySource {
    pub fn as_str(self) -> &'static str {
        match self {
            HistorySource::Manual => "MANUAL",
            HistorySource::Push => "PUSH",
            HistorySource::Auto => "AUTO",
        }
    }
}

impl FromStr for HistorySource {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MANUAL" => Ok(HistorySource::Manual),
            "PUSH" => Ok(HistorySource::Push),
            "AUTO" => Ok(HistorySource::Auto),
            other => Err(CoreError::InvalidArgument(format!(
                "unknown history source '{other}'"
            ))),
        }
    }
}

/// Immutable log row recording how a reminder was resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: i64,
    pub reminder_id: i64,
    pub status: ReminderStatus,
    pub recorded_at: DateTime<Utc>,
    pub source: HistorySource,
    /// Seconds between the scheduled instant and the recorded instant.
    /// `None` when the scheduled time is unknown.
    pub latency_seconds: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewHistory {
    pub reminder_id: i64,
    pub status: ReminderStatus,
    pub recorded_at: DateTime<Utc>,
    pub source: HistorySource,
    pub latency_seconds: Option<i64>,
    pub notes: Option<String>,
}
