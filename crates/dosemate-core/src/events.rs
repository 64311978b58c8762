//! Notification events broadcast to connected clients.
//!
//! Events are ephemeral hints for dashboards and toasts, never persisted.
//! Clients re-fetch authoritative state on receipt; an event may arrive
//! before or after the store write it reports.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ReminderStatus;

/// Wire payloads pushed through the fan-out hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NotificationEvent {
    /// A reminder's scheduled instant has arrived.
    #[serde(rename = "REMINDER_DUE")]
    #[serde(rename_all = "camelCase")]
    ReminderDue {
        reminder_id: i64,
        medicine_id: i64,
        medicine_name: String,
        dosage: String,
        unit: String,
        scheduled_at: NaiveDateTime,
    },
    /// An intake outcome was recorded against a reminder.
    #[serde(rename = "INTAKE_RECORDED")]
    #[serde(rename_all = "camelCase")]
    IntakeRecorded {
        reminder_id: i64,
        medicine_id: i64,
        medicine_name: String,
        status: ReminderStatus,
        timestamp: DateTime<Utc>,
        latency_seconds: Option<i64>,
    },
}
