//! # DoseMate Core Library
//!
//! Core business logic for DoseMate, a medication-reminder service: the
//! reminder lifecycle engine, its SQLite store, the notification fan-out
//! hub and the adherence statistics over the intake history.
//!
//! ## Architecture
//!
//! - **Engine**: two independent periodic tasks -- the schedule
//!   materializer (plus missed-dose sweep) and the due-reminder
//!   dispatcher. Cycle functions take an explicit `now`, so callers and
//!   tests drive them without a clock.
//! - **Storage**: SQLite store with compare-and-set status transitions
//!   (per-row linearizable, no global lock) and TOML-based configuration
//! - **Hub**: concurrent registry of client connections receiving
//!   fire-and-forget JSON events
//! - **Stats**: read-only adherence aggregations over the history log
//!
//! ## Key Components
//!
//! - [`ReminderEngine`]: background-task driver
//! - [`Database`]: reminder, medicine and history persistence
//! - [`NotificationHub`]: broadcast fan-out to connected clients
//! - [`Config`]: engine timing configuration

pub mod engine;
pub mod error;
pub mod events;
pub mod hub;
pub mod intake;
pub mod model;
pub mod reminders;
pub mod stats;
pub mod storage;

pub use engine::{ReminderEngine, SharedDatabase};
pub use error::{CoreError, DatabaseError, Result};
pub use events::NotificationEvent;
pub use hub::{ClientId, NotificationHub};
pub use model::{
    HistoryRecord, HistorySource, Medicine, NewMedicine, Reminder, ReminderStatus,
};
pub use stats::{AdherenceStats, DailyAdherence, MedicineAdherence};
pub use storage::{CasOutcome, Config, Database, EngineConfig};
