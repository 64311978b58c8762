pub mod history;
pub mod intake;
pub mod medicine;
pub mod reminder;
pub mod serve;
pub mod stats;

use chrono::{DateTime, Local, NaiveDateTime, Utc};

/// Parse a date-time argument, with or without seconds.
pub fn parse_datetime(s: &str) -> Result<NaiveDateTime, Box<dyn std::error::Error>> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .map_err(|_| format!("invalid date-time '{s}', expected YYYY-MM-DDTHH:MM[:SS]").into())
}

/// Interpret a local wall-clock date-time as a UTC instant. A wall-clock
/// time skipped by a DST transition has no local instant and is rejected.
pub fn local_to_utc(naive: NaiveDateTime) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    match naive.and_local_timezone(Local).earliest() {
        Some(dt) => Ok(dt.with_timezone(&Utc)),
        None => Err(format!("no local instant for '{naive}'").into()),
    }
}
