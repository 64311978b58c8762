//! Adherence statistics over the intake history log.
//!
//! Read-only aggregations, recomputed per call; no caching. Scoped to one
//! user's medicines through the history -> reminder -> medicine join.

mod adherence;

pub use adherence::{
    by_medicine, overall, weekly, AdherenceStats, DailyAdherence, MedicineAdherence,
};
