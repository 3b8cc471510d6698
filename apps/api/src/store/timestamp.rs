//! Fixed-width, lexicographically sortable analysis timestamps.
//!
//! `20240315_142501_000123`: date, time and microseconds in UTC, always 22 characters,
//! so string order and chronological order agree in file names and in the index.

use chrono::{DateTime, NaiveDateTime, Utc};

pub const FORMAT: &str = "%Y%m%d_%H%M%S_%6f";
pub const WIDTH: usize = 22;

pub fn format(at: DateTime<Utc>) -> String {
    at.format(FORMAT).to_string()
}

pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
    if raw.len() != WIDTH {
        return None;
    }
    NaiveDateTime::parse_from_str(raw, FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// The timestamp for a new entry: now, but never earlier than the newest existing entry,
/// so a clock step backwards cannot reorder the log.
pub fn next(now: DateTime<Utc>, newest: Option<&str>) -> String {
    let candidate = format(now);
    match newest {
        Some(prev) if prev > candidate.as_str() => prev.to_string(),
        _ => candidate,
    }
}
