//! Database access layer for roster-api

pub mod schools;
pub mod settings;
pub mod students;

pub use students::{InsertOutcome, RosterStore, SqliteRosterStore, UpdatedStudent};

use chrono::{DateTime, SecondsFormat, Utc};
use roster_common::{Error, Result};
use uuid::Uuid;

/// Fixed-width RFC 3339 text so stored timestamps sort chronologically
pub(crate) fn encode_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_timestamp(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| Error::Corrupt(format!("invalid timestamp {:?}: {}", text, e)))
}

pub(crate) fn decode_uuid(text: &str) -> Result<Uuid> {
    Uuid::parse_str(text).map_err(|e| Error::Corrupt(format!("invalid id {:?}: {}", text, e)))
}
