//! Time span entity model.

use serde::Serialize;
use sqlx::FromRow;
use watchlog_core::interval::TimeRange;
use watchlog_core::types::{DbId, Timestamp, Version};

/// A row from the `time_spans` table.
///
/// Rows are immutable once written. `orphaned_at` is set when the version
/// they belong to was abandoned by a later branch; orphaned rows are never
/// visible again but stay stored.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TimeSpanRow {
    pub id: DbId,
    pub media_entry_id: DbId,
    pub version: Version,
    pub begin_sec: i64,
    pub end_sec: i64,
    pub orphaned_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl TimeSpanRow {
    pub fn versioned_range(&self) -> (Version, TimeRange) {
        (
            self.version,
            TimeRange {
                begin_sec: self.begin_sec,
                end_sec: self.end_sec,
            },
        )
    }
}
