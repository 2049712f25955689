//! Media entry entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use watchlog_core::media_entry::{EntryParts, MediaEntry};
use watchlog_core::types::{DbId, Timestamp, Version};

/// A row from the `media_entries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MediaEntryRow {
    pub id: DbId,
    pub user_id: DbId,
    pub title: String,
    pub media_url: Option<String>,
    pub memo: Option<String>,
    pub duration_secs: Option<i64>,
    pub active_version: Version,
    pub do_not_watch: bool,
    pub status: String,
    pub status_label: String,
    pub watched_secs: Option<i64>,
    pub revision: i64,
    pub metadata_checked_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl MediaEntryRow {
    /// Persisted fields for rebuilding the aggregate.
    pub fn into_parts(self) -> EntryParts {
        EntryParts {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            media_url: self.media_url,
            memo: self.memo,
            duration_secs: self.duration_secs,
            active_version: self.active_version,
            do_not_watch: self.do_not_watch,
            revision: self.revision,
        }
    }
}

/// DTO for inserting a new media entry.
///
/// Cached columns are supplied by the caller from a provisional aggregate so
/// a freshly created row is already consistent.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMediaEntry {
    pub user_id: DbId,
    pub title: String,
    pub media_url: Option<String>,
    pub memo: Option<String>,
    pub duration_secs: Option<i64>,
    pub status: String,
    pub status_label: String,
    pub watched_secs: Option<i64>,
}

impl CreateMediaEntry {
    pub fn from_entry(entry: &MediaEntry) -> Self {
        Self {
            user_id: entry.user_id(),
            title: entry.title().to_string(),
            media_url: entry.media_url().map(str::to_string),
            memo: entry.memo().map(str::to_string),
            duration_secs: entry.duration_secs(),
            status: entry.status().code().to_string(),
            status_label: entry.status_label(),
            watched_secs: entry.watched_seconds(),
        }
    }
}

/// DTO for writing back every mutable column of an entry.
///
/// `revision` is the revision the entry was loaded at; the commit is refused
/// if the row has moved past it.
#[derive(Debug, Clone)]
pub struct SaveMediaEntry {
    pub id: DbId,
    pub revision: i64,
    pub title: String,
    pub media_url: Option<String>,
    pub memo: Option<String>,
    pub duration_secs: Option<i64>,
    pub active_version: Version,
    pub do_not_watch: bool,
    pub status: String,
    pub status_label: String,
    pub watched_secs: Option<i64>,
}

impl SaveMediaEntry {
    pub fn from_entry(entry: &MediaEntry) -> Self {
        Self {
            id: entry.id(),
            revision: entry.revision(),
            title: entry.title().to_string(),
            media_url: entry.media_url().map(str::to_string),
            memo: entry.memo().map(str::to_string),
            duration_secs: entry.duration_secs(),
            active_version: entry.active_version(),
            do_not_watch: entry.do_not_watch(),
            status: entry.status().code().to_string(),
            status_label: entry.status_label(),
            watched_secs: entry.watched_seconds(),
        }
    }
}

/// Result of [`crate::repositories::MediaEntryRepo::commit`].
#[derive(Debug, Clone)]
pub enum CommitOutcome {
    /// Row and span writes persisted; the row carries the new revision.
    Committed(MediaEntryRow),
    /// The entry no longer exists. Nothing was written.
    Missing,
    /// Another commit moved the row past the expected revision. Nothing was
    /// written.
    Stale { current_revision: i64 },
}
