//! Persistence seam for the tracker.
//!
//! An [`EntryStore`] loads media entry aggregates and commits an entry's
//! columns together with its pending [`SpanWrite`]s as one atomic unit.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use std::future::Future;

use watchlog_core::media_entry::MediaEntry;
use watchlog_core::types::DbId;
use watchlog_core::version_store::SpanWrite;

use crate::error::TrackerError;

pub trait EntryStore: Send + Sync {
    /// Persist a provisional entry (its `id` is ignored) at version 0 and
    /// return it with the assigned ID.
    ///
    /// A media URL already registered by the same user is a
    /// [`CoreError::Conflict`](watchlog_core::error::CoreError::Conflict).
    fn create(
        &self,
        entry: &MediaEntry,
    ) -> impl Future<Output = Result<MediaEntry, TrackerError>> + Send;

    /// Rebuild an entry from its stored row and live spans.
    fn load(
        &self,
        id: DbId,
    ) -> impl Future<Output = Result<Option<MediaEntry>, TrackerError>> + Send;

    /// Write the entry's columns and replay `writes`, all or nothing.
    ///
    /// Returns `false` (nothing written) if the entry no longer exists. If
    /// the stored entry is past [`MediaEntry::revision`], nothing is written
    /// and the result is a [`CoreError::Conflict`](watchlog_core::error::CoreError::Conflict).
    fn commit(
        &self,
        entry: &MediaEntry,
        writes: &[SpanWrite],
    ) -> impl Future<Output = Result<bool, TrackerError>> + Send;

    /// Delete an entry and all of its spans. Returns `false` if it did not
    /// exist.
    fn delete(&self, id: DbId) -> impl Future<Output = Result<bool, TrackerError>> + Send;

    /// A user's entries, newest first, optionally filtered by status code.
    fn list_by_user(
        &self,
        user_id: DbId,
        status: Option<&str>,
    ) -> impl Future<Output = Result<Vec<MediaEntry>, TrackerError>> + Send;

    /// IDs of entries with a YouTube URL and no duration. Entries never
    /// checked come first, then those checked longest ago.
    fn list_missing_duration(
        &self,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<DbId>, TrackerError>> + Send;

    /// Record a metadata refresh attempt, which moves the entry to the back
    /// of [`list_missing_duration`](Self::list_missing_duration).
    fn mark_metadata_checked(
        &self,
        id: DbId,
    ) -> impl Future<Output = Result<(), TrackerError>> + Send;
}
