//! Command surface of the watch tracker.
//!
//! Every mutating command takes the entry's lock, loads a fresh copy of the
//! aggregate, applies the change, and commits the entry row together with
//! the queued span writes. Any failure before the commit returns discards
//! the copy, so the stored entry is exactly as it was.

use watchlog_core::error::CoreError;
use watchlog_core::media_entry::{EntryDetails, MediaEntry, MediaEntryView};
use watchlog_core::metadata::{MediaMetadata, MetadataProvider};
use watchlog_core::types::DbId;
use watchlog_core::watch_status::validate_status_code;

use crate::error::TrackerError;
use crate::locks::EntryLocks;
use crate::store::EntryStore;

/// Outcome of one [`Tracker::refresh_missing_durations`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub attempted: usize,
    pub refreshed: usize,
    pub failed: usize,
}

/// Serializes commands per entry and persists them atomically through `S`,
/// using `P` for media metadata lookups.
pub struct Tracker<S, P> {
    store: S,
    provider: P,
    locks: EntryLocks,
}

impl<S, P> Tracker<S, P>
where
    S: EntryStore,
    P: MetadataProvider,
{
    pub fn new(store: S, provider: P) -> Self {
        Self {
            store,
            provider,
            locks: EntryLocks::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    // ---- entries ----

    /// Register a new entry for `user_id` with no intervals and no duration.
    pub async fn create_entry(
        &self,
        user_id: DbId,
        details: EntryDetails,
    ) -> Result<MediaEntryView, TrackerError> {
        let mut provisional = MediaEntry::new(0, user_id, "");
        provisional.update_details(details)?;
        let entry = self.store.create(&provisional).await?;
        tracing::info!(entry_id = entry.id(), user_id, "Media entry created");
        Ok(entry.view())
    }

    pub async fn entry(&self, entry_id: DbId) -> Result<MediaEntryView, TrackerError> {
        Ok(self.load(entry_id).await?.view())
    }

    /// A user's entries, newest first. `status` must be a known status code.
    pub async fn list_entries(
        &self,
        user_id: DbId,
        status: Option<&str>,
    ) -> Result<Vec<MediaEntryView>, TrackerError> {
        if let Some(code) = status {
            validate_status_code(code)?;
        }
        let entries = self.store.list_by_user(user_id, status).await?;
        Ok(entries.iter().map(MediaEntry::view).collect())
    }

    /// Delete an entry and its whole span history.
    pub async fn delete_entry(&self, entry_id: DbId) -> Result<(), TrackerError> {
        let guard = self.locks.lock(entry_id).await;
        let deleted = self.store.delete(entry_id).await;
        self.locks.release(entry_id, guard).await;

        if !deleted? {
            return Err(not_found(entry_id));
        }
        tracing::info!(entry_id, "Media entry deleted");
        Ok(())
    }

    pub async fn update_details(
        &self,
        entry_id: DbId,
        details: EntryDetails,
    ) -> Result<MediaEntryView, TrackerError> {
        self.mutate(entry_id, "update_details", |entry| entry.update_details(details))
            .await
    }

    // ---- intervals ----

    pub async fn add_interval(
        &self,
        entry_id: DbId,
        begin_sec: i64,
        end_sec: i64,
    ) -> Result<MediaEntryView, TrackerError> {
        self.mutate(entry_id, "add_interval", |entry| {
            entry.add_interval(begin_sec, end_sec)
        })
        .await
    }

    /// Record `[0, duration)` as a new, undoable version.
    pub async fn mark_watched(&self, entry_id: DbId) -> Result<MediaEntryView, TrackerError> {
        self.mutate(entry_id, "mark_watched", MediaEntry::mark_watched)
            .await
    }

    pub async fn delete_interval(
        &self,
        entry_id: DbId,
        index: usize,
    ) -> Result<MediaEntryView, TrackerError> {
        self.mutate(entry_id, "delete_interval", |entry| entry.delete_interval(index))
            .await
    }

    pub async fn restore(&self, entry_id: DbId) -> Result<MediaEntryView, TrackerError> {
        self.mutate(entry_id, "restore", MediaEntry::restore).await
    }

    // ---- flags and duration ----

    pub async fn mark_do_not_watch(&self, entry_id: DbId) -> Result<MediaEntryView, TrackerError> {
        self.mutate(entry_id, "mark_do_not_watch", |entry| {
            entry.mark_do_not_watch();
            Ok(())
        })
        .await
    }

    pub async fn unmark_do_not_watch(
        &self,
        entry_id: DbId,
    ) -> Result<MediaEntryView, TrackerError> {
        self.mutate(entry_id, "unmark_do_not_watch", |entry| {
            entry.unmark_do_not_watch();
            Ok(())
        })
        .await
    }

    pub async fn set_duration(
        &self,
        entry_id: DbId,
        duration_secs: Option<i64>,
    ) -> Result<MediaEntryView, TrackerError> {
        self.mutate(entry_id, "set_duration", |entry| entry.set_duration(duration_secs))
            .await
    }

    // ---- provider ----

    /// Look up `media_url` with the provider, then apply its title and
    /// duration to the entry.
    ///
    /// The lookup runs before the entry lock is taken. On provider failure the
    /// entry is left unchanged and the error is returned as
    /// [`CoreError::Provider`].
    pub async fn set_duration_from_provider(
        &self,
        entry_id: DbId,
        media_url: &str,
    ) -> Result<MediaEntryView, TrackerError> {
        let metadata = self.fetch_metadata(entry_id, media_url).await?;
        self.mutate(entry_id, "apply_metadata", |entry| {
            entry.apply_metadata(&metadata)
        })
        .await
    }

    /// Refresh title and duration from the entry's own media URL.
    pub async fn refresh_metadata(&self, entry_id: DbId) -> Result<MediaEntryView, TrackerError> {
        let entry = self.load(entry_id).await?;
        let media_url = entry.media_url().ok_or_else(|| {
            CoreError::Validation("Cannot refresh metadata: media URL is not set".to_string())
        })?;
        let metadata = self.fetch_metadata(entry_id, media_url).await?;

        let expected_url = media_url.to_string();
        self.mutate(entry_id, "refresh_metadata", move |entry| {
            if entry.media_url() != Some(expected_url.as_str()) {
                return Err(CoreError::Conflict(
                    "Media URL changed while metadata was being fetched".to_string(),
                ));
            }
            entry.apply_metadata(&metadata)
        })
        .await
    }

    /// Refresh up to `batch_size` entries that have a YouTube URL but no
    /// duration. Failures are logged and skipped.
    ///
    /// Every attempted entry is stamped as checked, so entries that keep
    /// failing rotate to the back instead of filling every batch.
    pub async fn refresh_missing_durations(
        &self,
        batch_size: i64,
    ) -> Result<RefreshReport, TrackerError> {
        let ids = self.store.list_missing_duration(batch_size).await?;
        let mut report = RefreshReport {
            attempted: ids.len(),
            ..RefreshReport::default()
        };

        for entry_id in ids {
            match self.refresh_metadata(entry_id).await {
                Ok(_) => report.refreshed += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(entry_id, error = %e, "Metadata refresh failed");
                }
            }
            self.store.mark_metadata_checked(entry_id).await?;
        }
        Ok(report)
    }

    // ---- private helpers ----

    async fn load(&self, entry_id: DbId) -> Result<MediaEntry, TrackerError> {
        self.store
            .load(entry_id)
            .await?
            .ok_or_else(|| not_found(entry_id))
    }

    async fn fetch_metadata(
        &self,
        entry_id: DbId,
        media_url: &str,
    ) -> Result<MediaMetadata, TrackerError> {
        self.provider.fetch(media_url).await.map_err(|e| {
            tracing::warn!(entry_id, media_url, error = %e, "Metadata lookup failed");
            TrackerError::from(e)
        })
    }

    /// Run `op` on a fresh copy of the entry under its lock and commit the
    /// result.
    async fn mutate<F>(
        &self,
        entry_id: DbId,
        command: &'static str,
        op: F,
    ) -> Result<MediaEntryView, TrackerError>
    where
        F: FnOnce(&mut MediaEntry) -> Result<(), CoreError> + Send,
    {
        let guard = self.locks.lock(entry_id).await;
        let result = self.mutate_locked(entry_id, command, op).await;
        self.locks.release(entry_id, guard).await;
        result
    }

    async fn mutate_locked<F>(
        &self,
        entry_id: DbId,
        command: &'static str,
        op: F,
    ) -> Result<MediaEntryView, TrackerError>
    where
        F: FnOnce(&mut MediaEntry) -> Result<(), CoreError> + Send,
    {
        let mut entry = self.load(entry_id).await?;
        if let Err(e) = op(&mut entry) {
            tracing::debug!(entry_id, command, error = %e, "Command rejected");
            return Err(e.into());
        }

        let writes = entry.take_pending_writes();
        let committed = match self.store.commit(&entry, &writes).await {
            Ok(committed) => committed,
            Err(e) => {
                tracing::error!(entry_id, command, error = %e, "Commit failed");
                return Err(e);
            }
        };
        if !committed {
            return Err(not_found(entry_id));
        }
        entry.record_commit();

        tracing::debug!(
            entry_id,
            command,
            version = entry.active_version(),
            revision = entry.revision(),
            writes = writes.len(),
            status = entry.status().code(),
            "Media entry committed"
        );
        Ok(entry.view())
    }
}

fn not_found(entry_id: DbId) -> TrackerError {
    CoreError::NotFound {
        entity: "media_entry",
        id: entry_id,
    }
    .into()
}
