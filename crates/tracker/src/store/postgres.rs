use std::collections::HashMap;

use sqlx::PgPool;
use watchlog_core::error::CoreError;
use watchlog_core::interval::TimeRange;
use watchlog_core::media_entry::MediaEntry;
use watchlog_core::types::{DbId, Version};
use watchlog_core::version_store::SpanWrite;
use watchlog_db::models::media_entry::{CommitOutcome, CreateMediaEntry, SaveMediaEntry};
use watchlog_db::repositories::{MediaEntryRepo, TimeSpanRepo};

use crate::error::{TrackerError, CONCURRENT_MODIFICATION};
use crate::store::EntryStore;

/// [`EntryStore`] backed by PostgreSQL through the `watchlog-db` repositories.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl EntryStore for PgStore {
    async fn create(&self, entry: &MediaEntry) -> Result<MediaEntry, TrackerError> {
        let row = MediaEntryRepo::create(&self.pool, &CreateMediaEntry::from_entry(entry)).await?;
        Ok(MediaEntry::from_parts(row.into_parts(), [])?)
    }

    async fn load(&self, id: DbId) -> Result<Option<MediaEntry>, TrackerError> {
        let Some(row) = MediaEntryRepo::find_by_id(&self.pool, id).await? else {
            return Ok(None);
        };
        let spans = TimeSpanRepo::list_live_for_entry(&self.pool, id).await?;
        let entry = MediaEntry::from_parts(
            row.into_parts(),
            spans.iter().map(|span| span.versioned_range()),
        )?;
        Ok(Some(entry))
    }

    async fn commit(&self, entry: &MediaEntry, writes: &[SpanWrite]) -> Result<bool, TrackerError> {
        let outcome =
            MediaEntryRepo::commit(&self.pool, &SaveMediaEntry::from_entry(entry), writes).await?;
        match outcome {
            CommitOutcome::Committed(_) => Ok(true),
            CommitOutcome::Missing => Ok(false),
            CommitOutcome::Stale { current_revision } => {
                tracing::debug!(
                    entry_id = entry.id(),
                    expected = entry.revision(),
                    current_revision,
                    "Stale commit rejected"
                );
                Err(CoreError::Conflict(CONCURRENT_MODIFICATION.to_string()).into())
            }
        }
    }

    async fn delete(&self, id: DbId) -> Result<bool, TrackerError> {
        Ok(MediaEntryRepo::hard_delete(&self.pool, id).await?)
    }

    async fn list_by_user(
        &self,
        user_id: DbId,
        status: Option<&str>,
    ) -> Result<Vec<MediaEntry>, TrackerError> {
        let rows = MediaEntryRepo::list_by_user(&self.pool, user_id, status).await?;
        let ids: Vec<DbId> = rows.iter().map(|row| row.id).collect();

        let mut spans: HashMap<DbId, Vec<(Version, TimeRange)>> = HashMap::new();
        for span in TimeSpanRepo::list_live_for_entries(&self.pool, &ids).await? {
            spans
                .entry(span.media_entry_id)
                .or_default()
                .push(span.versioned_range());
        }

        rows.into_iter()
            .map(|row| -> Result<MediaEntry, TrackerError> {
                let entry_spans = spans.remove(&row.id).unwrap_or_default();
                Ok(MediaEntry::from_parts(row.into_parts(), entry_spans)?)
            })
            .collect()
    }

    async fn list_missing_duration(&self, limit: i64) -> Result<Vec<DbId>, TrackerError> {
        let rows = MediaEntryRepo::list_missing_duration(&self.pool, limit).await?;
        Ok(rows.into_iter().map(|row| row.id).collect())
    }

    async fn mark_metadata_checked(&self, id: DbId) -> Result<(), TrackerError> {
        MediaEntryRepo::mark_metadata_checked(&self.pool, id).await?;
        Ok(())
    }
}
