//! Repository for the `media_entries` table.

use sqlx::PgPool;
use watchlog_core::types::DbId;
use watchlog_core::version_store::SpanWrite;

use crate::models::media_entry::{CommitOutcome, CreateMediaEntry, MediaEntryRow, SaveMediaEntry};
use crate::repositories::TimeSpanRepo;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, title, media_url, memo, duration_secs, active_version, \
    do_not_watch, status, status_label, watched_secs, revision, metadata_checked_at, \
    created_at, updated_at";

/// Matches the YouTube URL forms recognised by `watchlog_core::media_url`,
/// video ID included.
const YOUTUBE_URL_PATTERN: &str = r"^https?://((www\.|m\.)?youtube\.com/watch\?([^#]*&)?v=[A-Za-z0-9_-]+|youtu\.be/[A-Za-z0-9_-]+)";

/// Provides CRUD and the atomic commit for media entries.
pub struct MediaEntryRepo;

impl MediaEntryRepo {
    // ── Standard CRUD ────────────────────────────────────────────────

    /// Insert a new media entry at version 0.
    ///
    /// Fails with a unique violation on `uq_media_entries_user_media_url` when
    /// the user already registered the same URL.
    pub async fn create(
        pool: &PgPool,
        input: &CreateMediaEntry,
    ) -> Result<MediaEntryRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO media_entries
                (user_id, title, media_url, memo, duration_secs, status, status_label, watched_secs)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MediaEntryRow>(&query)
            .bind(input.user_id)
            .bind(&input.title)
            .bind(&input.media_url)
            .bind(&input.memo)
            .bind(input.duration_secs)
            .bind(&input.status)
            .bind(&input.status_label)
            .bind(input.watched_secs)
            .fetch_one(pool)
            .await
    }

    /// Find a media entry by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<MediaEntryRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM media_entries WHERE id = $1");
        sqlx::query_as::<_, MediaEntryRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a user's entries, newest first, optionally filtered by status code.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: DbId,
        status: Option<&str>,
    ) -> Result<Vec<MediaEntryRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM media_entries
             WHERE user_id = $1 AND ($2::TEXT IS NULL OR status = $2)
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, MediaEntryRow>(&query)
            .bind(user_id)
            .bind(status)
            .fetch_all(pool)
            .await
    }

    /// Entries with a YouTube URL and no duration yet. Never-checked entries
    /// come first, then the ones checked longest ago.
    pub async fn list_missing_duration(
        pool: &PgPool,
        limit: i64,
    ) -> Result<Vec<MediaEntryRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM media_entries
             WHERE duration_secs IS NULL AND media_url ~ $1
             ORDER BY metadata_checked_at NULLS FIRST, id
             LIMIT $2"
        );
        sqlx::query_as::<_, MediaEntryRow>(&query)
            .bind(YOUTUBE_URL_PATTERN)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Stamp the entry's last metadata refresh attempt.
    pub async fn mark_metadata_checked(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE media_entries SET metadata_checked_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Permanently delete an entry; its spans go with it (`ON DELETE CASCADE`).
    /// Returns `true` if a row was removed.
    pub async fn hard_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM media_entries WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ── Atomic commit ────────────────────────────────────────────────

    /// Persist an entry's columns and replay its pending span writes in one
    /// transaction.
    ///
    /// The row is locked with `SELECT ... FOR UPDATE` and its revision must
    /// still equal `input.revision`; otherwise nothing is written and the
    /// outcome is [`CommitOutcome::Stale`]. A successful commit bumps the
    /// revision by one.
    pub async fn commit(
        pool: &PgPool,
        input: &SaveMediaEntry,
        writes: &[SpanWrite],
    ) -> Result<CommitOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let current: Option<i64> =
            sqlx::query_scalar("SELECT revision FROM media_entries WHERE id = $1 FOR UPDATE")
                .bind(input.id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(current_revision) = current else {
            tx.rollback().await?;
            return Ok(CommitOutcome::Missing);
        };
        if current_revision != input.revision {
            tx.rollback().await?;
            return Ok(CommitOutcome::Stale { current_revision });
        }

        let query = format!(
            "UPDATE media_entries SET
                title = $2,
                media_url = $3,
                memo = $4,
                duration_secs = $5,
                active_version = $6,
                do_not_watch = $7,
                status = $8,
                status_label = $9,
                watched_secs = $10,
                revision = revision + 1,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, MediaEntryRow>(&query)
            .bind(input.id)
            .bind(&input.title)
            .bind(&input.media_url)
            .bind(&input.memo)
            .bind(input.duration_secs)
            .bind(input.active_version)
            .bind(input.do_not_watch)
            .bind(&input.status)
            .bind(&input.status_label)
            .bind(input.watched_secs)
            .fetch_one(&mut *tx)
            .await?;

        for write in writes {
            TimeSpanRepo::apply(&mut *tx, input.id, write).await?;
        }

        tx.commit().await?;
        Ok(CommitOutcome::Committed(row))
    }
}
