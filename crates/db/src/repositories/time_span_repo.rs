//! Repository for the `time_spans` table.

use sqlx::{PgConnection, PgPool};
use watchlog_core::interval::TimeRange;
use watchlog_core::types::{DbId, Version};
use watchlog_core::version_store::SpanWrite;

use crate::models::time_span::TimeSpanRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, media_entry_id, version, begin_sec, end_sec, orphaned_at, created_at";

/// Span reads plus the write primitives replayed inside an entry commit.
pub struct TimeSpanRepo;

impl TimeSpanRepo {
    /// All live (non-orphaned) spans of an entry, every version, ordered by
    /// version, then `begin_sec`, then `end_sec`.
    pub async fn list_live_for_entry(
        pool: &PgPool,
        media_entry_id: DbId,
    ) -> Result<Vec<TimeSpanRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM time_spans
             WHERE media_entry_id = $1 AND orphaned_at IS NULL
             ORDER BY version, begin_sec, end_sec, id"
        );
        sqlx::query_as::<_, TimeSpanRow>(&query)
            .bind(media_entry_id)
            .fetch_all(pool)
            .await
    }

    /// Live spans of several entries at once, for list views.
    pub async fn list_live_for_entries(
        pool: &PgPool,
        media_entry_ids: &[DbId],
    ) -> Result<Vec<TimeSpanRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM time_spans
             WHERE media_entry_id = ANY($1) AND orphaned_at IS NULL
             ORDER BY media_entry_id, version, begin_sec, end_sec, id"
        );
        sqlx::query_as::<_, TimeSpanRow>(&query)
            .bind(media_entry_ids)
            .fetch_all(pool)
            .await
    }

    /// Live spans of a single version, sorted.
    pub async fn list_for_version(
        pool: &PgPool,
        media_entry_id: DbId,
        version: Version,
    ) -> Result<Vec<TimeSpanRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM time_spans
             WHERE media_entry_id = $1 AND version = $2 AND orphaned_at IS NULL
             ORDER BY begin_sec, end_sec, id"
        );
        sqlx::query_as::<_, TimeSpanRow>(&query)
            .bind(media_entry_id)
            .bind(version)
            .fetch_all(pool)
            .await
    }

    /// Count every stored span of an entry, orphaned ones included.
    pub async fn count_all_for_entry(
        pool: &PgPool,
        media_entry_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM time_spans WHERE media_entry_id = $1")
            .bind(media_entry_id)
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }

    // ── Write primitives (run inside the caller's transaction) ───────

    /// Replay one [`SpanWrite`] on `conn`.
    pub async fn apply(
        conn: &mut PgConnection,
        media_entry_id: DbId,
        write: &SpanWrite,
    ) -> Result<(), sqlx::Error> {
        match write {
            SpanWrite::Snapshot { version, spans } => {
                let orphaned = Self::orphan_from(conn, media_entry_id, *version).await?;
                if orphaned > 0 {
                    tracing::debug!(
                        media_entry_id,
                        version,
                        orphaned,
                        "Orphaned spans of an abandoned branch"
                    );
                }
                Self::insert_snapshot(conn, media_entry_id, *version, spans).await
            }
            SpanWrite::Remove { version, span } => {
                Self::remove_one(conn, media_entry_id, *version, span).await
            }
            SpanWrite::Rewind { .. } => Ok(()),
        }
    }

    /// Mark live spans at `version` and above as orphaned. Returns the number
    /// of rows affected.
    async fn orphan_from(
        conn: &mut PgConnection,
        media_entry_id: DbId,
        version: Version,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE time_spans SET orphaned_at = NOW() \
             WHERE media_entry_id = $1 AND version >= $2 AND orphaned_at IS NULL",
        )
        .bind(media_entry_id)
        .bind(version)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }

    async fn insert_snapshot(
        conn: &mut PgConnection,
        media_entry_id: DbId,
        version: Version,
        spans: &[TimeRange],
    ) -> Result<(), sqlx::Error> {
        let begins: Vec<i64> = spans.iter().map(|s| s.begin_sec).collect();
        let ends: Vec<i64> = spans.iter().map(|s| s.end_sec).collect();
        sqlx::query(
            "INSERT INTO time_spans (media_entry_id, version, begin_sec, end_sec)
             SELECT $1, $2, s.begin_sec, s.end_sec
             FROM UNNEST($3::BIGINT[], $4::BIGINT[]) AS s(begin_sec, end_sec)",
        )
        .bind(media_entry_id)
        .bind(version)
        .bind(&begins)
        .bind(&ends)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Physically delete one live span of `version` matching `span`.
    ///
    /// A missing row means storage and the aggregate disagree, which is
    /// reported as [`sqlx::Error::RowNotFound`] so the transaction rolls back.
    async fn remove_one(
        conn: &mut PgConnection,
        media_entry_id: DbId,
        version: Version,
        span: &TimeRange,
    ) -> Result<(), sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM time_spans WHERE id = (
                SELECT id FROM time_spans
                WHERE media_entry_id = $1 AND version = $2
                  AND begin_sec = $3 AND end_sec = $4 AND orphaned_at IS NULL
                ORDER BY id
                LIMIT 1
             )",
        )
        .bind(media_entry_id)
        .bind(version)
        .bind(span.begin_sec)
        .bind(span.end_sec)
        .execute(&mut *conn)
        .await?;
        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }
}
