use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;
use watchlog_core::error::CoreError;
use watchlog_core::interval::TimeRange;
use watchlog_core::media_entry::{EntryParts, MediaEntry};
use watchlog_core::media_url::is_youtube_url;
use watchlog_core::types::{DbId, Version};
use watchlog_core::version_store::SpanWrite;

use crate::error::{TrackerError, CONCURRENT_MODIFICATION, DUPLICATE_MEDIA_URL};
use crate::store::EntryStore;

/// In-process [`EntryStore`] with the same storage rules as PostgreSQL:
/// orphaned spans are kept but never loaded, URLs are unique per user, a
/// commit either applies every write or none, and a commit from an outdated
/// revision is rejected.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    fail_next_commit: AtomicBool,
}

#[derive(Debug, Default)]
struct MemoryState {
    last_id: DbId,
    /// Monotonic stand-in for `metadata_checked_at`.
    check_seq: u64,
    entries: BTreeMap<DbId, StoredEntry>,
}

#[derive(Debug, Clone)]
struct StoredEntry {
    parts: EntryParts,
    spans: Vec<StoredSpan>,
    metadata_checked: Option<u64>,
}

#[derive(Debug, Clone, Copy)]
struct StoredSpan {
    version: Version,
    range: TimeRange,
    orphaned: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next commit fail without writing anything.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Every stored span of an entry, orphaned ones included.
    pub async fn stored_span_count(&self, id: DbId) -> usize {
        self.state
            .read()
            .await
            .entries
            .get(&id)
            .map_or(0, |entry| entry.spans.len())
    }
}

impl MemoryState {
    fn ensure_unique_url(
        &self,
        user_id: DbId,
        media_url: Option<&str>,
        except: DbId,
    ) -> Result<(), TrackerError> {
        let Some(url) = media_url else {
            return Ok(());
        };
        let taken = self.entries.iter().any(|(id, entry)| {
            *id != except
                && entry.parts.user_id == user_id
                && entry.parts.media_url.as_deref() == Some(url)
        });
        if taken {
            return Err(CoreError::Conflict(DUPLICATE_MEDIA_URL.to_string()).into());
        }
        Ok(())
    }

    fn rebuild(entry: &StoredEntry) -> Result<MediaEntry, TrackerError> {
        let live = entry
            .spans
            .iter()
            .filter(|span| !span.orphaned)
            .map(|span| (span.version, span.range));
        Ok(MediaEntry::from_parts(entry.parts.clone(), live)?)
    }
}

fn apply_write(spans: &mut Vec<StoredSpan>, write: &SpanWrite) -> Result<(), TrackerError> {
    match write {
        SpanWrite::Snapshot {
            version,
            spans: snapshot,
        } => {
            for span in spans
                .iter_mut()
                .filter(|span| !span.orphaned && span.version >= *version)
            {
                span.orphaned = true;
            }
            spans.extend(snapshot.iter().map(|range| StoredSpan {
                version: *version,
                range: *range,
                orphaned: false,
            }));
        }
        SpanWrite::Remove { version, span } => {
            let position = spans
                .iter()
                .position(|s| !s.orphaned && s.version == *version && s.range == *span)
                .ok_or_else(|| {
                    CoreError::Internal(format!(
                        "Stored span [{}, {}) of version {version} is missing",
                        span.begin_sec, span.end_sec
                    ))
                })?;
            spans.remove(position);
        }
        SpanWrite::Rewind { .. } => {}
    }
    Ok(())
}

impl EntryStore for MemoryStore {
    async fn create(&self, entry: &MediaEntry) -> Result<MediaEntry, TrackerError> {
        let mut state = self.state.write().await;
        state.ensure_unique_url(entry.user_id(), entry.media_url(), 0)?;

        state.last_id += 1;
        let parts = EntryParts {
            id: state.last_id,
            active_version: 0,
            revision: 0,
            ..entry.parts()
        };
        let stored = StoredEntry {
            parts,
            spans: Vec::new(),
            metadata_checked: None,
        };
        let created = MemoryState::rebuild(&stored)?;
        state.entries.insert(created.id(), stored);
        Ok(created)
    }

    async fn load(&self, id: DbId) -> Result<Option<MediaEntry>, TrackerError> {
        let state = self.state.read().await;
        state.entries.get(&id).map(MemoryState::rebuild).transpose()
    }

    async fn commit(&self, entry: &MediaEntry, writes: &[SpanWrite]) -> Result<bool, TrackerError> {
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(CoreError::Internal("Injected commit failure".to_string()).into());
        }

        let mut state = self.state.write().await;
        let mut parts = entry.parts();
        let Some(stored) = state.entries.get(&parts.id) else {
            return Ok(false);
        };
        if stored.parts.revision != parts.revision {
            return Err(CoreError::Conflict(CONCURRENT_MODIFICATION.to_string()).into());
        }
        state.ensure_unique_url(parts.user_id, parts.media_url.as_deref(), parts.id)?;

        // Stage on a copy so a failing write leaves the stored entry untouched.
        let mut spans = stored.spans.clone();
        for write in writes {
            apply_write(&mut spans, write)?;
        }
        let metadata_checked = stored.metadata_checked;

        parts.revision += 1;
        state.entries.insert(
            parts.id,
            StoredEntry {
                parts,
                spans,
                metadata_checked,
            },
        );
        Ok(true)
    }

    async fn delete(&self, id: DbId) -> Result<bool, TrackerError> {
        Ok(self.state.write().await.entries.remove(&id).is_some())
    }

    async fn list_by_user(
        &self,
        user_id: DbId,
        status: Option<&str>,
    ) -> Result<Vec<MediaEntry>, TrackerError> {
        let state = self.state.read().await;
        let mut entries = Vec::new();
        for stored in state.entries.values().rev() {
            if stored.parts.user_id != user_id {
                continue;
            }
            let entry = MemoryState::rebuild(stored)?;
            if status.is_none_or(|code| entry.status().code() == code) {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    async fn list_missing_duration(&self, limit: i64) -> Result<Vec<DbId>, TrackerError> {
        let limit = usize::try_from(limit).unwrap_or(0);
        let state = self.state.read().await;
        let mut candidates: Vec<(Option<u64>, DbId)> = state
            .entries
            .values()
            .filter(|stored| {
                stored.parts.duration_secs.is_none()
                    && stored.parts.media_url.as_deref().is_some_and(is_youtube_url)
            })
            .map(|stored| (stored.metadata_checked, stored.parts.id))
            .collect();
        // `None` sorts first, like `NULLS FIRST`.
        candidates.sort_unstable();
        Ok(candidates.into_iter().take(limit).map(|(_, id)| id).collect())
    }

    async fn mark_metadata_checked(&self, id: DbId) -> Result<(), TrackerError> {
        let mut state = self.state.write().await;
        state.check_seq += 1;
        let seq = state.check_seq;
        if let Some(stored) = state.entries.get_mut(&id) {
            stored.metadata_checked = Some(seq);
        }
        Ok(())
    }
}
