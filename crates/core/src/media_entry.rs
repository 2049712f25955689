//! The media entry aggregate.
//!
//! [`MediaEntry`] owns an entry's [`VersionStore`], its duration and
//! do-not-watch flag, and the cached `watched_secs` / [`WatchStatus`]. The
//! cache is private and recomputed by every mutation before it returns, so a
//! reader never sees derived state older than the entry's last write.
//!
//! Span mutations queue [`SpanWrite`]s; the persistence layer drains them
//! with [`MediaEntry::take_pending_writes`] and applies them in the same
//! transaction as the entry row.

use serde::Serialize;

use crate::error::CoreError;
use crate::interval::{watched_seconds, TimeRange};
use crate::media_url::{
    normalize_media_url, resume_url, thumbnail_url, validate_media_url,
};
use crate::metadata::MediaMetadata;
use crate::time_format::format_hms;
use crate::types::{DbId, Version};
use crate::version_store::{SpanWrite, VersionStore};
use crate::watch_status::WatchStatus;

/// Maximum title length in characters.
pub const MAX_TITLE_LEN: usize = 255;

// ---------------------------------------------------------------------------
// Input / persisted shapes
// ---------------------------------------------------------------------------

/// Persisted entry fields needed to rebuild the aggregate. Cached fields are
/// not included; they are recomputed on load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryParts {
    pub id: DbId,
    pub user_id: DbId,
    pub title: String,
    pub media_url: Option<String>,
    pub memo: Option<String>,
    pub duration_secs: Option<i64>,
    pub active_version: Version,
    pub do_not_watch: bool,
    /// Commit counter; a commit made from an older revision is rejected.
    pub revision: i64,
}

/// User-editable details.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryDetails {
    pub title: String,
    pub media_url: Option<String>,
    pub memo: Option<String>,
}

// ---------------------------------------------------------------------------
// Read model
// ---------------------------------------------------------------------------

/// One visible interval, formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntervalView {
    pub begin_sec: i64,
    pub end_sec: i64,
    pub begin: String,
    pub end: String,
    /// Link resuming playback where this interval ends (YouTube only).
    pub resume_url: Option<String>,
}

/// Everything a presentation layer needs to render an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaEntryView {
    pub id: DbId,
    pub title: String,
    pub media_url: Option<String>,
    pub memo: Option<String>,
    pub thumbnail_url: Option<String>,
    pub status: &'static str,
    pub status_label: String,
    pub watched_secs: Option<i64>,
    pub formatted_watched: String,
    pub duration_secs: Option<i64>,
    pub formatted_duration: String,
    pub do_not_watch: bool,
    pub active_version: Version,
    pub can_restore: bool,
    pub visible_intervals: Vec<IntervalView>,
}

// ---------------------------------------------------------------------------
// Aggregate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MediaEntry {
    id: DbId,
    user_id: DbId,
    title: String,
    media_url: Option<String>,
    memo: Option<String>,
    duration_secs: Option<i64>,
    do_not_watch: bool,
    spans: VersionStore,
    watched_secs: Option<i64>,
    status: WatchStatus,
    pending: Vec<SpanWrite>,
    revision: i64,
}

impl MediaEntry {
    /// A fresh entry with no intervals, no duration and no URL.
    pub fn new(id: DbId, user_id: DbId, title: impl Into<String>) -> Self {
        let mut entry = Self {
            id,
            user_id,
            title: title.into(),
            media_url: None,
            memo: None,
            duration_secs: None,
            do_not_watch: false,
            spans: VersionStore::new(),
            watched_secs: None,
            status: WatchStatus::DurationUnknown,
            pending: Vec::new(),
            revision: 0,
        };
        entry.refresh_cache();
        entry
    }

    /// Rebuild an entry from persisted fields and its live spans.
    pub fn from_parts<I>(parts: EntryParts, spans: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = (Version, TimeRange)>,
    {
        validate_duration(parts.duration_secs)?;
        let mut entry = Self {
            id: parts.id,
            user_id: parts.user_id,
            title: parts.title,
            media_url: parts.media_url,
            memo: parts.memo,
            duration_secs: parts.duration_secs,
            do_not_watch: parts.do_not_watch,
            spans: VersionStore::from_parts(parts.active_version, spans)?,
            watched_secs: None,
            status: WatchStatus::DurationUnknown,
            pending: Vec::new(),
            revision: parts.revision,
        };
        entry.refresh_cache();
        Ok(entry)
    }

    // -- accessors -----------------------------------------------------------

    pub fn id(&self) -> DbId {
        self.id
    }

    pub fn user_id(&self) -> DbId {
        self.user_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn media_url(&self) -> Option<&str> {
        self.media_url.as_deref()
    }

    pub fn memo(&self) -> Option<&str> {
        self.memo.as_deref()
    }

    pub fn duration_secs(&self) -> Option<i64> {
        self.duration_secs
    }

    /// `true` only for a known, non-zero duration.
    pub fn has_duration(&self) -> bool {
        self.duration_secs.is_some_and(|d| d > 0)
    }

    pub fn do_not_watch(&self) -> bool {
        self.do_not_watch
    }

    pub fn active_version(&self) -> Version {
        self.spans.active_version()
    }

    pub fn visible_spans(&self) -> &[TimeRange] {
        self.spans.visible_spans()
    }

    pub fn can_restore(&self) -> bool {
        self.spans.can_restore()
    }

    /// Revision this copy was loaded at.
    pub fn revision(&self) -> i64 {
        self.revision
    }

    /// Cached watched seconds; `None` while the duration is unknown.
    pub fn watched_seconds(&self) -> Option<i64> {
        self.watched_secs
    }

    pub fn status(&self) -> WatchStatus {
        self.status
    }

    pub fn status_label(&self) -> String {
        self.status.label()
    }

    // -- interval commands ---------------------------------------------------

    /// Record a watched interval as a new version.
    ///
    /// Invalid bounds are rejected before anything changes.
    pub fn add_interval(&mut self, begin_sec: i64, end_sec: i64) -> Result<(), CoreError> {
        let range = TimeRange::new(begin_sec, end_sec)?;
        let write = self.spans.add_interval(range);
        self.pending.push(write);
        self.refresh_cache();
        Ok(())
    }

    /// Record the whole media as watched, as an ordinary (undoable) interval.
    pub fn mark_watched(&mut self) -> Result<(), CoreError> {
        let duration_secs = self
            .duration_secs
            .filter(|_| self.has_duration())
            .ok_or_else(|| {
                CoreError::Validation("Cannot mark as watched: duration is not set".to_string())
            })?;
        self.add_interval(0, duration_secs)
    }

    /// Remove one interval of the active version by its visible index.
    pub fn delete_interval(&mut self, index: usize) -> Result<(), CoreError> {
        let write = self.spans.delete_interval(index)?;
        self.pending.push(write);
        self.refresh_cache();
        Ok(())
    }

    /// Undo the last added interval by rewinding to the previous version.
    pub fn restore(&mut self) -> Result<(), CoreError> {
        let write = self.spans.restore()?;
        self.pending.push(write);
        self.refresh_cache();
        Ok(())
    }

    // -- flag and detail commands --------------------------------------------

    /// Idempotent.
    pub fn mark_do_not_watch(&mut self) {
        self.do_not_watch = true;
        self.refresh_cache();
    }

    /// Idempotent. The status falls back to whatever the intervals say, which
    /// for an untouched entry is "not watched".
    pub fn unmark_do_not_watch(&mut self) {
        self.do_not_watch = false;
        self.refresh_cache();
    }

    /// Set or clear the media duration.
    pub fn set_duration(&mut self, duration_secs: Option<i64>) -> Result<(), CoreError> {
        validate_duration(duration_secs)?;
        self.duration_secs = duration_secs;
        self.refresh_cache();
        Ok(())
    }

    /// Apply a provider lookup: title and duration together.
    pub fn apply_metadata(&mut self, metadata: &MediaMetadata) -> Result<(), CoreError> {
        validate_title(&metadata.title)?;
        validate_duration(Some(metadata.duration_secs))?;
        self.title = metadata.title.clone();
        self.duration_secs = Some(metadata.duration_secs);
        self.refresh_cache();
        Ok(())
    }

    /// Replace title, URL and memo. A blank URL clears it.
    ///
    /// URL uniqueness per user is enforced by the store, not here.
    pub fn update_details(&mut self, details: EntryDetails) -> Result<(), CoreError> {
        validate_title(&details.title)?;
        let media_url = normalize_media_url(details.media_url.as_deref());
        if let Some(url) = &media_url {
            validate_media_url(url)?;
        }
        self.title = details.title;
        self.media_url = media_url;
        self.memo = details.memo.filter(|m| !m.trim().is_empty());
        Ok(())
    }

    // -- persistence hand-off ------------------------------------------------

    pub fn pending_writes(&self) -> &[SpanWrite] {
        &self.pending
    }

    /// Drain the span writes queued since the last call.
    pub fn take_pending_writes(&mut self) -> Vec<SpanWrite> {
        std::mem::take(&mut self.pending)
    }

    /// Adopt the revision a successful commit wrote.
    pub fn record_commit(&mut self) {
        self.revision += 1;
    }

    /// Fields to persist alongside the pending span writes.
    pub fn parts(&self) -> EntryParts {
        EntryParts {
            id: self.id,
            user_id: self.user_id,
            title: self.title.clone(),
            media_url: self.media_url.clone(),
            memo: self.memo.clone(),
            duration_secs: self.duration_secs,
            active_version: self.spans.active_version(),
            do_not_watch: self.do_not_watch,
            revision: self.revision,
        }
    }

    // -- read model ----------------------------------------------------------

    pub fn view(&self) -> MediaEntryView {
        let visible_intervals = self
            .visible_spans()
            .iter()
            .map(|span| IntervalView {
                begin_sec: span.begin_sec,
                end_sec: span.end_sec,
                begin: format_hms(Some(span.begin_sec)),
                end: format_hms(Some(span.end_sec)),
                resume_url: self
                    .media_url
                    .as_deref()
                    .and_then(|url| resume_url(url, span.end_sec)),
            })
            .collect();

        MediaEntryView {
            id: self.id,
            title: self.title.clone(),
            media_url: self.media_url.clone(),
            memo: self.memo.clone(),
            thumbnail_url: self.media_url.as_deref().and_then(thumbnail_url),
            status: self.status.code(),
            status_label: self.status.label(),
            watched_secs: self.watched_secs,
            formatted_watched: format_hms(self.watched_secs),
            duration_secs: self.duration_secs,
            formatted_duration: format_hms(self.duration_secs),
            do_not_watch: self.do_not_watch,
            active_version: self.spans.active_version(),
            can_restore: self.spans.can_restore(),
            visible_intervals,
        }
    }

    fn refresh_cache(&mut self) {
        self.watched_secs = watched_seconds(self.spans.visible_spans(), self.duration_secs);
        self.status = WatchStatus::derive(self.duration_secs, self.do_not_watch, self.watched_secs);
    }
}

fn validate_duration(duration_secs: Option<i64>) -> Result<(), CoreError> {
    match duration_secs {
        Some(d) if d < 0 => Err(CoreError::Validation(format!(
            "duration_secs must be >= 0, got {d}"
        ))),
        _ => Ok(()),
    }
}

fn validate_title(title: &str) -> Result<(), CoreError> {
    let len = title.chars().count();
    if len > MAX_TITLE_LEN {
        return Err(CoreError::Validation(format!(
            "Title must be at most {MAX_TITLE_LEN} characters, got {len}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
