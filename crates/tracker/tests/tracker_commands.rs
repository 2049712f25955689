//! Integration tests for the tracker command surface.
//!
//! Drives [`Tracker`] against the in-memory store and a scripted metadata
//! provider:
//! - Interval scenarios end to end (merge, clamp, status, undo)
//! - Failed commands leave the stored entry unchanged
//! - Provider lookups happen outside the entry lock and failures are surfaced
//! - Concurrent commands on one entry are serialized, and a commit from an
//!   outdated copy is rejected

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use watchlog_core::error::CoreError;
use watchlog_core::media_entry::{EntryDetails, MediaEntryView};
use watchlog_core::metadata::{MediaMetadata, MetadataProvider, ProviderError};
use watchlog_core::types::DbId;
use watchlog_tracker::error::CONCURRENT_MODIFICATION;
use watchlog_tracker::store::{EntryStore, MemoryStore};
use watchlog_tracker::{Tracker, TrackerError};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Provider answering from a fixed table; unknown URLs are `NotFound`.
#[derive(Default)]
struct ScriptedProvider {
    answers: Mutex<HashMap<String, Result<MediaMetadata, ProviderError>>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn answer(&self, url: &str, result: Result<MediaMetadata, ProviderError>) {
        self.answers
            .lock()
            .unwrap()
            .insert(url.to_string(), result);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MetadataProvider for ScriptedProvider {
    async fn fetch(&self, media_url: &str) -> Result<MediaMetadata, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let answer = self.answers.lock().unwrap().get(media_url).cloned();
        answer.unwrap_or(Err(ProviderError::NotFound))
    }
}

type TestTracker = Tracker<MemoryStore, ScriptedProvider>;

const VIDEO_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

fn tracker() -> TestTracker {
    Tracker::new(MemoryStore::new(), ScriptedProvider::default())
}

fn details(title: &str, url: Option<&str>) -> EntryDetails {
    EntryDetails {
        title: title.to_string(),
        media_url: url.map(str::to_string),
        memo: None,
    }
}

fn metadata(title: &str, duration_secs: i64) -> MediaMetadata {
    MediaMetadata {
        title: title.to_string(),
        duration_secs,
    }
}

async fn entry_with_duration(tracker: &TestTracker, duration_secs: i64) -> DbId {
    let view = tracker.create_entry(1, details("Lecture", None)).await.unwrap();
    tracker.set_duration(view.id, Some(duration_secs)).await.unwrap();
    view.id
}

fn spans(view: &MediaEntryView) -> Vec<(i64, i64)> {
    view.visible_intervals
        .iter()
        .map(|i| (i.begin_sec, i.end_sec))
        .collect()
}

fn assert_core_err(result: Result<MediaEntryView, TrackerError>) -> CoreError {
    match result {
        Err(TrackerError::Core(err)) => err,
        other => panic!("expected a domain error, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Interval scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn partial_watch_reports_remaining_time() {
    let tracker = tracker();
    let id = entry_with_duration(&tracker, 3600).await;

    let view = tracker.add_interval(id, 0, 900).await.unwrap();
    assert_eq!(view.watched_secs, Some(900));
    assert_eq!(view.status, "watching");
    assert_eq!(view.status_label, "Watching · 00:45:00 left");
    assert_eq!(view.formatted_watched, "00:15:00");
    assert_eq!(view.formatted_duration, "01:00:00");
}

#[tokio::test]
async fn touching_intervals_merge_and_clamp_to_completed() {
    let tracker = tracker();
    let id = entry_with_duration(&tracker, 3600).await;

    tracker.add_interval(id, 0, 3600).await.unwrap();
    let view = tracker.add_interval(id, 3600, 3650).await.unwrap();
    assert_eq!(spans(&view), vec![(0, 3650)]);
    assert_eq!(view.watched_secs, Some(3600));
    assert_eq!(view.status, "watched");
}

#[tokio::test]
async fn intervals_beyond_duration_count_only_up_to_it() {
    let tracker = tracker();
    let id = entry_with_duration(&tracker, 3600).await;

    tracker.add_interval(id, 0, 7200).await.unwrap();
    let view = tracker.add_interval(id, 3600, 7300).await.unwrap();
    assert_eq!(spans(&view), vec![(0, 7300)]);
    assert_eq!(view.watched_secs, Some(3600));
    assert_eq!(view.status_label, "Watched");
}

#[tokio::test]
async fn restore_is_a_single_step_undo() {
    let tracker = tracker();
    let id = entry_with_duration(&tracker, 10800).await;

    let first = tracker.add_interval(id, 0, 7200).await.unwrap();
    assert_eq!(first.active_version, 1);
    assert!(!first.can_restore);

    let second = tracker.add_interval(id, 3600, 10800).await.unwrap();
    assert_eq!(second.active_version, 2);
    assert!(second.can_restore);

    let restored = tracker.restore(id).await.unwrap();
    assert_eq!(restored.active_version, 1);
    assert_eq!(spans(&restored), vec![(0, 7200)]);
    assert!(!restored.can_restore);

    assert_matches!(
        assert_core_err(tracker.restore(id).await),
        CoreError::NothingToRestore
    );
}

#[tokio::test]
async fn delete_edits_the_active_version_in_place() {
    let tracker = tracker();
    let id = entry_with_duration(&tracker, 3600).await;

    tracker.add_interval(id, 0, 100).await.unwrap();
    tracker.add_interval(id, 50, 200).await.unwrap();
    let view = tracker.delete_interval(id, 0).await.unwrap();

    assert_eq!(view.active_version, 2);
    assert!(view.visible_intervals.is_empty());
    assert_eq!(view.watched_secs, Some(0));
    assert_eq!(view.status, "nowatch");
}

#[tokio::test]
async fn new_branch_after_restore_orphans_the_old_one() {
    let tracker = tracker();
    let id = entry_with_duration(&tracker, 3600).await;

    tracker.add_interval(id, 0, 10).await.unwrap();
    tracker.add_interval(id, 20, 30).await.unwrap();
    tracker.restore(id).await.unwrap();
    let view = tracker.add_interval(id, 100, 110).await.unwrap();

    assert_eq!(view.active_version, 2);
    assert_eq!(spans(&view), vec![(0, 10), (100, 110)]);
    assert_eq!(tracker.store().stored_span_count(id).await, 5);
}

#[tokio::test]
async fn mark_watched_is_undoable() {
    let tracker = tracker();
    let id = entry_with_duration(&tracker, 600).await;
    tracker.add_interval(id, 0, 60).await.unwrap();

    let watched = tracker.mark_watched(id).await.unwrap();
    assert_eq!(watched.status, "watched");

    let undone = tracker.restore(id).await.unwrap();
    assert_eq!(undone.watched_secs, Some(60));
}

// ---------------------------------------------------------------------------
// Flags and status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn do_not_watch_overrides_and_unmark_recomputes() {
    let tracker = tracker();
    let id = entry_with_duration(&tracker, 3600).await;

    tracker.mark_do_not_watch(id).await.unwrap();
    let view = tracker.mark_do_not_watch(id).await.unwrap();
    assert_eq!(view.status, "do_not_watch");
    assert_eq!(view.status_label, "Do not watch");

    let view = tracker.unmark_do_not_watch(id).await.unwrap();
    assert_eq!(view.status, "nowatch");
    assert_eq!(view.status_label, "Not watched");
}

#[tokio::test]
async fn unknown_duration_reports_no_watched_time() {
    let tracker = tracker();
    let view = tracker.create_entry(1, details("Lecture", None)).await.unwrap();
    let view = tracker.add_interval(view.id, 0, 500).await.unwrap();

    assert_eq!(view.status, "no_duration");
    assert_eq!(view.watched_secs, None);
    assert_eq!(view.formatted_duration, "00:00:00");
    assert_matches!(
        assert_core_err(tracker.mark_watched(view.id).await),
        CoreError::Validation(_)
    );
}

#[tokio::test]
async fn list_entries_filters_by_status_code() {
    let tracker = tracker();
    let done = entry_with_duration(&tracker, 60).await;
    tracker.mark_watched(done).await.unwrap();
    let skipped = entry_with_duration(&tracker, 60).await;
    tracker.mark_do_not_watch(skipped).await.unwrap();
    tracker.create_entry(2, details("Other user", None)).await.unwrap();

    let all = tracker.list_entries(1, None).await.unwrap();
    assert_eq!(all.iter().map(|v| v.id).collect::<Vec<_>>(), vec![skipped, done]);

    let watched = tracker.list_entries(1, Some("watched")).await.unwrap();
    assert_eq!(watched.len(), 1);
    assert_eq!(watched[0].id, done);

    assert_matches!(
        tracker.list_entries(1, Some("finished")).await,
        Err(TrackerError::Core(CoreError::Validation(_)))
    );
}

// ---------------------------------------------------------------------------
// Atomicity
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rejected_commands_leave_the_entry_unchanged() {
    let tracker = tracker();
    let id = entry_with_duration(&tracker, 3600).await;
    let before = tracker.add_interval(id, 0, 900).await.unwrap();

    assert_matches!(
        assert_core_err(tracker.add_interval(id, 500, 100).await),
        CoreError::InvalidInterval { begin_sec: 500, end_sec: 100 }
    );
    assert_matches!(
        assert_core_err(tracker.add_interval(id, -1, 100).await),
        CoreError::InvalidInterval { .. }
    );
    assert_matches!(
        assert_core_err(tracker.delete_interval(id, 3).await),
        CoreError::SpanNotFound { index: 3, len: 1 }
    );
    assert_matches!(
        assert_core_err(tracker.set_duration(id, Some(-5)).await),
        CoreError::Validation(_)
    );

    assert_eq!(tracker.entry(id).await.unwrap(), before);
}

#[tokio::test]
async fn store_failure_discards_the_change() {
    let tracker = tracker();
    let id = entry_with_duration(&tracker, 3600).await;
    let before = tracker.add_interval(id, 0, 900).await.unwrap();

    tracker.store().fail_next_commit();
    assert!(tracker.add_interval(id, 900, 1800).await.is_err());

    assert_eq!(tracker.entry(id).await.unwrap(), before);
    let after = tracker.add_interval(id, 900, 1800).await.unwrap();
    assert_eq!(after.active_version, 2);
}

#[tokio::test]
async fn commands_on_missing_entry_are_not_found() {
    let tracker = tracker();
    assert_matches!(
        assert_core_err(tracker.add_interval(42, 0, 10).await),
        CoreError::NotFound { id: 42, .. }
    );
    assert_matches!(
        tracker.delete_entry(42).await,
        Err(TrackerError::Core(CoreError::NotFound { .. }))
    );
}

// ---------------------------------------------------------------------------
// Details and provider
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_url_for_same_user_is_a_conflict() {
    let tracker = tracker();
    tracker
        .create_entry(1, details("First", Some(VIDEO_URL)))
        .await
        .unwrap();
    let second = tracker.create_entry(1, details("Second", None)).await.unwrap();

    assert_matches!(
        tracker.create_entry(1, details("Again", Some(VIDEO_URL))).await,
        Err(TrackerError::Core(CoreError::Conflict(_)))
    );
    assert_matches!(
        assert_core_err(
            tracker
                .update_details(second.id, details("Second", Some(VIDEO_URL)))
                .await
        ),
        CoreError::Conflict(_)
    );

    tracker
        .create_entry(2, details("Elsewhere", Some(VIDEO_URL)))
        .await
        .unwrap();
}

#[tokio::test]
async fn update_details_sets_links_for_youtube_urls() {
    let tracker = tracker();
    let id = entry_with_duration(&tracker, 3600).await;
    tracker.add_interval(id, 0, 125).await.unwrap();

    let view = tracker
        .update_details(id, details("Renamed", Some(VIDEO_URL)))
        .await
        .unwrap();
    assert_eq!(view.title, "Renamed");
    assert_eq!(
        view.thumbnail_url.as_deref(),
        Some("https://img.youtube.com/vi/dQw4w9WgXcQ/mqdefault.jpg")
    );
    assert_eq!(
        view.visible_intervals[0].resume_url.as_deref(),
        Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=125")
    );
}

#[tokio::test]
async fn provider_metadata_sets_title_and_duration() {
    let tracker = tracker();
    let view = tracker
        .create_entry(1, details("", Some(VIDEO_URL)))
        .await
        .unwrap();
    tracker.add_interval(view.id, 0, 212).await.unwrap();

    let provider_answer = metadata("Never Gonna Give You Up", 212);
    tracker_provider(&tracker).answer(VIDEO_URL, Ok(provider_answer));

    let refreshed = tracker.refresh_metadata(view.id).await.unwrap();
    assert_eq!(refreshed.title, "Never Gonna Give You Up");
    assert_eq!(refreshed.duration_secs, Some(212));
    assert_eq!(refreshed.status, "watched");
}

#[tokio::test]
async fn provider_failure_leaves_entry_unchanged_and_is_surfaced() {
    let tracker = tracker();
    let view = tracker
        .create_entry(1, details("Kept", Some(VIDEO_URL)))
        .await
        .unwrap();
    tracker_provider(&tracker).answer(VIDEO_URL, Err(ProviderError::Ambiguous { count: 2 }));

    assert_matches!(
        assert_core_err(tracker.refresh_metadata(view.id).await),
        CoreError::Provider(ProviderError::Ambiguous { count: 2 })
    );
    assert_matches!(
        assert_core_err(tracker.set_duration_from_provider(view.id, "https://youtu.be/other").await),
        CoreError::Provider(ProviderError::NotFound)
    );

    let after = tracker.entry(view.id).await.unwrap();
    assert_eq!(after, view);
}

#[tokio::test]
async fn refresh_without_url_never_calls_the_provider() {
    let tracker = tracker();
    let view = tracker.create_entry(1, details("No link", None)).await.unwrap();

    assert_matches!(
        assert_core_err(tracker.refresh_metadata(view.id).await),
        CoreError::Validation(_)
    );
    assert_eq!(tracker_provider(&tracker).calls(), 0);
}

#[tokio::test]
async fn refresh_missing_durations_counts_successes_and_failures() {
    let tracker = tracker();
    let ok = tracker
        .create_entry(1, details("", Some(VIDEO_URL)))
        .await
        .unwrap();
    tracker
        .create_entry(1, details("", Some("https://youtu.be/missing")))
        .await
        .unwrap();
    tracker
        .create_entry(1, details("", Some("https://media.example.com/a")))
        .await
        .unwrap();
    tracker_provider(&tracker).answer(VIDEO_URL, Ok(metadata("Found", 90)));

    let report = tracker.refresh_missing_durations(10).await.unwrap();
    assert_eq!(report.attempted, 2);
    assert_eq!(report.refreshed, 1);
    assert_eq!(report.failed, 1);

    assert_eq!(tracker.entry(ok.id).await.unwrap().duration_secs, Some(90));
    let second = tracker.refresh_missing_durations(10).await.unwrap();
    assert_eq!(second.attempted, 1);
}

#[tokio::test]
async fn failing_entries_do_not_starve_the_refresh_batch() {
    let tracker = tracker();
    for url in ["https://youtu.be/gone1", "https://youtu.be/gone2"] {
        tracker.create_entry(1, details("", Some(url))).await.unwrap();
    }
    let good = tracker
        .create_entry(1, details("", Some(VIDEO_URL)))
        .await
        .unwrap();
    tracker_provider(&tracker).answer(VIDEO_URL, Ok(metadata("Found", 90)));

    let first = tracker.refresh_missing_durations(2).await.unwrap();
    assert_eq!((first.attempted, first.failed), (2, 2));

    let second = tracker.refresh_missing_durations(2).await.unwrap();
    assert_eq!(second.refreshed, 1);
    assert_eq!(tracker.entry(good.id).await.unwrap().duration_secs, Some(90));
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adds_on_one_entry_are_serialized() {
    let tracker = Arc::new(tracker());
    let id = entry_with_duration(&tracker, 100_000).await;

    let tasks: Vec<_> = (0..20)
        .map(|i| {
            let tracker = Arc::clone(&tracker);
            tokio::spawn(async move {
                let begin = i * 100;
                tracker.add_interval(id, begin, begin + 10).await.unwrap();
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let view = tracker.entry(id).await.unwrap();
    assert_eq!(view.active_version, 20);
    assert_eq!(view.visible_intervals.len(), 20);
    assert_eq!(view.watched_secs, Some(200));
}

#[tokio::test]
async fn commit_from_an_outdated_copy_is_a_conflict() {
    let tracker = tracker();
    let id = entry_with_duration(&tracker, 600).await;
    let mut outdated = tracker.store().load(id).await.unwrap().unwrap();

    tracker.add_interval(id, 0, 60).await.unwrap();

    outdated.add_interval(300, 400).unwrap();
    let writes = outdated.take_pending_writes();
    assert_matches!(
        tracker.store().commit(&outdated, &writes).await,
        Err(TrackerError::Core(CoreError::Conflict(msg))) if msg == CONCURRENT_MODIFICATION
    );

    let view = tracker.entry(id).await.unwrap();
    assert_eq!(spans(&view), vec![(0, 60)]);
    assert_eq!(view.active_version, 1);

    // The tracker always commits from a fresh copy, so it keeps working.
    let view = tracker.add_interval(id, 300, 400).await.unwrap();
    assert_eq!(spans(&view), vec![(0, 60), (300, 400)]);
}

#[tokio::test]
async fn deleted_entry_is_gone() {
    let tracker = tracker();
    let id = entry_with_duration(&tracker, 60).await;
    tracker.add_interval(id, 0, 30).await.unwrap();

    tracker.delete_entry(id).await.unwrap();
    assert_matches!(
        tracker.entry(id).await,
        Err(TrackerError::Core(CoreError::NotFound { .. }))
    );
    assert_eq!(tracker.store().stored_span_count(id).await, 0);
}

fn tracker_provider(tracker: &TestTracker) -> &ScriptedProvider {
    tracker.provider()
}
