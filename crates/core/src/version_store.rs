//! Copy-on-write snapshot store for an entry's watched intervals.
//!
//! Every added interval produces a new version holding the full merged set,
//! so the previous version stays intact and can be restored with a pointer
//! rewind. Only one step of undo is offered: [`VersionStore::can_restore`]
//! looks at `active_version - 1` only.
//!
//! Mutations return a [`SpanWrite`] describing the storage change, so a
//! persistence layer can replay exactly what the in-memory store did.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::CoreError;
use crate::interval::{merge_ranges, TimeRange};
use crate::types::Version;

/// A storage change produced by a [`VersionStore`] mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpanWrite {
    /// A new snapshot written under `version`.
    ///
    /// Live spans already stored at `version` or above belong to an abandoned
    /// branch and must be orphaned (kept, but never visible) before the
    /// snapshot is inserted.
    Snapshot {
        version: Version,
        spans: Vec<TimeRange>,
    },
    /// One span physically removed from `version`.
    Remove { version: Version, span: TimeRange },
    /// The active version pointer moved without touching any span.
    Rewind { version: Version },
}

/// Interval snapshots keyed by version, plus the active version pointer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionStore {
    active_version: Version,
    /// Live spans per version, each list kept sorted. Versions without spans
    /// have no key.
    versions: BTreeMap<Version, Vec<TimeRange>>,
}

impl VersionStore {
    /// An empty store at version 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from persisted state.
    ///
    /// Spans are grouped by version and sorted; they are not merged, so a
    /// version's visible list reflects exactly what was stored.
    pub fn from_parts<I>(active_version: Version, spans: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = (Version, TimeRange)>,
    {
        if active_version < 0 {
            return Err(CoreError::Validation(format!(
                "active_version must be >= 0, got {active_version}"
            )));
        }
        let mut versions: BTreeMap<Version, Vec<TimeRange>> = BTreeMap::new();
        for (version, span) in spans {
            versions.entry(version).or_default().push(span);
        }
        for spans in versions.values_mut() {
            spans.sort_unstable();
        }
        Ok(Self {
            active_version,
            versions,
        })
    }

    pub fn active_version(&self) -> Version {
        self.active_version
    }

    /// Sorted spans of the active version. Empty at version 0.
    pub fn visible_spans(&self) -> &[TimeRange] {
        if self.active_version == 0 {
            return &[];
        }
        self.versions
            .get(&self.active_version)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Spans stored under any version, for inspection.
    pub fn spans_at(&self, version: Version) -> &[TimeRange] {
        self.versions
            .get(&version)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Merge `range` into the visible set and store the result as the next version.
    ///
    /// The version always advances by one, even when nothing merged. Any spans
    /// left above the active version by an earlier [`restore`](Self::restore)
    /// are dropped from memory here; the returned write tells storage to
    /// orphan them.
    pub fn add_interval(&mut self, range: TimeRange) -> SpanWrite {
        let merged = merge_ranges(self.visible_spans().iter().copied().chain([range]));
        let next = self.active_version + 1;

        self.versions.retain(|version, _| *version < next);
        self.versions.insert(next, merged.clone());
        self.active_version = next;

        SpanWrite::Snapshot {
            version: next,
            spans: merged,
        }
    }

    /// Remove the span at `index` of the visible list, editing the active
    /// version in place. No new version is created.
    pub fn delete_interval(&mut self, index: usize) -> Result<SpanWrite, CoreError> {
        let version = self.active_version;
        let len = self.visible_spans().len();
        if index >= len {
            return Err(CoreError::SpanNotFound { index, len });
        }

        let spans = self
            .versions
            .get_mut(&version)
            .ok_or(CoreError::SpanNotFound { index, len })?;
        let span = spans.remove(index);
        if spans.is_empty() {
            self.versions.remove(&version);
        }

        Ok(SpanWrite::Remove { version, span })
    }

    /// `true` when the version just below the active one has stored spans.
    pub fn can_restore(&self) -> bool {
        self.active_version > 0 && !self.spans_at(self.active_version - 1).is_empty()
    }

    /// Step the active version pointer back by one. Stored spans are untouched.
    pub fn restore(&mut self) -> Result<SpanWrite, CoreError> {
        if !self.can_restore() {
            return Err(CoreError::NothingToRestore);
        }
        self.active_version -= 1;
        Ok(SpanWrite::Rewind {
            version: self.active_version,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn r(begin_sec: i64, end_sec: i64) -> TimeRange {
        TimeRange { begin_sec, end_sec }
    }

    #[test]
    fn new_store_is_empty_at_version_zero() {
        let store = VersionStore::new();
        assert_eq!(store.active_version(), 0);
        assert!(store.visible_spans().is_empty());
        assert!(!store.can_restore());
    }

    #[test]
    fn version_zero_hides_stored_spans() {
        let store = VersionStore::from_parts(0, [(0, r(0, 10)), (1, r(0, 20))]).unwrap();
        assert!(store.visible_spans().is_empty());
    }

    #[test]
    fn from_parts_shows_only_active_version_sorted() {
        let store = VersionStore::from_parts(
            1,
            [
                (1, r(1, 10)),
                (1, r(0, 10)),
                (1, r(10, 15)),
                (1, r(0, 20)),
                (2, r(0, 30)),
            ],
        )
        .unwrap();
        assert_eq!(
            store.visible_spans(),
            &[r(0, 10), r(0, 20), r(1, 10), r(10, 15)]
        );
    }

    #[test]
    fn from_parts_rejects_negative_version() {
        assert!(VersionStore::from_parts(-1, []).is_err());
    }

    // -- add_interval --------------------------------------------------------

    #[test]
    fn add_advances_version_by_one_each_time() {
        let mut store = VersionStore::new();
        store.add_interval(r(0, 10));
        assert_eq!(store.active_version(), 1);
        store.add_interval(r(100, 110));
        assert_eq!(store.active_version(), 2);
        store.add_interval(r(100, 110));
        assert_eq!(store.active_version(), 3);
    }

    #[test]
    fn add_merges_with_visible_spans() {
        let mut store = VersionStore::new();
        store.add_interval(r(0, 7200));
        let write = store.add_interval(r(3600, 7300));

        assert_eq!(store.visible_spans(), &[r(0, 7300)]);
        assert_eq!(
            write,
            SpanWrite::Snapshot {
                version: 2,
                spans: vec![r(0, 7300)]
            }
        );
    }

    #[test]
    fn add_keeps_previous_version_unchanged() {
        let mut store = VersionStore::new();
        store.add_interval(r(0, 7200));
        store.add_interval(r(3600, 10800));
        assert_eq!(store.spans_at(1), &[r(0, 7200)]);
        assert_eq!(store.spans_at(2), &[r(0, 10800)]);
    }

    #[test]
    fn add_after_restore_replaces_abandoned_future() {
        let mut store = VersionStore::new();
        store.add_interval(r(0, 10));
        store.add_interval(r(5, 20));
        store.add_interval(r(30, 40));
        store.restore().unwrap();
        assert_eq!(store.active_version(), 2);

        store.add_interval(r(100, 110));
        assert_eq!(store.active_version(), 3);
        assert_eq!(store.visible_spans(), &[r(0, 20), r(100, 110)]);
    }

    // -- delete_interval -----------------------------------------------------

    #[test]
    fn delete_edits_active_version_in_place() {
        let mut store = VersionStore::new();
        store.add_interval(r(0, 3600));
        store.add_interval(r(7200, 10800));

        let write = store.delete_interval(0).unwrap();
        assert_eq!(
            write,
            SpanWrite::Remove {
                version: 2,
                span: r(0, 3600)
            }
        );
        assert_eq!(store.active_version(), 2);
        assert_eq!(store.visible_spans(), &[r(7200, 10800)]);
    }

    #[test]
    fn delete_only_span_does_not_resurrect_previous_version() {
        let mut store = VersionStore::new();
        store.add_interval(r(0, 10));
        store.add_interval(r(5, 20));

        store.delete_interval(0).unwrap();
        assert_eq!(store.active_version(), 2);
        assert!(store.visible_spans().is_empty());
        assert_eq!(store.spans_at(1), &[r(0, 10)]);
    }

    #[test]
    fn delete_out_of_range_leaves_store_unchanged() {
        let mut store = VersionStore::new();
        store.add_interval(r(0, 10));
        let before = store.clone();

        assert_matches!(
            store.delete_interval(1),
            Err(CoreError::SpanNotFound { index: 1, len: 1 })
        );
        assert_eq!(store, before);
    }

    #[test]
    fn delete_on_empty_store_fails() {
        let mut store = VersionStore::new();
        assert_matches!(store.delete_interval(0), Err(CoreError::SpanNotFound { .. }));
    }

    // -- can_restore / restore -----------------------------------------------

    #[test]
    fn restore_walks_back_one_step() {
        let mut store = VersionStore::new();
        store.add_interval(r(0, 7200));
        assert!(!store.can_restore());

        store.add_interval(r(3600, 10800));
        assert!(store.can_restore());

        let write = store.restore().unwrap();
        assert_eq!(write, SpanWrite::Rewind { version: 1 });
        assert_eq!(store.active_version(), 1);
        assert_eq!(store.visible_spans(), &[r(0, 7200)]);
        assert!(!store.can_restore());
    }

    #[test]
    fn restore_keeps_abandoned_version_stored() {
        let mut store = VersionStore::new();
        store.add_interval(r(0, 10));
        store.add_interval(r(20, 30));
        store.restore().unwrap();
        assert_eq!(store.spans_at(2), &[r(0, 10), r(20, 30)]);
    }

    #[test]
    fn restore_without_previous_version_fails() {
        let mut store = VersionStore::new();
        assert_matches!(store.restore(), Err(CoreError::NothingToRestore));

        store.add_interval(r(0, 10));
        assert_matches!(store.restore(), Err(CoreError::NothingToRestore));
        assert_eq!(store.active_version(), 1);
    }

    #[test]
    fn can_restore_follows_stored_versions() {
        let spans = [(1, r(0, 10)), (2, r(0, 20))];
        assert!(VersionStore::from_parts(2, spans).unwrap().can_restore());
        assert!(!VersionStore::from_parts(1, spans).unwrap().can_restore());
        assert!(!VersionStore::from_parts(0, spans).unwrap().can_restore());
    }
}
