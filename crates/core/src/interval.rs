//! Watched-interval arithmetic.
//!
//! Intervals are half-open ranges of whole seconds, `[begin_sec, end_sec)`.
//! This module merges them into a minimal non-overlapping set, clips them to
//! a media duration, and totals the watched seconds.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// TimeRange
// ---------------------------------------------------------------------------

/// A half-open range of watched seconds.
///
/// Field order matters: the derived `Ord` sorts by `begin_sec`, then `end_sec`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub begin_sec: i64,
    pub end_sec: i64,
}

impl TimeRange {
    /// Build a range, rejecting negative bounds and `begin_sec > end_sec`.
    ///
    /// A degenerate range (`begin_sec == end_sec`) is valid and has zero length.
    pub fn new(begin_sec: i64, end_sec: i64) -> Result<Self, CoreError> {
        if begin_sec < 0 || end_sec < 0 || begin_sec > end_sec {
            return Err(CoreError::InvalidInterval { begin_sec, end_sec });
        }
        Ok(Self { begin_sec, end_sec })
    }

    /// Number of seconds covered.
    pub fn len(&self) -> i64 {
        self.end_sec - self.begin_sec
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Merge ranges into the minimal sorted set covering the same union.
///
/// Ranges that overlap or touch (`end >= next.begin`) are joined. The input
/// order is irrelevant; the output is always sorted by `(begin, end)`.
/// Degenerate ranges survive only when they do not touch any other range.
pub fn merge_ranges<I>(ranges: I) -> Vec<TimeRange>
where
    I: IntoIterator<Item = TimeRange>,
{
    let mut sorted: Vec<TimeRange> = ranges.into_iter().collect();
    sorted.sort_unstable();

    let mut merged: Vec<TimeRange> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match merged.last_mut() {
            Some(last) if last.end_sec >= range.begin_sec => {
                last.end_sec = last.end_sec.max(range.end_sec);
            }
            _ => merged.push(range),
        }
    }
    merged
}

// ---------------------------------------------------------------------------
// Clamp and total
// ---------------------------------------------------------------------------

/// Clip a range to `[0, duration_secs]`.
///
/// Returns `None` when nothing of the range is left inside the media.
pub fn clamp_range(range: TimeRange, duration_secs: i64) -> Option<TimeRange> {
    let begin_sec = range.begin_sec.max(0);
    let end_sec = range.end_sec.min(duration_secs);
    if begin_sec >= end_sec {
        None
    } else {
        Some(TimeRange { begin_sec, end_sec })
    }
}

/// Total watched seconds of `ranges` against a media duration.
///
/// Returns `None` when the duration is unknown. The ranges are merged first,
/// so overlapping input never counts twice, and the result never exceeds the
/// duration.
pub fn watched_seconds(ranges: &[TimeRange], duration_secs: Option<i64>) -> Option<i64> {
    let duration_secs = duration_secs?;
    let total = merge_ranges(ranges.iter().copied())
        .into_iter()
        .filter_map(|r| clamp_range(r, duration_secs))
        .map(|r| r.len())
        .sum();
    Some(total)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
