//! Watch status derivation.
//!
//! The status is a pure function of the media duration, the do-not-watch
//! flag, and the watched seconds. Status codes are stable strings stored in
//! `media_entries.status` and used for list filtering; labels are the
//! human-facing text.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::time_format::format_hms;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const STATUS_DO_NOT_WATCH: &str = "do_not_watch";
pub const STATUS_NO_DURATION: &str = "no_duration";
pub const STATUS_NOT_WATCHED: &str = "nowatch";
pub const STATUS_WATCHING: &str = "watching";
pub const STATUS_WATCHED: &str = "watched";

/// All valid status codes.
pub const VALID_STATUS_CODES: &[&str] = &[
    STATUS_DO_NOT_WATCH,
    STATUS_NO_DURATION,
    STATUS_NOT_WATCHED,
    STATUS_WATCHING,
    STATUS_WATCHED,
];

// ---------------------------------------------------------------------------
// WatchStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WatchStatus {
    /// Explicitly parked by the user; overrides everything else.
    DoNotWatch,
    /// No duration is known, so progress cannot be measured.
    DurationUnknown,
    /// Duration known, nothing watched yet.
    NotWatched,
    InProgress { remaining_secs: i64 },
    Completed,
}

impl WatchStatus {
    /// Derive the status.
    ///
    /// Precedence: do-not-watch, unknown duration, completed
    /// (`watched >= duration`), not watched (`watched == 0`), in progress.
    /// A missing `watched_secs` with a known duration counts as zero.
    pub fn derive(
        duration_secs: Option<i64>,
        do_not_watch: bool,
        watched_secs: Option<i64>,
    ) -> Self {
        if do_not_watch {
            return Self::DoNotWatch;
        }
        let Some(duration_secs) = duration_secs else {
            return Self::DurationUnknown;
        };
        let watched_secs = watched_secs.unwrap_or(0);
        if watched_secs >= duration_secs {
            Self::Completed
        } else if watched_secs == 0 {
            Self::NotWatched
        } else {
            Self::InProgress {
                remaining_secs: duration_secs - watched_secs,
            }
        }
    }

    /// Stable status code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DoNotWatch => STATUS_DO_NOT_WATCH,
            Self::DurationUnknown => STATUS_NO_DURATION,
            Self::NotWatched => STATUS_NOT_WATCHED,
            Self::InProgress { .. } => STATUS_WATCHING,
            Self::Completed => STATUS_WATCHED,
        }
    }

    /// Human-facing label, e.g. `Watching · 00:45:00 left`.
    pub fn label(&self) -> String {
        match self {
            Self::DoNotWatch => "Do not watch".to_string(),
            Self::DurationUnknown => "Duration not set".to_string(),
            Self::NotWatched => "Not watched".to_string(),
            Self::InProgress { remaining_secs } => {
                format!("Watching · {} left", format_hms(Some(*remaining_secs)))
            }
            Self::Completed => "Watched".to_string(),
        }
    }

    /// Remaining seconds, only while in progress.
    pub fn remaining_secs(&self) -> Option<i64> {
        match self {
            Self::InProgress { remaining_secs } => Some(*remaining_secs),
            _ => None,
        }
    }
}

/// Validate a status code used as a list filter.
pub fn validate_status_code(code: &str) -> Result<(), CoreError> {
    if VALID_STATUS_CODES.contains(&code) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid status '{code}'. Must be one of: {}",
            VALID_STATUS_CODES.join(", ")
        )))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- derive --------------------------------------------------------------

    #[test]
    fn do_not_watch_overrides_everything() {
        assert_eq!(WatchStatus::derive(Some(3600), true, Some(3600)), WatchStatus::DoNotWatch);
        assert_eq!(WatchStatus::derive(Some(3600), true, Some(900)), WatchStatus::DoNotWatch);
        assert_eq!(WatchStatus::derive(None, true, None), WatchStatus::DoNotWatch);
    }

    #[test]
    fn unknown_duration() {
        assert_eq!(WatchStatus::derive(None, false, None), WatchStatus::DurationUnknown);
    }

    #[test]
    fn completed_when_watched_reaches_duration() {
        assert_eq!(WatchStatus::derive(Some(3600), false, Some(3600)), WatchStatus::Completed);
    }

    #[test]
    fn completed_for_zero_duration() {
        assert_eq!(WatchStatus::derive(Some(0), false, Some(0)), WatchStatus::Completed);
    }

    #[test]
    fn not_watched_when_nothing_counted() {
        assert_eq!(WatchStatus::derive(Some(3600), false, Some(0)), WatchStatus::NotWatched);
        assert_eq!(WatchStatus::derive(Some(3600), false, None), WatchStatus::NotWatched);
    }

    #[test]
    fn in_progress_reports_remaining() {
        let status = WatchStatus::derive(Some(3600), false, Some(900));
        assert_eq!(status, WatchStatus::InProgress { remaining_secs: 2700 });
        assert_eq!(status.remaining_secs(), Some(2700));
    }

    // -- code / label --------------------------------------------------------

    #[test]
    fn labels() {
        assert_eq!(WatchStatus::DoNotWatch.label(), "Do not watch");
        assert_eq!(WatchStatus::DurationUnknown.label(), "Duration not set");
        assert_eq!(WatchStatus::NotWatched.label(), "Not watched");
        assert_eq!(WatchStatus::Completed.label(), "Watched");
        assert_eq!(
            WatchStatus::InProgress { remaining_secs: 2700 }.label(),
            "Watching · 00:45:00 left"
        );
    }

    #[test]
    fn every_code_is_valid() {
        let all = [
            WatchStatus::DoNotWatch,
            WatchStatus::DurationUnknown,
            WatchStatus::NotWatched,
            WatchStatus::InProgress { remaining_secs: 1 },
            WatchStatus::Completed,
        ];
        for status in all {
            assert!(validate_status_code(status.code()).is_ok());
        }
    }

    #[test]
    fn rejects_unknown_code() {
        let msg = validate_status_code("paused").unwrap_err().to_string();
        assert!(msg.contains("paused"));
    }
}
