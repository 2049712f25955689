//! `HH:MM:SS` formatting for durations and watch positions.

use crate::error::CoreError;

const SECS_PER_MINUTE: i64 = 60;
const SECS_PER_HOUR: i64 = 3600;

/// Format seconds as zero-padded `HH:MM:SS`.
///
/// `None` formats as `00:00:00`. Hours are not wrapped at 24, and negative
/// input is treated as zero.
pub fn format_hms(secs: Option<i64>) -> String {
    let secs = secs.unwrap_or(0).max(0);
    let hours = secs / SECS_PER_HOUR;
    let minutes = (secs % SECS_PER_HOUR) / SECS_PER_MINUTE;
    let seconds = secs % SECS_PER_MINUTE;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Combine hour/minute/second form fields into seconds. Blank fields count as 0.
pub fn seconds_from_hms(
    hours: Option<i64>,
    minutes: Option<i64>,
    seconds: Option<i64>,
) -> Result<i64, CoreError> {
    let parts = [
        ("hours", hours.unwrap_or(0)),
        ("minutes", minutes.unwrap_or(0)),
        ("seconds", seconds.unwrap_or(0)),
    ];
    if let Some((name, value)) = parts.iter().find(|(_, v)| *v < 0) {
        return Err(CoreError::Validation(format!(
            "{name} must be >= 0, got {value}"
        )));
    }
    parts[0]
        .1
        .checked_mul(SECS_PER_HOUR)
        .and_then(|h| h.checked_add(parts[1].1.checked_mul(SECS_PER_MINUTE)?))
        .and_then(|hm| hm.checked_add(parts[2].1))
        .ok_or_else(|| CoreError::Validation("Time is too large".to_string()))
}
