//! Media metadata provider contract.
//!
//! A provider looks up `{title, duration}` for a media URL. Implementations
//! live outside this crate (see the YouTube client); the engine only depends
//! on [`MetadataProvider`] and consumes the duration for clamping.

use std::future::Future;

use serde::{Deserialize, Serialize};

/// Title and duration reported by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub title: String,
    pub duration_secs: i64,
}

/// Errors from a metadata lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The provider does not handle this URL.
    #[error("Unsupported media URL: {0}")]
    UnsupportedUrl(String),

    /// The request never produced a response (network, DNS, TLS).
    #[error("Provider request failed: {0}")]
    Request(String),

    /// The provider answered with a non-2xx status.
    #[error("Provider API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// No media matched the URL.
    #[error("No media found for the URL")]
    NotFound,

    /// More than one result matched; ambiguous lookups are failures.
    #[error("Ambiguous provider result: {count} items matched")]
    Ambiguous { count: usize },

    #[error("Invalid duration '{0}'")]
    InvalidDuration(String),

    /// The response body could not be decoded.
    #[error("Malformed provider response: {0}")]
    Decode(String),
}

/// Looks up metadata for a media URL.
pub trait MetadataProvider: Send + Sync {
    fn fetch(
        &self,
        media_url: &str,
    ) -> impl Future<Output = Result<MediaMetadata, ProviderError>> + Send;
}

/// Parse an ISO 8601 duration such as `PT1H2M3S` or `P1DT2H` into seconds.
///
/// Only day, hour, minute and second components are accepted; year, month
/// and week components are rejected because their length in seconds is
/// ambiguous.
pub fn parse_iso8601_duration(value: &str) -> Result<i64, ProviderError> {
    let invalid = || ProviderError::InvalidDuration(value.to_string());

    let rest = value.strip_prefix('P').ok_or_else(invalid)?;
    if rest.is_empty() {
        return Err(invalid());
    }

    let (date_part, time_part) = match rest.split_once('T') {
        Some((_, "")) => return Err(invalid()),
        Some((date, time)) => (date, time),
        None => (rest, ""),
    };

    const DATE_UNITS: &[(char, i64)] = &[('D', 86_400)];
    const TIME_UNITS: &[(char, i64)] = &[('H', 3600), ('M', 60), ('S', 1)];

    let mut total: i64 = 0;
    for (part, units) in [(date_part, DATE_UNITS), (time_part, TIME_UNITS)] {
        let mut digits = String::new();
        let mut next_unit = 0;
        for ch in part.chars() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                continue;
            }
            let position = units[next_unit..]
                .iter()
                .position(|(unit, _)| *unit == ch)
                .ok_or_else(invalid)?;
            let (_, factor) = units[next_unit + position];
            let amount: i64 = digits.parse().map_err(|_| invalid())?;
            total = amount
                .checked_mul(factor)
                .and_then(|secs| total.checked_add(secs))
                .ok_or_else(invalid)?;
            digits.clear();
            next_unit += position + 1;
        }
        if !digits.is_empty() {
            return Err(invalid());
        }
    }
    Ok(total)
}
