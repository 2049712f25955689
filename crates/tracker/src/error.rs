//! Error type for tracker commands.

use watchlog_core::error::CoreError;
use watchlog_core::metadata::ProviderError;

/// Message used when a user registers the same media URL twice.
pub const DUPLICATE_MEDIA_URL: &str = "This URL is already registered";

/// Message used when another writer committed the entry first.
pub const CONCURRENT_MODIFICATION: &str = "The entry was modified concurrently; reload and retry";

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// A domain error: validation, not found, conflict or provider failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An unclassified database failure.
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl TrackerError {
    /// The domain error, if this is one.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            Self::Core(err) => Some(err),
            Self::Database(_) => None,
        }
    }
}

impl From<ProviderError> for TrackerError {
    fn from(err: ProviderError) -> Self {
        Self::Core(CoreError::Provider(err))
    }
}

/// Classify a sqlx error.
///
/// - `RowNotFound` inside a commit means stored spans and the aggregate
///   disagree; it stays a database error.
/// - Unique constraint violations (constraint name starting with `uq_`) map
///   to [`CoreError::Conflict`].
impl From<sqlx::Error> for TrackerError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505")
                && db_err.constraint().is_some_and(|c| c.starts_with("uq_"))
            {
                return Self::Core(CoreError::Conflict(DUPLICATE_MEDIA_URL.to_string()));
            }
        }
        Self::Database(err)
    }
}
