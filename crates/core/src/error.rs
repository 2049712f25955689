use crate::metadata::ProviderError;
use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Invalid interval [{begin_sec}, {end_sec}): bounds must be non-negative and begin <= end")]
    InvalidInterval { begin_sec: i64, end_sec: i64 },

    #[error("No interval at index {index} (visible intervals: {len})")]
    SpanNotFound { index: usize, len: usize },

    #[error("Nothing to restore: no previous version is stored")]
    NothingToRestore,

    #[error("Metadata provider failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
