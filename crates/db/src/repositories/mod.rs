//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that accept
//! `&PgPool` (or a connection inside a caller's transaction) as the first
//! argument.

pub mod media_entry_repo;
pub mod time_span_repo;

pub use media_entry_repo::MediaEntryRepo;
pub use time_span_repo::TimeSpanRepo;
