//! Domain core for watch-progress tracking.
//!
//! Everything in this crate is synchronous and free of I/O: interval merging
//! and clamping, the versioned span store, status derivation, and the
//! [`media_entry::MediaEntry`] aggregate that ties them together.

pub mod error;
pub mod interval;
pub mod media_entry;
pub mod media_url;
pub mod metadata;
pub mod time_format;
pub mod types;
pub mod version_store;
pub mod watch_status;
