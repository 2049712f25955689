//! Row structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - Conversions to and from the `watchlog_core` domain types

pub mod media_entry;
pub mod time_span;
