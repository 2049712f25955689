//! YouTube Data API v3 client.
//!
//! Looks up title and duration for YouTube video URLs and implements the
//! [`watchlog_core::metadata::MetadataProvider`] contract.

pub mod api;
pub mod response;

pub use api::YouTubeApi;
