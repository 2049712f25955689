//! Watch-interval tracking service.
//!
//! Wires the `watchlog-core` aggregate to persistence ([`store`]) and to a
//! metadata provider, serializing commands per entry ([`locks`]) and running
//! the periodic metadata refresh ([`refresh`]).

pub mod config;
pub mod error;
pub mod locks;
pub mod refresh;
pub mod service;
pub mod store;

pub use error::TrackerError;
pub use service::{RefreshReport, Tracker};
