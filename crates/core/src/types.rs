/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Snapshot number of an entry's watched-interval set. `0` means nothing recorded yet.
pub type Version = i32;
