use std::time::Duration;

use watchlog_youtube::api::DEFAULT_API_URL;

/// Errors raised while reading configuration.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has an invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub database_url: String,
    /// Pool size (default: `20`).
    pub database_max_connections: u32,
    pub youtube_api_key: String,
    /// YouTube Data API base URL (default: the public v3 endpoint).
    pub youtube_api_url: String,
    /// Seconds between metadata refresh runs (default: `3600`).
    pub refresh_interval_secs: u64,
    /// Entries refreshed per run (default: `50`).
    pub refresh_batch_size: i64,
}

impl TrackerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                          | Default                                  |
    /// |----------------------------------|------------------------------------------|
    /// | `DATABASE_URL`                   | required                                 |
    /// | `DATABASE_MAX_CONNECTIONS`       | `20`                                     |
    /// | `YOUTUBE_API_KEY`                | required                                 |
    /// | `YOUTUBE_API_URL`                | `https://www.googleapis.com/youtube/v3`  |
    /// | `METADATA_REFRESH_INTERVAL_SECS` | `3600`                                   |
    /// | `METADATA_REFRESH_BATCH_SIZE`    | `50`                                     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| {
            lookup(var)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(var))
        };

        let refresh_interval_secs: u64 = parse_or(&lookup, "METADATA_REFRESH_INTERVAL_SECS", 3600)?;
        if refresh_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "METADATA_REFRESH_INTERVAL_SECS",
                value: "0".to_string(),
            });
        }

        let refresh_batch_size: i64 = parse_or(&lookup, "METADATA_REFRESH_BATCH_SIZE", 50)?;
        if refresh_batch_size <= 0 {
            return Err(ConfigError::Invalid {
                var: "METADATA_REFRESH_BATCH_SIZE",
                value: refresh_batch_size.to_string(),
            });
        }

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 20)?,
            youtube_api_key: required("YOUTUBE_API_KEY")?,
            youtube_api_url: lookup("YOUTUBE_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into()),
            refresh_interval_secs,
            refresh_batch_size,
        })
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}
