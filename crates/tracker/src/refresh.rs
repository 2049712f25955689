//! Periodic metadata refresh.
//!
//! Spawns a background loop that fills in title and duration for entries
//! with a YouTube URL but no duration yet. Runs on a fixed interval using
//! `tokio::time::interval`.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use watchlog_core::metadata::MetadataProvider;

use crate::service::Tracker;
use crate::store::EntryStore;

/// Run the refresh loop until `cancel` is triggered.
///
/// The first pass runs immediately; a failing pass is logged and the loop
/// carries on.
pub async fn run<S, P>(
    tracker: Arc<Tracker<S, P>>,
    every: Duration,
    batch_size: i64,
    cancel: CancellationToken,
) where
    S: EntryStore,
    P: MetadataProvider,
{
    tracing::info!(
        interval_secs = every.as_secs(),
        batch_size,
        "Metadata refresh job started"
    );

    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Metadata refresh job stopping");
                break;
            }
            _ = interval.tick() => {
                match tracker.refresh_missing_durations(batch_size).await {
                    Ok(report) if report.attempted > 0 => {
                        tracing::info!(
                            attempted = report.attempted,
                            refreshed = report.refreshed,
                            failed = report.failed,
                            "Metadata refresh: pass complete"
                        );
                    }
                    Ok(_) => {
                        tracing::debug!("Metadata refresh: nothing to refresh");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Metadata refresh: pass failed");
                    }
                }
            }
        }
    }
}
