//! Periodic producers: the feed scheduler and the housekeeping task.
//!
//! Two independent tickers. The feed scheduler asks storage for a bounded
//! batch of due feeds each tick and pushes it into the worker pool (which
//! blocks while the pool is saturated). Housekeeping archives old entries
//! on its own, much slower, cadence.

use crate::config::Config;
use crate::model::EntryStatus;
use crate::storage::Database;
use crate::worker::Pool;

/// Start both periodic tasks. Returns immediately; the tasks run until the
/// process exits.
pub fn serve(db: Database, pool: Pool, config: &Config) {
    tracing::info!("Starting scheduler");

    tokio::spawn(feed_scheduler(
        db.clone(),
        pool,
        config.polling_frequency_minutes,
        config.batch_size,
    ));

    tokio::spawn(cleanup_scheduler(
        db,
        config.cleanup_frequency_hours,
        config.archive_read_days,
        config.archive_unread_days,
        config.archive_batch_size,
    ));
}

async fn feed_scheduler(db: Database, pool: Pool, frequency_minutes: u64, batch_size: i64) {
    let period = std::time::Duration::from_secs(frequency_minutes * 60);
    let mut ticker = tokio::time::interval(period);
    // The first tick fires immediately; consume it so the cadence starts one
    // full period from startup, once subscriptions have settled.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        match db.next_batch(batch_size).await {
            Ok(jobs) => {
                tracing::debug!(jobs = jobs.len(), "Pushing scheduled jobs");
                pool.push(jobs).await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Unable to fetch scheduler batch");
            }
        }
    }
}

async fn cleanup_scheduler(
    db: Database,
    frequency_hours: u64,
    archive_read_days: i64,
    archive_unread_days: i64,
    archive_batch_size: i64,
) {
    let period = std::time::Duration::from_secs(frequency_hours * 60 * 60);
    let mut ticker = tokio::time::interval(period);
    ticker.tick().await;

    loop {
        ticker.tick().await;

        match db
            .archive_entries(EntryStatus::Read, archive_read_days, archive_batch_size)
            .await
        {
            Ok(archived) => {
                tracing::info!(archived = archived, "Archived read entries");
            }
            Err(err) => {
                tracing::error!(error = %err, "Unable to archive read entries");
            }
        }

        match db
            .archive_entries(EntryStatus::Unread, archive_unread_days, archive_batch_size)
            .await
        {
            Ok(archived) => {
                tracing::info!(archived = archived, "Archived unread entries");
            }
            Err(err) => {
                tracing::error!(error = %err, "Unable to archive unread entries");
            }
        }
    }
}
