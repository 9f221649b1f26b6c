//! Fixed-size worker pool draining refresh jobs.
//!
//! N long-lived tasks share one bounded channel (capacity 1). `push` awaits
//! every send, so when all workers are busy the scheduler's next batch
//! blocks; that backpressure is the system's only throttle. No job is ever
//! dropped and no queue grows without bound.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::fetch::FeedFetcher;
use crate::model::{Job, SchedulingPolicy};
use crate::reader::handler;
use crate::storage::Database;

#[derive(Clone)]
pub struct Pool {
    tx: mpsc::Sender<Job>,
}

impl Pool {
    /// Spawn `worker_count` workers, each looping on the shared job channel.
    pub fn spawn(
        worker_count: usize,
        db: Database,
        fetcher: FeedFetcher,
        policy: SchedulingPolicy,
    ) -> Pool {
        let (tx, rx) = mpsc::channel::<Job>(1);
        let rx = Arc::new(Mutex::new(rx));

        for worker_id in 0..worker_count {
            let rx = Arc::clone(&rx);
            let db = db.clone();
            let fetcher = fetcher.clone();
            let policy = policy.clone();

            tokio::spawn(async move {
                loop {
                    // Hold the lock only for the receive so the other
                    // workers can take the next job while this one fetches.
                    let job = { rx.lock().await.recv().await };
                    let Some(job) = job else {
                        tracing::debug!(worker_id = worker_id, "Job channel closed, worker exiting");
                        break;
                    };

                    tracing::debug!(
                        worker_id = worker_id,
                        user_id = job.user_id,
                        feed_id = job.feed_id,
                        "Refreshing feed"
                    );

                    // One feed's failure must not affect the others or the
                    // worker itself; the handler already recorded it on the
                    // feed row.
                    if let Err(err) =
                        handler::refresh_feed(&db, &fetcher, &policy, job.user_id, job.feed_id)
                            .await
                    {
                        tracing::error!(
                            worker_id = worker_id,
                            user_id = job.user_id,
                            feed_id = job.feed_id,
                            error = %err,
                            "Feed refresh failed"
                        );
                    }
                }
            });
        }

        Pool { tx }
    }

    /// Enqueue a batch with sequential blocking sends.
    pub async fn push(&self, jobs: Vec<Job>) {
        for job in jobs {
            if self.tx.send(job).await.is_err() {
                tracing::warn!("Job channel closed, dropping remaining batch");
                return;
            }
        }
    }
}
