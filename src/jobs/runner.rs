use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{jobs::lock::AdvisoryLock, saga::SagaError};

#[async_trait]
pub trait PeriodicJob: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run_once(&self) -> Result<(), SagaError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Ran,
    Skipped,
    Failed,
}

pub struct PeriodicJobRunner {
    job: Arc<dyn PeriodicJob>,
    lock: Arc<dyn AdvisoryLock>,
    interval: Duration,
}

impl PeriodicJobRunner {
    pub fn new(job: Arc<dyn PeriodicJob>, lock: Arc<dyn AdvisoryLock>, interval: Duration) -> Self {
        Self {
            job,
            lock,
            interval,
        }
    }

    /// One scheduling round. A lock held elsewhere skips the round.
    #[tracing::instrument(name = "job_tick", target = "jobs", skip(self), fields(job = self.job.name()))]
    pub async fn tick(&self) -> TickOutcome {
        let key = self.job.name();
        match self.lock.try_acquire(key).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(target: "jobs", "job_tick_skipped");
                return TickOutcome::Skipped;
            }
            Err(err) => {
                tracing::warn!(target: "jobs", error = %err, "job_lock_failed");
                return TickOutcome::Skipped;
            }
        }

        let outcome = match self.job.run_once().await {
            Ok(()) => TickOutcome::Ran,
            Err(err) => {
                tracing::warn!(
                    target: "jobs",
                    kind = ?err.kind,
                    error = %err.message,
                    "job_run_failed"
                );
                TickOutcome::Failed
            }
        };

        if let Err(err) = self.lock.release(key).await {
            tracing::error!(target: "jobs", error = %err, "job_lock_release_failed");
        }
        outcome
    }

    pub fn start(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        self.tick().await;
                    }
                }
            }
            tracing::info!(target: "jobs", job = self.job.name(), "job_runner_stopped");
        })
    }
}
