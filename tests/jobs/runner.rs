use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use certificate_wallet::{
    jobs::{AdvisoryLock, InMemoryAdvisoryLock, PeriodicJob, PeriodicJobRunner, TickOutcome},
    saga::{SagaError, transient},
};
use tokio_util::sync::CancellationToken;

struct CountingJob {
    runs: AtomicUsize,
    fail: bool,
}

impl CountingJob {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            runs: AtomicUsize::new(0),
            fail,
        })
    }

    fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PeriodicJob for CountingJob {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn run_once(&self) -> Result<(), SagaError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(transient("database went away"));
        }
        Ok(())
    }
}

#[tokio::test]
async fn given_lock_held_elsewhere_when_ticking_then_round_is_skipped() {
    let job = CountingJob::new(false);
    let lock = Arc::new(InMemoryAdvisoryLock::new());
    let runner = PeriodicJobRunner::new(job.clone(), lock.clone(), Duration::from_secs(1));

    assert!(lock.try_acquire("counting").await.expect("acquire"));
    assert_eq!(runner.tick().await, TickOutcome::Skipped);
    assert_eq!(job.runs(), 0);

    lock.release("counting").await.expect("release");
    assert_eq!(runner.tick().await, TickOutcome::Ran);
    assert_eq!(job.runs(), 1);
    assert!(lock.try_acquire("counting").await.expect("lock released after run"));
}

#[tokio::test]
async fn given_failing_job_when_ticking_then_failure_is_reported_and_lock_released() {
    let job = CountingJob::new(true);
    let lock = Arc::new(InMemoryAdvisoryLock::new());
    let runner = PeriodicJobRunner::new(job.clone(), lock.clone(), Duration::from_secs(1));

    assert_eq!(runner.tick().await, TickOutcome::Failed);
    assert_eq!(runner.tick().await, TickOutcome::Failed);
    assert_eq!(job.runs(), 2);
    assert!(lock.try_acquire("counting").await.expect("acquire"));
}

#[tokio::test(start_paused = true)]
async fn given_started_runner_when_time_passes_then_job_runs_every_interval() {
    let job = CountingJob::new(false);
    let runner = PeriodicJobRunner::new(
        job.clone(),
        Arc::new(InMemoryAdvisoryLock::new()),
        Duration::from_secs(10),
    );
    let shutdown = CancellationToken::new();
    let handle = runner.start(shutdown.clone());

    tokio::time::sleep(Duration::from_secs(25)).await;
    shutdown.cancel();
    handle.await.expect("runner stops");

    assert_eq!(job.runs(), 3);
}
