use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use certificate_wallet::{
    saga::{
        Activity, ActivityExecutor, ErrorKind, ItineraryPublisher, RetryPolicies, SagaError,
        SagaOutcome, SagaQueue, SagaRuntime, precondition,
    },
    testing::WalletFixture,
    wallet::WalletSliceState,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::plan_split;

/// Fails every call with the same error and counts how often it was asked.
struct FailingExecutor {
    calls: AtomicUsize,
    error: SagaError,
}

#[async_trait]
impl ActivityExecutor for FailingExecutor {
    async fn execute(&self, _activity: &Activity) -> Result<(), SagaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

#[tokio::test]
async fn given_precondition_failure_when_executing_then_activity_runs_once() {
    let fixture = WalletFixture::new().await.expect("fixture");
    let planned = plan_split(&fixture).await;
    let executor = Arc::new(FailingExecutor {
        calls: AtomicUsize::new(0),
        error: precondition("slice changed underneath"),
    });
    let runtime = SagaRuntime::new(executor.clone(), RetryPolicies::default());

    let outcome = runtime
        .execute(&planned.itinerary, &CancellationToken::new())
        .await;

    assert!(matches!(
        outcome,
        SagaOutcome::Faulted {
            activity_index: 0,
            activity: "send_transaction",
            ref error,
        } if error.kind == ErrorKind::Precondition
    ));
    assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn given_cancelled_token_when_executing_then_nothing_runs() {
    let fixture = WalletFixture::new().await.expect("fixture");
    let planned = plan_split(&fixture).await;
    let runtime = SagaRuntime::new(Arc::new(fixture.executor()), RetryPolicies::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    assert_eq!(
        runtime.execute(&planned.itinerary, &cancel).await,
        SagaOutcome::Cancelled
    );
    assert_eq!(
        fixture.slice(planned.source.id).await.expect("source").state,
        WalletSliceState::Slicing
    );
}

#[tokio::test(start_paused = true)]
async fn given_cancel_during_backoff_when_executing_then_saga_stops_early() {
    let fixture = WalletFixture::with_commit_after_polls(100)
        .await
        .expect("fixture");
    let planned = plan_split(&fixture).await;
    let runtime = SagaRuntime::new(Arc::new(fixture.executor()), RetryPolicies::default());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.cancel();
    });

    assert_eq!(
        runtime.execute(&planned.itinerary, &cancel).await,
        SagaOutcome::Cancelled
    );
}

#[tokio::test]
async fn given_running_runtime_when_itinerary_is_published_then_report_says_completed() {
    let fixture = WalletFixture::new().await.expect("fixture");
    let planned = plan_split(&fixture).await;
    let saga_id = planned.itinerary.id();

    let (queue, receiver) = SagaQueue::channel(2);
    let (reports_tx, mut reports) = mpsc::unbounded_channel();
    let shutdown = CancellationToken::new();
    let runtime = Arc::new(SagaRuntime::new(
        Arc::new(fixture.executor()),
        RetryPolicies::default(),
    ));
    let handle = runtime.start(receiver, shutdown.clone(), Some(reports_tx));

    queue.publish(planned.itinerary).await.expect("publish");
    let report = reports.recv().await.expect("report");
    assert_eq!(report.saga_id, saga_id);
    assert_eq!(report.outcome, SagaOutcome::Completed);

    shutdown.cancel();
    handle.await.expect("runtime stops");
    assert_eq!(
        fixture.slice(planned.source.id).await.expect("source").state,
        WalletSliceState::Sliced
    );
}
