use std::sync::Arc;

use tokio::{
    sync::mpsc,
    task::{JoinHandle, JoinSet},
    time::sleep,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::saga::{
    activities::ActivityExecutor,
    retry::RetryPolicies,
    types::{Itinerary, SagaOutcome},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SagaReport {
    pub saga_id: Uuid,
    pub outcome: SagaOutcome,
}

/// Executes itineraries activity by activity. Separate itineraries run
/// concurrently; activities inside one never do.
pub struct SagaRuntime {
    executor: Arc<dyn ActivityExecutor>,
    policies: RetryPolicies,
}

impl SagaRuntime {
    pub fn new(executor: Arc<dyn ActivityExecutor>, policies: RetryPolicies) -> Self {
        Self { executor, policies }
    }

    #[tracing::instrument(
        name = "saga_execute",
        target = "saga",
        skip(self, itinerary, cancel),
        fields(saga_id = %itinerary.id(), activities = itinerary.activities().len())
    )]
    pub async fn execute(&self, itinerary: &Itinerary, cancel: &CancellationToken) -> SagaOutcome {
        for (index, activity) in itinerary.activities().iter().enumerate() {
            let policy = self.policies.for_activity(activity);
            let mut attempt = 0_u32;

            loop {
                if cancel.is_cancelled() {
                    tracing::info!(
                        target: "saga",
                        activity_index = index,
                        activity = activity.name(),
                        "saga_cancelled"
                    );
                    return SagaOutcome::Cancelled;
                }

                let err = match self.executor.execute(activity).await {
                    Ok(()) => {
                        tracing::debug!(
                            target: "saga",
                            activity_index = index,
                            activity = activity.name(),
                            retries = attempt,
                            "saga_activity_completed"
                        );
                        break;
                    }
                    Err(err) => err,
                };

                let can_retry = policy.can_retry(&err, attempt);
                tracing::debug!(
                    target: "saga",
                    activity_index = index,
                    activity = activity.name(),
                    attempt = attempt,
                    kind = ?err.kind,
                    can_retry = can_retry,
                    error = %err.message,
                    "saga_activity_failed"
                );
                if !can_retry {
                    tracing::warn!(
                        target: "saga",
                        activity_index = index,
                        activity = activity.name(),
                        kind = ?err.kind,
                        error = %err.message,
                        "saga_faulted"
                    );
                    return SagaOutcome::Faulted {
                        activity_index: index,
                        activity: activity.name(),
                        error: err,
                    };
                }

                attempt += 1;
                let delay = policy.backoff_delay(attempt);
                tokio::select! {
                    _ = cancel.cancelled() => return SagaOutcome::Cancelled,
                    _ = sleep(delay) => {}
                }
            }
        }

        tracing::info!(target: "saga", "saga_completed");
        SagaOutcome::Completed
    }

    /// Drains `receiver` until `shutdown` fires, running each itinerary on its
    /// own task. In-flight sagas observe the same token.
    pub fn start(
        self: Arc<Self>,
        mut receiver: mpsc::Receiver<Itinerary>,
        shutdown: CancellationToken,
        reports: Option<mpsc::UnboundedSender<SagaReport>>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut running = JoinSet::new();
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    Some(finished) = running.join_next(), if !running.is_empty() => {
                        if let Err(err) = finished {
                            tracing::error!(target: "saga", error = %err, "saga_task_join_failed");
                        }
                    }
                    next = receiver.recv() => {
                        let Some(itinerary) = next else {
                            break;
                        };
                        let runtime = Arc::clone(&self);
                        let cancel = shutdown.child_token();
                        let reports = reports.clone();
                        running.spawn(async move {
                            let outcome = runtime.execute(&itinerary, &cancel).await;
                            if let Some(reports) = reports {
                                let _ = reports.send(SagaReport {
                                    saga_id: itinerary.id(),
                                    outcome,
                                });
                            }
                        });
                    }
                }
            }

            while let Some(finished) = running.join_next().await {
                if let Err(err) = finished {
                    tracing::error!(target: "saga", error = %err, "saga_task_join_failed");
                }
            }
            tracing::info!(target: "saga", "saga_runtime_stopped");
        })
    }
}
