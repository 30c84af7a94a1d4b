use std::{sync::Arc, time::Duration};

use tokio::{sync::mpsc, task::JoinHandle, time::sleep};
use tokio_util::sync::CancellationToken;

use crate::{
    claims::{
        service::ClaimService,
        types::{ClaimAccepted, ClaimCommand},
    },
    config::RetryConfig,
    saga::{ErrorKind, RetryPolicy, SagaError},
};

/// Message-consumer side of claim handling. Transient failures are retried at
/// a fixed interval, independently of saga retries; anything else drops the
/// command after the unit of work has rolled back. Cancelling `shutdown`
/// during a backoff gives up with the last error.
pub struct ClaimCommandConsumer {
    service: Arc<ClaimService>,
    policy: RetryPolicy,
}

impl ClaimCommandConsumer {
    pub fn new(service: Arc<ClaimService>, config: &RetryConfig) -> Self {
        Self {
            service,
            policy: RetryPolicy::fixed(
                vec![ErrorKind::Transient],
                config.consumer_retry_count,
                Duration::from_millis(config.consumer_retry_interval_ms),
            ),
        }
    }

    pub async fn consume(
        &self,
        command: &ClaimCommand,
        shutdown: &CancellationToken,
    ) -> Result<ClaimAccepted, SagaError> {
        let mut attempt = 0_u32;
        loop {
            match self.service.handle(command).await {
                Ok(accepted) => return Ok(accepted),
                Err(err) if self.policy.can_retry(&err, attempt) => {
                    attempt += 1;
                    tracing::debug!(
                        target: "claims",
                        request_id = %command.request_id,
                        attempt = attempt,
                        error = %err.message,
                        "claim_command_retry_scheduled"
                    );
                    tokio::select! {
                        _ = shutdown.cancelled() => {
                            tracing::info!(
                                target: "claims",
                                request_id = %command.request_id,
                                retries = attempt,
                                "claim_command_abandoned_on_shutdown"
                            );
                            return Err(err);
                        }
                        _ = sleep(self.policy.backoff_delay(attempt)) => {}
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        target: "claims",
                        request_id = %command.request_id,
                        kind = ?err.kind,
                        error = %err.message,
                        retries = attempt,
                        "claim_command_rejected"
                    );
                    return Err(err);
                }
            }
        }
    }

    pub fn start(
        self,
        mut receiver: mpsc::Receiver<ClaimCommand>,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let command = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    next = receiver.recv() => match next {
                        Some(command) => command,
                        None => break,
                    },
                };
                let _ = self.consume(&command, &shutdown).await;
            }
            tracing::info!(target: "claims", "claim_consumer_stopped");
        })
    }
}
