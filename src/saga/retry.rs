use std::time::Duration;

use crate::{
    config::RetryConfig,
    saga::{
        error::{ErrorKind, SagaError},
        types::Activity,
    },
};

const STATE_UPDATE_RETRY_COUNT: u32 = 3;
const STATE_UPDATE_INTERVAL_MS: u64 = 100;

/// Linear backoff: attempt `n` waits `initial + increment * (n - 1)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    retry_on: Vec<ErrorKind>,
    limit: u32,
    initial: Duration,
    increment: Duration,
}

impl RetryPolicy {
    pub fn incremental(
        retry_on: Vec<ErrorKind>,
        limit: u32,
        initial: Duration,
        increment: Duration,
    ) -> Self {
        Self {
            retry_on,
            limit,
            initial,
            increment,
        }
    }

    pub fn fixed(retry_on: Vec<ErrorKind>, limit: u32, interval: Duration) -> Self {
        Self::incremental(retry_on, limit, interval, Duration::ZERO)
    }

    /// `attempt` counts retries already made.
    pub fn can_retry(&self, err: &SagaError, attempt: u32) -> bool {
        attempt < self.limit && self.retry_on.contains(&err.kind)
    }

    /// `attempt` is 1-based.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.initial + self.increment.saturating_mul(attempt.saturating_sub(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicies {
    send_transaction: RetryPolicy,
    wait_for_commit: RetryPolicy,
    state_update: RetryPolicy,
}

impl RetryPolicies {
    pub fn from_config(config: &RetryConfig) -> Self {
        let still_processing_initial =
            Duration::from_millis(config.registry_transaction_still_processing_initial_interval_ms);
        let still_processing_increment = Duration::from_millis(
            config.registry_transaction_still_processing_interval_increment_ms,
        );

        Self {
            send_transaction: RetryPolicy::incremental(
                vec![ErrorKind::Transient],
                config.registry_send_retry_count,
                still_processing_initial,
                still_processing_increment,
            ),
            wait_for_commit: RetryPolicy::incremental(
                vec![ErrorKind::Transient],
                config.registry_transaction_still_processing_retry_count,
                still_processing_initial,
                still_processing_increment,
            ),
            state_update: RetryPolicy::fixed(
                vec![ErrorKind::Transient],
                STATE_UPDATE_RETRY_COUNT,
                Duration::from_millis(STATE_UPDATE_INTERVAL_MS),
            ),
        }
    }

    pub fn for_activity(&self, activity: &Activity) -> &RetryPolicy {
        match activity {
            Activity::SendTransaction(_) => &self.send_transaction,
            Activity::WaitForCommit(_) => &self.wait_for_commit,
            Activity::UpdateSliceStates(_) | Activity::UpdateClaimState(_) => &self.state_update,
        }
    }
}

impl Default for RetryPolicies {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
