use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    registry::{RegistryClient, TransactionStatus},
    saga::{
        error::{SagaError, fatal, transient},
        types::{
            Activity, SendTransactionArguments, UpdateClaimStateArguments,
            UpdateSliceStatesArguments, WaitForCommitArguments,
        },
    },
    wallet::WalletStore,
};

/// Runs a single activity once. Retrying is the runtime's job, so every
/// implementation must tolerate being invoked again with the same arguments.
#[async_trait]
pub trait ActivityExecutor: Send + Sync {
    async fn execute(&self, activity: &Activity) -> Result<(), SagaError>;
}

#[derive(Clone)]
pub struct RegistryActivityExecutor {
    registry: Arc<dyn RegistryClient>,
    store: Arc<dyn WalletStore>,
}

impl RegistryActivityExecutor {
    pub fn new(registry: Arc<dyn RegistryClient>, store: Arc<dyn WalletStore>) -> Self {
        Self { registry, store }
    }

    async fn send_transaction(&self, arguments: &SendTransactionArguments) -> Result<(), SagaError> {
        let transaction_id = self
            .registry
            .send_transaction(&arguments.registry, arguments.transaction.clone())
            .await?;
        tracing::debug!(
            target: "saga",
            registry = %arguments.registry,
            stream = %arguments.transaction.header.federated_stream_id,
            transaction_id = %transaction_id,
            payload_type = %arguments.transaction.header.payload_type,
            "registry_transaction_sent"
        );
        Ok(())
    }

    async fn wait_for_commit(&self, arguments: &WaitForCommitArguments) -> Result<(), SagaError> {
        let status = self
            .registry
            .transaction_status(&arguments.registry, &arguments.transaction_id)
            .await?;
        match status {
            TransactionStatus::Committed => Ok(()),
            TransactionStatus::Pending | TransactionStatus::Unknown => Err(transient(format!(
                "transaction '{}' is still processing",
                arguments.transaction_id
            ))),
            TransactionStatus::Failed { reason } => Err(fatal(format!(
                "transaction '{}' failed on registry '{}': {reason}",
                arguments.transaction_id, arguments.registry
            ))),
        }
    }

    async fn update_slice_states(
        &self,
        arguments: &UpdateSliceStatesArguments,
    ) -> Result<(), SagaError> {
        let mut uow = self.store.begin().await?;
        for (slice_id, state) in &arguments.slice_states {
            uow.set_slice_state(*slice_id, *state)?;
        }
        uow.commit()?;
        Ok(())
    }

    async fn update_claim_state(
        &self,
        arguments: &UpdateClaimStateArguments,
    ) -> Result<(), SagaError> {
        let mut uow = self.store.begin().await?;
        uow.set_claim_state(arguments.allocation_id, arguments.state)?;
        uow.commit()?;
        Ok(())
    }
}

#[async_trait]
impl ActivityExecutor for RegistryActivityExecutor {
    async fn execute(&self, activity: &Activity) -> Result<(), SagaError> {
        match activity {
            Activity::SendTransaction(arguments) => self.send_transaction(arguments).await,
            Activity::WaitForCommit(arguments) => self.wait_for_commit(arguments).await,
            Activity::UpdateSliceStates(arguments) => self.update_slice_states(arguments).await,
            Activity::UpdateClaimState(arguments) => self.update_claim_state(arguments).await,
        }
    }
}
