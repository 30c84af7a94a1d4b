use async_trait::async_trait;

use crate::registry::{
    error::RegistryError,
    types::{FederatedStreamId, Transaction, TransactionId, TransactionStatus},
};

#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Submits a signed transaction. Resubmitting a transaction the registry
    /// already holds is accepted and returns the same id.
    async fn send_transaction(
        &self,
        registry: &str,
        transaction: Transaction,
    ) -> Result<TransactionId, RegistryError>;

    async fn transaction_status(
        &self,
        registry: &str,
        transaction_id: &str,
    ) -> Result<TransactionStatus, RegistryError>;

    /// Committed transactions of one stream in ledger order, `None` if the
    /// stream does not exist.
    async fn stream_transactions(
        &self,
        stream: &FederatedStreamId,
    ) -> Result<Option<Vec<Transaction>>, RegistryError>;
}
