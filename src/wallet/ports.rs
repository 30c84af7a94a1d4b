use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::wallet::{
    error::WalletError,
    types::{
        Certificate, Claim, ClaimState, OutboxMessage, Wallet, WalletEndpoint, WalletSlice,
        WalletSliceState,
    },
};

/// One local transaction. Nothing is visible to other units of work until
/// `commit`; dropping without commit rolls back.
pub trait WalletUnitOfWork: Send {
    fn get_wallet(&self, wallet_id: Uuid) -> Result<Wallet, WalletError>;
    fn insert_wallet(&mut self, wallet: Wallet) -> Result<(), WalletError>;

    fn get_endpoint(&self, endpoint_id: Uuid) -> Result<WalletEndpoint, WalletError>;
    fn insert_endpoint(&mut self, endpoint: WalletEndpoint) -> Result<(), WalletError>;
    /// Returns the wallet's remainder endpoint, creating it on first use.
    fn remainder_endpoint(&mut self, wallet_id: Uuid) -> Result<WalletEndpoint, WalletError>;
    fn next_position(&mut self, endpoint_id: Uuid) -> Result<u32, WalletError>;

    fn get_slice(&self, slice_id: Uuid) -> Result<WalletSlice, WalletError>;
    fn find_slice(
        &self,
        endpoint_id: Uuid,
        position: u32,
    ) -> Result<Option<WalletSlice>, WalletError>;
    fn slices_by_certificate(
        &self,
        registry: &str,
        certificate_id: Uuid,
    ) -> Result<Vec<WalletSlice>, WalletError>;
    fn insert_slice(&mut self, slice: WalletSlice) -> Result<(), WalletError>;
    fn set_slice_state(
        &mut self,
        slice_id: Uuid,
        state: WalletSliceState,
    ) -> Result<(), WalletError>;
    /// Fails with a conflict unless the slice is currently in `expected`.
    fn transition_slice_state(
        &mut self,
        slice_id: Uuid,
        expected: WalletSliceState,
        next: WalletSliceState,
    ) -> Result<(), WalletError>;
    /// Moves `Available` slices of one certificate owned by `owner` to
    /// `Reserved`, in insertion order, until their sum reaches `quantity`.
    fn reserve_slices(
        &mut self,
        owner: &str,
        registry: &str,
        certificate_id: Uuid,
        quantity: u64,
    ) -> Result<Vec<WalletSlice>, WalletError>;

    fn insert_claim(&mut self, claim: Claim) -> Result<(), WalletError>;
    fn get_claim(&self, claim_id: Uuid) -> Result<Claim, WalletError>;
    fn set_claim_state(&mut self, claim_id: Uuid, state: ClaimState) -> Result<(), WalletError>;
    fn claims(&self) -> Result<Vec<Claim>, WalletError>;

    fn get_certificate(
        &self,
        registry: &str,
        certificate_id: Uuid,
    ) -> Result<Option<Certificate>, WalletError>;
    fn insert_certificate(&mut self, certificate: Certificate) -> Result<(), WalletError>;
    fn certificates_ended_before(
        &self,
        cutoff: OffsetDateTime,
    ) -> Result<Vec<Certificate>, WalletError>;

    fn insert_outbox_message(&mut self, message: OutboxMessage) -> Result<(), WalletError>;
    fn outbox_messages(&self, limit: usize) -> Result<Vec<OutboxMessage>, WalletError>;
    fn delete_outbox_message(&mut self, message_id: Uuid) -> Result<(), WalletError>;

    fn commit(self: Box<Self>) -> Result<(), WalletError>;
}

#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn WalletUnitOfWork>, WalletError>;
}
