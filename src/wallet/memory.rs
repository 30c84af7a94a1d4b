use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::wallet::{
    error::{WalletError, conflict, internal_error, not_found, precondition_failed, unavailable},
    ports::{WalletStore, WalletUnitOfWork},
    types::{
        Certificate, Claim, ClaimState, OutboxMessage, Wallet, WalletEndpoint, WalletSlice,
        WalletSliceState,
    },
};

#[derive(Debug, Clone, Default)]
struct WalletState {
    wallets: BTreeMap<Uuid, Wallet>,
    endpoints: BTreeMap<Uuid, WalletEndpoint>,
    next_positions: BTreeMap<Uuid, u32>,
    slices: Vec<WalletSlice>,
    claims: BTreeMap<Uuid, Claim>,
    certificates: BTreeMap<(String, Uuid), Certificate>,
    outbox: Vec<OutboxMessage>,
}

/// Units of work run one at a time against a private copy of the state, so
/// compare-and-set transitions observe every earlier commit.
#[derive(Clone, Default)]
pub struct InMemoryWalletStore {
    state: Arc<Mutex<WalletState>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }
}

#[async_trait]
impl WalletStore for InMemoryWalletStore {
    async fn begin(&self) -> Result<Box<dyn WalletUnitOfWork>, WalletError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(unavailable("wallet store is unavailable"));
        }
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryUnitOfWork { guard, working }))
    }
}

struct InMemoryUnitOfWork {
    guard: OwnedMutexGuard<WalletState>,
    working: WalletState,
}

impl InMemoryUnitOfWork {
    fn slice_mut(&mut self, slice_id: Uuid) -> Result<&mut WalletSlice, WalletError> {
        self.working
            .slices
            .iter_mut()
            .find(|slice| slice.id == slice_id)
            .ok_or_else(|| not_found(format!("slice '{slice_id}' not found")))
    }

    fn owner_of(&self, endpoint_id: Uuid) -> Option<&str> {
        self.working
            .endpoints
            .get(&endpoint_id)
            .map(|endpoint| endpoint.owner.as_str())
    }
}

impl WalletUnitOfWork for InMemoryUnitOfWork {
    fn get_wallet(&self, wallet_id: Uuid) -> Result<Wallet, WalletError> {
        self.working
            .wallets
            .get(&wallet_id)
            .cloned()
            .ok_or_else(|| not_found(format!("wallet '{wallet_id}' not found")))
    }

    fn insert_wallet(&mut self, wallet: Wallet) -> Result<(), WalletError> {
        if self.working.wallets.contains_key(&wallet.id) {
            return Err(conflict(format!("wallet '{}' already exists", wallet.id)));
        }
        self.working.wallets.insert(wallet.id, wallet);
        Ok(())
    }

    fn get_endpoint(&self, endpoint_id: Uuid) -> Result<WalletEndpoint, WalletError> {
        self.working
            .endpoints
            .get(&endpoint_id)
            .cloned()
            .ok_or_else(|| not_found(format!("wallet endpoint '{endpoint_id}' not found")))
    }

    fn insert_endpoint(&mut self, endpoint: WalletEndpoint) -> Result<(), WalletError> {
        if !self.working.wallets.contains_key(&endpoint.wallet_id) {
            return Err(not_found(format!(
                "wallet '{}' not found",
                endpoint.wallet_id
            )));
        }
        let taken = self.working.endpoints.values().any(|existing| {
            existing.id == endpoint.id
                || (existing.wallet_id == endpoint.wallet_id
                    && existing.position == endpoint.position)
        });
        if taken {
            return Err(conflict(format!(
                "endpoint '{}' or its position {} already exists",
                endpoint.id, endpoint.position
            )));
        }
        self.working.endpoints.insert(endpoint.id, endpoint);
        Ok(())
    }

    fn remainder_endpoint(&mut self, wallet_id: Uuid) -> Result<WalletEndpoint, WalletError> {
        let wallet = self.get_wallet(wallet_id)?;
        if let Some(existing) = self
            .working
            .endpoints
            .values()
            .find(|endpoint| endpoint.wallet_id == wallet_id && endpoint.is_remainder)
        {
            return Ok(existing.clone());
        }

        let position = self
            .working
            .endpoints
            .values()
            .filter(|endpoint| endpoint.wallet_id == wallet_id)
            .map(|endpoint| endpoint.position + 1)
            .max()
            .unwrap_or(0);
        let endpoint = WalletEndpoint {
            id: Uuid::now_v7(),
            wallet_id,
            owner: wallet.owner,
            position,
            is_remainder: true,
        };
        self.insert_endpoint(endpoint.clone())?;
        Ok(endpoint)
    }

    fn next_position(&mut self, endpoint_id: Uuid) -> Result<u32, WalletError> {
        self.get_endpoint(endpoint_id)?;
        let next = self.working.next_positions.entry(endpoint_id).or_insert(0);
        let position = *next;
        *next = next
            .checked_add(1)
            .ok_or_else(|| internal_error(format!("endpoint '{endpoint_id}' is out of positions")))?;
        Ok(position)
    }

    fn get_slice(&self, slice_id: Uuid) -> Result<WalletSlice, WalletError> {
        self.working
            .slices
            .iter()
            .find(|slice| slice.id == slice_id)
            .cloned()
            .ok_or_else(|| not_found(format!("slice '{slice_id}' not found")))
    }

    fn find_slice(
        &self,
        endpoint_id: Uuid,
        position: u32,
    ) -> Result<Option<WalletSlice>, WalletError> {
        Ok(self
            .working
            .slices
            .iter()
            .find(|slice| slice.endpoint_id == endpoint_id && slice.position == position)
            .cloned())
    }

    fn slices_by_certificate(
        &self,
        registry: &str,
        certificate_id: Uuid,
    ) -> Result<Vec<WalletSlice>, WalletError> {
        Ok(self
            .working
            .slices
            .iter()
            .filter(|slice| slice.registry == registry && slice.certificate_id == certificate_id)
            .cloned()
            .collect())
    }

    fn insert_slice(&mut self, slice: WalletSlice) -> Result<(), WalletError> {
        self.get_endpoint(slice.endpoint_id)?;
        let taken = self.working.slices.iter().any(|existing| {
            existing.id == slice.id
                || (existing.endpoint_id == slice.endpoint_id
                    && existing.position == slice.position)
        });
        if taken {
            return Err(conflict(format!(
                "slice '{}' or position {} on endpoint '{}' already exists",
                slice.id, slice.position, slice.endpoint_id
            )));
        }
        self.working.slices.push(slice);
        Ok(())
    }

    fn set_slice_state(
        &mut self,
        slice_id: Uuid,
        state: WalletSliceState,
    ) -> Result<(), WalletError> {
        self.slice_mut(slice_id)?.state = state;
        Ok(())
    }

    fn transition_slice_state(
        &mut self,
        slice_id: Uuid,
        expected: WalletSliceState,
        next: WalletSliceState,
    ) -> Result<(), WalletError> {
        let slice = self.slice_mut(slice_id)?;
        if slice.state != expected {
            return Err(conflict(format!(
                "slice '{slice_id}' is {:?}, expected {expected:?}",
                slice.state
            )));
        }
        slice.state = next;
        Ok(())
    }

    fn reserve_slices(
        &mut self,
        owner: &str,
        registry: &str,
        certificate_id: Uuid,
        quantity: u64,
    ) -> Result<Vec<WalletSlice>, WalletError> {
        let mut picked = Vec::new();
        let mut total: u64 = 0;
        for slice in &self.working.slices {
            if total >= quantity {
                break;
            }
            if slice.state == WalletSliceState::Available
                && slice.registry == registry
                && slice.certificate_id == certificate_id
                && self.owner_of(slice.endpoint_id) == Some(owner)
            {
                total = total.saturating_add(slice.quantity);
                picked.push(slice.id);
            }
        }
        if total < quantity {
            return Err(precondition_failed(format!(
                "only {total} of {quantity} available on certificate '{registry}/{certificate_id}'"
            )));
        }

        let mut reserved = Vec::with_capacity(picked.len());
        for slice_id in picked {
            self.transition_slice_state(
                slice_id,
                WalletSliceState::Available,
                WalletSliceState::Reserved,
            )?;
            reserved.push(self.get_slice(slice_id)?);
        }
        Ok(reserved)
    }

    fn insert_claim(&mut self, claim: Claim) -> Result<(), WalletError> {
        if self.working.claims.contains_key(&claim.id) {
            return Err(conflict(format!("claim '{}' already exists", claim.id)));
        }
        self.working.claims.insert(claim.id, claim);
        Ok(())
    }

    fn get_claim(&self, claim_id: Uuid) -> Result<Claim, WalletError> {
        self.working
            .claims
            .get(&claim_id)
            .cloned()
            .ok_or_else(|| not_found(format!("claim '{claim_id}' not found")))
    }

    fn set_claim_state(&mut self, claim_id: Uuid, state: ClaimState) -> Result<(), WalletError> {
        let claim = self
            .working
            .claims
            .get_mut(&claim_id)
            .ok_or_else(|| not_found(format!("claim '{claim_id}' not found")))?;
        claim.state = state;
        Ok(())
    }

    fn claims(&self) -> Result<Vec<Claim>, WalletError> {
        Ok(self.working.claims.values().cloned().collect())
    }

    fn get_certificate(
        &self,
        registry: &str,
        certificate_id: Uuid,
    ) -> Result<Option<Certificate>, WalletError> {
        Ok(self
            .working
            .certificates
            .get(&(registry.to_string(), certificate_id))
            .cloned())
    }

    fn insert_certificate(&mut self, certificate: Certificate) -> Result<(), WalletError> {
        let key = (certificate.registry.clone(), certificate.certificate_id);
        if self.working.certificates.contains_key(&key) {
            return Err(conflict(format!(
                "certificate '{}/{}' already exists",
                key.0, key.1
            )));
        }
        self.working.certificates.insert(key, certificate);
        Ok(())
    }

    fn certificates_ended_before(
        &self,
        cutoff: OffsetDateTime,
    ) -> Result<Vec<Certificate>, WalletError> {
        Ok(self
            .working
            .certificates
            .values()
            .filter(|certificate| certificate.end < cutoff)
            .cloned()
            .collect())
    }

    fn insert_outbox_message(&mut self, message: OutboxMessage) -> Result<(), WalletError> {
        self.working.outbox.push(message);
        Ok(())
    }

    fn outbox_messages(&self, limit: usize) -> Result<Vec<OutboxMessage>, WalletError> {
        Ok(self.working.outbox.iter().take(limit).cloned().collect())
    }

    fn delete_outbox_message(&mut self, message_id: Uuid) -> Result<(), WalletError> {
        self.working.outbox.retain(|message| message.id != message_id);
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<(), WalletError> {
        let InMemoryUnitOfWork { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
