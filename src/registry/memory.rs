use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;

use crate::registry::{
    error::{RegistryError, internal_error, rejected, unavailable, unknown_registry},
    events::{EventRegistry, RegistryEvent},
    ports::RegistryClient,
    types::{FederatedStreamId, Transaction, TransactionId, TransactionStatus},
};

struct PendingTransaction {
    transaction: Transaction,
    polls_remaining: u32,
}

#[derive(Default)]
struct LedgerState {
    unavailable: bool,
    reject_reason: Option<String>,
    streams: BTreeMap<FederatedStreamId, Vec<Transaction>>,
    pending: BTreeMap<TransactionId, PendingTransaction>,
    statuses: BTreeMap<TransactionId, TransactionStatus>,
}

/// Append-only ledger kept in memory.
///
/// A submitted transaction stays `Pending` for `commit_after_polls` status
/// polls and is appended to its stream on the next one. Only transport-level
/// checks are applied: known registry, payload digest, decodable payload and
/// stream existence.
pub struct InMemoryRegistry {
    registries: BTreeSet<String>,
    events: Arc<EventRegistry>,
    commit_after_polls: u32,
    state: Mutex<LedgerState>,
}

impl InMemoryRegistry {
    pub fn new<I, S>(registries: I, events: Arc<EventRegistry>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            registries: registries.into_iter().map(Into::into).collect(),
            events,
            commit_after_polls: 0,
            state: Mutex::new(LedgerState::default()),
        }
    }

    pub fn with_commit_after_polls(mut self, polls: u32) -> Self {
        self.commit_after_polls = polls;
        self
    }

    pub fn set_available(&self, available: bool) -> Result<(), RegistryError> {
        self.lock()?.unavailable = !available;
        Ok(())
    }

    /// Every transaction settled while a reason is set ends up `Failed`.
    pub fn set_reject_reason(&self, reason: Option<String>) -> Result<(), RegistryError> {
        self.lock()?.reject_reason = reason;
        Ok(())
    }

    /// Settles every pending transaction without waiting for status polls.
    pub fn commit_pending(&self) -> Result<usize, RegistryError> {
        let mut state = self.lock()?;
        let ids: Vec<TransactionId> = state.pending.keys().cloned().collect();
        for id in &ids {
            settle(&mut state, id);
        }
        Ok(ids.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerState>, RegistryError> {
        self.state
            .lock()
            .map_err(|_| internal_error("in-memory registry lock poisoned"))
    }

    fn ensure_registry(&self, registry: &str) -> Result<(), RegistryError> {
        if self.registries.contains(registry) {
            Ok(())
        } else {
            Err(unknown_registry(registry))
        }
    }
}

fn settle(state: &mut LedgerState, transaction_id: &str) {
    let Some(pending) = state.pending.remove(transaction_id) else {
        return;
    };

    let status = match &state.reject_reason {
        Some(reason) => TransactionStatus::Failed {
            reason: reason.clone(),
        },
        None => {
            state
                .streams
                .entry(pending.transaction.header.federated_stream_id.clone())
                .or_default()
                .push(pending.transaction);
            TransactionStatus::Committed
        }
    };
    state.statuses.insert(transaction_id.to_string(), status);
}

#[async_trait]
impl RegistryClient for InMemoryRegistry {
    async fn send_transaction(
        &self,
        registry: &str,
        transaction: Transaction,
    ) -> Result<TransactionId, RegistryError> {
        self.ensure_registry(registry)?;
        if transaction.header.federated_stream_id.registry != registry {
            return Err(rejected(format!(
                "transaction for '{}' submitted to registry '{registry}'",
                transaction.header.federated_stream_id
            )));
        }
        transaction.verify_payload_digest()?;
        let event = transaction
            .decode_event(&self.events)
            .map_err(|err| rejected(err.message))?;
        let transaction_id = transaction.id()?;

        let mut state = self.lock()?;
        if state.unavailable {
            return Err(unavailable(format!("registry '{registry}' is unavailable")));
        }
        if state.pending.contains_key(&transaction_id)
            || state.statuses.contains_key(&transaction_id)
        {
            return Ok(transaction_id);
        }

        let stream = &transaction.header.federated_stream_id;
        let stream_exists = state.streams.contains_key(stream);
        match event {
            RegistryEvent::Issued(_) if stream_exists => {
                return Err(rejected(format!("certificate '{stream}' is already issued")));
            }
            RegistryEvent::Issued(_) => {}
            _ if !stream_exists => {
                return Err(rejected(format!("certificate '{stream}' does not exist")));
            }
            _ => {}
        }

        state.pending.insert(
            transaction_id.clone(),
            PendingTransaction {
                transaction,
                polls_remaining: self.commit_after_polls,
            },
        );
        state
            .statuses
            .insert(transaction_id.clone(), TransactionStatus::Pending);
        Ok(transaction_id)
    }

    async fn transaction_status(
        &self,
        registry: &str,
        transaction_id: &str,
    ) -> Result<TransactionStatus, RegistryError> {
        self.ensure_registry(registry)?;
        let mut state = self.lock()?;
        if state.unavailable {
            return Err(unavailable(format!("registry '{registry}' is unavailable")));
        }

        if let Some(pending) = state.pending.get_mut(transaction_id) {
            if pending.polls_remaining > 0 {
                pending.polls_remaining -= 1;
                return Ok(TransactionStatus::Pending);
            }
            settle(&mut state, transaction_id);
        }

        Ok(state
            .statuses
            .get(transaction_id)
            .cloned()
            .unwrap_or(TransactionStatus::Unknown))
    }

    async fn stream_transactions(
        &self,
        stream: &FederatedStreamId,
    ) -> Result<Option<Vec<Transaction>>, RegistryError> {
        self.ensure_registry(&stream.registry)?;
        let state = self.lock()?;
        if state.unavailable {
            return Err(unavailable(format!(
                "registry '{}' is unavailable",
                stream.registry
            )));
        }
        Ok(state.streams.get(stream).cloned())
    }
}
