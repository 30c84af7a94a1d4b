use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    registry::{Transaction, TransactionId},
    saga::error::SagaError,
    wallet::{ClaimState, WalletSliceState},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendTransactionArguments {
    pub registry: String,
    pub transaction: Transaction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitForCommitArguments {
    pub registry: String,
    pub transaction_id: TransactionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSliceStatesArguments {
    pub slice_states: BTreeMap<Uuid, WalletSliceState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateClaimStateArguments {
    pub allocation_id: Uuid,
    pub state: ClaimState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "activity", content = "arguments", rename_all = "snake_case")]
pub enum Activity {
    SendTransaction(SendTransactionArguments),
    WaitForCommit(WaitForCommitArguments),
    UpdateSliceStates(UpdateSliceStatesArguments),
    UpdateClaimState(UpdateClaimStateArguments),
}

impl Activity {
    pub fn name(&self) -> &'static str {
        match self {
            Activity::SendTransaction(_) => "send_transaction",
            Activity::WaitForCommit(_) => "wait_for_commit",
            Activity::UpdateSliceStates(_) => "update_slice_states",
            Activity::UpdateClaimState(_) => "update_claim_state",
        }
    }
}

/// Ordered activities of one saga. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Itinerary {
    id: Uuid,
    activities: Vec<Activity>,
}

impl Itinerary {
    pub(crate) fn new(id: Uuid, activities: Vec<Activity>) -> Self {
        Self { id, activities }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn activity_names(&self) -> Vec<&'static str> {
        self.activities.iter().map(Activity::name).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SagaOutcome {
    Completed,
    Faulted {
        activity_index: usize,
        activity: &'static str,
        error: SagaError,
    },
    Cancelled,
}
