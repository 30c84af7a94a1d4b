use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    crypto::{BlindingFactor, SecretCommitmentInfo, WalletRootKey},
    registry::{FederatedStreamId, GranularCertificateType},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletSliceState {
    Available,
    Registering,
    Slicing,
    Reserved,
    Sliced,
    Claimed,
    Expired,
}

impl WalletSliceState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WalletSliceState::Sliced | WalletSliceState::Claimed | WalletSliceState::Expired
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSlice {
    pub id: Uuid,
    pub endpoint_id: Uuid,
    pub position: u32,
    pub registry: String,
    pub certificate_id: Uuid,
    pub quantity: u64,
    pub blinding: BlindingFactor,
    pub state: WalletSliceState,
}

impl WalletSlice {
    pub fn federated_stream_id(&self) -> FederatedStreamId {
        FederatedStreamId::new(self.registry.clone(), self.certificate_id)
    }

    pub fn secret(&self) -> SecretCommitmentInfo {
        SecretCommitmentInfo::new(self.quantity, self.blinding.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimState {
    Created,
    Claimed,
}

/// Keyed by the allocation id it was registered under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub id: Uuid,
    pub production_slice_id: Uuid,
    pub consumption_slice_id: Uuid,
    pub state: ClaimState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wallet {
    pub id: Uuid,
    pub owner: String,
    pub root_key: WalletRootKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletEndpoint {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub owner: String,
    pub position: u32,
    pub is_remainder: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    pub registry: String,
    pub certificate_id: Uuid,
    pub certificate_type: GranularCertificateType,
    pub grid_area: String,
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
    pub withdrawn: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxMessage {
    pub id: Uuid,
    pub message_type: String,
    pub payload: String,
    pub created_at: OffsetDateTime,
}
