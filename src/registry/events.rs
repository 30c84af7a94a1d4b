use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    crypto::{Commitment, EqualityProof, PublicKey, SliceHash},
    registry::{
        error::{RegistryError, decode_error, internal_error},
        types::{FederatedStreamId, GranularCertificateType},
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificatePeriod {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedEvent {
    pub certificate_id: FederatedStreamId,
    pub certificate_type: GranularCertificateType,
    pub quantity: Commitment,
    pub owner: PublicKey,
    pub grid_area: String,
    pub period: CertificatePeriod,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferredEvent {
    pub certificate_id: FederatedStreamId,
    pub source_slice_hash: SliceHash,
    pub new_owner: PublicKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatedEvent {
    pub allocation_id: Uuid,
    pub production_certificate_id: FederatedStreamId,
    pub consumption_certificate_id: FederatedStreamId,
    pub production_source_slice_hash: SliceHash,
    pub consumption_source_slice_hash: SliceHash,
    pub equality_proof: EqualityProof,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimedEvent {
    pub certificate_id: FederatedStreamId,
    pub allocation_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSlice {
    pub quantity: Commitment,
    pub new_owner: PublicKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlicedEvent {
    pub certificate_id: FederatedStreamId,
    pub source_slice_hash: SliceHash,
    pub new_slices: Vec<NewSlice>,
    pub sum_proof: EqualityProof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    Issued(IssuedEvent),
    Transferred(TransferredEvent),
    Allocated(AllocatedEvent),
    Claimed(ClaimedEvent),
    Sliced(SlicedEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Issued,
    Transferred,
    Allocated,
    Claimed,
    Sliced,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::Issued,
        EventKind::Transferred,
        EventKind::Allocated,
        EventKind::Claimed,
        EventKind::Sliced,
    ];

    pub fn payload_type(self) -> &'static str {
        match self {
            EventKind::Issued => "registry.v1.IssuedEvent",
            EventKind::Transferred => "registry.v1.TransferredEvent",
            EventKind::Allocated => "registry.v1.AllocatedEvent",
            EventKind::Claimed => "registry.v1.ClaimedEvent",
            EventKind::Sliced => "registry.v1.SlicedEvent",
        }
    }
}

impl RegistryEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            RegistryEvent::Issued(_) => EventKind::Issued,
            RegistryEvent::Transferred(_) => EventKind::Transferred,
            RegistryEvent::Allocated(_) => EventKind::Allocated,
            RegistryEvent::Claimed(_) => EventKind::Claimed,
            RegistryEvent::Sliced(_) => EventKind::Sliced,
        }
    }
}

/// Maps wire payload type names to the known event variants.
///
/// Built once at startup and shared; unknown payload types are rejected at
/// decode time instead of being looked up lazily.
#[derive(Debug, Clone)]
pub struct EventRegistry {
    by_payload_type: BTreeMap<&'static str, EventKind>,
}

impl EventRegistry {
    pub fn new() -> Self {
        let by_payload_type = EventKind::ALL
            .into_iter()
            .map(|kind| (kind.payload_type(), kind))
            .collect();
        Self { by_payload_type }
    }

    pub fn kind_of(&self, payload_type: &str) -> Option<EventKind> {
        self.by_payload_type.get(payload_type).copied()
    }

    pub fn encode(&self, event: &RegistryEvent) -> Result<(String, Vec<u8>), RegistryError> {
        let payload = match event {
            RegistryEvent::Issued(inner) => serde_json::to_vec(inner),
            RegistryEvent::Transferred(inner) => serde_json::to_vec(inner),
            RegistryEvent::Allocated(inner) => serde_json::to_vec(inner),
            RegistryEvent::Claimed(inner) => serde_json::to_vec(inner),
            RegistryEvent::Sliced(inner) => serde_json::to_vec(inner),
        }
        .map_err(|err| internal_error(format!("failed to encode {:?} event: {err}", event.kind())))?;

        Ok((event.kind().payload_type().to_string(), payload))
    }

    pub fn decode(&self, payload_type: &str, payload: &[u8]) -> Result<RegistryEvent, RegistryError> {
        let kind = self
            .kind_of(payload_type)
            .ok_or_else(|| decode_error(format!("unknown payload type '{payload_type}'")))?;

        Ok(match kind {
            EventKind::Issued => RegistryEvent::Issued(decode_payload(payload_type, payload)?),
            EventKind::Transferred => {
                RegistryEvent::Transferred(decode_payload(payload_type, payload)?)
            }
            EventKind::Allocated => {
                RegistryEvent::Allocated(decode_payload(payload_type, payload)?)
            }
            EventKind::Claimed => RegistryEvent::Claimed(decode_payload(payload_type, payload)?),
            EventKind::Sliced => RegistryEvent::Sliced(decode_payload(payload_type, payload)?),
        })
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_payload<T: DeserializeOwned>(payload_type: &str, payload: &[u8]) -> Result<T, RegistryError> {
    serde_json::from_slice(payload)
        .map_err(|err| decode_error(format!("failed to decode '{payload_type}' payload: {err}")))
}
