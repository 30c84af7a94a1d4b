use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TransactionId = String;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FederatedStreamId {
    pub registry: String,
    pub stream_id: Uuid,
}

impl FederatedStreamId {
    pub fn new(registry: impl Into<String>, stream_id: Uuid) -> Self {
        Self {
            registry: registry.into(),
            stream_id,
        }
    }
}

impl fmt::Display for FederatedStreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.registry, self.stream_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GranularCertificateType {
    Production,
    Consumption,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionHeader {
    pub federated_stream_id: FederatedStreamId,
    pub payload_type: String,
    pub payload_sha512: Vec<u8>,
    pub nonce: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub header: TransactionHeader,
    pub header_signature: Vec<u8>,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransactionStatus {
    Unknown,
    Pending,
    Committed,
    Failed { reason: String },
}
