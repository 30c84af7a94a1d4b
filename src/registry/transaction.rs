use sha2::{Digest, Sha256, Sha512};
use uuid::Uuid;

use crate::{
    crypto::{PublicKey, SigningKey, sign},
    registry::{
        error::{RegistryError, internal_error, rejected},
        events::{EventRegistry, RegistryEvent},
        types::{FederatedStreamId, Transaction, TransactionHeader, TransactionId},
    },
};

/// Encodes `event`, binds the payload digest into a fresh header and signs the
/// header with `key`.
pub fn build_transaction(
    events: &EventRegistry,
    stream: &FederatedStreamId,
    event: &RegistryEvent,
    key: &SigningKey,
) -> Result<Transaction, RegistryError> {
    let (payload_type, payload) = events.encode(event)?;
    let header = TransactionHeader {
        federated_stream_id: stream.clone(),
        payload_type,
        payload_sha512: Sha512::digest(&payload).to_vec(),
        nonce: Uuid::new_v4().to_string(),
    };
    let header_signature = sign(key, &header_bytes(&header)?);

    Ok(Transaction {
        header,
        header_signature,
        payload,
    })
}

pub fn header_bytes(header: &TransactionHeader) -> Result<Vec<u8>, RegistryError> {
    serde_json::to_vec(header)
        .map_err(|err| internal_error(format!("failed to encode transaction header: {err}")))
}

impl Transaction {
    pub fn id(&self) -> Result<TransactionId, RegistryError> {
        let mut hasher = Sha256::new();
        hasher.update(header_bytes(&self.header)?);
        hasher.update(&self.header_signature);
        Ok(hex::encode(hasher.finalize()))
    }

    pub fn verify_payload_digest(&self) -> Result<(), RegistryError> {
        if Sha512::digest(&self.payload).as_slice() != self.header.payload_sha512.as_slice() {
            return Err(rejected("payload digest does not match transaction header"));
        }
        Ok(())
    }

    pub fn verify_signature(&self, signer: &PublicKey) -> Result<(), RegistryError> {
        signer
            .verify(&header_bytes(&self.header)?, &self.header_signature)
            .map_err(|err| rejected(format!("header signature rejected: {err}")))
    }

    pub fn decode_event(&self, events: &EventRegistry) -> Result<RegistryEvent, RegistryError> {
        events.decode(&self.header.payload_type, &self.payload)
    }
}
