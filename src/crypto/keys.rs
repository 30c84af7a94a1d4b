use std::fmt;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use hkdf::Hkdf;
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::crypto::error::{CryptoError, derivation_failed, invalid_input, verification_failed};

const DERIVATION_SALT: &[u8] = b"certificate-wallet:hd:v1";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRootKey([u8; 32]);

impl WalletRootKey {
    pub fn generate() -> Self {
        let mut bytes = [0_u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for WalletRootKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WalletRootKey(..)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        let verifying_key = VerifyingKey::from_bytes(&self.0)
            .map_err(|err| invalid_input(format!("invalid public key: {err}")))?;
        let signature_bytes: [u8; 64] = signature.try_into().map_err(|_| {
            invalid_input(format!(
                "signature must be 64 bytes, got {}",
                signature.len()
            ))
        })?;
        verifying_key
            .verify(message, &Signature::from_bytes(&signature_bytes))
            .map_err(|err| verification_failed(format!("signature does not verify: {err}")))
    }
}

impl From<&SigningKey> for PublicKey {
    fn from(key: &SigningKey) -> Self {
        Self(key.verifying_key().to_bytes())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Walks `path` from the wallet root, one HKDF expansion per level.
///
/// The same root and path always yield the same key.
pub fn derive_signing_key(root: &WalletRootKey, path: &[u32]) -> Result<SigningKey, CryptoError> {
    let mut current = root.0;
    for position in path {
        let hkdf = Hkdf::<Sha256>::new(Some(DERIVATION_SALT), &current);
        let mut child = [0_u8; 32];
        hkdf.expand(&position.to_be_bytes(), &mut child)
            .map_err(|err| derivation_failed(format!("hkdf expand failed at {position}: {err}")))?;
        current = child;
    }
    Ok(SigningKey::from_bytes(&current))
}

pub fn derive_public_key(root: &WalletRootKey, path: &[u32]) -> Result<PublicKey, CryptoError> {
    Ok(PublicKey::from(&derive_signing_key(root, path)?))
}

pub fn sign(key: &SigningKey, message: &[u8]) -> Vec<u8> {
    key.sign(message).to_bytes().to_vec()
}
