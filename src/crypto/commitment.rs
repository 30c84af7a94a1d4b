use std::fmt;

use curve25519_dalek::{
    constants::RISTRETTO_BASEPOINT_POINT,
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

use crate::crypto::error::{CryptoError, invalid_input, verification_failed};

const BLINDING_GENERATOR_DOMAIN: &[u8] = b"certificate-wallet:pedersen:blinding-generator:v1";
const EQUALITY_PROOF_DOMAIN: &[u8] = b"certificate-wallet:equality-proof:v1";
const EQUALITY_PROOF_LEN: usize = 64;

/// Compressed Ristretto encoding of `quantity * G + blinding * H`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commitment(pub [u8; 32]);

impl Commitment {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Content address of a slice on the registry.
    pub fn slice_hash(&self) -> SliceHash {
        let digest = Sha256::digest(self.0);
        let mut bytes = [0_u8; 32];
        bytes.copy_from_slice(&digest);
        SliceHash(bytes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SliceHash(pub [u8; 32]);

impl fmt::Display for SliceHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindingFactor(pub [u8; 32]);

impl fmt::Debug for BlindingFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BlindingFactor(..)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretCommitmentInfo {
    pub quantity: u64,
    pub blinding: BlindingFactor,
}

impl SecretCommitmentInfo {
    pub fn new(quantity: u64, blinding: BlindingFactor) -> Self {
        Self { quantity, blinding }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EqualityProof(pub Vec<u8>);

/// Hiding, additively homomorphic commitments over unsigned quantities.
///
/// `prove_sum_equality` shows that `commit(lhs)` equals the sum of the
/// commitments in `rhs` without revealing any quantity. A single-element
/// `rhs` is a plain equality proof.
pub trait CommitmentAlgebra: Send + Sync {
    fn random_blinding(&self) -> BlindingFactor;

    fn commit(&self, secret: &SecretCommitmentInfo) -> Result<Commitment, CryptoError>;

    fn add(&self, lhs: &Commitment, rhs: &Commitment) -> Result<Commitment, CryptoError>;

    fn prove_sum_equality(
        &self,
        lhs: &SecretCommitmentInfo,
        rhs: &[SecretCommitmentInfo],
        context: &[u8],
    ) -> Result<EqualityProof, CryptoError>;

    fn verify_sum_equality(
        &self,
        lhs: &Commitment,
        rhs: &[Commitment],
        proof: &EqualityProof,
        context: &[u8],
    ) -> Result<(), CryptoError>;
}

#[derive(Debug, Clone)]
pub struct PedersenCommitmentAlgebra {
    blinding_generator: RistrettoPoint,
}

impl PedersenCommitmentAlgebra {
    pub fn new() -> Self {
        Self {
            blinding_generator: RistrettoPoint::hash_from_bytes::<Sha512>(
                BLINDING_GENERATOR_DOMAIN,
            ),
        }
    }

    fn blinding_scalar(blinding: &BlindingFactor) -> Result<Scalar, CryptoError> {
        Option::from(Scalar::from_canonical_bytes(blinding.0))
            .ok_or_else(|| invalid_input("blinding factor is not a canonical scalar"))
    }

    fn point(commitment: &Commitment) -> Result<RistrettoPoint, CryptoError> {
        CompressedRistretto(commitment.0)
            .decompress()
            .ok_or_else(|| invalid_input("commitment is not a valid ristretto point"))
    }

    fn commit_point(&self, secret: &SecretCommitmentInfo) -> Result<RistrettoPoint, CryptoError> {
        let blinding = Self::blinding_scalar(&secret.blinding)?;
        Ok(Scalar::from(secret.quantity) * RISTRETTO_BASEPOINT_POINT
            + blinding * self.blinding_generator)
    }

    fn challenge(
        difference: &RistrettoPoint,
        nonce_point: &RistrettoPoint,
        context: &[u8],
    ) -> Scalar {
        let mut hasher = Sha512::new();
        hasher.update(EQUALITY_PROOF_DOMAIN);
        hasher.update(difference.compress().as_bytes());
        hasher.update(nonce_point.compress().as_bytes());
        hasher.update((context.len() as u64).to_be_bytes());
        hasher.update(context);
        Scalar::from_hash(hasher)
    }
}

impl Default for PedersenCommitmentAlgebra {
    fn default() -> Self {
        Self::new()
    }
}

impl CommitmentAlgebra for PedersenCommitmentAlgebra {
    fn random_blinding(&self) -> BlindingFactor {
        BlindingFactor(Scalar::random(&mut OsRng).to_bytes())
    }

    fn commit(&self, secret: &SecretCommitmentInfo) -> Result<Commitment, CryptoError> {
        Ok(Commitment(self.commit_point(secret)?.compress().to_bytes()))
    }

    fn add(&self, lhs: &Commitment, rhs: &Commitment) -> Result<Commitment, CryptoError> {
        let sum = Self::point(lhs)? + Self::point(rhs)?;
        Ok(Commitment(sum.compress().to_bytes()))
    }

    fn prove_sum_equality(
        &self,
        lhs: &SecretCommitmentInfo,
        rhs: &[SecretCommitmentInfo],
        context: &[u8],
    ) -> Result<EqualityProof, CryptoError> {
        if rhs.is_empty() {
            return Err(invalid_input(
                "equality proof needs at least one right-hand commitment",
            ));
        }

        let mut rhs_quantity = 0_u64;
        let mut rhs_blinding = Scalar::ZERO;
        for secret in rhs {
            rhs_quantity = rhs_quantity
                .checked_add(secret.quantity)
                .ok_or_else(|| invalid_input("right-hand quantities overflow u64"))?;
            rhs_blinding += Self::blinding_scalar(&secret.blinding)?;
        }
        if rhs_quantity != lhs.quantity {
            return Err(invalid_input(format!(
                "committed quantities differ: lhs={}, rhs={}",
                lhs.quantity, rhs_quantity
            )));
        }

        let witness = Self::blinding_scalar(&lhs.blinding)? - rhs_blinding;
        let difference = witness * self.blinding_generator;
        let nonce = Scalar::random(&mut OsRng);
        let nonce_point = nonce * self.blinding_generator;
        let challenge = Self::challenge(&difference, &nonce_point, context);
        let response = nonce + challenge * witness;

        let mut bytes = Vec::with_capacity(EQUALITY_PROOF_LEN);
        bytes.extend_from_slice(nonce_point.compress().as_bytes());
        bytes.extend_from_slice(response.as_bytes());
        Ok(EqualityProof(bytes))
    }

    fn verify_sum_equality(
        &self,
        lhs: &Commitment,
        rhs: &[Commitment],
        proof: &EqualityProof,
        context: &[u8],
    ) -> Result<(), CryptoError> {
        if proof.0.len() != EQUALITY_PROOF_LEN {
            return Err(invalid_input(format!(
                "equality proof must be {EQUALITY_PROOF_LEN} bytes, got {}",
                proof.0.len()
            )));
        }

        let mut difference = Self::point(lhs)?;
        for commitment in rhs {
            difference -= Self::point(commitment)?;
        }

        let mut nonce_bytes = [0_u8; 32];
        nonce_bytes.copy_from_slice(&proof.0[..32]);
        let mut response_bytes = [0_u8; 32];
        response_bytes.copy_from_slice(&proof.0[32..]);

        let nonce_point = CompressedRistretto(nonce_bytes)
            .decompress()
            .ok_or_else(|| invalid_input("equality proof nonce is not a valid point"))?;
        let response: Scalar = Option::from(Scalar::from_canonical_bytes(response_bytes))
            .ok_or_else(|| invalid_input("equality proof response is not a canonical scalar"))?;

        let challenge = Self::challenge(&difference, &nonce_point, context);
        if response * self.blinding_generator != nonce_point + challenge * difference {
            return Err(verification_failed("equality proof does not verify"));
        }

        Ok(())
    }
}
