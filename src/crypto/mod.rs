pub mod commitment;
pub mod error;
pub mod keys;

pub use commitment::{
    BlindingFactor, Commitment, CommitmentAlgebra, EqualityProof, PedersenCommitmentAlgebra,
    SecretCommitmentInfo, SliceHash,
};
pub use error::{CryptoError, CryptoErrorKind};
pub use keys::{PublicKey, WalletRootKey, derive_public_key, derive_signing_key, sign};
pub use ed25519_dalek::SigningKey;
