pub mod error;
pub mod memory;
pub mod ports;
pub mod types;

pub use error::{WalletError, WalletErrorKind};
pub use memory::InMemoryWalletStore;
pub use ports::{WalletStore, WalletUnitOfWork};
pub use types::{
    Certificate, Claim, ClaimState, OutboxMessage, Wallet, WalletEndpoint, WalletSlice,
    WalletSliceState,
};
