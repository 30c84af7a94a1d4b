pub mod error;
pub mod events;
pub mod memory;
pub mod ports;
pub mod transaction;
pub mod types;

pub use error::{RegistryError, RegistryErrorKind};
pub use events::{
    AllocatedEvent, CertificatePeriod, ClaimedEvent, EventKind, EventRegistry, IssuedEvent,
    NewSlice, RegistryEvent, SlicedEvent, TransferredEvent,
};
pub use memory::InMemoryRegistry;
pub use ports::RegistryClient;
pub use transaction::build_transaction;
pub use types::{
    FederatedStreamId, GranularCertificateType, Transaction, TransactionHeader, TransactionId,
    TransactionStatus,
};
