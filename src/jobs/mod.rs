pub mod expiry;
pub mod lock;
pub mod outbox;
pub mod runner;

pub use expiry::CertificateExpiryJob;
pub use lock::{AdvisoryLock, InMemoryAdvisoryLock};
pub use outbox::OutboxWorker;
pub use runner::{PeriodicJob, PeriodicJobRunner, TickOutcome};
