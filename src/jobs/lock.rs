use std::{
    collections::HashSet,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;

use crate::wallet::{WalletError, error::internal_error};

/// Cross-replica mutual exclusion keyed by job identity. Acquisition never
/// waits: `false` means another holder is active.
#[async_trait]
pub trait AdvisoryLock: Send + Sync {
    async fn try_acquire(&self, key: &str) -> Result<bool, WalletError>;
    async fn release(&self, key: &str) -> Result<(), WalletError>;
}

#[derive(Default)]
pub struct InMemoryAdvisoryLock {
    held: Mutex<HashSet<String>>,
}

impl InMemoryAdvisoryLock {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashSet<String>>, WalletError> {
        self.held
            .lock()
            .map_err(|_| internal_error("advisory lock table poisoned"))
    }
}

#[async_trait]
impl AdvisoryLock for InMemoryAdvisoryLock {
    async fn try_acquire(&self, key: &str) -> Result<bool, WalletError> {
        Ok(self.lock()?.insert(key.to_string()))
    }

    async fn release(&self, key: &str) -> Result<(), WalletError> {
        self.lock()?.remove(key);
        Ok(())
    }
}
