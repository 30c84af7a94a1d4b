use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    jobs::runner::PeriodicJob,
    saga::SagaError,
    wallet::{WalletSliceState, WalletStore},
};

/// Retires unspent slices of certificates whose production period ended too
/// long ago to be claimed.
pub struct CertificateExpiryJob {
    store: Arc<dyn WalletStore>,
    expire_after: time::Duration,
}

impl CertificateExpiryJob {
    pub fn new(store: Arc<dyn WalletStore>, expire_after_days: u32) -> Self {
        Self {
            store,
            expire_after: time::Duration::days(i64::from(expire_after_days)),
        }
    }

    /// Returns how many slices were expired.
    pub async fn run_at(&self, now: OffsetDateTime) -> Result<usize, SagaError> {
        let cutoff = now - self.expire_after;
        let mut uow = self.store.begin().await?;
        let mut expired = 0;
        for certificate in uow.certificates_ended_before(cutoff)? {
            for slice in uow.slices_by_certificate(&certificate.registry, certificate.certificate_id)? {
                if slice.state == WalletSliceState::Available {
                    uow.transition_slice_state(
                        slice.id,
                        WalletSliceState::Available,
                        WalletSliceState::Expired,
                    )?;
                    expired += 1;
                }
            }
        }
        uow.commit()?;

        if expired > 0 {
            tracing::info!(target: "jobs", expired = expired, cutoff = %cutoff, "slices_expired");
        }
        Ok(expired)
    }
}

#[async_trait]
impl PeriodicJob for CertificateExpiryJob {
    fn name(&self) -> &'static str {
        "certificate_expiry"
    }

    async fn run_once(&self) -> Result<(), SagaError> {
        self.run_at(OffsetDateTime::now_utc()).await.map(|_| ())
    }
}
