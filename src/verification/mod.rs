use std::sync::Arc;

use uuid::Uuid;

use crate::{
    crypto::{BlindingFactor, CommitmentAlgebra, SecretCommitmentInfo, derive_public_key},
    projection::{
        CertificateFetchFailure, CertificateProjector, GetCertificateResult, get_certificate,
    },
    registry::{FederatedStreamId, RegistryClient},
    saga::{SagaError, fatal, precondition, transient},
    wallet::{Certificate, WalletSlice, WalletSliceState, WalletStore},
};

/// Secret material of a slice someone sent to one of our endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedSlice {
    pub endpoint_id: Uuid,
    pub registry: String,
    pub certificate_id: Uuid,
    pub quantity: u64,
    pub blinding: BlindingFactor,
    pub position: u32,
}

/// Accepts a received slice only once the ledger shows it, unspent and owned
/// by the key derived for the receiving endpoint and position.
pub struct SliceReceiver {
    registry: Arc<dyn RegistryClient>,
    store: Arc<dyn WalletStore>,
    algebra: Arc<dyn CommitmentAlgebra>,
    projector: CertificateProjector,
}

impl SliceReceiver {
    pub fn new(
        registry: Arc<dyn RegistryClient>,
        store: Arc<dyn WalletStore>,
        algebra: Arc<dyn CommitmentAlgebra>,
        projector: CertificateProjector,
    ) -> Self {
        Self {
            registry,
            store,
            algebra,
            projector,
        }
    }

    #[tracing::instrument(
        name = "receive_slice",
        target = "verification",
        skip(self, received),
        fields(
            endpoint_id = %received.endpoint_id,
            registry = %received.registry,
            certificate_id = %received.certificate_id,
            position = received.position
        )
    )]
    pub async fn receive(&self, received: &ReceivedSlice) -> Result<WalletSlice, SagaError> {
        let commitment = self.algebra.commit(&SecretCommitmentInfo::new(
            received.quantity,
            received.blinding.clone(),
        ))?;
        let slice_hash = commitment.slice_hash();
        let stream = FederatedStreamId::new(received.registry.clone(), received.certificate_id);

        let view = match get_certificate(self.registry.as_ref(), &self.projector, &stream).await {
            GetCertificateResult::Success(view) => view,
            GetCertificateResult::NotFound => {
                return Err(precondition(format!("certificate '{stream}' not found")));
            }
            GetCertificateResult::TransientFailure(err) => {
                return Err(transient(format!(
                    "certificate '{stream}' is temporarily unavailable: {err}"
                )));
            }
            GetCertificateResult::Failure(CertificateFetchFailure::Registry(err)) => {
                return Err(fatal(format!("failed to fetch certificate '{stream}': {err}")));
            }
            GetCertificateResult::Failure(CertificateFetchFailure::Projection(err)) => {
                return Err(err.into());
            }
        };

        let mut uow = self.store.begin().await?;
        if let Some(existing) = uow.find_slice(received.endpoint_id, received.position)? {
            if existing.quantity == received.quantity && existing.blinding == received.blinding {
                tracing::debug!(
                    target: "verification",
                    slice_id = %existing.id,
                    "slice_already_received"
                );
                return Ok(existing);
            }
            return Err(precondition(format!(
                "position {} on endpoint '{}' already holds another slice",
                received.position, received.endpoint_id
            )));
        }

        let endpoint = uow.get_endpoint(received.endpoint_id)?;
        let wallet = uow.get_wallet(endpoint.wallet_id)?;
        let expected_owner =
            derive_public_key(&wallet.root_key, &[endpoint.position, received.position])?;

        let certificate_slice = view.get_certificate_slice(&slice_hash).ok_or_else(|| {
            precondition(format!(
                "slice '{slice_hash}' is not available on certificate '{stream}'"
            ))
        })?;
        if certificate_slice.owner != expected_owner {
            return Err(precondition(format!(
                "slice '{slice_hash}' is owned by '{}', not by the receiving endpoint",
                certificate_slice.owner
            )));
        }

        if uow
            .get_certificate(&received.registry, received.certificate_id)?
            .is_none()
        {
            uow.insert_certificate(Certificate {
                registry: received.registry.clone(),
                certificate_id: received.certificate_id,
                certificate_type: view.certificate_type,
                grid_area: view.grid_area.clone(),
                start: view.period.start,
                end: view.period.end,
                withdrawn: false,
            })?;
        }

        let slice = WalletSlice {
            id: Uuid::now_v7(),
            endpoint_id: received.endpoint_id,
            position: received.position,
            registry: received.registry.clone(),
            certificate_id: received.certificate_id,
            quantity: received.quantity,
            blinding: received.blinding.clone(),
            state: WalletSliceState::Available,
        };
        uow.insert_slice(slice.clone())?;
        uow.commit()?;

        tracing::info!(
            target: "verification",
            slice_id = %slice.id,
            slice_hash = %slice_hash,
            "slice_received"
        );
        Ok(slice)
    }
}
