use std::{collections::BTreeMap, sync::Arc};

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{
    crypto::{
        BlindingFactor, CommitmentAlgebra, PedersenCommitmentAlgebra, SecretCommitmentInfo,
        WalletRootKey, derive_public_key, derive_signing_key,
    },
    projection::CertificateProjector,
    registry::{
        CertificatePeriod, EventRegistry, FederatedStreamId, GranularCertificateType,
        InMemoryRegistry, IssuedEvent, NewSlice, RegistryClient, RegistryEvent, SlicedEvent,
        build_transaction,
    },
    saga::{RegistryActivityExecutor, SagaError, fatal},
    wallet::{
        Certificate, Claim, InMemoryWalletStore, Wallet, WalletEndpoint, WalletSlice,
        WalletSliceState, WalletStore,
    },
};

pub const REGISTRY: &str = "narnia";
pub const OTHER_REGISTRY: &str = "brakebills";
pub const OWNER: &str = "alice";

#[derive(Debug, Clone)]
pub struct IssuedSlice {
    pub position: u32,
    pub quantity: u64,
    pub blinding: BlindingFactor,
}

#[derive(Debug, Clone)]
pub struct LedgerIssuance {
    pub stream: FederatedStreamId,
    pub period: CertificatePeriod,
    pub slices: Vec<IssuedSlice>,
}

#[derive(Debug, Clone)]
pub struct IssuedCertificate {
    pub stream: FederatedStreamId,
    pub slices: Vec<WalletSlice>,
}

/// One wallet with a single deposit endpoint, backed by in-memory adapters.
pub struct WalletFixture {
    pub store: Arc<InMemoryWalletStore>,
    pub registry: Arc<InMemoryRegistry>,
    pub algebra: Arc<PedersenCommitmentAlgebra>,
    pub events: Arc<EventRegistry>,
    pub wallet: Wallet,
    pub endpoint: WalletEndpoint,
}

impl WalletFixture {
    pub async fn new() -> Result<Self, SagaError> {
        Self::with_commit_after_polls(0).await
    }

    /// Registry transactions stay pending for `polls` status checks.
    pub async fn with_commit_after_polls(polls: u32) -> Result<Self, SagaError> {
        let events = Arc::new(EventRegistry::new());
        let registry = Arc::new(
            InMemoryRegistry::new([REGISTRY, OTHER_REGISTRY], Arc::clone(&events))
                .with_commit_after_polls(polls),
        );
        let store = Arc::new(InMemoryWalletStore::new());

        let wallet = Wallet {
            id: Uuid::now_v7(),
            owner: OWNER.to_string(),
            root_key: WalletRootKey::generate(),
        };
        let endpoint = WalletEndpoint {
            id: Uuid::now_v7(),
            wallet_id: wallet.id,
            owner: OWNER.to_string(),
            position: 0,
            is_remainder: false,
        };
        let mut uow = store.begin().await?;
        uow.insert_wallet(wallet.clone())?;
        uow.insert_endpoint(endpoint.clone())?;
        uow.commit()?;

        Ok(Self {
            store,
            registry,
            algebra: Arc::new(PedersenCommitmentAlgebra::new()),
            events,
            wallet,
            endpoint,
        })
    }

    pub fn projector(&self) -> CertificateProjector {
        CertificateProjector::new(Arc::clone(&self.events))
    }

    pub fn executor(&self) -> RegistryActivityExecutor {
        RegistryActivityExecutor::new(self.registry.clone(), self.store.clone())
    }

    pub fn default_period() -> CertificatePeriod {
        let end = OffsetDateTime::now_utc() - Duration::hours(1);
        CertificatePeriod {
            start: end - Duration::hours(1),
            end,
        }
    }

    /// Issues a certificate whose value ends up in one committed slice per
    /// entry of `quantities`, and records it locally as `Available`.
    pub async fn issue_certificate(
        &self,
        registry: &str,
        certificate_type: GranularCertificateType,
        quantities: &[u64],
    ) -> Result<IssuedCertificate, SagaError> {
        self.issue_certificate_with_period(
            registry,
            certificate_type,
            quantities,
            Self::default_period(),
        )
        .await
    }

    pub async fn issue_certificate_with_period(
        &self,
        registry: &str,
        certificate_type: GranularCertificateType,
        quantities: &[u64],
        period: CertificatePeriod,
    ) -> Result<IssuedCertificate, SagaError> {
        let issuance = self
            .issue_on_ledger(registry, certificate_type, quantities, period)
            .await?;

        let mut uow = self.store.begin().await?;
        uow.insert_certificate(Certificate {
            registry: registry.to_string(),
            certificate_id: issuance.stream.stream_id,
            certificate_type,
            grid_area: "DK1".to_string(),
            start: issuance.period.start,
            end: issuance.period.end,
            withdrawn: false,
        })?;
        let mut slices = Vec::with_capacity(issuance.slices.len());
        for issued in issuance.slices {
            let slice = WalletSlice {
                id: Uuid::now_v7(),
                endpoint_id: self.endpoint.id,
                position: issued.position,
                registry: registry.to_string(),
                certificate_id: issuance.stream.stream_id,
                quantity: issued.quantity,
                blinding: issued.blinding,
                state: WalletSliceState::Available,
            };
            uow.insert_slice(slice.clone())?;
            slices.push(slice);
        }
        uow.commit()?;

        Ok(IssuedCertificate {
            stream: issuance.stream,
            slices,
        })
    }

    /// Puts a certificate on the ledger owned by this wallet's endpoint
    /// without telling the local store about it.
    pub async fn issue_on_ledger(
        &self,
        registry: &str,
        certificate_type: GranularCertificateType,
        quantities: &[u64],
        period: CertificatePeriod,
    ) -> Result<LedgerIssuance, SagaError> {
        if quantities.is_empty() {
            return Err(fatal("at least one slice quantity is required"));
        }
        let stream = FederatedStreamId::new(registry, Uuid::new_v4());
        let mut uow = self.store.begin().await?;

        let total: u64 = quantities.iter().sum();
        let issued = IssuedSlice {
            position: uow.next_position(self.endpoint.id)?,
            quantity: total,
            blinding: self.algebra.random_blinding(),
        };
        let mut slices = Vec::with_capacity(quantities.len());
        if quantities.len() > 1 {
            for quantity in quantities {
                slices.push(IssuedSlice {
                    position: uow.next_position(self.endpoint.id)?,
                    quantity: *quantity,
                    blinding: self.algebra.random_blinding(),
                });
            }
        }
        uow.commit()?;

        let issued_secret = SecretCommitmentInfo::new(issued.quantity, issued.blinding.clone());
        let issued_commitment = self.algebra.commit(&issued_secret)?;
        let issuer_key = derive_signing_key(
            &self.wallet.root_key,
            &[self.endpoint.position, issued.position],
        )?;
        let event = RegistryEvent::Issued(IssuedEvent {
            certificate_id: stream.clone(),
            certificate_type,
            quantity: issued_commitment,
            owner: derive_public_key(
                &self.wallet.root_key,
                &[self.endpoint.position, issued.position],
            )?,
            grid_area: "DK1".to_string(),
            period: period.clone(),
            attributes: BTreeMap::from([("fuel".to_string(), "wind".to_string())]),
        });
        self.submit(&stream, &event, &issuer_key).await?;

        if slices.is_empty() {
            return Ok(LedgerIssuance {
                stream,
                period,
                slices: vec![issued],
            });
        }

        let secrets: Vec<SecretCommitmentInfo> = slices
            .iter()
            .map(|slice| SecretCommitmentInfo::new(slice.quantity, slice.blinding.clone()))
            .collect();
        let mut new_slices = Vec::with_capacity(slices.len());
        for (slice, secret) in slices.iter().zip(&secrets) {
            new_slices.push(NewSlice {
                quantity: self.algebra.commit(secret)?,
                new_owner: derive_public_key(
                    &self.wallet.root_key,
                    &[self.endpoint.position, slice.position],
                )?,
            });
        }
        let source_slice_hash = issued_commitment.slice_hash();
        let sum_proof =
            self.algebra
                .prove_sum_equality(&issued_secret, &secrets, &source_slice_hash.0)?;
        let event = RegistryEvent::Sliced(SlicedEvent {
            certificate_id: stream.clone(),
            source_slice_hash,
            new_slices,
            sum_proof,
        });
        self.submit(&stream, &event, &issuer_key).await?;

        Ok(LedgerIssuance {
            stream,
            period,
            slices,
        })
    }

    pub async fn slice(&self, slice_id: Uuid) -> Result<WalletSlice, SagaError> {
        Ok(self.store.begin().await?.get_slice(slice_id)?)
    }

    pub async fn slices_of(&self, stream: &FederatedStreamId) -> Result<Vec<WalletSlice>, SagaError> {
        Ok(self
            .store
            .begin()
            .await?
            .slices_by_certificate(&stream.registry, stream.stream_id)?)
    }

    pub async fn claims(&self) -> Result<Vec<Claim>, SagaError> {
        Ok(self.store.begin().await?.claims()?)
    }

    async fn submit(
        &self,
        stream: &FederatedStreamId,
        event: &RegistryEvent,
        key: &crate::crypto::SigningKey,
    ) -> Result<(), SagaError> {
        let transaction = build_transaction(&self.events, stream, event, key)?;
        self.registry
            .send_transaction(&stream.registry, transaction)
            .await?;
        self.registry.commit_pending()?;
        Ok(())
    }
}
