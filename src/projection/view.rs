use std::collections::BTreeMap;

use uuid::Uuid;

use crate::{
    crypto::{Commitment, PublicKey, SliceHash},
    registry::{CertificatePeriod, FederatedStreamId, GranularCertificateType},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateSlice {
    pub commitment: Commitment,
    pub owner: PublicKey,
}

/// Value parked between an `Allocated` and its `Claimed` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationSlice {
    pub commitment: Commitment,
    pub owner: PublicKey,
    pub allocation_id: Uuid,
    pub production_certificate_id: FederatedStreamId,
    pub consumption_certificate_id: FederatedStreamId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateView {
    pub certificate_id: FederatedStreamId,
    pub certificate_type: GranularCertificateType,
    pub grid_area: String,
    pub period: CertificatePeriod,
    pub attributes: BTreeMap<String, String>,
    pub(crate) available: BTreeMap<SliceHash, CertificateSlice>,
    pub(crate) allocations: BTreeMap<Uuid, AllocationSlice>,
    pub(crate) claims: BTreeMap<Uuid, AllocationSlice>,
}

impl CertificateView {
    pub fn get_certificate_slice(&self, hash: &SliceHash) -> Option<&CertificateSlice> {
        self.available.get(hash)
    }

    pub fn has_allocation(&self, allocation_id: &Uuid) -> bool {
        self.allocations.contains_key(allocation_id)
    }

    pub fn has_claim(&self, allocation_id: &Uuid) -> bool {
        self.claims.contains_key(allocation_id)
    }

    pub fn get_allocation(&self, allocation_id: &Uuid) -> Option<&AllocationSlice> {
        self.allocations.get(allocation_id)
    }

    pub fn available_slices(&self) -> impl Iterator<Item = (&SliceHash, &CertificateSlice)> {
        self.available.iter()
    }
}
