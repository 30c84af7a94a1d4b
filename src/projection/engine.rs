use std::{collections::BTreeMap, sync::Arc};

use crate::{
    crypto::SliceHash,
    projection::{
        error::ProjectionError,
        view::{AllocationSlice, CertificateSlice, CertificateView},
    },
    registry::{
        AllocatedEvent, ClaimedEvent, EventRegistry, GranularCertificateType, RegistryEvent,
        SlicedEvent, Transaction, TransferredEvent,
    },
};

/// Rebuilds slice ownership of one certificate purely from its ordered log.
#[derive(Debug, Clone)]
pub struct CertificateProjector {
    events: Arc<EventRegistry>,
}

impl CertificateProjector {
    pub fn new(events: Arc<EventRegistry>) -> Self {
        Self { events }
    }

    pub fn project(&self, transactions: &[Transaction]) -> Result<CertificateView, ProjectionError> {
        let Some((first, rest)) = transactions.split_first() else {
            return Err(ProjectionError::new("-", "transaction log is empty"));
        };
        let stream = first.header.federated_stream_id.to_string();

        let issued = match first.decode_event(&self.events) {
            Ok(RegistryEvent::Issued(issued)) => issued,
            Ok(other) => {
                return Err(ProjectionError::new(
                    stream,
                    format!("first event must be Issued, got {:?}", other.kind()),
                ));
            }
            Err(err) => return Err(ProjectionError::new(stream, err.message)),
        };

        let mut view = CertificateView {
            certificate_id: issued.certificate_id,
            certificate_type: issued.certificate_type,
            grid_area: issued.grid_area,
            period: issued.period,
            attributes: issued.attributes,
            available: BTreeMap::new(),
            allocations: BTreeMap::new(),
            claims: BTreeMap::new(),
        };
        view.available.insert(
            issued.quantity.slice_hash(),
            CertificateSlice {
                commitment: issued.quantity,
                owner: issued.owner,
            },
        );

        for transaction in rest {
            let event = transaction
                .decode_event(&self.events)
                .map_err(|err| ProjectionError::new(&stream, err.message))?;
            match event {
                RegistryEvent::Issued(_) => {
                    return Err(ProjectionError::new(&stream, "certificate issued twice"));
                }
                RegistryEvent::Transferred(event) => apply_transferred(&mut view, event),
                RegistryEvent::Allocated(event) => apply_allocated(&mut view, event),
                RegistryEvent::Claimed(event) => apply_claimed(&mut view, event),
                RegistryEvent::Sliced(event) => apply_sliced(&mut view, event),
            }
            .map_err(|message| ProjectionError::new(&stream, message))?;
        }

        tracing::debug!(
            target: "projection",
            stream = %stream,
            transactions = transactions.len(),
            available = view.available.len(),
            allocations = view.allocations.len(),
            claims = view.claims.len(),
            "certificate_projected"
        );
        Ok(view)
    }
}

fn take_slice(view: &mut CertificateView, hash: &SliceHash) -> Result<CertificateSlice, String> {
    view.available
        .remove(hash)
        .ok_or_else(|| format!("slice '{hash}' is not available on the certificate"))
}

fn apply_transferred(view: &mut CertificateView, event: TransferredEvent) -> Result<(), String> {
    let slice = take_slice(view, &event.source_slice_hash)?;
    view.available.insert(
        slice.commitment.slice_hash(),
        CertificateSlice {
            commitment: slice.commitment,
            owner: event.new_owner,
        },
    );
    Ok(())
}

fn apply_allocated(view: &mut CertificateView, event: AllocatedEvent) -> Result<(), String> {
    let source_hash = match view.certificate_type {
        GranularCertificateType::Production => &event.production_source_slice_hash,
        GranularCertificateType::Consumption => &event.consumption_source_slice_hash,
    };
    let slice = take_slice(view, source_hash)?;
    view.allocations.insert(
        event.allocation_id,
        AllocationSlice {
            commitment: slice.commitment,
            owner: slice.owner,
            allocation_id: event.allocation_id,
            production_certificate_id: event.production_certificate_id,
            consumption_certificate_id: event.consumption_certificate_id,
        },
    );
    Ok(())
}

fn apply_claimed(view: &mut CertificateView, event: ClaimedEvent) -> Result<(), String> {
    let allocation = view
        .allocations
        .remove(&event.allocation_id)
        .ok_or_else(|| format!("allocation '{}' is unknown", event.allocation_id))?;
    view.claims.insert(event.allocation_id, allocation);
    Ok(())
}

fn apply_sliced(view: &mut CertificateView, event: SlicedEvent) -> Result<(), String> {
    take_slice(view, &event.source_slice_hash)?;
    for new_slice in event.new_slices {
        view.available.insert(
            new_slice.quantity.slice_hash(),
            CertificateSlice {
                commitment: new_slice.quantity,
                owner: new_slice.new_owner,
            },
        );
    }
    Ok(())
}
