use std::sync::Arc;

use uuid::Uuid;

use crate::{
    claims::{
        matcher::ClaimMatcher,
        types::{ClaimAccepted, ClaimCommand},
    },
    crypto::CommitmentAlgebra,
    process::RegistryProcessBuilder,
    registry::{EventRegistry, GranularCertificateType},
    saga::{SagaError, itinerary_message, precondition},
    wallet::{WalletStore, WalletUnitOfWork},
};

/// Turns a claim request into a queued saga inside one unit of work.
pub struct ClaimService {
    store: Arc<dyn WalletStore>,
    algebra: Arc<dyn CommitmentAlgebra>,
    events: Arc<EventRegistry>,
}

impl ClaimService {
    pub fn new(
        store: Arc<dyn WalletStore>,
        algebra: Arc<dyn CommitmentAlgebra>,
        events: Arc<EventRegistry>,
    ) -> Self {
        Self {
            store,
            algebra,
            events,
        }
    }

    #[tracing::instrument(
        name = "claim_command",
        target = "claims",
        skip(self, command),
        fields(request_id = %command.request_id, quantity = command.quantity)
    )]
    pub async fn handle(&self, command: &ClaimCommand) -> Result<ClaimAccepted, SagaError> {
        if command.quantity == 0 {
            return Err(precondition("claim quantity must be positive"));
        }

        let mut uow = self.store.begin().await?;
        ensure_certificate(
            uow.as_ref(),
            &command.production_registry,
            command.production_certificate_id,
            GranularCertificateType::Production,
        )?;
        ensure_certificate(
            uow.as_ref(),
            &command.consumption_registry,
            command.consumption_certificate_id,
            GranularCertificateType::Consumption,
        )?;

        let mut builder =
            RegistryProcessBuilder::new(self.algebra.as_ref(), self.events.as_ref(), uow.as_mut());
        let production = builder.reserve_slices(
            &command.owner,
            &command.production_registry,
            command.production_certificate_id,
            command.quantity,
        )?;
        let consumption = builder.reserve_slices(
            &command.owner,
            &command.consumption_registry,
            command.consumption_certificate_id,
            command.quantity,
        )?;
        let summary = ClaimMatcher::reconcile(&mut builder, production, consumption, command.quantity)?;
        let itinerary = builder.build();

        uow.insert_outbox_message(itinerary_message(&itinerary)?)?;
        uow.commit()?;

        tracing::info!(
            target: "claims",
            saga_id = %itinerary.id(),
            claims = summary.allocation_ids.len(),
            splits = summary.splits,
            activities = itinerary.activities().len(),
            "claim_accepted"
        );
        Ok(ClaimAccepted {
            request_id: command.request_id,
            saga_id: itinerary.id(),
            allocation_ids: summary.allocation_ids,
        })
    }
}

fn ensure_certificate(
    uow: &dyn WalletUnitOfWork,
    registry: &str,
    certificate_id: Uuid,
    expected: GranularCertificateType,
) -> Result<(), SagaError> {
    let certificate = uow
        .get_certificate(registry, certificate_id)?
        .ok_or_else(|| precondition(format!("certificate '{registry}/{certificate_id}' is unknown")))?;
    if certificate.certificate_type != expected {
        return Err(precondition(format!(
            "certificate '{registry}/{certificate_id}' is {:?}, expected {expected:?}",
            certificate.certificate_type
        )));
    }
    if certificate.withdrawn {
        return Err(precondition(format!(
            "certificate '{registry}/{certificate_id}' is withdrawn"
        )));
    }
    Ok(())
}
