use std::collections::{BTreeMap, HashSet};

use uuid::Uuid;

use crate::{
    crypto::{
        CommitmentAlgebra, PublicKey, SigningKey, derive_public_key, derive_signing_key,
    },
    registry::{
        AllocatedEvent, ClaimedEvent, EventRegistry, FederatedStreamId, GranularCertificateType,
        NewSlice, RegistryEvent, SlicedEvent, build_transaction,
    },
    saga::{
        Activity, Itinerary, SagaError, SendTransactionArguments, UpdateClaimStateArguments,
        UpdateSliceStatesArguments, WaitForCommitArguments, precondition,
    },
    wallet::{Claim, ClaimState, WalletSlice, WalletSliceState, WalletUnitOfWork},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Split {
        source: Uuid,
        quantity: u64,
        quantity_slice: Uuid,
        remainder_slice: Uuid,
    },
    Claim {
        allocation_id: Uuid,
        production_slice: Uuid,
        consumption_slice: Uuid,
    },
}

/// Accumulates the activities of one saga while recording the matching
/// local state changes in the caller's unit of work.
///
/// Slices reserved through the builder or created by one of its splits may be
/// used again by later operations of the same builder; anything else must be
/// `Available`. A slice is consumed by the first split or claim that uses it.
pub struct RegistryProcessBuilder<'a> {
    algebra: &'a dyn CommitmentAlgebra,
    events: &'a EventRegistry,
    uow: &'a mut dyn WalletUnitOfWork,
    itinerary_id: Uuid,
    activities: Vec<Activity>,
    operations: Vec<Operation>,
    owned: HashSet<Uuid>,
    consumed: HashSet<Uuid>,
}

impl<'a> RegistryProcessBuilder<'a> {
    pub fn new(
        algebra: &'a dyn CommitmentAlgebra,
        events: &'a EventRegistry,
        uow: &'a mut dyn WalletUnitOfWork,
    ) -> Self {
        Self {
            algebra,
            events,
            uow,
            itinerary_id: Uuid::now_v7(),
            activities: Vec::new(),
            operations: Vec::new(),
            owned: HashSet::new(),
            consumed: HashSet::new(),
        }
    }

    pub fn itinerary_id(&self) -> Uuid {
        self.itinerary_id
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Reserves `Available` slices for this builder's later operations.
    pub fn reserve_slices(
        &mut self,
        owner: &str,
        registry: &str,
        certificate_id: Uuid,
        quantity: u64,
    ) -> Result<Vec<WalletSlice>, SagaError> {
        let reserved = self
            .uow
            .reserve_slices(owner, registry, certificate_id, quantity)?;
        self.owned.extend(reserved.iter().map(|slice| slice.id));
        Ok(reserved)
    }

    pub fn split_slice(
        &mut self,
        source: &WalletSlice,
        quantity: u64,
    ) -> Result<(WalletSlice, WalletSlice), SagaError> {
        if quantity >= source.quantity {
            return Err(precondition(
                "cannot split slice with quantity less than or equal to the requested quantity",
            ));
        }
        if quantity == 0 {
            return Err(precondition("cannot split off an empty slice"));
        }
        let current = self.usable_slice(source)?;

        let source_key = self.slice_signing_key(&current)?;
        let endpoint = self.uow.get_endpoint(current.endpoint_id)?;
        let wallet = self.uow.get_wallet(endpoint.wallet_id)?;
        let remainder_endpoint = self.uow.remainder_endpoint(wallet.id)?;

        let quantity_slice = WalletSlice {
            id: Uuid::now_v7(),
            endpoint_id: remainder_endpoint.id,
            position: self.uow.next_position(remainder_endpoint.id)?,
            registry: current.registry.clone(),
            certificate_id: current.certificate_id,
            quantity,
            blinding: self.algebra.random_blinding(),
            state: WalletSliceState::Registering,
        };
        let remainder_slice = WalletSlice {
            id: Uuid::now_v7(),
            position: self.uow.next_position(remainder_endpoint.id)?,
            quantity: current.quantity - quantity,
            blinding: self.algebra.random_blinding(),
            ..quantity_slice.clone()
        };

        let source_commitment = self.algebra.commit(&current.secret())?;
        let source_slice_hash = source_commitment.slice_hash();
        let new_slices = [&quantity_slice, &remainder_slice]
            .into_iter()
            .map(|slice| -> Result<NewSlice, SagaError> {
                Ok(NewSlice {
                    quantity: self.algebra.commit(&slice.secret())?,
                    new_owner: derive_public_key(
                        &wallet.root_key,
                        &[remainder_endpoint.position, slice.position],
                    )?,
                })
            })
            .collect::<Result<Vec<_>, SagaError>>()?;
        let sum_proof = self.algebra.prove_sum_equality(
            &current.secret(),
            &[quantity_slice.secret(), remainder_slice.secret()],
            &source_slice_hash.0,
        )?;

        let stream = current.federated_stream_id();
        let event = RegistryEvent::Sliced(SlicedEvent {
            certificate_id: stream.clone(),
            source_slice_hash,
            new_slices,
            sum_proof,
        });

        self.uow.transition_slice_state(
            current.id,
            current.state,
            WalletSliceState::Slicing,
        )?;
        self.uow.insert_slice(quantity_slice.clone())?;
        self.uow.insert_slice(remainder_slice.clone())?;

        self.push_transaction(&stream, &event, &source_key)?;
        self.activities
            .push(Activity::UpdateSliceStates(UpdateSliceStatesArguments {
                slice_states: BTreeMap::from([
                    (quantity_slice.id, WalletSliceState::Reserved),
                    (remainder_slice.id, WalletSliceState::Reserved),
                    (current.id, WalletSliceState::Sliced),
                ]),
            }));

        self.consumed.insert(current.id);
        self.owned.insert(quantity_slice.id);
        self.owned.insert(remainder_slice.id);
        self.operations.push(Operation::Split {
            source: current.id,
            quantity,
            quantity_slice: quantity_slice.id,
            remainder_slice: remainder_slice.id,
        });
        tracing::debug!(
            target: "process",
            saga_id = %self.itinerary_id,
            source_slice_id = %current.id,
            quantity_slice_id = %quantity_slice.id,
            remainder_slice_id = %remainder_slice.id,
            stream = %stream,
            "split_slice_planned"
        );

        Ok((quantity_slice, remainder_slice))
    }

    /// Returns the allocation id the claim is registered under.
    pub fn claim(
        &mut self,
        production: &WalletSlice,
        consumption: &WalletSlice,
    ) -> Result<Uuid, SagaError> {
        if production.quantity != consumption.quantity {
            return Err(precondition(
                "production and consumption slices must have the same quantity",
            ));
        }
        if production.id == consumption.id {
            return Err(precondition("a slice cannot be claimed against itself"));
        }
        let production = self.usable_slice(production)?;
        let consumption = self.usable_slice(consumption)?;
        self.ensure_certificate_type(&production, GranularCertificateType::Production)?;
        self.ensure_certificate_type(&consumption, GranularCertificateType::Consumption)?;

        let production_key = self.slice_signing_key(&production)?;
        let consumption_key = self.slice_signing_key(&consumption)?;
        let production_stream = production.federated_stream_id();
        let consumption_stream = consumption.federated_stream_id();

        let allocation_id = Uuid::new_v4();
        let equality_proof = self.algebra.prove_sum_equality(
            &production.secret(),
            &[consumption.secret()],
            allocation_id.as_bytes(),
        )?;
        let allocated = RegistryEvent::Allocated(AllocatedEvent {
            allocation_id,
            production_certificate_id: production_stream.clone(),
            consumption_certificate_id: consumption_stream.clone(),
            production_source_slice_hash: self.algebra.commit(&production.secret())?.slice_hash(),
            consumption_source_slice_hash: self
                .algebra
                .commit(&consumption.secret())?
                .slice_hash(),
            equality_proof,
        });
        let production_claimed = RegistryEvent::Claimed(ClaimedEvent {
            certificate_id: production_stream.clone(),
            allocation_id,
        });
        let consumption_claimed = RegistryEvent::Claimed(ClaimedEvent {
            certificate_id: consumption_stream.clone(),
            allocation_id,
        });

        for slice in [&production, &consumption] {
            if slice.state == WalletSliceState::Available {
                self.uow.transition_slice_state(
                    slice.id,
                    WalletSliceState::Available,
                    WalletSliceState::Reserved,
                )?;
            }
        }
        self.uow.insert_claim(Claim {
            id: allocation_id,
            production_slice_id: production.id,
            consumption_slice_id: consumption.id,
            state: ClaimState::Created,
        })?;

        self.push_transaction(&production_stream, &allocated, &production_key)?;
        self.push_transaction(&consumption_stream, &allocated, &consumption_key)?;
        self.push_transaction(&production_stream, &production_claimed, &production_key)?;
        self.push_transaction(&consumption_stream, &consumption_claimed, &consumption_key)?;
        self.activities
            .push(Activity::UpdateSliceStates(UpdateSliceStatesArguments {
                slice_states: BTreeMap::from([
                    (production.id, WalletSliceState::Claimed),
                    (consumption.id, WalletSliceState::Claimed),
                ]),
            }));
        self.activities
            .push(Activity::UpdateClaimState(UpdateClaimStateArguments {
                allocation_id,
                state: ClaimState::Claimed,
            }));

        self.consumed.insert(production.id);
        self.consumed.insert(consumption.id);
        self.operations.push(Operation::Claim {
            allocation_id,
            production_slice: production.id,
            consumption_slice: consumption.id,
        });
        tracing::debug!(
            target: "process",
            saga_id = %self.itinerary_id,
            allocation_id = %allocation_id,
            production_slice_id = %production.id,
            consumption_slice_id = %consumption.id,
            quantity = production.quantity,
            "claim_planned"
        );

        Ok(allocation_id)
    }

    /// Schedules absolute state assignments after everything planned so far.
    pub fn set_slice_states(&mut self, slice_states: BTreeMap<Uuid, WalletSliceState>) {
        if slice_states.is_empty() {
            return;
        }
        self.activities
            .push(Activity::UpdateSliceStates(UpdateSliceStatesArguments { slice_states }));
    }

    /// Gives an unused slice back. Confirmed slices are released at once;
    /// slices still being registered are released once the saga reaches
    /// this point.
    pub fn release_slice(&mut self, slice: &WalletSlice) -> Result<(), SagaError> {
        let current = self.usable_slice(slice)?;
        self.consumed.insert(current.id);
        match current.state {
            WalletSliceState::Registering => {
                self.set_slice_states(BTreeMap::from([(
                    current.id,
                    WalletSliceState::Available,
                )]));
            }
            state => {
                self.uow
                    .transition_slice_state(current.id, state, WalletSliceState::Available)?;
            }
        }
        tracing::debug!(
            target: "process",
            saga_id = %self.itinerary_id,
            slice_id = %current.id,
            quantity = current.quantity,
            "slice_released"
        );
        Ok(())
    }

    pub fn build(self) -> Itinerary {
        Itinerary::new(self.itinerary_id, self.activities)
    }

    fn usable_slice(&self, slice: &WalletSlice) -> Result<WalletSlice, SagaError> {
        if self.consumed.contains(&slice.id) {
            return Err(precondition(format!(
                "slice '{}' is already used by this operation",
                slice.id
            )));
        }
        let current = self.uow.get_slice(slice.id)?;
        let usable = match current.state {
            WalletSliceState::Available => true,
            WalletSliceState::Reserved | WalletSliceState::Registering => {
                self.owned.contains(&current.id)
            }
            WalletSliceState::Slicing
            | WalletSliceState::Sliced
            | WalletSliceState::Claimed
            | WalletSliceState::Expired => false,
        };
        if !usable {
            return Err(precondition(format!(
                "slice '{}' is {:?} and cannot be used",
                current.id, current.state
            )));
        }
        if current.quantity != slice.quantity {
            return Err(precondition(format!(
                "slice '{}' quantity changed from {} to {}",
                current.id, slice.quantity, current.quantity
            )));
        }
        Ok(current)
    }

    fn ensure_certificate_type(
        &self,
        slice: &WalletSlice,
        expected: GranularCertificateType,
    ) -> Result<(), SagaError> {
        let certificate = self
            .uow
            .get_certificate(&slice.registry, slice.certificate_id)?
            .ok_or_else(|| {
                precondition(format!(
                    "certificate '{}/{}' of slice '{}' is unknown",
                    slice.registry, slice.certificate_id, slice.id
                ))
            })?;
        if certificate.certificate_type != expected {
            return Err(precondition(format!(
                "slice '{}' belongs to a {:?} certificate, expected {expected:?}",
                slice.id, certificate.certificate_type
            )));
        }
        Ok(())
    }

    fn slice_signing_key(&self, slice: &WalletSlice) -> Result<SigningKey, SagaError> {
        let endpoint = self.uow.get_endpoint(slice.endpoint_id)?;
        let wallet = self.uow.get_wallet(endpoint.wallet_id)?;
        Ok(derive_signing_key(
            &wallet.root_key,
            &[endpoint.position, slice.position],
        )?)
    }

    fn push_transaction(
        &mut self,
        stream: &FederatedStreamId,
        event: &RegistryEvent,
        key: &SigningKey,
    ) -> Result<(), SagaError> {
        let transaction = build_transaction(self.events, stream, event, key)?;
        let transaction_id = transaction.id()?;
        tracing::trace!(
            target: "process",
            saga_id = %self.itinerary_id,
            stream = %stream,
            signer = %PublicKey::from(key),
            transaction_id = %transaction_id,
            payload_type = %transaction.header.payload_type,
            "transaction_signed"
        );
        self.activities
            .push(Activity::SendTransaction(SendTransactionArguments {
                registry: stream.registry.clone(),
                transaction,
            }));
        self.activities
            .push(Activity::WaitForCommit(WaitForCommitArguments {
                registry: stream.registry.clone(),
                transaction_id,
            }));
        Ok(())
    }
}
