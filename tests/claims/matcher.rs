use std::collections::BTreeMap;

use uuid::Uuid;

use certificate_wallet::{
    claims::ClaimMatcher,
    process::{Operation, RegistryProcessBuilder},
    saga::{Activity, ErrorKind},
    testing::{OTHER_REGISTRY, OWNER, REGISTRY},
    wallet::{WalletSlice, WalletSliceState, WalletStore, WalletUnitOfWork},
};

use crate::ClaimScenario;

fn quantities_by_id(uow: &dyn WalletUnitOfWork, ids: &[Uuid]) -> BTreeMap<Uuid, u64> {
    ids.iter()
        .map(|id| (*id, uow.get_slice(*id).expect("slice").quantity))
        .collect()
}

#[tokio::test]
async fn given_uneven_slices_when_matching_200_then_two_splits_and_three_equal_claims() {
    let scenario = ClaimScenario::new(&[100, 100], &[150, 50]).await;
    let fixture = &scenario.fixture;

    let mut uow = fixture.store.begin().await.expect("begin");
    let mut builder =
        RegistryProcessBuilder::new(fixture.algebra.as_ref(), &fixture.events, uow.as_mut());
    let production = builder
        .reserve_slices(OWNER, REGISTRY, scenario.production.stream.stream_id, 200)
        .expect("reserve production");
    let consumption = builder
        .reserve_slices(OWNER, OTHER_REGISTRY, scenario.consumption.stream.stream_id, 200)
        .expect("reserve consumption");
    let summary =
        ClaimMatcher::reconcile(&mut builder, production, consumption, 200).expect("match");
    let operations = builder.operations().to_vec();
    builder.build();

    assert_eq!(summary.claimed_quantity, 200);
    assert_eq!(summary.splits, 2);
    assert_eq!(summary.allocation_ids.len(), 3);

    let claims: Vec<(Uuid, Uuid)> = operations
        .iter()
        .filter_map(|operation| match operation {
            Operation::Claim {
                production_slice,
                consumption_slice,
                ..
            } => Some((*production_slice, *consumption_slice)),
            Operation::Split { .. } => None,
        })
        .collect();
    assert_eq!(claims.len(), 3);
    let mut claimed = 0;
    for (production, consumption) in claims {
        let quantities = quantities_by_id(uow.as_ref(), &[production, consumption]);
        assert_eq!(quantities[&production], quantities[&consumption]);
        claimed += quantities[&production];
    }
    assert_eq!(claimed, 200);
}

#[tokio::test]
async fn given_more_reserved_than_needed_when_matching_then_excess_is_released() {
    let scenario = ClaimScenario::new(&[80, 70], &[120]).await;
    let fixture = &scenario.fixture;

    let mut uow = fixture.store.begin().await.expect("begin");
    let mut builder =
        RegistryProcessBuilder::new(fixture.algebra.as_ref(), &fixture.events, uow.as_mut());
    let production = builder
        .reserve_slices(OWNER, REGISTRY, scenario.production.stream.stream_id, 150)
        .expect("reserve production");
    let consumption = builder
        .reserve_slices(OWNER, OTHER_REGISTRY, scenario.consumption.stream.stream_id, 100)
        .expect("reserve consumption");
    let summary =
        ClaimMatcher::reconcile(&mut builder, production, consumption, 100).expect("match");
    let operations = builder.operations().to_vec();
    let itinerary = builder.build();

    assert_eq!(summary.claimed_quantity, 100);
    assert_eq!(summary.allocation_ids.len(), 2);

    let released_later: Vec<&BTreeMap<Uuid, WalletSliceState>> = itinerary
        .activities()
        .iter()
        .filter_map(|activity| match activity {
            Activity::UpdateSliceStates(arguments) => {
                Some(&arguments.slice_states)
            }
            _ => None,
        })
        .filter(|states| {
            states.len() == 1 && states.values().all(|state| *state == WalletSliceState::Available)
        })
        .collect();
    let released_quantity: u64 = released_later
        .iter()
        .flat_map(|states| states.keys())
        .map(|id| uow.get_slice(*id).expect("slice").quantity)
        .sum();
    assert_eq!(released_quantity, 20 + 50);

    let split_sources: Vec<Uuid> = operations
        .iter()
        .filter_map(|operation| match operation {
            Operation::Split { source, .. } => Some(*source),
            Operation::Claim { .. } => None,
        })
        .collect();
    assert_eq!(split_sources.len(), 3);
    assert_eq!(summary.splits, 3);
}

#[tokio::test]
async fn given_too_little_production_when_matching_then_precondition_fails() {
    let scenario = ClaimScenario::new(&[50], &[100]).await;
    let fixture = &scenario.fixture;

    let mut uow = fixture.store.begin().await.expect("begin");
    let mut builder =
        RegistryProcessBuilder::new(fixture.algebra.as_ref(), &fixture.events, uow.as_mut());
    let production: Vec<WalletSlice> = builder
        .reserve_slices(OWNER, REGISTRY, scenario.production.stream.stream_id, 50)
        .expect("reserve production");
    let consumption = builder
        .reserve_slices(OWNER, OTHER_REGISTRY, scenario.consumption.stream.stream_id, 100)
        .expect("reserve consumption");

    let err = ClaimMatcher::reconcile(&mut builder, production, consumption, 100)
        .expect_err("production cannot cover the claim");
    assert_eq!(err.kind, ErrorKind::Precondition);
}
