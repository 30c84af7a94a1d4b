use std::sync::Arc;

use certificate_wallet::{
    crypto::CommitmentAlgebra,
    process::RegistryProcessBuilder,
    projection::{GetCertificateResult, get_certificate},
    registry::{GranularCertificateType, RegistryEvent},
    saga::{Activity, ErrorKind, RetryPolicies, SagaOutcome, SagaRuntime},
    testing::{OTHER_REGISTRY, REGISTRY, WalletFixture},
    wallet::{ClaimState, WalletSliceState, WalletStore},
};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn given_equal_slices_when_claiming_then_ten_activities_are_planned_and_claim_is_created() {
    let fixture = WalletFixture::new().await.expect("fixture");
    let production = fixture
        .issue_certificate(REGISTRY, GranularCertificateType::Production, &[150])
        .await
        .expect("production");
    let consumption = fixture
        .issue_certificate(OTHER_REGISTRY, GranularCertificateType::Consumption, &[150])
        .await
        .expect("consumption");

    let mut uow = fixture.store.begin().await.expect("begin");
    let mut builder =
        RegistryProcessBuilder::new(fixture.algebra.as_ref(), &fixture.events, uow.as_mut());
    let allocation_id = builder
        .claim(&production.slices[0], &consumption.slices[0])
        .expect("claim");
    let itinerary = builder.build();

    assert_eq!(
        itinerary.activity_names(),
        vec![
            "send_transaction",
            "wait_for_commit",
            "send_transaction",
            "wait_for_commit",
            "send_transaction",
            "wait_for_commit",
            "send_transaction",
            "wait_for_commit",
            "update_slice_states",
            "update_claim_state",
        ]
    );

    let Activity::SendTransaction(first) = &itinerary.activities()[0] else {
        panic!("claims start with the production allocation");
    };
    assert_eq!(first.registry, REGISTRY);
    let RegistryEvent::Allocated(allocated) = first
        .transaction
        .decode_event(&fixture.events)
        .expect("decode")
    else {
        panic!("first transaction must be an allocation");
    };
    assert_eq!(allocated.allocation_id, allocation_id);
    let production_commitment = fixture
        .algebra
        .commit(&production.slices[0].secret())
        .expect("commit");
    let consumption_commitment = fixture
        .algebra
        .commit(&consumption.slices[0].secret())
        .expect("commit");
    fixture
        .algebra
        .verify_sum_equality(
            &production_commitment,
            &[consumption_commitment],
            &allocated.equality_proof,
            allocation_id.as_bytes(),
        )
        .expect("equality proof binds both commitments to the allocation");

    let Activity::SendTransaction(second) = &itinerary.activities()[2] else {
        panic!("second transaction allocates on the consumption certificate");
    };
    assert_eq!(second.registry, OTHER_REGISTRY);

    let claims = uow.claims().expect("claims");
    assert_eq!(claims.len(), 1);
    assert_eq!(claims[0].id, allocation_id);
    assert_eq!(claims[0].state, ClaimState::Created);
    assert_eq!(
        uow.get_slice(production.slices[0].id).expect("slice").state,
        WalletSliceState::Reserved
    );
    assert_eq!(
        uow.get_slice(consumption.slices[0].id).expect("slice").state,
        WalletSliceState::Reserved
    );
}

#[tokio::test]
async fn given_unequal_quantities_when_claiming_then_precondition_fails_in_both_directions() {
    let fixture = WalletFixture::new().await.expect("fixture");
    let production = fixture
        .issue_certificate(REGISTRY, GranularCertificateType::Production, &[150])
        .await
        .expect("production");
    let consumption = fixture
        .issue_certificate(OTHER_REGISTRY, GranularCertificateType::Consumption, &[100])
        .await
        .expect("consumption");

    let mut uow = fixture.store.begin().await.expect("begin");
    let mut builder =
        RegistryProcessBuilder::new(fixture.algebra.as_ref(), &fixture.events, uow.as_mut());
    for (left, right) in [
        (&production.slices[0], &consumption.slices[0]),
        (&consumption.slices[0], &production.slices[0]),
    ] {
        let err = builder.claim(left, right).expect_err("claim must be rejected");
        assert_eq!(err.kind, ErrorKind::Precondition);
        assert_eq!(
            err.message,
            "production and consumption slices must have the same quantity"
        );
    }
    assert!(builder.build().is_empty());
    assert!(uow.claims().expect("claims").is_empty());
    assert_eq!(
        uow.get_slice(production.slices[0].id).expect("slice").state,
        WalletSliceState::Available
    );
}

#[tokio::test]
async fn given_roles_swapped_when_claiming_then_precondition_fails_before_any_change() {
    let fixture = WalletFixture::new().await.expect("fixture");
    let production = fixture
        .issue_certificate(REGISTRY, GranularCertificateType::Production, &[150])
        .await
        .expect("production");
    let consumption = fixture
        .issue_certificate(OTHER_REGISTRY, GranularCertificateType::Consumption, &[150])
        .await
        .expect("consumption");

    let mut uow = fixture.store.begin().await.expect("begin");
    let mut builder =
        RegistryProcessBuilder::new(fixture.algebra.as_ref(), &fixture.events, uow.as_mut());
    let err = builder
        .claim(&consumption.slices[0], &production.slices[0])
        .expect_err("swapped roles must be rejected");
    assert_eq!(err.kind, ErrorKind::Precondition);
    assert!(err.message.contains("expected Production"), "{}", err.message);

    assert!(builder.build().is_empty());
    assert!(uow.claims().expect("claims").is_empty());
    for slice in [&production.slices[0], &consumption.slices[0]] {
        assert_eq!(
            uow.get_slice(slice.id).expect("slice").state,
            WalletSliceState::Available
        );
    }
    drop(uow);

    let projector = fixture.projector();
    for stream in [&production.stream, &consumption.stream] {
        let GetCertificateResult::Success(view) =
            get_certificate(fixture.registry.as_ref(), &projector, stream).await
        else {
            panic!("certificate '{stream}' should still project");
        };
        assert_eq!(view.available_slices().count(), 1);
    }
}

#[tokio::test]
async fn given_planned_claim_when_saga_runs_then_both_certificates_show_the_claim() {
    let fixture = WalletFixture::new().await.expect("fixture");
    let production = fixture
        .issue_certificate(REGISTRY, GranularCertificateType::Production, &[150])
        .await
        .expect("production");
    let consumption = fixture
        .issue_certificate(OTHER_REGISTRY, GranularCertificateType::Consumption, &[150])
        .await
        .expect("consumption");

    let mut uow = fixture.store.begin().await.expect("begin");
    let mut builder =
        RegistryProcessBuilder::new(fixture.algebra.as_ref(), &fixture.events, uow.as_mut());
    let allocation_id = builder
        .claim(&production.slices[0], &consumption.slices[0])
        .expect("claim");
    let itinerary = builder.build();
    uow.commit().expect("commit");

    let runtime = SagaRuntime::new(Arc::new(fixture.executor()), RetryPolicies::default());
    assert_eq!(
        runtime.execute(&itinerary, &CancellationToken::new()).await,
        SagaOutcome::Completed
    );

    let claims = fixture.claims().await.expect("claims");
    assert_eq!(claims[0].state, ClaimState::Claimed);
    for slice in [&production.slices[0], &consumption.slices[0]] {
        assert_eq!(
            fixture.slice(slice.id).await.expect("slice").state,
            WalletSliceState::Claimed
        );
    }

    let projector = fixture.projector();
    for stream in [&production.stream, &consumption.stream] {
        let GetCertificateResult::Success(view) =
            get_certificate(fixture.registry.as_ref(), &projector, stream).await
        else {
            panic!("certificate '{stream}' should project");
        };
        assert!(view.has_claim(&allocation_id));
        assert!(!view.has_allocation(&allocation_id));
        assert_eq!(view.available_slices().count(), 0);
    }
}

#[tokio::test]
async fn given_slice_split_in_same_builder_when_claiming_child_then_claim_follows_split() {
    let fixture = WalletFixture::new().await.expect("fixture");
    let production = fixture
        .issue_certificate(REGISTRY, GranularCertificateType::Production, &[150])
        .await
        .expect("production");
    let consumption = fixture
        .issue_certificate(OTHER_REGISTRY, GranularCertificateType::Consumption, &[100])
        .await
        .expect("consumption");

    let mut uow = fixture.store.begin().await.expect("begin");
    let mut builder =
        RegistryProcessBuilder::new(fixture.algebra.as_ref(), &fixture.events, uow.as_mut());
    let (part, leftover) = builder
        .split_slice(&production.slices[0], 100)
        .expect("split");
    let allocation_id = builder.claim(&part, &consumption.slices[0]).expect("claim");
    builder.release_slice(&leftover).expect("release");
    let itinerary = builder.build();
    uow.commit().expect("commit");

    let runtime = SagaRuntime::new(Arc::new(fixture.executor()), RetryPolicies::default());
    assert_eq!(
        runtime.execute(&itinerary, &CancellationToken::new()).await,
        SagaOutcome::Completed
    );

    assert_eq!(
        fixture.slice(part.id).await.expect("part").state,
        WalletSliceState::Claimed
    );
    assert_eq!(
        fixture.slice(leftover.id).await.expect("leftover").state,
        WalletSliceState::Available
    );
    assert_eq!(
        fixture.slice(production.slices[0].id).await.expect("source").state,
        WalletSliceState::Sliced
    );

    let GetCertificateResult::Success(view) =
        get_certificate(fixture.registry.as_ref(), &fixture.projector(), &production.stream).await
    else {
        panic!("production should project");
    };
    assert!(view.has_claim(&allocation_id));
    let leftover_hash = fixture
        .algebra
        .commit(&leftover.secret())
        .expect("commit")
        .slice_hash();
    assert!(view.get_certificate_slice(&leftover_hash).is_some());
}
