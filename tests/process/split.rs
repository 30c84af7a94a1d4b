use std::sync::Arc;

use certificate_wallet::{
    crypto::{CommitmentAlgebra, derive_public_key},
    process::{Operation, RegistryProcessBuilder},
    projection::{GetCertificateResult, get_certificate},
    registry::{GranularCertificateType, RegistryEvent},
    saga::{Activity, ErrorKind, RetryPolicies, SagaOutcome, SagaRuntime},
    testing::{REGISTRY, WalletFixture},
    wallet::{WalletSliceState, WalletStore},
};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn given_slice_of_150_when_splitting_100_then_children_conserve_quantity_and_sum_proof_verifies()
 {
    let fixture = WalletFixture::new().await.expect("fixture");
    let issued = fixture
        .issue_certificate(REGISTRY, GranularCertificateType::Production, &[150])
        .await
        .expect("issue");
    let source = issued.slices[0].clone();

    let mut uow = fixture.store.begin().await.expect("begin");
    let mut builder =
        RegistryProcessBuilder::new(fixture.algebra.as_ref(), &fixture.events, uow.as_mut());
    let (quantity_slice, remainder_slice) = builder.split_slice(&source, 100).expect("split");
    assert_eq!(
        builder.operations(),
        &[Operation::Split {
            source: source.id,
            quantity: 100,
            quantity_slice: quantity_slice.id,
            remainder_slice: remainder_slice.id,
        }]
    );
    let itinerary = builder.build();

    assert_eq!(quantity_slice.quantity, 100);
    assert_eq!(remainder_slice.quantity, 50);
    assert_eq!(
        itinerary.activity_names(),
        vec!["send_transaction", "wait_for_commit", "update_slice_states"]
    );

    let Activity::SendTransaction(send) = &itinerary.activities()[0] else {
        panic!("first activity must send the sliced transaction");
    };
    let RegistryEvent::Sliced(sliced) = send
        .transaction
        .decode_event(&fixture.events)
        .expect("decode")
    else {
        panic!("split must emit a sliced event");
    };
    let source_commitment = fixture.algebra.commit(&source.secret()).expect("commit");
    assert_eq!(sliced.source_slice_hash, source_commitment.slice_hash());
    let new_commitments: Vec<_> = sliced.new_slices.iter().map(|slice| slice.quantity).collect();
    fixture
        .algebra
        .verify_sum_equality(
            &source_commitment,
            &new_commitments,
            &sliced.sum_proof,
            &source_commitment.slice_hash().0,
        )
        .expect("sum proof should verify against the source commitment");

    let source_owner = derive_public_key(
        &fixture.wallet.root_key,
        &[fixture.endpoint.position, source.position],
    )
    .expect("derive");
    send.transaction
        .verify_signature(&source_owner)
        .expect("sliced transaction is signed by the source slice key");

    assert_eq!(
        uow.get_slice(source.id).expect("source").state,
        WalletSliceState::Slicing
    );
    for child in [&quantity_slice, &remainder_slice] {
        let stored = uow.get_slice(child.id).expect("child");
        assert_eq!(stored.state, WalletSliceState::Registering);
        assert!(uow.get_endpoint(stored.endpoint_id).expect("endpoint").is_remainder);
    }
}

#[tokio::test]
async fn given_slice_of_150_when_splitting_150_or_200_then_precondition_fails_without_new_slices() {
    let fixture = WalletFixture::new().await.expect("fixture");
    let issued = fixture
        .issue_certificate(REGISTRY, GranularCertificateType::Production, &[150])
        .await
        .expect("issue");
    let source = issued.slices[0].clone();

    for requested in [150, 200] {
        let mut uow = fixture.store.begin().await.expect("begin");
        let mut builder =
            RegistryProcessBuilder::new(fixture.algebra.as_ref(), &fixture.events, uow.as_mut());
        let err = builder
            .split_slice(&source, requested)
            .expect_err("split must be rejected");
        assert_eq!(err.kind, ErrorKind::Precondition);
        assert_eq!(
            err.message,
            "cannot split slice with quantity less than or equal to the requested quantity"
        );
        assert!(builder.build().is_empty());
        uow.commit().expect("commit");
    }

    let slices = fixture.slices_of(&issued.stream).await.expect("slices");
    assert_eq!(slices.len(), 1);
    assert_eq!(slices[0].state, WalletSliceState::Available);
}

#[tokio::test]
async fn given_committed_split_when_saga_runs_then_ledger_and_local_state_agree() {
    let fixture = WalletFixture::new().await.expect("fixture");
    let issued = fixture
        .issue_certificate(REGISTRY, GranularCertificateType::Production, &[150])
        .await
        .expect("issue");
    let source = issued.slices[0].clone();

    let mut uow = fixture.store.begin().await.expect("begin");
    let mut builder =
        RegistryProcessBuilder::new(fixture.algebra.as_ref(), &fixture.events, uow.as_mut());
    let (quantity_slice, remainder_slice) = builder.split_slice(&source, 100).expect("split");
    let itinerary = builder.build();
    uow.commit().expect("commit");

    let runtime = SagaRuntime::new(Arc::new(fixture.executor()), RetryPolicies::default());
    let outcome = runtime.execute(&itinerary, &CancellationToken::new()).await;
    assert_eq!(outcome, SagaOutcome::Completed);

    assert_eq!(
        fixture.slice(source.id).await.expect("source").state,
        WalletSliceState::Sliced
    );
    assert_eq!(
        fixture.slice(quantity_slice.id).await.expect("child").state,
        WalletSliceState::Reserved
    );
    assert_eq!(
        fixture.slice(remainder_slice.id).await.expect("child").state,
        WalletSliceState::Reserved
    );

    let GetCertificateResult::Success(view) =
        get_certificate(fixture.registry.as_ref(), &fixture.projector(), &issued.stream).await
    else {
        panic!("certificate should project");
    };
    let source_hash = fixture
        .algebra
        .commit(&source.secret())
        .expect("commit")
        .slice_hash();
    assert!(view.get_certificate_slice(&source_hash).is_none());
    for child in [&quantity_slice, &remainder_slice] {
        let hash = fixture
            .algebra
            .commit(&child.secret())
            .expect("commit")
            .slice_hash();
        assert!(view.get_certificate_slice(&hash).is_some());
    }
}

#[tokio::test]
async fn given_sliced_child_when_splitting_it_again_in_same_builder_then_both_splits_are_planned() {
    let fixture = WalletFixture::new().await.expect("fixture");
    let issued = fixture
        .issue_certificate(REGISTRY, GranularCertificateType::Production, &[150])
        .await
        .expect("issue");

    let mut uow = fixture.store.begin().await.expect("begin");
    let mut builder =
        RegistryProcessBuilder::new(fixture.algebra.as_ref(), &fixture.events, uow.as_mut());
    let (first, _) = builder.split_slice(&issued.slices[0], 100).expect("split");
    let (second, rest) = builder.split_slice(&first, 40).expect("split child");
    let err = builder
        .split_slice(&first, 10)
        .expect_err("a consumed slice cannot be split twice");
    assert_eq!(err.kind, ErrorKind::Precondition);
    let itinerary = builder.build();
    uow.commit().expect("commit");

    assert_eq!(second.quantity + rest.quantity, 100);
    assert_eq!(itinerary.activities().len(), 6);

    let runtime = SagaRuntime::new(Arc::new(fixture.executor()), RetryPolicies::default());
    assert_eq!(
        runtime.execute(&itinerary, &CancellationToken::new()).await,
        SagaOutcome::Completed
    );
    assert_eq!(
        fixture.slice(first.id).await.expect("first").state,
        WalletSliceState::Sliced
    );
}
