use certificate_wallet::{
    crypto::{CommitmentAlgebra, derive_signing_key},
    projection::{CertificateFetchFailure, GetCertificateResult, get_certificate},
    registry::{
        ClaimedEvent, FederatedStreamId, GranularCertificateType, RegistryClient, RegistryEvent,
        build_transaction,
    },
    testing::{REGISTRY, WalletFixture},
};
use uuid::Uuid;

#[tokio::test]
async fn given_unknown_stream_when_fetching_then_not_found() {
    let fixture = WalletFixture::new().await.expect("fixture");
    let stream = FederatedStreamId::new(REGISTRY, Uuid::new_v4());

    let result = get_certificate(fixture.registry.as_ref(), &fixture.projector(), &stream).await;
    assert_eq!(result, GetCertificateResult::NotFound);
}

#[tokio::test]
async fn given_issued_certificate_when_fetching_then_view_holds_every_slice() {
    let fixture = WalletFixture::new().await.expect("fixture");
    let issued = fixture
        .issue_certificate(REGISTRY, GranularCertificateType::Production, &[60, 40])
        .await
        .expect("issue");

    let GetCertificateResult::Success(view) =
        get_certificate(fixture.registry.as_ref(), &fixture.projector(), &issued.stream).await
    else {
        panic!("certificate should project");
    };
    assert_eq!(view.certificate_id, issued.stream);
    assert_eq!(view.available_slices().count(), 2);
    for slice in &issued.slices {
        let hash = fixture
            .algebra
            .commit(&slice.secret())
            .expect("commit")
            .slice_hash();
        assert!(view.get_certificate_slice(&hash).is_some());
    }
}

#[tokio::test]
async fn given_registry_down_when_fetching_then_transient_failure() {
    let fixture = WalletFixture::new().await.expect("fixture");
    let issued = fixture
        .issue_certificate(REGISTRY, GranularCertificateType::Production, &[10])
        .await
        .expect("issue");
    fixture.registry.set_available(false).expect("toggle");

    let result = get_certificate(fixture.registry.as_ref(), &fixture.projector(), &issued.stream).await;
    assert!(matches!(result, GetCertificateResult::TransientFailure(_)));
}

#[tokio::test]
async fn given_unknown_registry_when_fetching_then_failure_is_not_transient() {
    let fixture = WalletFixture::new().await.expect("fixture");
    let stream = FederatedStreamId::new("atlantis", Uuid::new_v4());

    let result = get_certificate(fixture.registry.as_ref(), &fixture.projector(), &stream).await;
    assert!(matches!(
        result,
        GetCertificateResult::Failure(CertificateFetchFailure::Registry(_))
    ));
}

#[tokio::test]
async fn given_log_that_does_not_replay_when_fetching_then_projection_failure() {
    let fixture = WalletFixture::new().await.expect("fixture");
    let issued = fixture
        .issue_certificate(REGISTRY, GranularCertificateType::Production, &[10])
        .await
        .expect("issue");
    let key = derive_signing_key(&fixture.wallet.root_key, &[fixture.endpoint.position, 0])
        .expect("derive");
    let bogus = build_transaction(
        &fixture.events,
        &issued.stream,
        &RegistryEvent::Claimed(ClaimedEvent {
            certificate_id: issued.stream.clone(),
            allocation_id: Uuid::new_v4(),
        }),
        &key,
    )
    .expect("build");
    fixture
        .registry
        .send_transaction(REGISTRY, bogus)
        .await
        .expect("registry accepts without replaying");
    fixture.registry.commit_pending().expect("commit");

    let result = get_certificate(fixture.registry.as_ref(), &fixture.projector(), &issued.stream).await;
    assert!(matches!(
        result,
        GetCertificateResult::Failure(CertificateFetchFailure::Projection(_))
    ));
}
