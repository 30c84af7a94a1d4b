mod runtime;

use certificate_wallet::{
    process::RegistryProcessBuilder,
    registry::GranularCertificateType,
    saga::Itinerary,
    testing::{REGISTRY, WalletFixture},
    wallet::{WalletSlice, WalletStore},
};

pub struct PlannedSplit {
    pub itinerary: Itinerary,
    pub source: WalletSlice,
    pub children: [WalletSlice; 2],
}

pub async fn plan_split(fixture: &WalletFixture) -> PlannedSplit {
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

    PlannedSplit {
        itinerary,
        source,
        children: [quantity_slice, remainder_slice],
    }
}
