use crate::{
    projection::{engine::CertificateProjector, error::ProjectionError, view::CertificateView},
    registry::{FederatedStreamId, RegistryClient, RegistryError},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetCertificateResult {
    Success(CertificateView),
    NotFound,
    Failure(CertificateFetchFailure),
    TransientFailure(RegistryError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateFetchFailure {
    Registry(RegistryError),
    Projection(ProjectionError),
}

/// Fetches the full log of `stream` and replays it.
pub async fn get_certificate(
    client: &dyn RegistryClient,
    projector: &CertificateProjector,
    stream: &FederatedStreamId,
) -> GetCertificateResult {
    let transactions = match client.stream_transactions(stream).await {
        Ok(Some(transactions)) if !transactions.is_empty() => transactions,
        Ok(_) => return GetCertificateResult::NotFound,
        Err(err) if err.is_transient() => {
            tracing::warn!(
                target: "projection",
                stream = %stream,
                error = %err,
                "certificate_fetch_transient_failure"
            );
            return GetCertificateResult::TransientFailure(err);
        }
        Err(err) => {
            tracing::warn!(
                target: "projection",
                stream = %stream,
                error = %err,
                "certificate_fetch_failed"
            );
            return GetCertificateResult::Failure(CertificateFetchFailure::Registry(err));
        }
    };

    match projector.project(&transactions) {
        Ok(view) => GetCertificateResult::Success(view),
        Err(err) => {
            tracing::error!(
                target: "projection",
                stream = %stream,
                error = %err,
                "certificate_projection_diverged"
            );
            GetCertificateResult::Failure(CertificateFetchFailure::Projection(err))
        }
    }
}
