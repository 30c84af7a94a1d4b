pub mod engine;
pub mod error;
pub mod fetch;
pub mod view;

pub use engine::CertificateProjector;
pub use error::ProjectionError;
pub use fetch::{CertificateFetchFailure, GetCertificateResult, get_certificate};
pub use view::{AllocationSlice, CertificateSlice, CertificateView};
