pub mod consumer;
pub mod matcher;
pub mod service;
pub mod types;

pub use consumer::ClaimCommandConsumer;
pub use matcher::{ClaimMatcher, MatchSummary};
pub use service::ClaimService;
pub use types::{ClaimAccepted, ClaimCommand};
