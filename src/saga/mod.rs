pub mod activities;
pub mod error;
pub mod queue;
pub mod retry;
pub mod runtime;
pub mod types;

pub use activities::{ActivityExecutor, RegistryActivityExecutor};
pub use error::{ErrorKind, SagaError, fatal, precondition, transient};
pub use queue::{
    ITINERARY_MESSAGE_TYPE, ItineraryPublisher, SagaQueue, decode_itinerary_message,
    itinerary_message,
};
pub use retry::{RetryPolicies, RetryPolicy};
pub use runtime::{SagaReport, SagaRuntime};
pub use types::{
    Activity, Itinerary, SagaOutcome, SendTransactionArguments, UpdateClaimStateArguments,
    UpdateSliceStatesArguments, WaitForCommitArguments,
};
