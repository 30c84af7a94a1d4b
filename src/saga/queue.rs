use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    saga::{
        error::{SagaError, fatal, transient},
        types::Itinerary,
    },
    wallet::OutboxMessage,
};

pub const ITINERARY_MESSAGE_TYPE: &str = "saga.itinerary.v1";

pub fn itinerary_message(itinerary: &Itinerary) -> Result<OutboxMessage, SagaError> {
    let payload = serde_json::to_string(itinerary)
        .map_err(|err| fatal(format!("failed to encode saga '{}': {err}", itinerary.id())))?;
    Ok(OutboxMessage {
        id: Uuid::now_v7(),
        message_type: ITINERARY_MESSAGE_TYPE.to_string(),
        payload,
        created_at: OffsetDateTime::now_utc(),
    })
}

pub fn decode_itinerary_message(message: &OutboxMessage) -> Result<Itinerary, SagaError> {
    if message.message_type != ITINERARY_MESSAGE_TYPE {
        return Err(fatal(format!(
            "outbox message '{}' has unknown type '{}'",
            message.id, message.message_type
        )));
    }
    serde_json::from_str(&message.payload)
        .map_err(|err| fatal(format!("outbox message '{}' is malformed: {err}", message.id)))
}

/// Hands a built itinerary to whatever runs sagas.
#[async_trait]
pub trait ItineraryPublisher: Send + Sync {
    async fn publish(&self, itinerary: Itinerary) -> Result<(), SagaError>;
}

/// Bounded in-process queue feeding a `SagaRuntime`.
#[derive(Clone)]
pub struct SagaQueue {
    sender: mpsc::Sender<Itinerary>,
}

impl SagaQueue {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Itinerary>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl ItineraryPublisher for SagaQueue {
    async fn publish(&self, itinerary: Itinerary) -> Result<(), SagaError> {
        let saga_id = itinerary.id();
        self.sender
            .send(itinerary)
            .await
            .map_err(|_| transient(format!("saga queue closed before saga '{saga_id}' was queued")))
    }
}
