use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    jobs::runner::PeriodicJob,
    saga::{ItineraryPublisher, SagaError, decode_itinerary_message},
    wallet::WalletStore,
};

/// Moves committed itineraries from the outbox to the saga queue.
///
/// Publishing happens before deletion, so a crash in between publishes the
/// message again on the next poll.
pub struct OutboxWorker {
    store: Arc<dyn WalletStore>,
    publisher: Arc<dyn ItineraryPublisher>,
    batch_size: usize,
}

impl OutboxWorker {
    pub fn new(
        store: Arc<dyn WalletStore>,
        publisher: Arc<dyn ItineraryPublisher>,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            publisher,
            batch_size: batch_size.max(1),
        }
    }

    /// Returns how many messages left the outbox.
    pub async fn poll_once(&self) -> Result<usize, SagaError> {
        let messages = self.store.begin().await?.outbox_messages(self.batch_size)?;

        let mut handled = 0;
        for message in messages {
            match decode_itinerary_message(&message) {
                Ok(itinerary) => {
                    let saga_id = itinerary.id();
                    self.publisher.publish(itinerary).await?;
                    tracing::debug!(
                        target: "jobs",
                        message_id = %message.id,
                        saga_id = %saga_id,
                        "outbox_message_published"
                    );
                }
                Err(err) => {
                    tracing::error!(
                        target: "jobs",
                        message_id = %message.id,
                        error = %err.message,
                        "outbox_message_discarded"
                    );
                }
            }

            let mut uow = self.store.begin().await?;
            uow.delete_outbox_message(message.id)?;
            uow.commit()?;
            handled += 1;
        }
        Ok(handled)
    }
}

#[async_trait]
impl PeriodicJob for OutboxWorker {
    fn name(&self) -> &'static str {
        "outbox"
    }

    async fn run_once(&self) -> Result<(), SagaError> {
        self.poll_once().await.map(|_| ())
    }
}
