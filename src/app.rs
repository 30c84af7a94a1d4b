use std::sync::Arc;

use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
    claims::{ClaimCommand, ClaimCommandConsumer, ClaimService},
    config::Config,
    crypto::{CommitmentAlgebra, PedersenCommitmentAlgebra},
    jobs::{CertificateExpiryJob, InMemoryAdvisoryLock, OutboxWorker, PeriodicJobRunner},
    registry::{EventRegistry, InMemoryRegistry},
    saga::{RegistryActivityExecutor, RetryPolicies, SagaQueue, SagaRuntime},
    wallet::InMemoryWalletStore,
};

/// Background tasks of one wallet process, all stopped by one token.
pub struct WalletRuntime {
    claim_commands: mpsc::Sender<ClaimCommand>,
    shutdown: CancellationToken,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl WalletRuntime {
    pub fn start(config: &Config) -> Self {
        let events = Arc::new(EventRegistry::new());
        let registry = Arc::new(InMemoryRegistry::new(
            config.registries.keys().cloned(),
            Arc::clone(&events),
        ));
        Self::with_adapters(config, Arc::new(InMemoryWalletStore::new()), registry, events)
    }

    /// Wires the runtime around adapters the caller already holds.
    pub fn with_adapters(
        config: &Config,
        store: Arc<InMemoryWalletStore>,
        registry: Arc<InMemoryRegistry>,
        events: Arc<EventRegistry>,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let algebra: Arc<dyn CommitmentAlgebra> = Arc::new(PedersenCommitmentAlgebra::new());
        let lock = Arc::new(InMemoryAdvisoryLock::new());

        let (queue, itineraries) = SagaQueue::channel(config.saga.queue_capacity);
        let runtime = Arc::new(SagaRuntime::new(
            Arc::new(RegistryActivityExecutor::new(registry, store.clone())),
            RetryPolicies::from_config(&config.retry),
        ));
        let mut tasks = vec![("saga_runtime", runtime.start(itineraries, shutdown.clone(), None))];

        let outbox = PeriodicJobRunner::new(
            Arc::new(OutboxWorker::new(
                store.clone(),
                Arc::new(queue),
                config.jobs.outbox_batch_size,
            )),
            lock.clone(),
            config.jobs.outbox_poll_interval(),
        );
        tasks.push(("outbox", outbox.start(shutdown.clone())));

        let expiry = PeriodicJobRunner::new(
            Arc::new(CertificateExpiryJob::new(
                store.clone(),
                config.jobs.expire_certificates_after_days,
            )),
            lock,
            config.jobs.expiry_sweep_interval(),
        );
        tasks.push(("certificate_expiry", expiry.start(shutdown.clone())));

        let (claim_commands, claim_receiver) = mpsc::channel(config.saga.queue_capacity.max(1));
        let consumer = ClaimCommandConsumer::new(
            Arc::new(ClaimService::new(store.clone(), algebra, events)),
            &config.retry,
        );
        tasks.push(("claim_consumer", consumer.start(claim_receiver, shutdown.clone())));

        for (name, endpoint) in &config.registries {
            tracing::info!(
                target: "wallet",
                registry = %name,
                url = %endpoint.url,
                "registry_endpoint_configured"
            );
        }
        tracing::info!(
            target: "wallet",
            registries = config.registries.len(),
            tasks = tasks.len(),
            "wallet_runtime_started"
        );
        Self {
            claim_commands,
            shutdown,
            tasks,
        }
    }

    pub fn claim_commands(&self) -> mpsc::Sender<ClaimCommand> {
        self.claim_commands.clone()
    }

    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for (name, task) in self.tasks {
            if let Err(err) = task.await {
                tracing::error!(target: "wallet", task = name, error = %err, "task_join_failed");
            }
        }
        tracing::info!(target: "wallet", "wallet_runtime_stopped");
    }
}
