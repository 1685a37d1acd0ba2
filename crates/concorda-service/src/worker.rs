//! Worker pool draining the update queue.
//!
//! Each worker long-polls the queue and fans a batch out into transient
//! tasks, one per message, then awaits the whole batch before polling again.
//! Workers only poll while the shared health flag is up, and exit when the
//! done signal fires or the shutdown flag is set.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info};

use concorda_core::{defaults, UpdateQueue};

use crate::health::SystemHealth;
use crate::service::AggregateService;

/// Worker pool sizing and polling behavior.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of concurrent worker tasks.
    pub workers: usize,
    /// Pause between poll attempts while unhealthy or erroring.
    pub backoff: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get() + 1)
                .unwrap_or(2),
            backoff: Duration::from_millis(defaults::UNHEALTHY_BACKOFF_MS),
        }
    }
}

/// The pool of notification workers.
pub struct WorkerPool {
    service: Arc<AggregateService>,
    queue: Arc<dyn UpdateQueue>,
    health: Arc<SystemHealth>,
    config: WorkerConfig,
}

/// Handle awaiting the drain of all workers.
pub struct WorkerHandle {
    tasks: JoinSet<()>,
}

impl WorkerHandle {
    /// Wait for every worker to exit its poll loop.
    pub async fn join(mut self) {
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                error!(error = ?e, "worker task panicked");
            }
        }
    }
}

impl WorkerPool {
    pub fn new(
        service: Arc<AggregateService>,
        queue: Arc<dyn UpdateQueue>,
        health: Arc<SystemHealth>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            service,
            queue,
            health,
            config,
        }
    }

    /// Spawn the workers. In read-only mode no workers start and the handle
    /// joins immediately.
    pub fn start(self, done: watch::Receiver<bool>) -> WorkerHandle {
        let mut tasks = JoinSet::new();
        if self.service.read_only() {
            info!("service is read-only, not starting workers");
            return WorkerHandle { tasks };
        }

        info!(workers = self.config.workers, "starting notification workers");
        for worker_id in 0..self.config.workers {
            let service = self.service.clone();
            let queue = self.queue.clone();
            let health = self.health.clone();
            let done = done.clone();
            let backoff = self.config.backoff;
            tasks.spawn(async move {
                run_worker(worker_id, service, queue, health, done, backoff).await;
            });
        }
        WorkerHandle { tasks }
    }
}

async fn run_worker(
    worker_id: usize,
    service: Arc<AggregateService>,
    queue: Arc<dyn UpdateQueue>,
    health: Arc<SystemHealth>,
    mut done: watch::Receiver<bool>,
    backoff: Duration,
) {
    loop {
        if *done.borrow() || health.is_shutting_down() {
            info!(worker_id, "stopping worker");
            return;
        }
        if !health.is_good() {
            tokio::select! {
                _ = done.changed() => {}
                _ = tokio::time::sleep(backoff) => {}
            }
            continue;
        }

        let batch = tokio::select! {
            _ = done.changed() => continue,
            received = queue.receive() => match received {
                Ok(batch) => batch,
                Err(e) => {
                    error!(worker_id, error = %e, "error while listening for messages");
                    tokio::time::sleep(backoff).await;
                    continue;
                }
            },
        };
        if batch.is_empty() {
            continue;
        }

        info!(worker_id, batch_size = batch.len(), "worker processing notifications");
        let mut tasks = JoinSet::new();
        for update in batch {
            let service = service.clone();
            tasks.spawn(async move {
                if let Err(e) = service.process_update(&update).await {
                    error!(concept_uuid = %update.uuid, error = %e, "error processing message");
                }
            });
        }
        // The batch completes before the next poll.
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!(worker_id, error = ?e, "message task panicked");
            }
        }
    }
}
