use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};
use tokio::task::JoinHandle;

use super::coordinator::JobRunner;
use super::message::JobMessage;
use super::queue::MessageQueue;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Worker slots pulling from the runner's inbound queue. Each slot runs
/// one job at a time with its own session.
pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Spawns `worker_count` slots (at least one) on the current runtime.
    pub fn start(runner: Arc<JobRunner>, worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let shutdown = Arc::new(AtomicBool::new(false));
        let queue = runner.job_queue();

        let workers = (0..worker_count)
            .map(|worker_id| {
                tokio::spawn(run_worker(
                    worker_id,
                    Arc::clone(&runner),
                    Arc::clone(&queue),
                    Arc::clone(&shutdown),
                ))
            })
            .collect();

        info!("Started {} workers", worker_count);

        Self { workers, shutdown }
    }

    /// Stops pulling new messages. Jobs already running finish, and that
    /// includes a retry backoff: `JobRunner::handle` sleeps out the delay
    /// (up to 8 minutes with the default policy) and republishes the
    /// message before the slot sees the flag. The republished message stays
    /// on the queue for the next pool.
    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub async fn wait(self) {
        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.await {
                error!("Worker {} panicked: {}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All workers have stopped");
    }
}

async fn run_worker(
    worker_id: usize,
    runner: Arc<JobRunner>,
    queue: Arc<dyn MessageQueue<JobMessage>>,
    shutdown: Arc<AtomicBool>,
) {
    debug!("Worker {} started", worker_id);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        match queue.receive().await {
            Ok(Some(message)) => {
                let job_id = message.job_id.clone();
                debug!("Worker {} processing job {}", worker_id, job_id);
                match runner.handle(message).await {
                    Ok(outcome) => debug!("Worker {} job {}: {:?}", worker_id, job_id, outcome),
                    Err(e) => error!("Worker {} failed job {}: {}", worker_id, job_id, e),
                }
            }
            Ok(None) => tokio::time::sleep(POLL_INTERVAL).await,
            Err(e) => {
                error!("Worker {} could not read the queue: {}", worker_id, e);
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}
