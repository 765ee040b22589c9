//! Priority dispatch with bounded retry.
//!
//! Three bounded queues (high/medium/low) feed a pool of workers; each
//! worker always drains higher-priority queues first. A job attempt maps
//! its error class to an outcome: missing entities complete as no-ops,
//! invalid arguments and partial completions fail fast, transient
//! infrastructure errors back off
//! and retry up to the attempt cap, and exhausted jobs land on the
//! dead-letter channel — never on the floor.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::{Job, Queue};
use crate::engine::Engine;
use crate::errors::EngineError;

/// Retry behavior for a single job. Backoff doubles per attempt and is
/// capped at `max_backoff`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.base_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// A job that exhausted its retries or failed fatally, surfaced to the
/// operational consumer instead of being dropped.
#[derive(Debug)]
pub struct DeadLetter {
    pub job: Job,
    pub error: String,
    pub attempts: u32,
}

type SharedRx = Arc<Mutex<mpsc::Receiver<Job>>>;

pub struct Dispatcher {
    high: mpsc::Sender<Job>,
    medium: mpsc::Sender<Job>,
    low: mpsc::Sender<Job>,
    workers: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    /// Spawn `workers` worker tasks over the engine. Returns the dispatch
    /// handle and the dead-letter stream.
    pub fn start(
        engine: Arc<Engine>,
        policy: RetryPolicy,
        workers: usize,
        queue_capacity: usize,
    ) -> (Self, mpsc::UnboundedReceiver<DeadLetter>) {
        let (high_tx, high_rx) = mpsc::channel(queue_capacity);
        let (medium_tx, medium_rx) = mpsc::channel(queue_capacity);
        let (low_tx, low_rx) = mpsc::channel(queue_capacity);
        let (dead_tx, dead_rx) = mpsc::unbounded_channel();

        let high_rx: SharedRx = Arc::new(Mutex::new(high_rx));
        let medium_rx: SharedRx = Arc::new(Mutex::new(medium_rx));
        let low_rx: SharedRx = Arc::new(Mutex::new(low_rx));

        let handles = (0..workers.max(1))
            .map(|worker_id| {
                let engine = Arc::clone(&engine);
                let policy = policy.clone();
                let queues = [
                    Arc::clone(&high_rx),
                    Arc::clone(&medium_rx),
                    Arc::clone(&low_rx),
                ];
                let dead_tx = dead_tx.clone();
                tokio::spawn(async move {
                    worker_loop(worker_id, engine, policy, queues, dead_tx).await;
                })
            })
            .collect();

        (
            Self {
                high: high_tx,
                medium: medium_tx,
                low: low_tx,
                workers: handles,
            },
            dead_rx,
        )
    }

    /// Route a job onto its priority queue. Applies backpressure when the
    /// queue is full.
    pub async fn enqueue(&self, job: Job) -> Result<(), EngineError> {
        let sender = match job.queue() {
            Queue::High => &self.high,
            Queue::Medium => &self.medium,
            Queue::Low => &self.low,
        };
        sender
            .send(job)
            .await
            .map_err(|e| EngineError::Internal(anyhow::anyhow!("queue closed: {e}")))
    }

    /// Close the queues and wait for workers to drain them.
    pub async fn shutdown(self) {
        drop((self.high, self.medium, self.low));
        for handle in self.workers {
            let _ = handle.await;
        }
    }
}

/// Pull jobs strictly in priority order: a lower queue is only consulted
/// when every higher one is momentarily empty.
async fn next_job(queues: &[SharedRx; 3]) -> Option<Job> {
    loop {
        let mut all_closed = true;
        for rx in queues {
            match rx.lock().await.try_recv() {
                Ok(job) => return Some(job),
                Err(mpsc::error::TryRecvError::Empty) => all_closed = false,
                Err(mpsc::error::TryRecvError::Disconnected) => {}
            }
        }
        if all_closed {
            return None;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn worker_loop(
    worker_id: usize,
    engine: Arc<Engine>,
    policy: RetryPolicy,
    queues: [SharedRx; 3],
    dead_tx: mpsc::UnboundedSender<DeadLetter>,
) {
    while let Some(job) = next_job(&queues).await {
        run_with_retries(worker_id, &engine, &policy, job, &dead_tx).await;
    }
    debug!(worker_id, "queues closed, worker exiting");
}

async fn run_with_retries(
    worker_id: usize,
    engine: &Engine,
    policy: &RetryPolicy,
    job: Job,
    dead_tx: &mpsc::UnboundedSender<DeadLetter>,
) {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match job.run(engine).await {
            Ok(()) => {
                debug!(worker_id, job = job.name(), attempt, "job complete");
                return;
            }
            Err(e) if e.is_missing_entity() => {
                // The source entity vanished between enqueue and execution.
                debug!(worker_id, job = job.name(), %e, "entity gone, treating as done");
                return;
            }
            Err(e) if e.is_fatal() => {
                error!(worker_id, job = job.name(), %e, "job rejected, not retrying");
                let _ = dead_tx.send(DeadLetter {
                    job,
                    error: e.to_string(),
                    attempts: attempt,
                });
                return;
            }
            Err(e) if attempt >= policy.max_attempts => {
                error!(
                    worker_id,
                    job = job.name(),
                    attempts = attempt,
                    %e,
                    "retries exhausted, dead-lettering"
                );
                let _ = dead_tx.send(DeadLetter {
                    job,
                    error: e.to_string(),
                    attempts: attempt,
                });
                return;
            }
            Err(e) => {
                let delay = policy.backoff(attempt - 1);
                warn!(
                    worker_id,
                    job = job.name(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    %e,
                    "transient failure, backing off"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(1500),
        };
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(800));
        assert_eq!(policy.backoff(6), Duration::from_millis(1500));
        assert_eq!(policy.backoff(40), Duration::from_millis(1500));
    }
}
