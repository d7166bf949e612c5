//! Timed, size-capped replication of queued index ops.
//!
//! Workers push into a bounded channel ([`IndexQueue`]); a single
//! [`IndexBatcher`] wakes on a fixed interval, takes at most `max_batch`
//! ops and submits them as one bulk request. Ops beyond the cap wait for
//! the next tick. When every producer is gone the rest is drained without
//! waiting for ticks.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use indicatif::ProgressBar;
use plebis_core::retry_with_backoff;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::time::MissedTickBehavior;

use crate::index::SearchIndex;
use crate::op::IndexOp;

#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Time between flush ticks
    pub interval: Duration,
    /// Max ops per bulk request
    pub max_batch: usize,
    /// Queued ops before producers wait
    pub queue_capacity: usize,
    /// Bulk retries before a batch is dropped
    pub max_retries: u32,
    pub retry_base: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            max_batch: 500,
            queue_capacity: 100_000,
            max_retries: 3,
            retry_base: Duration::from_secs(1),
        }
    }
}

/// Error returned when pushing after the batcher has stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueClosed;

impl std::fmt::Display for QueueClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "index queue closed")
    }
}

impl std::error::Error for QueueClosed {}

/// Producer handle; clone one per worker.
#[derive(Debug, Clone)]
pub struct IndexQueue {
    tx: mpsc::Sender<IndexOp>,
    indexed: Arc<AtomicU64>,
}

impl IndexQueue {
    /// Enqueue one op, waiting only while the queue is at capacity
    pub async fn push(&self, op: IndexOp) -> Result<(), QueueClosed> {
        self.tx.send(op).await.map_err(|_| QueueClosed)
    }

    /// Documents successfully submitted so far
    pub fn indexed(&self) -> u64 {
        self.indexed.load(Ordering::Relaxed)
    }
}

/// Totals of a batcher run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchStats {
    pub requests: u64,
    pub indexed: u64,
    pub rejected: u64,
    /// Ops lost because their batch failed after all retries
    pub dropped: u64,
}

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Drain {
    pub taken: usize,
    /// Queue empty and every producer dropped
    pub disconnected: bool,
}

pub struct IndexBatcher {
    rx: mpsc::Receiver<IndexOp>,
    index: Arc<dyn SearchIndex>,
    config: BatchConfig,
    stats: BatchStats,
    indexed: Arc<AtomicU64>,
    status: ProgressBar,
}

impl IndexBatcher {
    /// Create the queue/batcher pair
    pub fn channel(index: Arc<dyn SearchIndex>, config: BatchConfig) -> (IndexQueue, Self) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let indexed = Arc::new(AtomicU64::new(0));
        let queue = IndexQueue {
            tx,
            indexed: indexed.clone(),
        };
        let batcher = Self {
            rx,
            index,
            config,
            stats: BatchStats::default(),
            indexed,
            status: ProgressBar::hidden(),
        };
        (queue, batcher)
    }

    /// Show flush totals on a status line
    pub fn with_status(mut self, status: ProgressBar) -> Self {
        self.status = status;
        self
    }

    pub fn stats(&self) -> &BatchStats {
        &self.stats
    }

    /// Take up to `max_batch` queued ops and submit them; no request when empty.
    pub async fn flush_once(&mut self) -> Drain {
        let mut batch = Vec::with_capacity(self.config.max_batch.min(1024));
        let mut disconnected = false;
        while batch.len() < self.config.max_batch {
            match self.rx.try_recv() {
                Ok(op) => batch.push(op),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }

        let taken = batch.len();
        if taken > 0 {
            self.submit(batch).await;
        }
        Drain {
            taken,
            disconnected,
        }
    }

    async fn submit(&mut self, batch: Vec<IndexOp>) {
        let first = batch.first().map_or(0, IndexOp::id);
        let label = format!("bulk[{} ops from {first}]", batch.len());
        let index = self.index.clone();
        let result = retry_with_backoff(
            &label,
            self.config.max_retries,
            self.config.retry_base,
            || index.bulk(&batch),
        )
        .await;

        self.stats.requests += 1;
        match result {
            Ok(outcome) => {
                self.stats.indexed += outcome.indexed as u64;
                self.stats.rejected += outcome.rejected as u64;
                self.indexed
                    .fetch_add(outcome.indexed as u64, Ordering::Relaxed);
                log::info!(
                    "Indexed {} documents.. [{}]",
                    outcome.indexed,
                    self.stats.indexed
                );
            }
            Err(e) => {
                self.stats.dropped += batch.len() as u64;
                log::error!("{label}: dropped after retries: {e}");
            }
        }
        self.status.set_message(format!(
            "{} indexed, {} dropped",
            self.stats.indexed, self.stats.dropped
        ));
    }

    /// Flush on every tick until all producers are gone and the queue is empty.
    pub async fn run(mut self) -> BatchStats {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval fires immediately; the first flush waits one full period
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if self.flush_once().await.disconnected {
                break;
            }
            if self.rx.is_closed() {
                // producers are gone, no reason to pace the remainder
                while !self.flush_once().await.disconnected {}
                break;
            }
        }

        self.status.finish_and_clear();
        log::info!(
            "Index flush finished: {} indexed in {} requests ({} rejected, {} dropped)",
            self.stats.indexed,
            self.stats.requests,
            self.stats.rejected,
            self.stats.dropped
        );
        self.stats
    }
}
