//! Replay stored reports into the search index.
//!
//! The store is the source of truth; ops still queued when a harvest was
//! killed are recovered by re-submitting every available document.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use plebis_core::is_shutdown_requested;
use plebis_core::progress::fmt_num;
use plebis_search::{BatchConfig, BatchStats, IndexBatcher, IndexOp, SearchIndex};
use plebis_store::DocumentStore;

#[derive(Debug, Clone)]
pub struct ReindexSummary {
    /// Documents read from the store and queued
    pub queued: u64,
    pub index: BatchStats,
    pub interrupted: bool,
    pub elapsed: Duration,
}

/// Page through available documents in ID order and push them through a
/// fresh batcher. Store errors abort the run after the queue is drained.
pub async fn reindex(
    store: Arc<dyn DocumentStore>,
    index: Arc<dyn SearchIndex>,
    index_name: &str,
    doc_type: Option<&str>,
    page_size: usize,
    batch: BatchConfig,
) -> Result<ReindexSummary> {
    let start = Instant::now();
    let (queue, batcher) = IndexBatcher::channel(index, batch);
    let flusher = tokio::spawn(batcher.run());

    let page_size = page_size.max(1);
    let mut after = 0;
    let mut queued = 0u64;
    let mut interrupted = false;

    let scanned = async {
        loop {
            if is_shutdown_requested() {
                interrupted = true;
                break;
            }
            let page = store
                .scan_published(after, page_size)
                .await
                .with_context(|| format!("scanning stored reports after {after}"))?;
            let last_page = page.len() < page_size;

            for (id, doc) in page {
                queue.push(IndexOp::new(index_name, doc_type, id, doc)).await?;
                queued += 1;
                after = id;
            }
            log::debug!("Queued {} reports, last ID {after}", fmt_num(queued));

            if last_page {
                break;
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    drop(queue);
    let index = flusher.await.context("index flush task failed")?;
    scanned?;

    let summary = ReindexSummary {
        queued,
        index,
        interrupted,
        elapsed: start.elapsed(),
    };
    log::info!(
        "Reindexed {} of {} stored reports in {:.1}s",
        fmt_num(summary.index.indexed),
        fmt_num(summary.queued),
        summary.elapsed.as_secs_f64()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use plebis_search::MemoryIndex;
    use plebis_store::MemoryStore;
    use serde_json::json;

    async fn seeded() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for id in 1..=7u64 {
            let available = id % 3 != 0;
            store
                .upsert(
                    id,
                    &json!({"meta": {"erowidId": id, "available": available}, "title": "t"}),
                )
                .await
                .unwrap();
        }
        store
    }

    fn config() -> BatchConfig {
        BatchConfig {
            max_batch: 2,
            retry_base: Duration::ZERO,
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn replays_only_available_documents() {
        let store = seeded().await;
        let index = Arc::new(MemoryIndex::new());

        let summary = reindex(store, index.clone(), "reports", Some("report"), 2, config())
            .await
            .unwrap();

        assert_eq!(index.indexed_ids(), vec![1, 2, 4, 5, 7]);
        assert_eq!(summary.queued, 5);
        assert_eq!(summary.index.indexed, 5);
        assert!(!summary.interrupted);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_store_sends_nothing() {
        let index = Arc::new(MemoryIndex::new());
        let summary = reindex(
            Arc::new(MemoryStore::new()),
            index.clone(),
            "reports",
            None,
            100,
            config(),
        )
        .await
        .unwrap();

        assert_eq!(summary.queued, 0);
        assert!(index.request_sizes().is_empty());
    }
}
