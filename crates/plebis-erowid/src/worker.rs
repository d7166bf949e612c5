//! Per-ID processing chain and the worker loop around it

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Context;
use plebis_core::progress::IdProgress;
use plebis_core::{ExternalId, IdCursor, RecordFetcher, is_shutdown_requested};
use plebis_search::{IndexOp, IndexQueue};
use plebis_store::DocumentStore;

use crate::classify::{Classification, classify_payload};
use crate::decode::decode_latin1;
use crate::error::HarvestError;
use crate::report::StoredMeta;
use crate::runner::FetcherFactory;
use crate::transform::Transformer;

/// Everything one ID needs after the existence check
pub struct Pipeline {
    pub store: Arc<dyn DocumentStore>,
    pub transformer: Arc<dyn Transformer>,
    pub queue: IndexQueue,
    pub index_name: String,
    pub doc_type: Option<String>,
    /// Paid after hidden and visible outcomes only
    pub delay: Duration,
}

/// fetch → classify → (stub | decode → transform → store → enqueue).
///
/// Stub outcomes return immediately. Hidden reports write nothing. Any
/// error leaves the store untouched for that step onwards.
pub async fn process_id(
    pipeline: &Pipeline,
    fetcher: &dyn RecordFetcher,
    id: ExternalId,
) -> Result<Classification, HarvestError> {
    let raw = fetcher.fetch(id).await?;

    if let Some(stub) = StoredMeta::for_class(id, classify_payload(&raw)) {
        pipeline.store.upsert(id, &stub.to_document()).await?;
        return Ok(if stub.reviewed {
            Classification::NotReviewed
        } else {
            Classification::Withdrawn
        });
    }

    let html = decode_latin1(&raw);
    let report = pipeline.transformer.transform(id, &html)?;

    let outcome = if report.is_hidden() {
        Classification::Hidden
    } else {
        let doc = report.to_document()?;
        pipeline.store.upsert(id, &doc).await?;
        let op = IndexOp::new(&pipeline.index_name, pipeline.doc_type.as_deref(), id, doc);
        pipeline.queue.push(op).await?;
        Classification::Visible
    };

    tokio::time::sleep(pipeline.delay).await;
    Ok(outcome)
}

/// Outcome counters shared by all workers
#[derive(Debug, Default)]
pub struct HarvestStats {
    skipped: AtomicU64,
    withdrawn: AtomicU64,
    not_reviewed: AtomicU64,
    hidden: AtomicU64,
    stored: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of [`HarvestStats`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HarvestCounts {
    /// Already present in the store, not fetched
    pub skipped: u64,
    pub withdrawn: u64,
    pub not_reviewed: u64,
    pub hidden: u64,
    pub stored: u64,
    pub failed: u64,
}

impl HarvestStats {
    pub fn record(&self, class: Classification) {
        let counter = match class {
            Classification::Withdrawn => &self.withdrawn,
            Classification::NotReviewed => &self.not_reviewed,
            Classification::Hidden => &self.hidden,
            Classification::Visible => &self.stored,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HarvestCounts {
        HarvestCounts {
            skipped: self.skipped.load(Ordering::Relaxed),
            withdrawn: self.withdrawn.load(Ordering::Relaxed),
            not_reviewed: self.not_reviewed.load(Ordering::Relaxed),
            hidden: self.hidden.load(Ordering::Relaxed),
            stored: self.stored.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// State shared by every worker of one run
pub struct WorkerContext {
    pub pipeline: Pipeline,
    pub cursor: IdCursor,
    pub fetchers: FetcherFactory,
    pub stats: HarvestStats,
    pub progress: IdProgress,
}

/// Consume IDs until the cursor is exhausted or shutdown is requested.
///
/// Per-ID failures are logged and skipped. A failing existence check
/// abandons the in-flight ID and ends the loop with `Err` so the
/// supervisor can restart it.
pub async fn run_worker(ctx: Arc<WorkerContext>, worker: usize) -> anyhow::Result<()> {
    let fetcher = (ctx.fetchers)().with_context(|| format!("worker {worker}: HTTP client"))?;

    while !is_shutdown_requested() {
        let Some(id) = ctx.cursor.next() else {
            break;
        };

        let exists = ctx.pipeline.store.exists(id).await;
        if exists.is_err() {
            // the abandoned ID still counts as attempted
            ctx.progress.inc();
        }
        let exists =
            exists.with_context(|| format!("worker {worker}: existence check for {id}"))?;

        if exists {
            ctx.stats.record_skip();
        } else {
            match process_id(&ctx.pipeline, fetcher.as_ref(), id).await {
                Ok(class) => {
                    ctx.stats.record(class);
                    match class {
                        Classification::Withdrawn | Classification::NotReviewed => {
                            log::info!("Report {id} not available: {class}.")
                        }
                        Classification::Hidden => log::debug!("Report {id} hidden"),
                        Classification::Visible => log::debug!("Report {id} stored"),
                    }
                }
                Err(e) => {
                    ctx.stats.record_failure();
                    log::error!("Could not load report {id}: {e}");
                }
            }
        }
        ctx.progress.inc();
    }

    log::debug!("worker {worker}: done");
    Ok(())
}
