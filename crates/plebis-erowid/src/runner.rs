//! Main runner for the harvest pipeline

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use plebis_core::progress::fmt_num;
use plebis_core::{
    FetchError, HttpFetcher, IdCursor, ProgressContext, RecordFetcher, is_shutdown_requested,
    supervise,
};
use plebis_search::{BatchStats, IndexBatcher, SearchIndex};
use plebis_store::DocumentStore;
use tokio::task::JoinSet;

use crate::config::HarvestConfig;
use crate::transform::{HtmlTransformer, Transformer};
use crate::worker::{HarvestCounts, HarvestStats, Pipeline, WorkerContext, run_worker};

/// Builds one fetcher per worker incarnation.
pub type FetcherFactory =
    Arc<dyn Fn() -> Result<Arc<dyn RecordFetcher>, FetchError> + Send + Sync>;

/// Harvest execution summary
#[derive(Debug, Clone)]
pub struct Summary {
    pub total_ids: u64,
    /// IDs taken by a worker and finished (skips and failures included)
    pub attempted: u64,
    pub counts: HarvestCounts,
    pub restarts: u32,
    /// Workers whose restart budget ran out
    pub retired_workers: usize,
    pub index: BatchStats,
    pub ids_exhausted: bool,
    pub interrupted: bool,
    pub elapsed: Duration,
}

impl Summary {
    /// Every ID was handed out, no worker retired and no index batch was lost
    pub fn is_complete(&self) -> bool {
        self.ids_exhausted && self.retired_workers == 0 && self.index.dropped == 0
    }

    pub fn log(&self) {
        let c = &self.counts;
        log::info!("=== Harvest Summary ===");
        log::info!(
            "IDs: {}/{} attempted ({} already stored)",
            fmt_num(self.attempted),
            fmt_num(self.total_ids),
            fmt_num(c.skipped)
        );
        log::info!(
            "Reports: {} stored, {} hidden, {} withdrawn, {} not reviewed, {} failed",
            fmt_num(c.stored),
            fmt_num(c.hidden),
            fmt_num(c.withdrawn),
            fmt_num(c.not_reviewed),
            fmt_num(c.failed)
        );
        log::info!(
            "Index: {} indexed in {} requests ({} rejected, {} dropped)",
            fmt_num(self.index.indexed),
            self.index.requests,
            self.index.rejected,
            self.index.dropped
        );
        if self.restarts > 0 || self.retired_workers > 0 {
            log::warn!(
                "Workers: {} restarts, {} retired",
                self.restarts,
                self.retired_workers
            );
        }
        if self.interrupted {
            log::warn!("Interrupted before the ID range was exhausted");
        }
        log::info!("Time: {:.1}s", self.elapsed.as_secs_f64());
    }
}

pub struct Harvester {
    config: HarvestConfig,
    store: Arc<dyn DocumentStore>,
    index: Arc<dyn SearchIndex>,
    transformer: Arc<dyn Transformer>,
    fetchers: FetcherFactory,
}

impl Harvester {
    /// Harvester over HTTP with the HTML transformer
    pub fn new(
        config: HarvestConfig,
        store: Arc<dyn DocumentStore>,
        index: Arc<dyn SearchIndex>,
    ) -> Self {
        let http = config.http.clone();
        let fetchers: FetcherFactory = Arc::new(move || {
            HttpFetcher::new(&http).map(|f| Arc::new(f) as Arc<dyn RecordFetcher>)
        });
        Self {
            config,
            store,
            index,
            transformer: Arc::new(HtmlTransformer::new()),
            fetchers,
        }
    }

    pub fn with_transformer(mut self, transformer: Arc<dyn Transformer>) -> Self {
        self.transformer = transformer;
        self
    }

    pub fn with_fetchers(mut self, fetchers: FetcherFactory) -> Self {
        self.fetchers = fetchers;
        self
    }

    /// Run the pool over the configured range, then drain the index queue.
    pub async fn run(self, progress: &ProgressContext) -> Result<Summary> {
        let start = Instant::now();
        let config = self.config;
        let cursor = IdCursor::new(config.id_range());
        let total_ids = cursor.total();
        let workers = config.worker_count();

        log::info!(
            "Harvesting {} IDs ({}..{}) with {} workers",
            fmt_num(total_ids),
            config.start,
            config.end,
            workers
        );

        let (queue, batcher) = IndexBatcher::channel(self.index, config.batch.clone());
        let batcher = batcher.with_status(progress.stage_line("index"));
        let flusher = tokio::spawn(batcher.run());

        let ctx = Arc::new(WorkerContext {
            pipeline: Pipeline {
                store: self.store,
                transformer: self.transformer,
                queue,
                index_name: config.index_name.clone(),
                doc_type: config.doc_type.clone(),
                delay: config.delay,
            },
            cursor,
            fetchers: self.fetchers,
            stats: HarvestStats::default(),
            progress: progress.id_progress("reports", total_ids),
        });

        let mut pool = JoinSet::new();
        for worker in 0..workers {
            let ctx = ctx.clone();
            let policy = config.restart.clone();
            pool.spawn(async move {
                let label = format!("worker {worker}");
                supervise(&label, &policy, || run_worker(ctx.clone(), worker)).await
            });
        }

        let mut restarts = 0;
        let mut retired_workers = 0;
        while let Some(joined) = pool.join_next().await {
            let report = joined.context("worker supervisor task failed")?;
            restarts += report.restarts;
            if report.gave_up {
                retired_workers += 1;
            }
        }

        ctx.progress.finish();
        let attempted = ctx.progress.done();
        let counts = ctx.stats.snapshot();
        let ids_exhausted = ctx.cursor.is_exhausted();

        // last queue handle; the flusher drains the remainder and stops
        drop(ctx);
        let index = flusher.await.context("index flush task failed")?;

        let summary = Summary {
            total_ids,
            attempted,
            counts,
            restarts,
            retired_workers,
            index,
            ids_exhausted,
            interrupted: is_shutdown_requested() && !ids_exhausted,
            elapsed: start.elapsed(),
        };
        summary.log();
        Ok(summary)
    }
}
