//! Harvest subcommand - walk the ID range and store every report

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use plebis_core::SharedProgress;
use plebis_core::progress::fmt_num;
use plebis_erowid::{HarvestConfig, Harvester, Summary};
use plebis_search::{ElasticsearchIndex, MemoryIndex, SearchIndex};
use plebis_store::{DocumentStore, MemoryStore, PgStore};

use super::{print_table, redact_url};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct HarvestArgs {
    /// First ID to attempt
    #[arg(short, long)]
    pub start: Option<u64>,

    /// Stop before this ID
    #[arg(short, long)]
    pub end: Option<u64>,

    /// Number of concurrent workers
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Pause after each page that yielded a report (milliseconds)
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Keep results in memory; nothing is written to the store or index
    #[arg(long)]
    pub dry_run: bool,
}

impl HarvestArgs {
    /// Config file values with command-line overrides applied
    fn harvest_config(&self, config: &Config) -> HarvestConfig {
        let mut harvest = config.harvest();
        if let Some(start) = self.start {
            harvest.start = start;
        }
        if let Some(end) = self.end {
            harvest.end = end;
        }
        if let Some(workers) = self.workers {
            harvest.workers = workers;
        }
        if let Some(ms) = self.delay_ms {
            harvest.delay = Duration::from_millis(ms);
        }
        harvest
    }
}

pub async fn run(args: HarvestArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let harvest = args.harvest_config(config);

    let store: Arc<dyn DocumentStore>;
    let index: Arc<dyn SearchIndex>;
    if args.dry_run {
        log::info!("Dry run: results are kept in memory");
        store = Arc::new(MemoryStore::new());
        index = Arc::new(MemoryIndex::new());
    } else {
        let pg = PgStore::connect(&config.store.url, config.store.max_connections)
            .await
            .context("Failed to connect to the store")?;
        let es = ElasticsearchIndex::new(
            &config.search.host,
            Duration::from_secs(config.search.timeout_secs),
        )
        .context("Failed to create search client")?;
        log::info!("Indexing into {}", redact_url(es.bulk_url()));
        store = Arc::new(pg);
        index = Arc::new(es);
    }

    let summary = Harvester::new(harvest, store, index).run(progress).await?;
    print_summary(&summary);

    if !summary.is_complete() {
        anyhow::bail!("Harvest incomplete");
    }
    Ok(())
}

fn print_summary(summary: &Summary) {
    let c = &summary.counts;
    print_table(
        "Harvest",
        &[
            (
                "IDs",
                format!(
                    "{}/{} ({} already stored)",
                    fmt_num(summary.attempted),
                    fmt_num(summary.total_ids),
                    fmt_num(c.skipped)
                ),
            ),
            ("Stored", fmt_num(c.stored)),
            ("Hidden", fmt_num(c.hidden)),
            ("Withdrawn", fmt_num(c.withdrawn)),
            ("Not reviewed", fmt_num(c.not_reviewed)),
            ("Failed", fmt_num(c.failed)),
            (
                "Indexed",
                format!(
                    "{} ({} dropped)",
                    fmt_num(summary.index.indexed),
                    summary.index.dropped
                ),
            ),
            (
                "Workers",
                format!(
                    "{} restarts, {} retired",
                    summary.restarts, summary.retired_workers
                ),
            ),
            ("Time", format!("{:.1}s", summary.elapsed.as_secs_f64())),
        ],
    );
}
