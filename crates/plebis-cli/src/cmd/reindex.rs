//! Reindex subcommand - bring the search index back in line with the store

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use plebis_core::progress::fmt_num;
use plebis_search::ElasticsearchIndex;
use plebis_store::PgStore;

use super::{print_table, redact_url};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct ReindexArgs {
    /// Documents read from the store per query
    #[arg(short, long, default_value_t = 1_000)]
    pub batch: usize,
}

pub async fn run(args: ReindexArgs, config: &Config) -> Result<()> {
    let store = PgStore::connect(&config.store.url, config.store.max_connections)
        .await
        .context("Failed to connect to the store")?;
    let index = ElasticsearchIndex::new(
        &config.search.host,
        Duration::from_secs(config.search.timeout_secs),
    )
    .context("Failed to create search client")?;

    log::info!(
        "Reindexing stored reports into {} ({} per page)",
        redact_url(index.bulk_url()),
        args.batch
    );

    let summary = plebis_erowid::reindex(
        Arc::new(store),
        Arc::new(index),
        &config.search.index,
        config.search.doc_type(),
        args.batch,
        config.search.batch(),
    )
    .await?;

    print_table(
        "Reindex",
        &[
            ("Queued", fmt_num(summary.queued)),
            (
                "Indexed",
                format!(
                    "{} in {} requests",
                    fmt_num(summary.index.indexed),
                    summary.index.requests
                ),
            ),
            ("Rejected", summary.index.rejected.to_string()),
            ("Dropped", summary.index.dropped.to_string()),
            ("Time", format!("{:.1}s", summary.elapsed.as_secs_f64())),
        ],
    );

    if summary.interrupted {
        anyhow::bail!("Reindex interrupted");
    }
    if summary.index.dropped > 0 {
        anyhow::bail!("{} documents could not be indexed", summary.index.dropped);
    }
    Ok(())
}
