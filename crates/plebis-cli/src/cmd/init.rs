//! Init subcommand - create the reports table and its indexes

use anyhow::{Context, Result};
use plebis_store::{INDEXES, PgStore};

use super::print_table;
use crate::config::Config;

pub async fn run(config: &Config) -> Result<()> {
    // connect() creates the schema when missing
    let store = PgStore::connect(&config.store.url, 1)
        .await
        .context("Failed to prepare the store")?;
    let count = store.count().await.context("Failed to count reports")?;

    let mut rows = vec![("Reports", count.to_string())];
    rows.extend(
        INDEXES
            .iter()
            .map(|spec| (spec.name, spec.keys.join(", "))),
    );
    print_table("Store", &rows);
    Ok(())
}
