//! Plebis Erowid - experience report harvester
//!
//! Walks the Erowid experience ID space with a pool of supervised workers,
//! classifies each page, stores publishable reports and replicates them
//! into the search index.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use plebis_erowid::{HarvestConfig, Harvester};
//!
//! let config = HarvestConfig { end: 100, ..Default::default() };
//! let summary = Harvester::new(config, store, index).run(&progress).await?;
//! println!("Stored {} reports", summary.stored);
//! ```

pub mod classify;
pub mod config;
pub mod decode;
pub mod error;
pub mod reindex;
pub mod report;
pub mod runner;
pub mod transform;
pub mod worker;

// Re-exports
pub use classify::{Classification, PayloadClass, classify_payload};
pub use config::HarvestConfig;
pub use error::{HarvestError, TransformError};
pub use reindex::{ReindexSummary, reindex};
pub use report::{Report, StoredMeta};
pub use runner::{FetcherFactory, Harvester, Summary};
pub use transform::{HtmlTransformer, Transformer};
pub use worker::{HarvestCounts, Pipeline, process_id};
