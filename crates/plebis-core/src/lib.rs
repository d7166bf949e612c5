//! Plebis Core - Common infrastructure for record harvesting pipelines
//!
//! This crate provides the source-agnostic pieces of a harvest run:
//! ID distribution across workers, HTTP fetching, retry, worker
//! supervision, logging and progress reporting.

pub mod cursor;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod progress;
pub mod retry;
pub mod shutdown;
pub mod supervisor;

/// Sequential key identifying one remote record.
pub type ExternalId = u64;

// Re-exports for convenience
pub use cursor::IdCursor;
pub use error::FetchError;
pub use fetch::{HttpConfig, HttpFetcher, RecordFetcher};
pub use logging::init_logging;
pub use progress::{ProgressContext, SharedProgress};
pub use retry::{Retryable, backoff_duration, retry_with_backoff};
pub use shutdown::{install_signal_handlers, is_shutdown_requested, shutdown_flag};
pub use supervisor::{RestartPolicy, SupervisorReport, supervise};
