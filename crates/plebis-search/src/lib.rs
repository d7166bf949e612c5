//! plebis-search: search index replication
//!
//! Index operations are queued by harvest workers and submitted to the
//! search engine in bounded bulk requests by a single flush loop.

pub mod batcher;
pub mod error;
pub mod index;
pub mod memory;
pub mod op;

pub use batcher::{BatchConfig, BatchStats, Drain, IndexBatcher, IndexQueue, QueueClosed};
pub use error::IndexError;
pub use index::{BulkOutcome, ElasticsearchIndex, SearchIndex};
pub use memory::MemoryIndex;
pub use op::{IndexAction, IndexOp};
