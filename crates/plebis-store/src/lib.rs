//! plebis-store: primary document store for harvested records
//!
//! Records are JSON documents keyed by their external ID. Writes are
//! upserts that replace top-level fields, so repeated harvests converge
//! to the same stored state.

pub mod error;
pub mod memory;
pub mod schema;
pub mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use schema::{INDEXES, IndexSpec, ensure_schema};
pub use store::{DocumentStore, PgStore, merge_top_level};
