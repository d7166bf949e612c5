//! Error types for the per-ID harvest chain

use plebis_core::FetchError;
use plebis_search::QueueClosed;
use plebis_store::StoreError;

/// Page could not be turned into a report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// Required element missing; not an experience page
    NotAReport(String),
}

impl std::fmt::Display for TransformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAReport(what) => write!(f, "not a report page: {what}"),
        }
    }
}

impl std::error::Error for TransformError {}

/// Failure of one step while processing a single ID
#[derive(Debug)]
pub enum HarvestError {
    Fetch(FetchError),
    Transform(TransformError),
    Store(StoreError),
    Encode(serde_json::Error),
    /// Index batcher stopped before the op could be queued
    QueueClosed,
}

impl std::fmt::Display for HarvestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "fetch: {e}"),
            Self::Transform(e) => write!(f, "transform: {e}"),
            Self::Store(e) => write!(f, "store: {e}"),
            Self::Encode(e) => write!(f, "encode: {e}"),
            Self::QueueClosed => write!(f, "index queue closed"),
        }
    }
}

impl std::error::Error for HarvestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fetch(e) => Some(e),
            Self::Transform(e) => Some(e),
            Self::Store(e) => Some(e),
            Self::Encode(e) => Some(e),
            Self::QueueClosed => None,
        }
    }
}

impl From<FetchError> for HarvestError {
    fn from(e: FetchError) -> Self {
        Self::Fetch(e)
    }
}

impl From<TransformError> for HarvestError {
    fn from(e: TransformError) -> Self {
        Self::Transform(e)
    }
}

impl From<StoreError> for HarvestError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<serde_json::Error> for HarvestError {
    fn from(e: serde_json::Error) -> Self {
        Self::Encode(e)
    }
}

impl From<QueueClosed> for HarvestError {
    fn from(_: QueueClosed) -> Self {
        Self::QueueClosed
    }
}
