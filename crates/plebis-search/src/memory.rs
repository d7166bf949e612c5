//! In-process search index recording every bulk request

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::IndexError;
use crate::index::{BulkOutcome, SearchIndex};
use crate::op::IndexOp;

#[derive(Debug, Default)]
pub struct MemoryIndex {
    requests: Mutex<Vec<Vec<IndexOp>>>,
    /// Remaining bulk calls that fail with HTTP 503
    failing: AtomicUsize,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, n: usize) {
        self.failing.store(n, Ordering::SeqCst);
    }

    /// Sizes of the accepted bulk requests, in order
    pub fn request_sizes(&self) -> Vec<usize> {
        self.lock().iter().map(Vec::len).collect()
    }

    /// IDs of every accepted op, in submission order
    pub fn indexed_ids(&self) -> Vec<u64> {
        self.lock().iter().flatten().map(IndexOp::id).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Vec<IndexOp>>> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    async fn bulk(&self, ops: &[IndexOp]) -> Result<BulkOutcome, IndexError> {
        let injected = self
            .failing
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if injected.is_ok() {
            return Err(IndexError::Http {
                status: Some(503),
                message: "injected failure".to_string(),
            });
        }
        self.lock().push(ops.to_vec());
        Ok(BulkOutcome {
            indexed: ops.len(),
            rejected: 0,
        })
    }
}
