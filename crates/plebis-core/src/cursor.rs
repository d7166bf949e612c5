//! Lock-free ID cursor for distributing record IDs across concurrent workers

use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::ExternalId;

/// Shared, monotonically advancing cursor over a bounded ID range.
///
/// Workers call [`next()`](IdCursor::next) to atomically claim the next ID.
/// Every call returns a distinct ID until the range is exhausted.
#[derive(Debug)]
pub struct IdCursor {
    start: ExternalId,
    end: ExternalId,
    next: AtomicU64,
}

impl IdCursor {
    /// Create a cursor over `range` (end exclusive)
    pub fn new(range: Range<ExternalId>) -> Self {
        let end = range.end.max(range.start);
        Self {
            start: range.start,
            end,
            next: AtomicU64::new(range.start),
        }
    }

    /// Claim the next ID to attempt (lock-free)
    pub fn next(&self) -> Option<ExternalId> {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        (id < self.end).then_some(id)
    }

    /// Total IDs in the range
    pub fn total(&self) -> u64 {
        self.end - self.start
    }

    /// IDs handed out so far
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::Relaxed).min(self.end) - self.start
    }

    pub fn is_exhausted(&self) -> bool {
        self.next.load(Ordering::Relaxed) >= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn yields_range_in_order() {
        let c = IdCursor::new(1..4);
        assert_eq!(c.total(), 3);
        assert_eq!(c.next(), Some(1));
        assert_eq!(c.next(), Some(2));
        assert_eq!(c.next(), Some(3));
        assert_eq!(c.next(), None);
        assert!(c.is_exhausted());
    }

    #[test]
    fn issued_saturates_at_total() {
        let c = IdCursor::new(10..12);
        assert_eq!(c.issued(), 0);
        c.next();
        assert_eq!(c.issued(), 1);
        c.next();
        c.next();
        c.next();
        assert_eq!(c.issued(), 2);
    }

    #[test]
    fn empty_range() {
        let c = IdCursor::new(5..5);
        assert_eq!(c.total(), 0);
        assert_eq!(c.next(), None);

        let inverted = IdCursor::new(9..3);
        assert_eq!(inverted.total(), 0);
        assert_eq!(inverted.next(), None);
    }

    #[test]
    fn concurrent_callers_get_distinct_ids() {
        let c = Arc::new(IdCursor::new(1..10_001));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let c = c.clone();
                std::thread::spawn(move || {
                    let mut seen = Vec::new();
                    while let Some(id) = c.next() {
                        seen.push(id);
                    }
                    seen
                })
            })
            .collect();

        let mut all = HashSet::new();
        for h in handles {
            for id in h.join().unwrap() {
                assert!(all.insert(id), "id {id} issued twice");
            }
        }
        assert_eq!(all.len(), 10_000);
    }
}
