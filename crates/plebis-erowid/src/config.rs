//! Harvest run parameters

use std::ops::Range;
use std::time::Duration;

use plebis_core::{ExternalId, HttpConfig, RestartPolicy};
use plebis_search::BatchConfig;

#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// First ID to attempt
    pub start: ExternalId,
    /// Exclusive upper bound
    pub end: ExternalId,
    pub workers: usize,
    /// Pause after each fetched page that produced a report
    pub delay: Duration,
    pub http: HttpConfig,
    pub index_name: String,
    /// Mapping type for the bulk action line; `None` omits `_type`
    pub doc_type: Option<String>,
    pub batch: BatchConfig,
    pub restart: RestartPolicy,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            start: 1,
            end: 200_000,
            workers: 64,
            delay: Duration::from_millis(500),
            http: HttpConfig::default(),
            index_name: "reports".to_string(),
            doc_type: Some("report".to_string()),
            batch: BatchConfig::default(),
            restart: RestartPolicy::default(),
        }
    }
}

impl HarvestConfig {
    /// IDs this run will attempt; empty when `start >= end`
    pub fn id_range(&self) -> Range<ExternalId> {
        self.start..self.end.max(self.start)
    }

    /// Pool size, at least one worker
    pub fn worker_count(&self) -> usize {
        self.workers.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = HarvestConfig::default();
        assert_eq!(config.id_range(), 1..200_000);
        assert_eq!(config.worker_count(), 64);
        assert_eq!(config.delay, Duration::from_millis(500));
        assert_eq!(config.index_name, "reports");
        assert_eq!(config.doc_type.as_deref(), Some("report"));
        assert_eq!(config.batch.max_batch, 500);
    }

    #[test]
    fn inverted_range_is_empty() {
        let config = HarvestConfig {
            start: 10,
            end: 5,
            ..Default::default()
        };
        assert!(config.id_range().is_empty());
    }

    #[test]
    fn zero_workers_clamped() {
        let config = HarvestConfig {
            workers: 0,
            ..Default::default()
        };
        assert_eq!(config.worker_count(), 1);
    }
}
