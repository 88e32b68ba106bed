//! Crawl metrics hooks.
//!
//! ## Counters
//!
//! | Metric | Labels | Meaning |
//! |--------|--------|---------|
//! | `crawl_items_total` | | Ids taken from the listing |
//! | `crawl_lock_contention_total` | | Ids skipped because another worker holds them |
//! | `crawl_filtered_total` | | Ids the filter declined |
//! | `crawl_audits_total` | `outcome` | Completed audits by outcome |
//! | `crawl_item_failures_total` | `error` | Item attempts that failed |
//! | `crawl_pass_aborts_total` | | Passes aborted by an error |
//! | `crawl_passes_total` | | Passes that reached the end of the listing |
//! | `staleness_skipped_relationships_total` | | Relationships without an event link |
//! | `staleness_unparsable_timestamps_total` | | Fixity events with unparsable timestamps |

use std::collections::HashMap;

use tracing::info;

/// Items taken from the listing.
pub const ITEMS_TOTAL: &str = "crawl_items_total";
/// Ids skipped on lock contention.
pub const LOCK_CONTENTION_TOTAL: &str = "crawl_lock_contention_total";
/// Ids the filter declined.
pub const FILTERED_TOTAL: &str = "crawl_filtered_total";
/// Completed audits.
pub const AUDITS_TOTAL: &str = "crawl_audits_total";
/// Failed item attempts.
pub const ITEM_FAILURES_TOTAL: &str = "crawl_item_failures_total";
/// Aborted passes.
pub const PASS_ABORTS_TOTAL: &str = "crawl_pass_aborts_total";
/// Completed passes.
pub const PASSES_TOTAL: &str = "crawl_passes_total";
/// Relationships skipped by the staleness walk.
pub const SKIPPED_RELATIONSHIPS_TOTAL: &str = "staleness_skipped_relationships_total";
/// Unparsable fixity timestamps.
pub const UNPARSABLE_TIMESTAMPS_TOTAL: &str = "staleness_unparsable_timestamps_total";

/// Counter sink for crawl observability.
pub trait CrawlMetrics: Send + Sync {
    /// Increment a counter by `by`.
    fn add(&self, metric_name: &str, labels: &[(&str, &str)], by: u64);

    /// Increment a counter by 1.
    fn increment(&self, metric_name: &str, labels: &[(&str, &str)]) {
        self.add(metric_name, labels, 1);
    }
}

/// No-op metrics.
#[derive(Debug, Default)]
pub struct NoOpMetrics;

impl CrawlMetrics for NoOpMetrics {
    fn add(&self, _metric_name: &str, _labels: &[(&str, &str)], _by: u64) {}
}

/// Metrics emitted as structured log lines, aggregated downstream.
#[derive(Debug, Default)]
pub struct TracingMetrics;

impl CrawlMetrics for TracingMetrics {
    fn add(&self, metric_name: &str, labels: &[(&str, &str)], by: u64) {
        if by == 0 {
            return;
        }
        info!(
            target: "fixity_spider::metrics",
            metric = metric_name,
            labels = ?labels,
            value = by,
            "counter"
        );
    }
}

/// In-memory metrics for testing.
#[derive(Debug, Default)]
pub struct TestMetrics {
    /// Counter values keyed by `name:labels`.
    pub counters: std::sync::Mutex<HashMap<String, u64>>,
}

impl CrawlMetrics for TestMetrics {
    fn add(&self, metric_name: &str, labels: &[(&str, &str)], by: u64) {
        let key = format!("{}:{:?}", metric_name, labels);
        let mut counters = self.counters.lock().unwrap();
        *counters.entry(key).or_insert(0) += by;
    }
}

impl TestMetrics {
    /// Total for a metric across all label sets.
    pub fn get_count(&self, metric_name: &str) -> u64 {
        let prefix = format!("{metric_name}:");
        let counters = self.counters.lock().unwrap();
        counters
            .iter()
            .filter(|(k, _)| k.starts_with(&prefix))
            .map(|(_, v)| v)
            .sum()
    }

    /// Value for a metric with an exact label set.
    pub fn get_labeled(&self, metric_name: &str, labels: &[(&str, &str)]) -> u64 {
        let key = format!("{}:{:?}", metric_name, labels);
        self.counters.lock().unwrap().get(&key).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_sum_across_labels() {
        let metrics = TestMetrics::default();
        metrics.increment(AUDITS_TOTAL, &[("outcome", "SUCCESS")]);
        metrics.increment(AUDITS_TOTAL, &[("outcome", "FAIL")]);
        metrics.add(AUDITS_TOTAL, &[("outcome", "FAIL")], 2);

        assert_eq!(metrics.get_count(AUDITS_TOTAL), 4);
        assert_eq!(metrics.get_labeled(AUDITS_TOTAL, &[("outcome", "FAIL")]), 3);
        assert_eq!(metrics.get_count(ITEMS_TOTAL), 0);
    }

    #[test]
    fn test_prefix_does_not_match_longer_names() {
        let metrics = TestMetrics::default();
        metrics.increment(PASS_ABORTS_TOTAL, &[]);
        assert_eq!(metrics.get_count("crawl_pass"), 0);
    }
}
