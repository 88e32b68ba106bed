//! Crawl driver configuration.

use std::str::FromStr;
use std::time::Duration;

/// Default pause before each item.
pub const DEFAULT_ITEM_DELAY: Duration = Duration::from_millis(100);

/// Default pause between completed passes.
pub const DEFAULT_PASS_INTERVAL: Duration = DEFAULT_ITEM_DELAY;

/// Default pause before restarting an aborted pass.
pub const DEFAULT_RESTART_BACKOFF: Duration = Duration::from_secs(5);

/// What a pass does when an item fails for a reason other than contention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Abandon the pass and restart from the beginning of the listing.
    #[default]
    AbortPass,
    /// Log the failure and move on to the next item.
    SkipItem,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "abort-pass" | "abort" => Ok(Self::AbortPass),
            "skip-item" | "skip" => Ok(Self::SkipItem),
            other => Err(format!("unknown failure policy: {other}")),
        }
    }
}

/// Crawl timing and failure handling. Fixed for the life of a crawler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlerConfig {
    /// Pause before each item, applied whether or not the item is processed.
    pub item_delay: Duration,
    /// Pause after a completed pass before listing again. Bounds the listing
    /// rate when the catalog is empty.
    pub pass_interval: Duration,
    /// Pause before restarting after a pass aborts.
    pub restart_backoff: Duration,
    /// Item failure handling.
    pub failure_policy: FailurePolicy,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            item_delay: DEFAULT_ITEM_DELAY,
            pass_interval: DEFAULT_PASS_INTERVAL,
            restart_backoff: DEFAULT_RESTART_BACKOFF,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl CrawlerConfig {
    /// Set the per-item delay.
    pub fn with_item_delay(mut self, delay: Duration) -> Self {
        self.item_delay = delay;
        self
    }

    /// Set the pause between completed passes.
    pub fn with_pass_interval(mut self, interval: Duration) -> Self {
        self.pass_interval = interval;
        self
    }

    /// Set the restart backoff.
    pub fn with_restart_backoff(mut self, backoff: Duration) -> Self {
        self.restart_backoff = backoff;
        self
    }

    /// Set the failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}
