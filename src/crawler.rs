//! Crawl driver.
//!
//! Walks the object listing forever. For every id it takes the distributed
//! lock, asks the filter whether the object is due, runs the action, and
//! releases the lock:
//!
//! ```text
//! pager ──id──► try_acquire ──lease──► filter.admit ──yes──► action.apply
//!                   │                        │                    │
//!               contention                   no                   │
//!                   ▼                        ▼                    ▼
//!                 skip ◄──────────────── release ◄────────────────┘
//! ```
//!
//! Several crawlers may run against the same catalog; the lock keeps them
//! from working on the same object at once.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::catalog::{CatalogError, ProvenanceCatalog};
use crate::config::{CrawlerConfig, FailurePolicy};
use crate::content::ContentError;
use crate::fixity::FixityError;
use crate::lock::{LockError, QuorumMutex};
use crate::metrics::{self, CrawlMetrics, NoOpMetrics};
use crate::pager::ObjectPager;

/// Error type for crawl items and passes.
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    /// Catalog failure (listing or filter reads).
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    /// Audit failure.
    #[error("fixity error: {0}")]
    Fixity(#[from] FixityError),
    /// Content store failure.
    #[error("content error: {0}")]
    Content(#[from] ContentError),
    /// Lock failure other than contention.
    #[error("lock error: {0}")]
    Lock(#[from] LockError),
    /// Failure raised by a custom filter or action.
    #[error("{0}")]
    Other(String),
}

impl CrawlError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Catalog(_) => "catalog",
            Self::Fixity(_) => "fixity",
            Self::Content(_) => "content",
            Self::Lock(_) => "lock",
            Self::Other(_) => "other",
        }
    }
}

/// Decides whether a locked object should be processed.
#[async_trait]
pub trait CrawlFilter: Send + Sync {
    /// `true` to run the action on `object_id`.
    async fn admit(&self, object_id: &str) -> Result<bool, CrawlError>;
}

/// Work performed on an admitted object while its lock is held.
#[async_trait]
pub trait CrawlAction: Send + Sync {
    /// Process `object_id`.
    async fn apply(&self, object_id: &str) -> Result<(), CrawlError>;
}

/// Filter admitting every object.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

#[async_trait]
impl CrawlFilter for AcceptAll {
    async fn admit(&self, _object_id: &str) -> Result<bool, CrawlError> {
        Ok(true)
    }
}

/// What happened to one id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Another worker holds the lock.
    Contended,
    /// The filter declined the object.
    Filtered,
    /// The action ran to completion.
    Processed,
}

/// Counts for one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Ids taken from the listing.
    pub seen: usize,
    /// Ids skipped on contention.
    pub contended: usize,
    /// Ids the filter declined.
    pub filtered: usize,
    /// Ids the action completed.
    pub processed: usize,
    /// Ids that failed under [`FailurePolicy::SkipItem`].
    pub failed: usize,
    /// Listing pages fetched.
    pub pages: usize,
}

/// Lock-coordinated crawl driver.
pub struct Crawler {
    catalog: Arc<dyn ProvenanceCatalog>,
    mutex: Arc<QuorumMutex>,
    filter: Arc<dyn CrawlFilter>,
    action: Arc<dyn CrawlAction>,
    config: CrawlerConfig,
    metrics: Arc<dyn CrawlMetrics>,
}

impl Crawler {
    /// Create a crawler.
    pub fn new(
        catalog: Arc<dyn ProvenanceCatalog>,
        mutex: Arc<QuorumMutex>,
        filter: Arc<dyn CrawlFilter>,
        action: Arc<dyn CrawlAction>,
        config: CrawlerConfig,
    ) -> Self {
        Self {
            catalog,
            mutex,
            filter,
            action,
            config,
            metrics: Arc::new(NoOpMetrics),
        }
    }

    /// Report crawl counters to `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<dyn CrawlMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// Lock, filter and process one id.
    ///
    /// Contention is an outcome, not an error. The lease is released before
    /// returning on every path, including filter and action errors.
    pub async fn process_item(&self, object_id: &str) -> Result<ItemOutcome, CrawlError> {
        let mut lease = match self.mutex.try_acquire(object_id).await {
            Ok(lease) => lease,
            Err(LockError::Contention { granted, quorum, .. }) => {
                debug!(object_id = %object_id, granted, quorum, "Object locked elsewhere, skipping");
                self.metrics.increment(metrics::LOCK_CONTENTION_TOTAL, &[]);
                return Ok(ItemOutcome::Contended);
            }
            Err(e) => return Err(e.into()),
        };

        let result = self.filter_and_apply(object_id).await;
        lease.release().await;

        match &result {
            Ok(ItemOutcome::Filtered) => self.metrics.increment(metrics::FILTERED_TOTAL, &[]),
            Ok(_) => {}
            Err(e) => self.metrics.increment(metrics::ITEM_FAILURES_TOTAL, &[("error", e.kind())]),
        }
        result
    }

    async fn filter_and_apply(&self, object_id: &str) -> Result<ItemOutcome, CrawlError> {
        if !self.filter.admit(object_id).await? {
            debug!(object_id = %object_id, "Object not due, skipping");
            return Ok(ItemOutcome::Filtered);
        }
        self.action.apply(object_id).await?;
        Ok(ItemOutcome::Processed)
    }

    /// Walk the whole listing once, from cursor `"0"` to the end.
    ///
    /// Listing failures always end the pass. Item failures end it under
    /// [`FailurePolicy::AbortPass`] and are counted under
    /// [`FailurePolicy::SkipItem`].
    pub async fn run_pass(&self) -> Result<PassSummary, CrawlError> {
        let mut pager = ObjectPager::new(Arc::clone(&self.catalog));
        let mut summary = PassSummary::default();

        while let Some(ids) = pager.next_page().await? {
            summary.pages = pager.pages_fetched();
            for object_id in ids {
                tokio::time::sleep(self.config.item_delay).await;
                summary.seen += 1;
                self.metrics.increment(metrics::ITEMS_TOTAL, &[]);

                match self.process_item(&object_id).await {
                    Ok(ItemOutcome::Contended) => summary.contended += 1,
                    Ok(ItemOutcome::Filtered) => summary.filtered += 1,
                    Ok(ItemOutcome::Processed) => summary.processed += 1,
                    Err(e) => match self.config.failure_policy {
                        FailurePolicy::AbortPass => return Err(e),
                        FailurePolicy::SkipItem => {
                            warn!(object_id = %object_id, error = %e, "Item failed, continuing pass");
                            summary.failed += 1;
                        }
                    },
                }
            }
        }

        self.metrics.increment(metrics::PASSES_TOTAL, &[]);
        Ok(summary)
    }

    /// Run one pass, then wait out the pass interval on success or the
    /// restart backoff on failure.
    pub async fn run_cycle(&self) -> Result<PassSummary, CrawlError> {
        match self.run_pass().await {
            Ok(summary) => {
                info!(
                    seen = summary.seen,
                    processed = summary.processed,
                    filtered = summary.filtered,
                    contended = summary.contended,
                    failed = summary.failed,
                    pages = summary.pages,
                    pass_interval_ms = self.config.pass_interval.as_millis() as u64,
                    "Crawl pass complete, restarting"
                );
                tokio::time::sleep(self.config.pass_interval).await;
                Ok(summary)
            }
            Err(e) => {
                self.metrics.increment(metrics::PASS_ABORTS_TOTAL, &[]);
                error!(
                    severity = "critical",
                    error = %e,
                    backoff_ms = self.config.restart_backoff.as_millis() as u64,
                    "Crawl pass aborted"
                );
                tokio::time::sleep(self.config.restart_backoff).await;
                Err(e)
            }
        }
    }

    /// Crawl until the task is dropped.
    pub async fn crawl(&self) {
        info!(
            item_delay_ms = self.config.item_delay.as_millis() as u64,
            pass_interval_ms = self.config.pass_interval.as_millis() as u64,
            restart_backoff_ms = self.config.restart_backoff.as_millis() as u64,
            failure_policy = ?self.config.failure_policy,
            "Crawler started"
        );
        loop {
            let _ = self.run_cycle().await;
        }
    }
}
