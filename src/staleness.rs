//! Staleness filter.
//!
//! Decides whether an object is due for another audit by rebuilding its audit
//! history from the provenance graph:
//!
//! ```text
//! Object --uuid links--> Relationship --linking event--> Event ("fixity check")
//! ```
//!
//! The walk is tolerant of heterogeneous graph shapes: relationships that link
//! no event and events whose timestamp does not parse are skipped and counted,
//! never treated as failures. Catalog errors do propagate.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::catalog::{CatalogError, ProvenanceCatalog};
use crate::crawler::{CrawlError, CrawlFilter};
use crate::metrics::{self, CrawlMetrics, NoOpMetrics};
use crate::types::FIXITY_CHECK_EVENT_TYPE;

/// Audit history reconstructed for one object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StalenessAssessment {
    /// Most recent matching event timestamp.
    pub last_checked: Option<DateTime<Utc>>,
    /// Matching events with a usable timestamp.
    pub dated_events: usize,
    /// Relationships that linked no event.
    pub skipped_relationships: usize,
    /// Matching events whose timestamp did not parse.
    pub unparsable_timestamps: usize,
}

impl StalenessAssessment {
    /// Stale iff never checked, or checked strictly more than `max_age` before `now`.
    ///
    /// A last check in the future (clock skew) is treated as fresh.
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        let Some(last) = self.last_checked else {
            return true;
        };
        match (now - last).to_std() {
            Ok(age) => age > max_age,
            Err(_) => false,
        }
    }
}

/// Filter admitting objects whose last audit is older than a threshold.
pub struct StalenessFilter<C: ProvenanceCatalog + ?Sized> {
    catalog: Arc<C>,
    max_age: Duration,
    event_type: String,
    metrics: Arc<dyn CrawlMetrics>,
}

impl<C: ProvenanceCatalog + ?Sized> StalenessFilter<C> {
    /// Create a filter looking for `"fixity check"` events older than `max_age`.
    pub fn new(catalog: Arc<C>, max_age: Duration) -> Self {
        Self {
            catalog,
            max_age,
            event_type: FIXITY_CHECK_EVENT_TYPE.to_string(),
            metrics: Arc::new(NoOpMetrics),
        }
    }

    /// Match a different event type.
    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    /// Report skip counts to `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<dyn CrawlMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Configured threshold.
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Walk the graph around `object_id` and summarize its audit history.
    pub async fn assess(&self, object_id: &str) -> Result<StalenessAssessment, CatalogError> {
        let object = self.catalog.fetch_object(object_id).await?;
        let mut assessment = StalenessAssessment::default();

        let mut event_ids: BTreeSet<String> = BTreeSet::new();
        for relationship_id in object.uuid_relationship_ids() {
            let relationship = self.catalog.fetch_relationship(&relationship_id).await?;
            if !relationship.links_event() {
                assessment.skipped_relationships += 1;
                continue;
            }
            event_ids.extend(relationship.linked_event_ids());
        }

        for event_id in &event_ids {
            let event = self.catalog.fetch_event(event_id).await?;
            if event.event_type != self.event_type {
                continue;
            }
            match event.timestamp() {
                Some(at) => {
                    assessment.dated_events += 1;
                    assessment.last_checked = assessment.last_checked.max(Some(at));
                }
                None => assessment.unparsable_timestamps += 1,
            }
        }

        self.metrics.add(metrics::SKIPPED_RELATIONSHIPS_TOTAL, &[], assessment.skipped_relationships as u64);
        self.metrics.add(metrics::UNPARSABLE_TIMESTAMPS_TOTAL, &[], assessment.unparsable_timestamps as u64);

        tracing::debug!(
            object_id = %object_id,
            last_checked = ?assessment.last_checked,
            dated_events = assessment.dated_events,
            skipped_relationships = assessment.skipped_relationships,
            unparsable_timestamps = assessment.unparsable_timestamps,
            "Assessed audit history"
        );

        Ok(assessment)
    }

    /// Whether `object_id` is due for audit as of `now`.
    pub async fn is_stale_at(&self, object_id: &str, now: DateTime<Utc>) -> Result<bool, CatalogError> {
        Ok(self.assess(object_id).await?.is_stale(now, self.max_age))
    }

    /// Whether `object_id` is due for audit now.
    pub async fn is_stale(&self, object_id: &str) -> Result<bool, CatalogError> {
        self.is_stale_at(object_id, Utc::now()).await
    }
}

#[async_trait]
impl<C: ProvenanceCatalog + ?Sized> CrawlFilter for StalenessFilter<C> {
    async fn admit(&self, object_id: &str) -> Result<bool, CrawlError> {
        Ok(self.is_stale(object_id).await?)
    }
}
