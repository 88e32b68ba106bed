//! Fixity audit.
//!
//! Streams an object's bytes through an incremental digest, compares the
//! result with the digest declared on the object record, and records the
//! finding as an Event plus a Relationship linking it to the object.
//!
//! A digest mismatch is a finding (`FAIL`), not an error. Errors are reserved
//! for malformed records, unreachable backends and rejected writes.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use md5::Md5;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::catalog::{CatalogError, ProvenanceCatalog, RecordKind};
use crate::content::{ContentError, ContentStore};
use crate::crawler::{CrawlAction, CrawlError};
use crate::metrics::{self, CrawlMetrics, NoOpMetrics};
use crate::types::{
    EventOutcome, EventRecord, ObjectRecord, RelationshipRecord, FIXITY_CHECK_EVENT_TYPE,
};

/// Largest slice fed to the digest in one update.
pub const FIXITY_CHUNK_SIZE: usize = 8096;

/// Name the auditor signs its events with.
pub const CHECKER_SERVICE: &str = "the fixity checker service";

/// Relationship note written alongside each fixity event.
pub const FIXITY_RELATIONSHIP_NOTE: &str = "links the object to a fixity check";

/// Digest algorithms the auditor can verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FixityAlgorithm {
    /// MD5, the catalog's historical default.
    #[default]
    Md5,
    /// SHA-256.
    Sha256,
}

impl FixityAlgorithm {
    /// Name as it appears in `messageDigestAlgorithm`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
        }
    }

    /// Whether a declared algorithm name refers to this algorithm.
    pub fn matches(&self, declared: &str) -> bool {
        declared.trim().eq_ignore_ascii_case(self.name())
    }

    /// Fresh accumulator for this algorithm.
    pub fn accumulator(&self) -> DigestAccumulator {
        match self {
            Self::Md5 => DigestAccumulator::Md5(Md5::new(), 0),
            Self::Sha256 => DigestAccumulator::Sha256(Sha256::new(), 0),
        }
    }
}

impl FromStr for FixityAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            other => Err(format!("unsupported fixity algorithm: {other}")),
        }
    }
}

impl std::fmt::Display for FixityAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Incremental digest over a byte stream.
pub enum DigestAccumulator {
    /// MD5 state and bytes seen.
    Md5(Md5, u64),
    /// SHA-256 state and bytes seen.
    Sha256(Sha256, u64),
}

impl DigestAccumulator {
    /// Feed `data`, at most [`FIXITY_CHUNK_SIZE`] bytes per update.
    pub fn update(&mut self, data: &[u8]) {
        for chunk in data.chunks(FIXITY_CHUNK_SIZE) {
            match self {
                Self::Md5(hasher, seen) => {
                    hasher.update(chunk);
                    *seen += chunk.len() as u64;
                }
                Self::Sha256(hasher, seen) => {
                    hasher.update(chunk);
                    *seen += chunk.len() as u64;
                }
            }
        }
    }

    /// Bytes fed so far.
    pub fn bytes_seen(&self) -> u64 {
        match self {
            Self::Md5(_, seen) | Self::Sha256(_, seen) => *seen,
        }
    }

    /// Lowercase hex digest.
    pub fn finalize_hex(self) -> String {
        match self {
            Self::Md5(hasher, _) => hex::encode(hasher.finalize()),
            Self::Sha256(hasher, _) => hex::encode(hasher.finalize()),
        }
    }
}

/// Error type for fixity audits.
#[derive(Debug, thiserror::Error)]
pub enum FixityError {
    /// The object declares no digest for the audited algorithm.
    #[error("object {object_id} declares no {algorithm} fixity")]
    MissingFixity {
        /// Audited object.
        object_id: String,
        /// Algorithm looked for.
        algorithm: FixityAlgorithm,
    },
    /// The object declares several digests for the audited algorithm.
    #[error("object {object_id} declares {count} {algorithm} fixities")]
    DuplicateFixity {
        /// Audited object.
        object_id: String,
        /// Algorithm looked for.
        algorithm: FixityAlgorithm,
        /// Declarations found.
        count: usize,
    },
    /// Reading from the catalog failed.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    /// Streaming the content failed.
    #[error("content error: {0}")]
    Content(#[from] ContentError),
    /// The catalog refused a finding record.
    #[error("catalog rejected {kind} record for {object_id}: {source}")]
    RecordRejected {
        /// Record kind that was rejected.
        kind: RecordKind,
        /// Audited object.
        object_id: String,
        /// Underlying catalog error.
        #[source]
        source: CatalogError,
    },
}

/// Result of one completed audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixityFinding {
    /// Audited object.
    pub object_id: String,
    /// Algorithm used.
    pub algorithm: FixityAlgorithm,
    /// Digest declared on the object record.
    pub declared_digest: String,
    /// Digest computed from the content.
    pub computed_digest: String,
    /// Bytes streamed.
    pub bytes: u64,
    /// Recorded outcome.
    pub outcome: EventOutcome,
    /// Id of the posted event.
    pub event_id: String,
    /// Id of the posted relationship.
    pub relationship_id: String,
}

/// Audits objects and records findings in the catalog.
pub struct FixityAuditor<C: ProvenanceCatalog + ?Sized, S: ContentStore + ?Sized> {
    catalog: Arc<C>,
    content: Arc<S>,
    algorithm: FixityAlgorithm,
    metrics: Arc<dyn CrawlMetrics>,
}

impl<C, S> FixityAuditor<C, S>
where
    C: ProvenanceCatalog + ?Sized,
    S: ContentStore + ?Sized,
{
    /// Create an MD5 auditor.
    pub fn new(catalog: Arc<C>, content: Arc<S>) -> Self {
        Self {
            catalog,
            content,
            algorithm: FixityAlgorithm::default(),
            metrics: Arc::new(NoOpMetrics),
        }
    }

    /// Audit with a different algorithm.
    pub fn with_algorithm(mut self, algorithm: FixityAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Report outcomes to `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<dyn CrawlMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Configured algorithm.
    pub fn algorithm(&self) -> FixityAlgorithm {
        self.algorithm
    }

    /// The single declared digest for the configured algorithm.
    pub fn declared_digest(&self, object_id: &str, object: &ObjectRecord) -> Result<String, FixityError> {
        let mut declared = object
            .fixities()
            .filter(|f| self.algorithm.matches(&f.message_digest_algorithm));

        let first = declared.next().ok_or_else(|| FixityError::MissingFixity {
            object_id: object_id.to_string(),
            algorithm: self.algorithm,
        })?;

        let extra = declared.count();
        if extra > 0 {
            return Err(FixityError::DuplicateFixity {
                object_id: object_id.to_string(),
                algorithm: self.algorithm,
                count: extra + 1,
            });
        }

        Ok(first.message_digest.clone())
    }

    /// Stream the content and return `(hex digest, bytes)`.
    pub async fn compute_digest(&self, object_id: &str) -> Result<(String, u64), FixityError> {
        let mut stream = self.content.open(object_id).await?;
        let mut accumulator = self.algorithm.accumulator();

        while let Some(chunk) = stream.next().await {
            accumulator.update(&chunk?);
        }

        let bytes = accumulator.bytes_seen();
        Ok((accumulator.finalize_hex(), bytes))
    }

    /// Build the event and relationship describing a finding.
    pub fn build_records(
        &self,
        object_id: &str,
        outcome: EventOutcome,
        computed_digest: &str,
        at: DateTime<Utc>,
    ) -> (EventRecord, RelationshipRecord) {
        let event_id = Uuid::new_v4().simple().to_string();
        let relationship_id = Uuid::new_v4().simple().to_string();
        let algorithm = self.algorithm.name();

        let event = EventRecord::new(event_id.clone(), FIXITY_CHECK_EVENT_TYPE, at)
            .with_detail(format!("fixity checked via {algorithm} by {CHECKER_SERVICE}"))
            .with_outcome(outcome, format!("Computed {algorithm}: {computed_digest}"));

        let relationship = RelationshipRecord::new(relationship_id, "link", "simple")
            .with_note(FIXITY_RELATIONSHIP_NOTE)
            .linking_object(object_id)
            .linking_event(event_id);

        (event, relationship)
    }

    /// Audit `object_id` and record the finding.
    ///
    /// Missing or duplicate declarations fail before any content is read or
    /// any record is written. The relationship is only posted once the event
    /// has been accepted.
    pub async fn audit(&self, object_id: &str) -> Result<FixityFinding, FixityError> {
        let object = self.catalog.fetch_object(object_id).await?;
        let declared_digest = self.declared_digest(object_id, &object)?;

        let (computed_digest, bytes) = self.compute_digest(object_id).await?;
        let outcome = if computed_digest == declared_digest {
            EventOutcome::Success
        } else {
            EventOutcome::Fail
        };

        let (event, relationship) = self.build_records(object_id, outcome, &computed_digest, Utc::now());

        self.catalog
            .create_event(&event)
            .await
            .map_err(|source| FixityError::RecordRejected {
                kind: RecordKind::Event,
                object_id: object_id.to_string(),
                source,
            })?;

        self.catalog
            .create_relationship(&relationship)
            .await
            .map_err(|source| FixityError::RecordRejected {
                kind: RecordKind::Relationship,
                object_id: object_id.to_string(),
                source,
            })?;

        self.metrics.increment(metrics::AUDITS_TOTAL, &[("outcome", outcome.as_str())]);

        match outcome {
            EventOutcome::Success => tracing::info!(
                object_id = %object_id,
                algorithm = %self.algorithm,
                bytes = bytes,
                "Fixity verified"
            ),
            EventOutcome::Fail => tracing::warn!(
                object_id = %object_id,
                algorithm = %self.algorithm,
                declared = %declared_digest,
                computed = %computed_digest,
                bytes = bytes,
                "Fixity mismatch"
            ),
        }

        Ok(FixityFinding {
            object_id: object_id.to_string(),
            algorithm: self.algorithm,
            declared_digest,
            computed_digest,
            bytes,
            outcome,
            event_id: event.id().unwrap_or_default().to_string(),
            relationship_id: relationship.id().unwrap_or_default().to_string(),
        })
    }
}

#[async_trait]
impl<C, S> CrawlAction for FixityAuditor<C, S>
where
    C: ProvenanceCatalog + ?Sized,
    S: ContentStore + ?Sized,
{
    async fn apply(&self, object_id: &str) -> Result<(), CrawlError> {
        self.audit(object_id).await?;
        Ok(())
    }
}
