//! # fixity-spider
//!
//! Lock-coordinated crawling of a provenance catalog.
//!
//! The crawler answers one question for every object in the catalog:
//!
//! > Do the stored bytes still match the digest the catalog declares for them?
//!
//! ## Core Contract
//!
//! 1. Walk the full object listing, page by page, forever
//! 2. Take a cluster-wide lock on each object before touching it
//! 3. Audit only objects whose last fixity check is older than a threshold
//! 4. Record every audit as an Event linked to the object by a Relationship
//!
//! ## Architecture
//!
//! ```text
//! ObjectPager → QuorumMutex → StalenessFilter → FixityAuditor
//!      ↓              ↓              ↓               ↓
//! ProvenanceCatalog  LockReplica  ProvenanceCatalog  ContentStore + ProvenanceCatalog
//! ```
//!
//! ## Coordination Guarantees
//!
//! - At most one worker holds a given object's lease at a time
//! - Contention skips the object; it is revisited on the next pass
//! - An Event is always posted before the Relationship that links it

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod catalog;
pub mod content;
pub mod pager;
pub mod lock;
pub mod staleness;
pub mod fixity;
pub mod crawler;
pub mod config;
pub mod metrics;

// Re-exports
pub use types::{
    ObjectRecord, EventRecord, RelationshipRecord, AgentRecord, RightsRecord,
    EventOutcome, FIXITY_CHECK_EVENT_TYPE,
};
pub use catalog::{
    ProvenanceCatalog, CatalogError, ObjectPage, RecordKind,
    HttpCatalog, HttpCatalogConfig, InMemoryCatalog,
};
pub use content::{
    ContentStore, ContentError, ContentStream, download_to,
    HttpContentStore, HttpContentConfig, InMemoryContentStore,
};
pub use pager::{ObjectPager, START_CURSOR, PAGE_SIZE};
pub use lock::{
    LockReplica, ReplicaError, LockError, QuorumMutex, QuorumConfig, Lease,
    InMemoryLockReplica,
};
#[cfg(feature = "redis")]
pub use lock::RedisLockReplica;
pub use staleness::{StalenessFilter, StalenessAssessment};
pub use fixity::{
    FixityAuditor, FixityAlgorithm, FixityError, FixityFinding, DigestAccumulator,
    FIXITY_CHUNK_SIZE,
};
pub use crawler::{
    Crawler, CrawlError, CrawlFilter, CrawlAction, AcceptAll, ItemOutcome, PassSummary,
};
pub use config::{CrawlerConfig, FailurePolicy};
pub use metrics::{CrawlMetrics, NoOpMetrics, TracingMetrics, TestMetrics};
