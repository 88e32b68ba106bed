//! Provenance catalog backends.
//!
//! The catalog is the only persistent state the crawler touches. It is read
//! page by page, record by record, and appended to with new events and
//! relationships.

pub mod memory;
pub mod http;

use async_trait::async_trait;

use crate::types::{AgentRecord, EventRecord, ObjectRecord, RelationshipRecord, RightsRecord};

/// Record kinds served by the catalog, with their list path fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Object records.
    Object,
    /// Event records.
    Event,
    /// Relationship records.
    Relationship,
    /// Agent records.
    Agent,
    /// Rights records.
    Rights,
}

impl RecordKind {
    /// List endpoint name (`object_list`, `event_list`, ...).
    pub fn list_name(&self) -> &'static str {
        match self {
            Self::Object => "object_list",
            Self::Event => "event_list",
            Self::Relationship => "relationship_list",
            Self::Agent => "agent_list",
            Self::Rights => "rights_list",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Object => "object",
            Self::Event => "event",
            Self::Relationship => "relationship",
            Self::Agent => "agent",
            Self::Rights => "rights",
        };
        f.write_str(name)
    }
}

/// Protocol-level catalog failure. Never retried where it occurs.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Record kind.
        kind: RecordKind,
        /// Requested id.
        id: String,
    },
    /// The catalog answered with a status other than 200.
    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },
    /// The response body could not be decoded.
    #[error("undecodable response from {url}: {reason}")]
    Decode {
        /// Request URL.
        url: String,
        /// Decoder message.
        reason: String,
    },
    /// The configured base URL cannot address catalog records.
    #[error("invalid catalog url: {0}")]
    InvalidUrl(String),
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),
}

/// One page of object ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectPage {
    /// Object ids in catalog order.
    pub ids: Vec<String>,
    /// Cursor for the following page; `None` once the listing is exhausted.
    pub next_cursor: Option<String>,
}

/// Typed access to the provenance catalog.
///
/// Every method is a single round trip. Implementations must return ids in a
/// stable order so that a full listing yields each object once.
#[async_trait]
pub trait ProvenanceCatalog: Send + Sync {
    /// List one page of object ids starting at `cursor`.
    async fn list_objects(&self, cursor: &str, limit: usize) -> Result<ObjectPage, CatalogError>;

    /// Fetch an object record.
    async fn fetch_object(&self, id: &str) -> Result<ObjectRecord, CatalogError>;

    /// Fetch an event record.
    async fn fetch_event(&self, id: &str) -> Result<EventRecord, CatalogError>;

    /// Fetch a relationship record.
    async fn fetch_relationship(&self, id: &str) -> Result<RelationshipRecord, CatalogError>;

    /// Fetch an agent record.
    async fn fetch_agent(&self, id: &str) -> Result<AgentRecord, CatalogError>;

    /// Fetch a rights record.
    async fn fetch_rights(&self, id: &str) -> Result<RightsRecord, CatalogError>;

    /// Append an event record.
    async fn create_event(&self, event: &EventRecord) -> Result<(), CatalogError>;

    /// Append a relationship record.
    async fn create_relationship(&self, relationship: &RelationshipRecord) -> Result<(), CatalogError>;
}

pub use memory::InMemoryCatalog;
pub use http::{HttpCatalog, HttpCatalogConfig};
