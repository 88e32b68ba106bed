//! HTTP catalog client.
//!
//! ## Endpoints
//!
//! - `GET {base}/object_list?cursor=..&limit=..` - one page of object ids
//! - `GET {base}/{kind}_list/{id}` - one record as JSON
//! - `POST {base}/{kind}_list` - form field `record` holding the JSON record
//!
//! Every call requires status 200 exactly. Ids travel as a single path
//! segment, percent-encoded. A listing must carry a `pagination` object.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::types::{AgentRecord, EventRecord, ObjectRecord, RelationshipRecord, RightsRecord};
use super::{CatalogError, ObjectPage, ProvenanceCatalog, RecordKind};

/// Configuration for the HTTP catalog client.
#[derive(Debug, Clone)]
pub struct HttpCatalogConfig {
    /// Catalog root URL.
    pub base_url: String,
    /// Per-request timeout (default: 30s).
    pub request_timeout: Duration,
}

impl HttpCatalogConfig {
    /// Configuration for `base_url` with default timeouts.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[derive(Debug, Deserialize)]
struct ListingEntry {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    #[serde(default)]
    next_cursor: Option<String>,
}

// `pagination` is required: a listing without it is a decode error, never
// the end of the pass.
#[derive(Debug, Deserialize)]
struct ObjectListing {
    object_list: Vec<ListingEntry>,
    pagination: Pagination,
}

/// Catalog client over HTTP.
pub struct HttpCatalog {
    client: Client,
    base: Url,
}

impl HttpCatalog {
    /// Create a client from configuration.
    pub fn new(config: HttpCatalogConfig) -> Result<Self, CatalogError> {
        let base = Url::parse(&config.base_url)
            .map_err(|e| CatalogError::InvalidUrl(format!("{}: {e}", config.base_url)))?;
        if base.cannot_be_a_base() {
            return Err(CatalogError::InvalidUrl(config.base_url));
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| CatalogError::Transport(e.to_string()))?;

        Ok(Self { client, base })
    }

    /// Catalog root URL (no trailing slash).
    pub fn base_url(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    fn url_with(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn record_url(&self, kind: RecordKind, id: &str) -> Url {
        self.url_with(&[kind.list_name(), id])
    }

    fn list_url(&self, kind: RecordKind) -> Url {
        self.url_with(&[kind.list_name()])
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
        kind: RecordKind,
        id: &str,
    ) -> Result<T, CatalogError> {
        let response = self
            .client
            .get(url.clone())
            .query(query)
            .send()
            .await
            .map_err(|e| CatalogError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => {
                return Err(CatalogError::NotFound { kind, id: id.to_string() });
            }
            status => {
                return Err(CatalogError::UnexpectedStatus {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| CatalogError::Transport(e.to_string()))?;

        serde_json::from_slice(&body).map_err(|e| CatalogError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, kind: RecordKind, id: &str) -> Result<T, CatalogError> {
        tracing::trace!(kind = %kind, id = %id, "Fetching record");
        self.get_json(self.record_url(kind, id), &[], kind, id).await
    }

    async fn create<T: Serialize>(&self, kind: RecordKind, record: &T) -> Result<(), CatalogError> {
        let url = self.list_url(kind);
        let body = serde_json::to_string(record).map_err(|e| CatalogError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let response = self
            .client
            .post(url.clone())
            .form(&[("record", body)])
            .send()
            .await
            .map_err(|e| CatalogError::Transport(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(CatalogError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        tracing::debug!(kind = %kind, "Record created");
        Ok(())
    }
}

#[async_trait]
impl ProvenanceCatalog for HttpCatalog {
    async fn list_objects(&self, cursor: &str, limit: usize) -> Result<ObjectPage, CatalogError> {
        let query = [("cursor", cursor.to_string()), ("limit", limit.to_string())];
        let listing: ObjectListing = self
            .get_json(self.list_url(RecordKind::Object), &query, RecordKind::Object, cursor)
            .await?;

        Ok(ObjectPage {
            ids: listing.object_list.into_iter().map(|e| e.id).collect(),
            next_cursor: listing.pagination.next_cursor.filter(|c| !c.is_empty()),
        })
    }

    async fn fetch_object(&self, id: &str) -> Result<ObjectRecord, CatalogError> {
        self.fetch(RecordKind::Object, id).await
    }

    async fn fetch_event(&self, id: &str) -> Result<EventRecord, CatalogError> {
        self.fetch(RecordKind::Event, id).await
    }

    async fn fetch_relationship(&self, id: &str) -> Result<RelationshipRecord, CatalogError> {
        self.fetch(RecordKind::Relationship, id).await
    }

    async fn fetch_agent(&self, id: &str) -> Result<AgentRecord, CatalogError> {
        self.fetch(RecordKind::Agent, id).await
    }

    async fn fetch_rights(&self, id: &str) -> Result<RightsRecord, CatalogError> {
        self.fetch(RecordKind::Rights, id).await
    }

    async fn create_event(&self, event: &EventRecord) -> Result<(), CatalogError> {
        self.create(RecordKind::Event, event).await
    }

    async fn create_relationship(&self, relationship: &RelationshipRecord) -> Result<(), CatalogError> {
        self.create(RecordKind::Relationship, relationship).await
    }
}
