//! In-memory catalog for testing.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::types::{AgentRecord, EventRecord, ObjectRecord, RelationshipRecord, RightsRecord};
use super::{CatalogError, ObjectPage, ProvenanceCatalog, RecordKind};

/// A record appended through the catalog, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogWrite {
    /// An event was created.
    Event(EventRecord),
    /// A relationship was created.
    Relationship(RelationshipRecord),
}

#[derive(Debug, Default)]
struct Inner {
    /// Object ids in listing order.
    object_order: Vec<String>,
    objects: BTreeMap<String, ObjectRecord>,
    events: BTreeMap<String, EventRecord>,
    relationships: BTreeMap<String, RelationshipRecord>,
    agents: BTreeMap<String, AgentRecord>,
    rights: BTreeMap<String, RightsRecord>,
    writes: Vec<CatalogWrite>,
    rejected: HashSet<RecordKind>,
}

/// In-memory catalog.
///
/// Cursors are decimal offsets into the listing order, so `"0"` starts a
/// listing exactly as it does against the HTTP catalog.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    inner: RwLock<Inner>,
}

impl InMemoryCatalog {
    /// Create a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object; ids keep their first insertion position in listings.
    pub fn add_object(&self, id: impl Into<String>, object: ObjectRecord) {
        let id = id.into();
        let mut inner = self.inner.write();
        if !inner.objects.contains_key(&id) {
            inner.object_order.push(id.clone());
        }
        inner.objects.insert(id, object);
    }

    /// Add an event under an explicit id.
    pub fn add_event(&self, id: impl Into<String>, event: EventRecord) {
        self.inner.write().events.insert(id.into(), event);
    }

    /// Add a relationship under an explicit id.
    pub fn add_relationship(&self, id: impl Into<String>, relationship: RelationshipRecord) {
        self.inner.write().relationships.insert(id.into(), relationship);
    }

    /// Add an agent under an explicit id.
    pub fn add_agent(&self, id: impl Into<String>, agent: AgentRecord) {
        self.inner.write().agents.insert(id.into(), agent);
    }

    /// Add a rights statement under an explicit id.
    pub fn add_rights(&self, id: impl Into<String>, rights: RightsRecord) {
        self.inner.write().rights.insert(id.into(), rights);
    }

    /// Make every create of `kind` fail with status 500.
    pub fn reject_creates(&self, kind: RecordKind) {
        self.inner.write().rejected.insert(kind);
    }

    /// All records created through the catalog, in order.
    pub fn writes(&self) -> Vec<CatalogWrite> {
        self.inner.read().writes.clone()
    }

    /// Number of objects.
    pub fn num_objects(&self) -> usize {
        self.inner.read().object_order.len()
    }

    fn not_found(kind: RecordKind, id: &str) -> CatalogError {
        CatalogError::NotFound { kind, id: id.to_string() }
    }

    fn check_rejected(inner: &Inner, kind: RecordKind) -> Result<(), CatalogError> {
        if inner.rejected.contains(&kind) {
            return Err(CatalogError::UnexpectedStatus {
                url: format!("memory:///{}", kind.list_name()),
                status: 500,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ProvenanceCatalog for InMemoryCatalog {
    async fn list_objects(&self, cursor: &str, limit: usize) -> Result<ObjectPage, CatalogError> {
        let offset: usize = cursor.parse().map_err(|_| CatalogError::Decode {
            url: "memory:///object_list".to_string(),
            reason: format!("invalid cursor {cursor:?}"),
        })?;

        let inner = self.inner.read();
        let end = offset.saturating_add(limit).min(inner.object_order.len());
        let ids = inner
            .object_order
            .get(offset..end)
            .map(|s| s.to_vec())
            .unwrap_or_default();
        let next_cursor = (end < inner.object_order.len()).then(|| end.to_string());

        Ok(ObjectPage { ids, next_cursor })
    }

    async fn fetch_object(&self, id: &str) -> Result<ObjectRecord, CatalogError> {
        self.inner.read().objects.get(id).cloned()
            .ok_or_else(|| Self::not_found(RecordKind::Object, id))
    }

    async fn fetch_event(&self, id: &str) -> Result<EventRecord, CatalogError> {
        self.inner.read().events.get(id).cloned()
            .ok_or_else(|| Self::not_found(RecordKind::Event, id))
    }

    async fn fetch_relationship(&self, id: &str) -> Result<RelationshipRecord, CatalogError> {
        self.inner.read().relationships.get(id).cloned()
            .ok_or_else(|| Self::not_found(RecordKind::Relationship, id))
    }

    async fn fetch_agent(&self, id: &str) -> Result<AgentRecord, CatalogError> {
        self.inner.read().agents.get(id).cloned()
            .ok_or_else(|| Self::not_found(RecordKind::Agent, id))
    }

    async fn fetch_rights(&self, id: &str) -> Result<RightsRecord, CatalogError> {
        self.inner.read().rights.get(id).cloned()
            .ok_or_else(|| Self::not_found(RecordKind::Rights, id))
    }

    async fn create_event(&self, event: &EventRecord) -> Result<(), CatalogError> {
        let mut inner = self.inner.write();
        Self::check_rejected(&inner, RecordKind::Event)?;

        let id = event.id().unwrap_or_default().to_string();
        inner.events.insert(id, event.clone());
        inner.writes.push(CatalogWrite::Event(event.clone()));
        Ok(())
    }

    async fn create_relationship(&self, relationship: &RelationshipRecord) -> Result<(), CatalogError> {
        let mut inner = self.inner.write();
        Self::check_rejected(&inner, RecordKind::Relationship)?;

        let id = relationship.id().unwrap_or_default().to_string();
        inner.relationships.insert(id.clone(), relationship.clone());
        inner.writes.push(CatalogWrite::Relationship(relationship.clone()));

        // Keep the object -> relationship edge so later passes can walk it.
        for object_id in relationship.linking_object_identifier.iter().map(|l| &l.value) {
            if let Some(object) = inner.objects.get_mut(object_id) {
                object.linking_relationship_identifier
                    .push(crate::types::LinkingRelationshipIdentifier::uuid(id.clone()));
            }
        }
        Ok(())
    }
}
