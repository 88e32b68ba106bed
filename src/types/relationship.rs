//! Relationship records linking objects to events.

use serde::{Deserialize, Serialize};

typed_identifier!(
    /// Identifier of a relationship record.
    RelationshipIdentifier, "relationshipIdentifierType", "relationshipIdentifierValue"
);

typed_identifier!(
    /// Link from a relationship to an object.
    LinkingObjectIdentifier, "linkingObjectIdentifierType", "linkingObjectIdentifierValue"
);

typed_identifier!(
    /// Link from a relationship to an event.
    LinkingEventIdentifier, "linkingEventIdentifierType", "linkingEventIdentifierValue"
);

/// A relationship in the provenance graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipRecord {
    /// Relationship identifiers.
    #[serde(default)]
    pub relationship_identifier: Vec<RelationshipIdentifier>,
    /// Relationship type (e.g. `"link"`).
    #[serde(default)]
    pub relationship_type: String,
    /// Relationship subtype (e.g. `"simple"`).
    #[serde(default)]
    pub relationship_sub_type: String,
    /// Free-text note.
    #[serde(default)]
    pub relationship_note: String,
    /// Linked objects.
    #[serde(default)]
    pub linking_object_identifier: Vec<LinkingObjectIdentifier>,
    /// Linked events.
    #[serde(default)]
    pub linking_event_identifier: Vec<LinkingEventIdentifier>,
}

impl RelationshipRecord {
    /// Create a relationship with a `"uuid"` identifier.
    pub fn new(
        id: impl Into<String>,
        relationship_type: impl Into<String>,
        sub_type: impl Into<String>,
    ) -> Self {
        Self {
            relationship_identifier: vec![RelationshipIdentifier::uuid(id)],
            relationship_type: relationship_type.into(),
            relationship_sub_type: sub_type.into(),
            ..Self::default()
        }
    }

    /// Set the note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.relationship_note = note.into();
        self
    }

    /// Link an object by `"uuid"` id.
    pub fn linking_object(mut self, object_id: impl Into<String>) -> Self {
        self.linking_object_identifier
            .push(LinkingObjectIdentifier::uuid(object_id));
        self
    }

    /// Link an event by `"uuid"` id.
    pub fn linking_event(mut self, event_id: impl Into<String>) -> Self {
        self.linking_event_identifier
            .push(LinkingEventIdentifier::uuid(event_id));
        self
    }

    /// Primary identifier value.
    pub fn id(&self) -> Option<&str> {
        self.relationship_identifier.first().map(|i| i.value.as_str())
    }

    /// Linked event ids (empty when the relationship links no event).
    pub fn linked_event_ids(&self) -> Vec<String> {
        self.linking_event_identifier
            .iter()
            .map(|l| l.value.clone())
            .collect()
    }

    /// Whether this relationship links at least one event.
    pub fn links_event(&self) -> bool {
        !self.linking_event_identifier.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_links_object_and_event() {
        let rel = RelationshipRecord::new("r1", "link", "simple")
            .with_note("links the object to a fixity check")
            .linking_object("obj-1")
            .linking_event("ev-1");

        let json = serde_json::to_value(&rel).unwrap();
        assert_eq!(json["relationshipSubType"], "simple");
        assert_eq!(json["linkingObjectIdentifier"][0]["linkingObjectIdentifierValue"], "obj-1");
        assert_eq!(json["linkingEventIdentifier"][0]["linkingEventIdentifierType"], "uuid");
        assert_eq!(rel.linked_event_ids(), vec!["ev-1".to_string()]);
    }

    #[test]
    fn test_relationship_without_event_link() {
        let json = serde_json::json!({
            "relationshipIdentifier": [
                {"relationshipIdentifierType": "uuid", "relationshipIdentifierValue": "r2"}
            ],
            "relationshipType": "structural",
            "linkingObjectIdentifier": [
                {"linkingObjectIdentifierType": "uuid", "linkingObjectIdentifierValue": "obj-1"}
            ]
        });
        let rel: RelationshipRecord = serde_json::from_value(json).unwrap();
        assert_eq!(rel.id(), Some("r2"));
        assert!(!rel.links_event());
    }
}
