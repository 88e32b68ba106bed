//! Object records.

use serde::{Deserialize, Serialize};

typed_identifier!(
    /// Identifier of an object record.
    ObjectIdentifier, "objectIdentifierType", "objectIdentifierValue"
);

typed_identifier!(
    /// Outbound link from an object to a relationship record.
    LinkingRelationshipIdentifier,
    "linkingRelationshipIdentifierType",
    "linkingRelationshipIdentifierValue"
);

/// A declared content digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixity {
    /// Digest algorithm name (e.g. `"md5"`).
    pub message_digest_algorithm: String,
    /// Hex-encoded digest value.
    pub message_digest: String,
}

impl Fixity {
    /// Create a fixity declaration.
    pub fn new(algorithm: impl Into<String>, digest: impl Into<String>) -> Self {
        Self {
            message_digest_algorithm: algorithm.into(),
            message_digest: digest.into(),
        }
    }
}

/// Technical characteristics block; only fixity is modeled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectCharacteristics {
    /// Fixity declarations.
    #[serde(default)]
    pub fixity: Vec<Fixity>,
}

/// An object in the provenance graph.
///
/// Objects are created by the ingest pipeline; the crawler only reads them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRecord {
    /// Object identifiers.
    #[serde(default)]
    pub object_identifier: Vec<ObjectIdentifier>,
    /// Characteristics blocks carrying fixity declarations.
    #[serde(default)]
    pub object_characteristics: Vec<ObjectCharacteristics>,
    /// Links to relationship records.
    #[serde(default)]
    pub linking_relationship_identifier: Vec<LinkingRelationshipIdentifier>,
}

impl ObjectRecord {
    /// Create an object with a single `"uuid"` identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            object_identifier: vec![ObjectIdentifier::uuid(id)],
            ..Self::default()
        }
    }

    /// Add a fixity declaration in its own characteristics block.
    pub fn with_fixity(mut self, algorithm: impl Into<String>, digest: impl Into<String>) -> Self {
        self.object_characteristics.push(ObjectCharacteristics {
            fixity: vec![Fixity::new(algorithm, digest)],
        });
        self
    }

    /// Add a `"uuid"` link to a relationship.
    pub fn with_relationship(mut self, relationship_id: impl Into<String>) -> Self {
        self.linking_relationship_identifier
            .push(LinkingRelationshipIdentifier::uuid(relationship_id));
        self
    }

    /// Primary identifier value.
    pub fn id(&self) -> Option<&str> {
        self.object_identifier.first().map(|i| i.value.as_str())
    }

    /// All fixity declarations across characteristics blocks.
    pub fn fixities(&self) -> impl Iterator<Item = &Fixity> {
        self.object_characteristics.iter().flat_map(|c| c.fixity.iter())
    }

    /// Relationship ids linked with the `"uuid"` scheme, in record order.
    pub fn uuid_relationship_ids(&self) -> Vec<String> {
        self.linking_relationship_identifier
            .iter()
            .filter(|l| l.is_uuid())
            .map(|l| l.value.clone())
            .collect()
    }
}
