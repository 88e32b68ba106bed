//! Provenance record types.
//!
//! Only the fields the crawler reads or writes are modeled. Field names follow
//! the catalog's camelCase JSON schema; repeatable fields are vectors.

/// Identifier scheme used for every link the crawler follows or writes.
pub const UUID_IDENTIFIER_TYPE: &str = "uuid";

/// Declares a `(type, value)` identifier pair with schema-specific field names.
macro_rules! typed_identifier {
    ($(#[$meta:meta])* $name:ident, $type_field:literal, $value_field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        pub struct $name {
            /// Identifier scheme (e.g. `"uuid"`).
            #[serde(rename = $type_field)]
            pub id_type: String,
            /// Identifier value.
            #[serde(rename = $value_field)]
            pub value: String,
        }

        impl $name {
            /// Create a `"uuid"`-typed identifier.
            pub fn uuid(value: impl Into<String>) -> Self {
                Self {
                    id_type: $crate::types::UUID_IDENTIFIER_TYPE.to_string(),
                    value: value.into(),
                }
            }

            /// Whether this identifier uses the `"uuid"` scheme.
            pub fn is_uuid(&self) -> bool {
                self.id_type == $crate::types::UUID_IDENTIFIER_TYPE
            }
        }
    };
}

pub mod object;
pub mod event;
pub mod relationship;
pub mod agent;

pub use object::{ObjectRecord, ObjectIdentifier, ObjectCharacteristics, Fixity, LinkingRelationshipIdentifier};
pub use event::{
    EventRecord, EventIdentifier, EventDetailInformation, EventOutcomeInformation,
    EventOutcomeDetail, EventOutcome, EVENT_TIMESTAMP_FORMAT, FIXITY_CHECK_EVENT_TYPE, format_event_timestamp,
    parse_event_timestamp,
};
pub use relationship::{
    RelationshipRecord, RelationshipIdentifier, LinkingObjectIdentifier, LinkingEventIdentifier,
};
pub use agent::{AgentRecord, AgentIdentifier, RightsRecord, RightsIdentifier};
