//! Agent and rights records.
//!
//! The crawler never interprets these; they are fetched by peripheral
//! tooling, so everything beyond the identifier is kept as raw JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

typed_identifier!(
    /// Identifier of an agent record.
    AgentIdentifier, "agentIdentifierType", "agentIdentifierValue"
);

typed_identifier!(
    /// Identifier of a rights record.
    RightsIdentifier, "rightsStatementIdentifierType", "rightsStatementIdentifierValue"
);

/// An agent (person, organization or software) in the provenance graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRecord {
    /// Agent identifiers.
    #[serde(default)]
    pub agent_identifier: Vec<AgentIdentifier>,
    /// Remaining fields, untouched.
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

/// A rights statement in the provenance graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RightsRecord {
    /// Rights statement identifiers.
    #[serde(rename = "rightsStatementIdentifier", default)]
    pub rights_statement_identifier: Vec<RightsIdentifier>,
    /// Remaining fields, untouched.
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_keeps_unknown_fields() {
        let json = serde_json::json!({
            "agentIdentifier": [
                {"agentIdentifierType": "uuid", "agentIdentifierValue": "a1"}
            ],
            "agentName": "fixity checker"
        });
        let agent: AgentRecord = serde_json::from_value(json).unwrap();
        assert!(agent.agent_identifier[0].is_uuid());
        assert_eq!(agent.fields["agentName"], "fixity checker");
    }
}
