//! Event records.
//!
//! Events are immutable once posted. The crawler writes fixity-check events
//! and reads them back on later passes to decide staleness.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event type tag written and searched for by fixity audits.
pub const FIXITY_CHECK_EVENT_TYPE: &str = "fixity check";

/// Timestamp format for `eventDateTime` (fraction optional when parsing).
pub const EVENT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Format an event timestamp the way the catalog stores it.
pub fn format_event_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

/// Parse an `eventDateTime` value as UTC, or `None` if it does not match.
pub fn parse_event_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), EVENT_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

typed_identifier!(
    /// Identifier of an event record.
    EventIdentifier, "eventIdentifierType", "eventIdentifierValue"
);

/// Outcome of an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventOutcome {
    /// The check passed.
    Success,
    /// The check ran and found a discrepancy.
    Fail,
}

impl EventOutcome {
    /// Catalog string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Fail => "FAIL",
        }
    }
}

impl fmt::Display for EventOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-text event detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetailInformation {
    /// Detail text.
    pub event_detail: String,
}

/// Note attached to an outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventOutcomeDetail {
    /// Note text.
    pub event_outcome_detail_note: String,
}

/// Outcome block of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventOutcomeInformation {
    /// Outcome string (`SUCCESS`/`FAIL` for fixity checks).
    pub event_outcome: String,
    /// Outcome notes.
    #[serde(default)]
    pub event_outcome_detail: Vec<EventOutcomeDetail>,
}

/// An event in the provenance graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// Event identifiers.
    #[serde(default)]
    pub event_identifier: Vec<EventIdentifier>,
    /// Event type tag (e.g. `"fixity check"`).
    #[serde(default)]
    pub event_type: String,
    /// Event timestamp, see [`EVENT_TIMESTAMP_FORMAT`].
    #[serde(default)]
    pub event_date_time: String,
    /// Detail blocks.
    #[serde(default)]
    pub event_detail_information: Vec<EventDetailInformation>,
    /// Outcome blocks.
    #[serde(default)]
    pub event_outcome_information: Vec<EventOutcomeInformation>,
}

impl EventRecord {
    /// Create an event with a `"uuid"` identifier, type and timestamp.
    pub fn new(id: impl Into<String>, event_type: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            event_identifier: vec![EventIdentifier::uuid(id)],
            event_type: event_type.into(),
            event_date_time: format_event_timestamp(at),
            ..Self::default()
        }
    }

    /// Set the raw timestamp string verbatim.
    pub fn with_raw_timestamp(mut self, raw: impl Into<String>) -> Self {
        self.event_date_time = raw.into();
        self
    }

    /// Add a detail block.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.event_detail_information.push(EventDetailInformation {
            event_detail: detail.into(),
        });
        self
    }

    /// Add an outcome block with one note.
    pub fn with_outcome(mut self, outcome: EventOutcome, note: impl Into<String>) -> Self {
        self.event_outcome_information.push(EventOutcomeInformation {
            event_outcome: outcome.as_str().to_string(),
            event_outcome_detail: vec![EventOutcomeDetail {
                event_outcome_detail_note: note.into(),
            }],
        });
        self
    }

    /// Primary identifier value.
    pub fn id(&self) -> Option<&str> {
        self.event_identifier.first().map(|i| i.value.as_str())
    }

    /// Parsed timestamp, `None` if unparsable.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        parse_event_timestamp(&self.event_date_time)
    }

    /// First outcome string.
    pub fn outcome(&self) -> Option<&str> {
        self.event_outcome_information
            .first()
            .map(|o| o.event_outcome.as_str())
    }

    /// First outcome note.
    pub fn outcome_note(&self) -> Option<&str> {
        self.event_outcome_information
            .first()
            .and_then(|o| o.event_outcome_detail.first())
            .map(|d| d.event_outcome_detail_note.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_format_accepts_fraction_and_whole_seconds() {
        let with_fraction = parse_event_timestamp("2017-05-09 14:32:11.123456").unwrap();
        let whole = parse_event_timestamp("2017-05-09 14:32:11").unwrap();
        assert_eq!(whole, Utc.with_ymd_and_hms(2017, 5, 9, 14, 32, 11).unwrap());
        assert!(with_fraction > whole);
    }

    #[test]
    fn test_timestamp_rejects_other_formats() {
        assert!(parse_event_timestamp("2017-05-09T14:32:11Z").is_none());
        assert!(parse_event_timestamp("yesterday").is_none());
        assert!(parse_event_timestamp("").is_none());
    }

    #[test]
    fn test_written_timestamp_parses_back() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let event = EventRecord::new("e1", "fixity check", at);
        assert_eq!(event.event_date_time, "2024-01-02 03:04:05.000000");
        assert_eq!(event.timestamp(), Some(at));
    }

    #[test]
    fn test_serialized_shape() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let event = EventRecord::new("e1", "fixity check", at)
            .with_detail("checked")
            .with_outcome(EventOutcome::Fail, "Computed md5: 00");

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["eventIdentifier"][0]["eventIdentifierValue"], "e1");
        assert_eq!(json["eventType"], "fixity check");
        assert_eq!(json["eventOutcomeInformation"][0]["eventOutcome"], "FAIL");
        assert_eq!(
            json["eventOutcomeInformation"][0]["eventOutcomeDetail"][0]["eventOutcomeDetailNote"],
            "Computed md5: 00"
        );
        assert_eq!(event.outcome(), Some("FAIL"));
        assert_eq!(event.outcome_note(), Some("Computed md5: 00"));
    }
}
