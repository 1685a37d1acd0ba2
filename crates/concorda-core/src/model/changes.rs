//! Graph-writer response records and downstream event payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response body of a successful graph write: the change events to publish
/// and the ids whose caches must be purged.
///
/// An empty `updated_ids` means the concept was unchanged since the last
/// write; the pipeline short-circuits without further side effects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConceptChanges {
    #[serde(default)]
    pub events: Vec<ConceptEvent>,
    #[serde(rename = "updatedIDs", default)]
    pub updated_ids: Vec<String>,
}

/// One concept-change event, forwarded verbatim to the notification topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConceptEvent {
    #[serde(rename = "type")]
    pub concept_type: String,
    #[serde(rename = "uuid")]
    pub concept_uuid: String,
    #[serde(rename = "aggregateHash", default)]
    pub aggregate_hash: String,
    #[serde(rename = "transactionID", default)]
    pub transaction_id: String,
    #[serde(rename = "eventDetails", default)]
    pub event_details: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decodes_writer_response() {
        let changes: ConceptChanges = serde_json::from_value(json!({
            "events": [{
                "type": "Person",
                "uuid": "28090964-9997-4bc2-9638-7a11135aaff9",
                "aggregateHash": "1234567890",
                "transactionID": "tid_abc",
                "eventDetails": {"type": "Concept Updated"}
            }],
            "updatedIDs": ["28090964-9997-4bc2-9638-7a11135aaff9"]
        }))
        .unwrap();

        assert_eq!(changes.updated_ids.len(), 1);
        assert_eq!(changes.events[0].concept_type, "Person");
        assert_eq!(
            changes.events[0].event_details,
            json!({"type": "Concept Updated"})
        );
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let changes: ConceptChanges = serde_json::from_value(json!({})).unwrap();
        assert!(changes.events.is_empty());
        assert!(changes.updated_ids.is_empty());
    }
}
