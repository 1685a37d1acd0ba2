//! Data model: source concepts, canonical concepts, relationships,
//! concordance records, and queue notifications.

pub mod canonical;
pub mod changes;
pub mod property;
pub mod relationship;
pub mod source;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use canonical::CanonicalConcept;
pub use changes::{ConceptChanges, ConceptEvent};
pub use property::PropertyValue;
pub use relationship::Relationship;
pub use source::SourceConcept;

/// One entry of a concept's concordance: an authority's record known to refer
/// to the same real-world thing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcordanceRecord {
    pub uuid: Uuid,
    pub authority: String,
    #[serde(rename = "authorityValue")]
    pub authority_value: String,
}

/// A "concept changed" notification pulled from the work queue.
///
/// The uuid may be a composite `<publication>-<concept>` key. The receipt
/// handle acknowledges the message once the pipeline succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptUpdate {
    pub uuid: String,
    pub bookmark: String,
    pub receipt_handle: String,
}
