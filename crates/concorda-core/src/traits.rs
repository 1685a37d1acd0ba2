//! Capability interfaces for external collaborators.
//!
//! Cloud-specific bindings live behind these traits so the pipeline and
//! worker pool stay testable with in-memory implementations.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::model::{ConceptEvent, ConceptUpdate, ConcordanceRecord, SourceConcept};

/// A source concept together with the transaction id stamped on its stored
/// object. The transaction id is propagated through every downstream call.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredConcept {
    pub concept: SourceConcept,
    pub transaction_id: String,
}

/// Content-addressed blob store holding source concepts.
#[async_trait]
pub trait ConceptStore: Send + Sync {
    /// Fetch a source concept by publication scope and UUID.
    ///
    /// `Ok(None)` is a normal miss, not an error.
    async fn fetch(&self, publication: Option<Uuid>, uuid: Uuid) -> Result<Option<StoredConcept>>;
}

/// The concordance service: which authority records refer to the same thing.
#[async_trait]
pub trait ConcordanceClient: Send + Sync {
    /// All concordance records for a concept. A lookup miss yields an empty
    /// list.
    async fn concordances(&self, uuid: Uuid, bookmark: &str) -> Result<Vec<ConcordanceRecord>>;
}

/// The "concept changed" work queue.
#[async_trait]
pub trait UpdateQueue: Send + Sync {
    /// Long-poll for the next batch of notifications. An idle queue returns
    /// an empty batch.
    async fn receive(&self) -> Result<Vec<ConceptUpdate>>;

    /// Acknowledge a message by its receipt handle.
    async fn delete(&self, receipt_handle: &str) -> Result<()>;
}

/// The notification topic for concept-change events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish all events as a single batch. Partial failures are aggregated
    /// into one error listing every failed entry.
    async fn publish(&self, events: &[ConceptEvent]) -> Result<()>;
}

/// The downstream record stream for updated-id notifications.
#[async_trait]
pub trait RecordStream: Send + Sync {
    async fn put_record(&self, payload: &[u8], concept_type: &str) -> Result<()>;
}

/// A named readiness probe exposed by every client.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok` when the collaborator is reachable and serviceable.
    async fn check(&self) -> Result<()>;
}
