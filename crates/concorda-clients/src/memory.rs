//! In-memory adapters for deterministic testing and local runs.
//!
//! Each adapter implements the same capability trait as its HTTP
//! counterpart, with failure injection where tests need it.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use uuid::Uuid;

use concorda_core::{
    ConceptEvent, ConceptStore, ConceptUpdate, ConcordanceClient, ConcordanceRecord, Error,
    EventPublisher, HealthCheck, RecordStream, Result, SourceConcept, StoredConcept, UpdateQueue,
};

use crate::queue::{encode_notification, parse_notification};

// ─── Blob store ────────────────────────────────────────────────────────────

/// In-memory concept store keyed by `(publication, uuid)`.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreState>>,
}

#[derive(Default)]
struct MemoryStoreState {
    objects: HashMap<(Option<Uuid>, Uuid), StoredConcept>,
    fail_uuids: HashSet<Uuid>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a concept under the default (internal) scope.
    pub fn insert(&self, concept: SourceConcept, transaction_id: &str) -> &Self {
        self.insert_scoped(None, concept, transaction_id)
    }

    pub fn insert_scoped(
        &self,
        publication: Option<Uuid>,
        concept: SourceConcept,
        transaction_id: &str,
    ) -> &Self {
        let mut state = self.inner.lock().unwrap();
        state.objects.insert(
            (publication, concept.uuid),
            StoredConcept {
                concept,
                transaction_id: transaction_id.to_string(),
            },
        );
        self
    }

    /// Make fetches of the given uuid fail with a store error.
    pub fn fail_on(&self, uuid: Uuid) -> &Self {
        self.inner.lock().unwrap().fail_uuids.insert(uuid);
        self
    }
}

#[async_trait]
impl ConceptStore for MemoryStore {
    async fn fetch(&self, publication: Option<Uuid>, uuid: Uuid) -> Result<Option<StoredConcept>> {
        let state = self.inner.lock().unwrap();
        if state.fail_uuids.contains(&uuid) {
            return Err(Error::Store(format!("injected failure for {uuid}")));
        }
        Ok(state.objects.get(&(publication, uuid)).cloned())
    }
}

#[async_trait]
impl HealthCheck for MemoryStore {
    fn name(&self) -> &str {
        "Check connectivity to concept store"
    }

    async fn check(&self) -> Result<()> {
        Ok(())
    }
}

// ─── Concordances ──────────────────────────────────────────────────────────

/// In-memory concordance lookup.
#[derive(Clone, Default)]
pub struct MemoryConcordances {
    inner: Arc<Mutex<HashMap<Uuid, Vec<ConcordanceRecord>>>>,
}

impl MemoryConcordances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, uuid: Uuid, records: Vec<ConcordanceRecord>) -> &Self {
        self.inner.lock().unwrap().insert(uuid, records);
        self
    }
}

#[async_trait]
impl ConcordanceClient for MemoryConcordances {
    async fn concordances(&self, uuid: Uuid, _bookmark: &str) -> Result<Vec<ConcordanceRecord>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .get(&uuid)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl HealthCheck for MemoryConcordances {
    fn name(&self) -> &str {
        "Check connectivity to concordances service"
    }

    async fn check(&self) -> Result<()> {
        Ok(())
    }
}

// ─── Queue ─────────────────────────────────────────────────────────────────

/// In-memory update queue with receipt handles and visibility-timeout
/// redelivery.
#[derive(Clone)]
pub struct MemoryQueue {
    inner: Arc<Mutex<MemoryQueueState>>,
    max_messages: usize,
    visibility_timeout: Duration,
}

#[derive(Default)]
struct MemoryQueueState {
    next_receipt: u64,
    ready: VecDeque<String>,
    inflight: HashMap<String, (String, Instant)>,
    acked: usize,
}

impl MemoryQueue {
    pub fn new(max_messages: usize, visibility_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryQueueState::default())),
            max_messages,
            visibility_timeout,
        }
    }

    /// Enqueue a wire-format notification for an object key.
    pub fn enqueue(&self, key: &str, bookmark: &str) {
        self.enqueue_raw(encode_notification(key, bookmark));
    }

    pub fn enqueue_raw(&self, body: String) {
        self.inner.lock().unwrap().ready.push_back(body);
    }

    pub fn acked_count(&self) -> usize {
        self.inner.lock().unwrap().acked
    }

    pub fn pending_count(&self) -> usize {
        let state = self.inner.lock().unwrap();
        state.ready.len() + state.inflight.len()
    }
}

#[async_trait]
impl UpdateQueue for MemoryQueue {
    async fn receive(&self) -> Result<Vec<ConceptUpdate>> {
        // Emulate a long poll so callers do not spin on an idle queue.
        if self.inner.lock().unwrap().ready.is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let mut state = self.inner.lock().unwrap();

        // Expired in-flight messages become visible again.
        let now = Instant::now();
        let expired: Vec<String> = state
            .inflight
            .iter()
            .filter(|(_, (_, taken))| now.duration_since(*taken) >= self.visibility_timeout)
            .map(|(receipt, _)| receipt.clone())
            .collect();
        for receipt in expired {
            if let Some((body, _)) = state.inflight.remove(&receipt) {
                state.ready.push_back(body);
            }
        }

        let mut updates = Vec::new();
        while updates.len() < self.max_messages {
            let Some(body) = state.ready.pop_front() else {
                break;
            };
            state.next_receipt += 1;
            let receipt = format!("receipt-{}", state.next_receipt);
            if let Some(update) = parse_notification(&body, receipt.clone()) {
                state.inflight.insert(receipt, (body, now));
                updates.push(update);
            }
        }
        Ok(updates)
    }

    async fn delete(&self, receipt_handle: &str) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        if state.inflight.remove(receipt_handle).is_none() {
            return Err(Error::Queue(format!(
                "unknown receipt handle: {receipt_handle}"
            )));
        }
        state.acked += 1;
        Ok(())
    }
}

#[async_trait]
impl HealthCheck for MemoryQueue {
    fn name(&self) -> &str {
        "Check connectivity to update queue"
    }

    async fn check(&self) -> Result<()> {
        Ok(())
    }
}

// ─── Topic ─────────────────────────────────────────────────────────────────

/// In-memory event publisher recording everything it is given.
#[derive(Clone, Default)]
pub struct MemoryTopic {
    inner: Arc<Mutex<MemoryTopicState>>,
}

#[derive(Default)]
struct MemoryTopicState {
    published: Vec<ConceptEvent>,
    fail_uuids: HashSet<String>,
}

impl MemoryTopic {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make publishing fail for events carrying the given concept uuid.
    pub fn fail_on(&self, concept_uuid: &str) -> &Self {
        self.inner
            .lock()
            .unwrap()
            .fail_uuids
            .insert(concept_uuid.to_string());
        self
    }

    pub fn published(&self) -> Vec<ConceptEvent> {
        self.inner.lock().unwrap().published.clone()
    }
}

#[async_trait]
impl EventPublisher for MemoryTopic {
    async fn publish(&self, events: &[ConceptEvent]) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        let mut failures = Vec::new();
        for (i, event) in events.iter().enumerate() {
            if state.fail_uuids.contains(&event.concept_uuid) {
                failures.push(format!(
                    "publishing {}_{i} event failed: InternalFailure",
                    event.concept_uuid
                ));
            } else {
                state.published.push(event.clone());
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Publish(failures.join("; ")))
        }
    }
}

#[async_trait]
impl HealthCheck for MemoryTopic {
    fn name(&self) -> &str {
        "Check connectivity to events topic"
    }

    async fn check(&self) -> Result<()> {
        Ok(())
    }
}

// ─── Stream ────────────────────────────────────────────────────────────────

/// In-memory record stream.
#[derive(Clone, Default)]
pub struct MemoryStream {
    inner: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl MemoryStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded `(concept_type, payload)` pairs.
    pub fn records(&self) -> Vec<(String, Vec<u8>)> {
        self.inner.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordStream for MemoryStream {
    async fn put_record(&self, payload: &[u8], concept_type: &str) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .push((concept_type.to_string(), payload.to_vec()));
        Ok(())
    }
}

#[async_trait]
impl HealthCheck for MemoryStream {
    fn name(&self) -> &str {
        "Check connectivity to record stream"
    }

    async fn check(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_queue_delivers_and_acks() {
        let queue = MemoryQueue::new(10, Duration::from_secs(60));
        queue.enqueue("28090964/9997/4bc2/9638/7a11135aaff9", "b1");

        let batch = queue.receive().await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].uuid, "28090964-9997-4bc2-9638-7a11135aaff9");

        queue.delete(&batch[0].receipt_handle).await.unwrap();
        assert_eq!(queue.acked_count(), 1);
        assert_eq!(queue.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_memory_queue_redelivers_after_visibility_timeout() {
        let queue = MemoryQueue::new(10, Duration::from_millis(0));
        queue.enqueue("28090964/9997/4bc2/9638/7a11135aaff9", "");

        let first = queue.receive().await.unwrap();
        assert_eq!(first.len(), 1);
        // Not acked, zero visibility: the next poll sees it again.
        let second = queue.receive().await.unwrap();
        assert_eq!(second.len(), 1);
        assert_ne!(first[0].receipt_handle, second[0].receipt_handle);
    }

    #[tokio::test]
    async fn test_memory_queue_rejects_unknown_receipt() {
        let queue = MemoryQueue::new(10, Duration::from_secs(60));
        assert!(queue.delete("nope").await.is_err());
    }

    #[tokio::test]
    async fn test_memory_topic_aggregates_partial_failures() {
        let topic = MemoryTopic::new();
        topic.fail_on("bad-uuid");
        let events = vec![
            ConceptEvent {
                concept_uuid: "good-uuid".to_string(),
                ..Default::default()
            },
            ConceptEvent {
                concept_uuid: "bad-uuid".to_string(),
                ..Default::default()
            },
        ];

        let err = topic.publish(&events).await.unwrap_err();
        assert!(err.to_string().contains("bad-uuid_1"));
        assert_eq!(topic.published().len(), 1);
    }
}
