//! The aggregation pipeline.
//!
//! One pipeline run takes a "concept changed" notification through a fixed
//! sequence: resolve the concordance, fetch every source concept, merge them
//! into the canonical view, write it to the graph, purge caches, write to
//! search, publish change events, push the updated ids to the record stream,
//! and finally acknowledge the notification. An error at any step aborts the
//! run without acking, so queue redelivery drives the retry.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use concorda_clients::{GraphWriterClient, PurgerClient, SearchWriteOutcome, SearchWriterClient};
use concorda_core::identifiers::trailing_uuid;
use concorda_core::ontology::SMARTLOGIC_AUTHORITY;
use concorda_core::{
    concept_type_path, defaults, merge, CanonicalConcept, ConceptKey, ConceptStore, ConceptUpdate,
    ConcordanceClient, ConcordanceRecord, Error, EventPublisher, RecordStream, Result,
    SourceConcept, StoredConcept, UpdateQueue,
};

use crate::concordance::bucket_concordances;

/// Tuning and mode switches for the pipeline.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Deadline for one full pipeline run.
    pub process_timeout: Duration,
    /// Disables the write pipeline; only the read path stays available.
    pub read_only: bool,
    /// Types purged from their public plural endpoints as well.
    pub public_endpoint_types: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            process_timeout: Duration::from_millis(defaults::PROCESS_TIMEOUT_MS),
            read_only: false,
            public_endpoint_types: defaults::PUBLIC_ENDPOINT_TYPES
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

/// The aggregation service: concordance fan-out, merge, and downstream
/// propagation.
pub struct AggregateService {
    store: Arc<dyn ConceptStore>,
    external_store: Arc<dyn ConceptStore>,
    concordances: Arc<dyn ConcordanceClient>,
    queue: Arc<dyn UpdateQueue>,
    events: Arc<dyn EventPublisher>,
    stream: Arc<dyn RecordStream>,
    graph_writer: GraphWriterClient,
    search_writer: SearchWriterClient,
    purger: PurgerClient,
    config: ServiceConfig,
}

impl AggregateService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn ConceptStore>,
        external_store: Arc<dyn ConceptStore>,
        concordances: Arc<dyn ConcordanceClient>,
        queue: Arc<dyn UpdateQueue>,
        events: Arc<dyn EventPublisher>,
        stream: Arc<dyn RecordStream>,
        graph_writer: GraphWriterClient,
        search_writer: SearchWriterClient,
        purger: PurgerClient,
        config: ServiceConfig,
    ) -> Self {
        Self {
            store,
            external_store,
            concordances,
            queue,
            events,
            stream,
            graph_writer,
            search_writer,
            purger,
            config,
        }
    }

    pub fn read_only(&self) -> bool {
        self.config.read_only
    }

    /// Run the full pipeline for one notification and acknowledge it,
    /// bounded by the per-message deadline. On expiry the message is not
    /// acked, so visibility-timeout redelivery retries it.
    pub async fn process_update(&self, update: &ConceptUpdate) -> Result<()> {
        let work = async {
            self.process_message(&update.uuid, &update.bookmark).await?;
            self.queue
                .delete(&update.receipt_handle)
                .await
                .map_err(|e| Error::QueueAck(e.to_string()))
        };
        match timeout(self.config.process_timeout, work).await {
            Ok(result) => result,
            Err(_) => Err(Error::DeadlineExceeded),
        }
    }

    /// Aggregate the concept behind a (possibly composite) key and propagate
    /// it downstream in the fixed pipeline order.
    pub async fn process_message(&self, key: &str, bookmark: &str) -> Result<()> {
        if self.config.read_only {
            return Err(Error::ReadOnly);
        }

        let (concept, transaction_id) = self.concorded_concept(key, bookmark).await?;
        if concept.is_empty() {
            warn!(concept_uuid = %key, "no sources found, skipping");
            return Ok(());
        }

        let requested = trailing_uuid(key);
        if requested != concept.pref_uuid.to_string() {
            info!(
                %transaction_id,
                concept_uuid = %requested,
                pref_uuid = %concept.pref_uuid,
                "requested concept is a source node for the canonical concept"
            );
        }

        let type_path = concept_type_path(&concept.concept_type);

        debug!(%transaction_id, concept_uuid = %concept.pref_uuid, "writing concept to graph");
        let changes = self
            .graph_writer
            .write(&type_path, &concept, &transaction_id)
            .await?;

        if changes.updated_ids.is_empty() {
            info!(
                %transaction_id,
                concept_uuid = %concept.pref_uuid,
                "concept was unchanged since last update, skipping"
            );
            return Ok(());
        }

        self.purge_updated(&concept, &changes.updated_ids, &transaction_id)
            .await;

        if is_type_allowed_in_search(&concept) {
            debug!(%transaction_id, concept_uuid = %concept.pref_uuid, "writing concept to search");
            if self
                .search_writer
                .write(&type_path, &concept, &transaction_id)
                .await?
                == SearchWriteOutcome::UnsupportedType
            {
                debug!(
                    %transaction_id,
                    concept_uuid = %concept.pref_uuid,
                    "search writer skipped unsupported type"
                );
            }
        }

        self.events.publish(&changes.events).await?;

        let payload = serde_json::to_vec(&changes.updated_ids)?;
        self.stream
            .put_record(&payload, &concept.concept_type)
            .await?;

        info!(
            %transaction_id,
            concept_uuid = %concept.pref_uuid,
            "finished processing concept update"
        );
        Ok(())
    }

    /// Resolve the concordance for a key, fetch every source, and merge.
    ///
    /// Returns the canonical concept plus the transaction id of the elected
    /// primary source (or the last fetched secondary when no primary
    /// authority exists).
    pub async fn concorded_concept(
        &self,
        key: &str,
        bookmark: &str,
    ) -> Result<(CanonicalConcept, String)> {
        let parsed = ConceptKey::parse(key)?;
        let records = self
            .concordances
            .concordances(parsed.concept, bookmark)
            .await?;
        debug!(concept_uuid = %parsed.concept, records = records.len(), "resolved concordance");
        let buckets = bucket_concordances(records)?;

        let store = if parsed.publication.is_some() {
            self.external_store.clone()
        } else {
            self.store.clone()
        };

        let secondary_records: Vec<ConcordanceRecord> =
            buckets.secondary_records().cloned().collect();
        let mut fetched: Vec<(ConcordanceRecord, Option<StoredConcept>)> =
            stream::iter(secondary_records.into_iter().map(|record| {
                let store = store.clone();
                let publication = parsed.publication;
                async move {
                    let found = store.fetch(publication, record.uuid).await?;
                    Ok::<_, Error>((record, found))
                }
            }))
            .buffer_unordered(defaults::SOURCE_FETCH_CONCURRENCY)
            .try_collect()
            .await?;

        // Secondaries merge in (authority, uuid) order so overwrite merging
        // and the no-primary fallback stay deterministic.
        fetched.sort_by(|a, b| {
            (a.0.authority.as_str(), a.0.uuid).cmp(&(b.0.authority.as_str(), b.0.uuid))
        });

        let mut transaction_id = String::new();
        let mut secondaries = Vec::with_capacity(fetched.len());
        for (record, found) in fetched {
            match found {
                Some(stored) => {
                    if !stored.transaction_id.is_empty() {
                        transaction_id = stored.transaction_id;
                    }
                    secondaries.push(stored.concept);
                }
                None => {
                    // Missing secondaries still concord: synthesize a Thing
                    // stub from the concordance record.
                    warn!(
                        concept_uuid = %record.uuid,
                        authority = %record.authority,
                        "source concept not found in store"
                    );
                    secondaries.push(thing_stub(&record));
                }
            }
        }

        let primary = match buckets.primary_record() {
            Some(record) => match store.fetch(parsed.publication, record.uuid).await? {
                Some(stored) => {
                    if !stored.transaction_id.is_empty() {
                        transaction_id = stored.transaction_id;
                    }
                    Some(stored.concept)
                }
                None => {
                    let err = Error::CanonicalConceptNotFound(record.uuid);
                    error!(concept_uuid = %parsed.concept, error = %err, "primary source missing");
                    return Err(err);
                }
            },
            None => None,
        };

        let (primary, secondaries) = match primary {
            Some(primary) => (primary, secondaries),
            None => {
                let Some(promoted) = secondaries.pop() else {
                    // Concordance resolution is expected to miss instead;
                    // returning the empty concept keeps legacy behavior.
                    error!(%transaction_id, concept_uuid = %key, "no sources found");
                    return Ok((CanonicalConcept::default(), transaction_id));
                };
                (promoted, secondaries)
            }
        };

        Ok((merge::aggregate(primary, secondaries), transaction_id))
    }

    /// Purge every updated id, plus the extra per-type purges. Purge
    /// failures are logged, never fatal.
    async fn purge_updated(
        &self,
        concept: &CanonicalConcept,
        updated_ids: &[String],
        transaction_id: &str,
    ) {
        if let Err(e) = self
            .purger
            .purge(
                updated_ids,
                &concept.concept_type,
                &self.config.public_endpoint_types,
                transaction_id,
            )
            .await
        {
            error!(
                %transaction_id,
                concept_uuid = %concept.pref_uuid,
                error = %e,
                "concept couldn't be purged from cache"
            );
        }

        match concept.concept_type.as_str() {
            "FinancialInstrument" => {
                if let Some(issuer) = concept.relationship_target("ISSUED_BY") {
                    self.purge_related(issuer, "Organisation", transaction_id)
                        .await;
                }
            }
            "Membership" => match concept.relationship_target("HAS_MEMBER") {
                Some(person) => self.purge_related(person, "Person", transaction_id).await,
                None => warn!(
                    %transaction_id,
                    concept_uuid = %concept.pref_uuid,
                    "membership is missing HAS_MEMBER relationship, skipping person purge"
                ),
            },
            _ => {}
        }
    }

    async fn purge_related(&self, uuid: Uuid, concept_type: &str, transaction_id: &str) {
        if let Err(e) = self
            .purger
            .purge(
                &[uuid.to_string()],
                concept_type,
                &self.config.public_endpoint_types,
                transaction_id,
            )
            .await
        {
            error!(
                %transaction_id,
                concept_uuid = %uuid,
                error = %e,
                "related concept couldn't be purged from cache"
            );
        }
    }
}

fn thing_stub(record: &ConcordanceRecord) -> SourceConcept {
    SourceConcept {
        uuid: record.uuid,
        concept_type: defaults::THING_TYPE.to_string(),
        authority: record.authority.clone(),
        authority_value: record.authority_value.clone(),
        ..Default::default()
    }
}

/// Whether the canonical concept belongs in the search index.
///
/// Memberships only qualify when at least one source is Smartlogic-curated
/// (those drive author discovery).
pub fn is_type_allowed_in_search(concept: &CanonicalConcept) -> bool {
    match concept.concept_type.as_str() {
        "FinancialInstrument" | "MembershipRole" | "BoardRole" => false,
        "IndustryClassification" | "NAICSIndustryClassification" | "FTAnIIndustryClassification" => {
            false
        }
        "Membership" => concept.has_source_with_authority(SMARTLOGIC_AUTHORITY),
        _ => true,
    }
}
