//! Structured logging field names for concorda.
//!
//! All crates use these constants so log aggregation tools can query by
//! standardized field names across every subsystem. Downstream log processors
//! key alerting off `transaction_id`, `concept_uuid`, and `alert_tag`.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Pipeline failure, requires operator attention |
//! | WARN  | Recoverable issue (missing source, purge failure) |
//! | INFO  | Lifecycle events, completed pipeline runs |
//! | DEBUG | Per-step progress, downstream call details |

/// Transaction id propagated end-to-end from the blob store through every
/// downstream call.
pub const TRANSACTION_ID: &str = "transaction_id";

/// The concept UUID being processed.
pub const CONCEPT_UUID: &str = "concept_uuid";

/// Authority of a source concept.
pub const AUTHORITY: &str = "authority";

/// Alerting tag picked up by downstream log pipelines.
pub const ALERT_TAG: &str = "alert_tag";

/// Worker task index.
pub const WORKER_ID: &str = "worker_id";

/// Number of messages in a queue batch.
pub const BATCH_SIZE: &str = "batch_size";

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Alert tag emitted when a concordance carries more than one primary
/// authority record.
pub const TAG_MULTIPLE_PRIMARY_AUTHORITIES: &str = "ConceptAggregationMultiplePrimaryAuthorities";
