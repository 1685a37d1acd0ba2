//! Error types for concorda.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias using concorda's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for concorda operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// The elected primary source is missing from the blob store
    #[error("canonical concept {0} not found in S3")]
    CanonicalConceptNotFound(Uuid),

    /// The concordance lookup returned zero records
    #[error("no concordances provided")]
    NoConcordances,

    /// More than one record for a primary authority in a concordance
    #[error("more than 1 primary authority")]
    MultiplePrimaryAuthorities,

    /// Property key is not declared in the ontology
    #[error("unknown concept property: {0}")]
    UnknownProperty(String),

    /// Property value does not match its declared ontology type
    #[error("invalid property value for {name}: {value}")]
    InvalidPropertyValue {
        name: String,
        value: serde_json::Value,
    },

    /// Composite key contains no UUID-shaped substring
    #[error("error while extracting identifiers from key: {0}")]
    InvalidKey(String),

    /// Service is configured read-only; the write pipeline is disabled
    #[error("aggregate service is in read-only mode")]
    ReadOnly,

    /// A writer returned an unexpected HTTP status
    #[error("request to {url} returned status: {status}")]
    WriterStatus { url: String, status: u16 },

    /// Blob store operation failed
    #[error("Store error: {0}")]
    Store(String),

    /// Queue operation failed
    #[error("Queue error: {0}")]
    Queue(String),

    /// Queue message could not be acknowledged
    #[error("error removing message from SQS: {0}")]
    QueueAck(String),

    /// One or more entries in a batched event publish failed
    #[error("Publish error: {0}")]
    Publish(String),

    /// Record stream put failed
    #[error("Stream error: {0}")]
    Stream(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// The surrounding request was cancelled
    #[error("context canceled")]
    Canceled,

    /// The per-message processing deadline expired
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
