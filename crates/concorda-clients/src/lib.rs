//! # concorda-clients
//!
//! Adapters for concorda's external collaborators: the content-addressed
//! blob stores, the concordance service, the graph and search writers, the
//! cache purger, and the queue/topic/stream plumbing.
//!
//! Cloud services speak the AWS JSON 1.0 wire protocol against a configured
//! endpoint (an emulator or signing sidecar); request signing is deliberately
//! out of scope. Everything else is plain HTTP via a shared [`reqwest`]
//! client.

mod aws;

pub mod concordances;
pub mod memory;
pub mod purger;
pub mod queue;
pub mod store;
pub mod stream;
pub mod topic;
pub mod writers;

pub use concordances::ConcordancesClient;
pub use purger::PurgerClient;
pub use queue::HttpQueue;
pub use store::BlobStoreClient;
pub use stream::HttpStream;
pub use topic::HttpTopic;
pub use writers::{GraphWriterClient, SearchWriteOutcome, SearchWriterClient};
