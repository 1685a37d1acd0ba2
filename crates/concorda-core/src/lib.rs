//! # concorda-core
//!
//! Core types, traits, and abstractions for the concorda concept-aggregation
//! service.
//!
//! This crate provides the ontology configuration, the source/canonical
//! concept data model, the merge engine, and the capability interfaces that
//! the other concorda crates depend on.

pub mod defaults;
pub mod error;
pub mod identifiers;
pub mod logging;
pub mod merge;
pub mod model;
pub mod ontology;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use identifiers::{concept_type_path, ConceptKey};
pub use model::{
    CanonicalConcept, ConceptChanges, ConceptEvent, ConceptUpdate, ConcordanceRecord,
    PropertyValue, Relationship, SourceConcept,
};
pub use ontology::{MergingStrategy, OntologyConfig, PropertyType};
pub use traits::{
    ConceptStore, ConcordanceClient, EventPublisher, HealthCheck, RecordStream, StoredConcept,
    UpdateQueue,
};
