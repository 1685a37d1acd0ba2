//! Ontology configuration.
//!
//! The ontology is a declarative document embedded at build time. It declares
//! which dynamic properties a concept may carry (and their types), which
//! relationships exist (cardinality, inline properties, merging strategy,
//! target label), and the set of recognized authorities.
//!
//! The loaded configuration is a process-wide immutable value. Tests may swap
//! it with [`install`], which returns a guard restoring the previous
//! configuration on drop.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// The authority whose record is elected primary when present.
pub const SMARTLOGIC_AUTHORITY: &str = "Smartlogic";

/// Secondary primary authority, elected when no Smartlogic record exists.
pub const MANAGED_LOCATION_AUTHORITY: &str = "ManagedLocation";

/// Authority whose pref label doubles as a scope-note candidate.
pub const TME_AUTHORITY: &str = "TME";

/// Second-preference authority for scope notes.
pub const WIKIDATA_AUTHORITY: &str = "Wikidata";

const DEFAULT_UUID_KEY: &str = "uuid";

static EMBEDDED: &str = include_str!("ontology.json");

/// Declared type of a dynamic property or inline relationship property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum PropertyType {
    #[serde(rename = "string")]
    String,
    #[serde(rename = "int")]
    Int,
    #[serde(rename = "[]string")]
    StringList,
    #[serde(rename = "date")]
    Date,
}

impl PropertyType {
    /// Whether a JSON value matches this declared type.
    ///
    /// Strings and dates accept only strings, ints accept integers or
    /// whole-valued JSON numbers, string lists accept homogenous string
    /// arrays.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            PropertyType::String | PropertyType::Date => value.is_string(),
            PropertyType::Int => match value {
                Value::Number(n) => {
                    n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.trunc() == f)
                }
                _ => false,
            },
            PropertyType::StringList => match value {
                Value::Array(items) => items.iter().all(Value::is_string),
                _ => false,
            },
        }
    }
}

/// How relationship values combine when multiple sources carry the same
/// relationship label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum MergingStrategy {
    #[default]
    #[serde(rename = "overwrite")]
    Overwrite,
    #[serde(rename = "aggregate")]
    Aggregate,
}

/// Configuration of one declared property.
#[derive(Debug, Clone, Deserialize)]
pub struct PropertyConfig {
    /// Property name on the graph node.
    #[serde(rename = "neoProp")]
    pub neo_prop: String,
    #[serde(rename = "type")]
    pub kind: PropertyType,
}

/// Configuration of one declared relationship label.
#[derive(Debug, Clone, Deserialize)]
pub struct RelationshipConfig {
    /// JSON key the relationship serializes under.
    #[serde(rename = "conceptField")]
    pub concept_field: String,
    #[serde(rename = "oneToOne", default)]
    pub one_to_one: bool,
    /// Inline properties carried on the relationship itself.
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyType>,
    /// Label of the node the relationship points at.
    #[serde(rename = "toNodeWithLabel", default)]
    pub target_label: String,
    #[serde(rename = "mergingStrategy", default)]
    pub strategy: MergingStrategy,
    /// Override for the JSON key carrying the target UUID.
    #[serde(rename = "uuidKey", default)]
    pub uuid_key: Option<String>,
}

/// The loaded ontology: property and relationship declarations plus the
/// recognized authorities.
#[derive(Debug, Clone, Deserialize)]
pub struct OntologyConfig {
    pub properties: BTreeMap<String, PropertyConfig>,
    /// Relationships keyed by label.
    pub relationships: BTreeMap<String, RelationshipConfig>,
    pub authorities: Vec<String>,
}

impl OntologyConfig {
    /// Parse an ontology document from JSON.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn property_type(&self, name: &str) -> Option<PropertyType> {
        self.properties.get(name).map(|p| p.kind)
    }

    pub fn relationship(&self, label: &str) -> Option<&RelationshipConfig> {
        self.relationships.get(label)
    }

    /// Whether any relationship serializes under the given JSON key.
    pub fn has_relationship_field(&self, concept_field: &str) -> bool {
        self.relationships
            .values()
            .any(|rel| rel.concept_field == concept_field)
    }

    /// Look up a relationship by the JSON key it serializes under.
    pub fn relationship_by_field(&self, concept_field: &str) -> Option<(&str, &RelationshipConfig)> {
        self.relationships
            .iter()
            .find(|(_, rel)| rel.concept_field == concept_field)
            .map(|(label, rel)| (label.as_str(), rel))
    }

    /// Merging strategy for a relationship label; unknown labels default to
    /// overwrite.
    pub fn merging_strategy(&self, label: &str) -> MergingStrategy {
        self.relationships
            .get(label)
            .map(|rel| rel.strategy)
            .unwrap_or_default()
    }

    /// JSON key carrying the target UUID for a relationship label.
    pub fn relationship_uuid_key(&self, label: &str) -> &str {
        self.relationships
            .get(label)
            .and_then(|rel| rel.uuid_key.as_deref())
            .unwrap_or(DEFAULT_UUID_KEY)
    }

    /// Whether a value is valid for a declared property.
    pub fn is_property_value_valid(&self, name: &str, value: &Value) -> bool {
        self.property_type(name)
            .is_some_and(|kind| kind.matches(value))
    }

    /// Strict validation of a property bag: every key must be declared and
    /// every value must match its declared type.
    pub fn validate_properties(&self, props: &serde_json::Map<String, Value>) -> Result<()> {
        for (name, value) in props {
            if !self.has_property(name) {
                return Err(Error::UnknownProperty(name.clone()));
            }
            if !self.is_property_value_valid(name, value) {
                return Err(Error::InvalidPropertyValue {
                    name: name.clone(),
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn is_recognized_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a == authority)
    }
}

static CONFIG: Lazy<RwLock<Arc<OntologyConfig>>> = Lazy::new(|| {
    let cfg = OntologyConfig::from_json(EMBEDDED).expect("embedded ontology document is valid");
    RwLock::new(Arc::new(cfg))
});

/// The process-wide ontology configuration.
pub fn get() -> Arc<OntologyConfig> {
    CONFIG.read().expect("ontology lock poisoned").clone()
}

/// Swap the process-wide ontology, restoring the previous one when the
/// returned guard drops. Intended for tests.
#[must_use = "the previous ontology is restored when the guard drops"]
pub fn install(cfg: OntologyConfig) -> ConfigGuard {
    let mut slot = CONFIG.write().expect("ontology lock poisoned");
    let previous = std::mem::replace(&mut *slot, Arc::new(cfg));
    ConfigGuard { previous }
}

/// Guard restoring the previously installed ontology on drop.
pub struct ConfigGuard {
    previous: Arc<OntologyConfig>,
}

impl Drop for ConfigGuard {
    fn drop(&mut self) {
        let mut slot = CONFIG.write().expect("ontology lock poisoned");
        *slot = self.previous.clone();
    }
}
