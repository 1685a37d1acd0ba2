//! The canonical concept — the merged, authoritative view.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::property::PropertyValue;
use crate::model::relationship::{
    relationships_from_json, relationships_to_json, Relationship,
};
use crate::model::source::{insert_nonempty, string_field, string_list_field, SourceConcept};
use crate::ontology;

/// The merged output of aggregation, consumed by the downstream graph,
/// search, and cache collaborators.
///
/// `source_representations` preserves the original inputs in merge order for
/// downstream auditing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalConcept {
    pub pref_uuid: Uuid,
    pub pref_label: String,
    pub concept_type: String,
    pub aliases: Vec<String>,
    pub scope_note: Option<String>,
    pub is_deprecated: bool,
    pub properties: BTreeMap<String, PropertyValue>,
    pub relationships: Vec<Relationship>,
    pub source_representations: Vec<SourceConcept>,
}

impl CanonicalConcept {
    /// Whether this is the empty concept produced when a concordance has no
    /// fetchable sources. The pipeline skips it without error.
    pub fn is_empty(&self) -> bool {
        self.pref_uuid.is_nil()
    }

    /// Target UUID of the first relationship with the given label.
    pub fn relationship_target(&self, label: &str) -> Option<Uuid> {
        self.relationships
            .iter()
            .find(|rel| rel.label == label)
            .map(|rel| rel.target)
    }

    /// Whether any source representation comes from the given authority.
    pub fn has_source_with_authority(&self, authority: &str) -> bool {
        self.source_representations
            .iter()
            .any(|src| src.authority == authority)
    }

    /// Build the wire-level JSON object.
    pub fn to_value(&self) -> Value {
        let cfg = ontology::get();
        let mut map = Map::new();
        if !self.pref_uuid.is_nil() {
            map.insert(
                "prefUUID".to_string(),
                Value::String(self.pref_uuid.to_string()),
            );
        }
        insert_nonempty(&mut map, "prefLabel", &self.pref_label);
        insert_nonempty(&mut map, "type", &self.concept_type);
        if !self.aliases.is_empty() {
            map.insert(
                "aliases".to_string(),
                Value::Array(self.aliases.iter().cloned().map(Value::String).collect()),
            );
        }
        if let Some(note) = self.scope_note.as_deref().filter(|n| !n.is_empty()) {
            map.insert("scopeNote".to_string(), Value::String(note.to_string()));
        }
        if self.is_deprecated {
            map.insert("isDeprecated".to_string(), Value::Bool(true));
        }
        for (name, value) in &self.properties {
            if cfg.has_property(name) {
                map.insert(name.clone(), value.to_json());
            }
        }
        map.extend(relationships_to_json(&self.relationships, &cfg));
        if !self.source_representations.is_empty() {
            map.insert(
                "sourceRepresentations".to_string(),
                Value::Array(
                    self.source_representations
                        .iter()
                        .map(SourceConcept::to_value)
                        .collect(),
                ),
            );
        }
        Value::Object(map)
    }

    /// Parse the wire-level JSON object, dropping undeclared keys.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(Error::Serialization(
                "canonical concept must be a JSON object".to_string(),
            ));
        };
        let cfg = ontology::get();

        let pref_uuid = match map.get("prefUUID").and_then(Value::as_str) {
            Some(raw) => Uuid::parse_str(raw)
                .map_err(|_| Error::Serialization(format!("invalid prefUUID: {raw}")))?,
            None => Uuid::nil(),
        };

        let mut concept = CanonicalConcept {
            pref_uuid,
            pref_label: string_field(&map, "prefLabel"),
            concept_type: string_field(&map, "type"),
            aliases: string_list_field(&map, "aliases"),
            scope_note: Some(string_field(&map, "scopeNote")).filter(|s| !s.is_empty()),
            is_deprecated: map
                .get("isDeprecated")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            properties: BTreeMap::new(),
            relationships: relationships_from_json(&map, &cfg)?,
            source_representations: Vec::new(),
        };

        for (name, raw) in &map {
            let Some(kind) = cfg.property_type(name) else {
                continue;
            };
            if let Some(value) = PropertyValue::from_json(kind, raw) {
                concept.properties.insert(name.clone(), value);
            }
        }

        if let Some(sources) = map.get("sourceRepresentations").and_then(Value::as_array) {
            for source in sources {
                concept
                    .source_representations
                    .push(SourceConcept::from_value(source.clone())?);
            }
        }

        Ok(concept)
    }
}

impl Serialize for CanonicalConcept {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CanonicalConcept {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(D::Error::custom)
    }
}
