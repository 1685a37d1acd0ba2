//! Source concepts — one authority's view of a concept.

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
use crate::ontology;

/// An immutable snapshot of one authority's concept record, as read from the
/// blob store.
///
/// Wire JSON merges three disjoint parts: the required fields, the typed
/// scalar fields, and the ontology-declared dynamic property bag plus
/// relationships. Keys the ontology does not declare are dropped on both
/// input and output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceConcept {
    pub uuid: Uuid,
    pub concept_type: String,
    pub pref_label: String,
    pub authority: String,
    pub authority_value: String,
    pub aliases: Vec<String>,
    pub scope_note: Option<String>,
    pub is_deprecated: bool,
    pub properties: BTreeMap<String, PropertyValue>,
    pub relationships: Vec<Relationship>,
}

impl SourceConcept {
    /// Build the wire-level JSON object.
    pub fn to_value(&self) -> Value {
        let cfg = ontology::get();
        let mut map = Map::new();
        if !self.uuid.is_nil() {
            map.insert("uuid".to_string(), Value::String(self.uuid.to_string()));
        }
        insert_nonempty(&mut map, "type", &self.concept_type);
        insert_nonempty(&mut map, "prefLabel", &self.pref_label);
        insert_nonempty(&mut map, "authority", &self.authority);
        insert_nonempty(&mut map, "authorityValue", &self.authority_value);
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
        Value::Object(map)
    }

    /// Parse the wire-level JSON object, dropping undeclared keys.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(Error::Serialization(
                "source concept must be a JSON object".to_string(),
            ));
        };
        let cfg = ontology::get();

        let uuid = match map.get("uuid").and_then(Value::as_str) {
            Some(raw) => Uuid::parse_str(raw)
                .map_err(|_| Error::Serialization(format!("invalid concept uuid: {raw}")))?,
            None => Uuid::nil(),
        };

        let mut concept = SourceConcept {
            uuid,
            concept_type: string_field(&map, "type"),
            pref_label: string_field(&map, "prefLabel"),
            authority: string_field(&map, "authority"),
            authority_value: string_field(&map, "authorityValue"),
            aliases: string_list_field(&map, "aliases"),
            scope_note: Some(string_field(&map, "scopeNote")).filter(|s| !s.is_empty()),
            is_deprecated: map
                .get("isDeprecated")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            properties: BTreeMap::new(),
            relationships: relationships_from_json(&map, &cfg)?,
        };

        for (name, raw) in &map {
            let Some(kind) = cfg.property_type(name) else {
                continue;
            };
            // Mismatched values are dropped, matching the lenient ingest
            // contract; strict validation lives on OntologyConfig.
            if let Some(value) = PropertyValue::from_json(kind, raw) {
                concept.properties.insert(name.clone(), value);
            }
        }

        Ok(concept)
    }
}

impl Serialize for SourceConcept {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SourceConcept {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(D::Error::custom)
    }
}

pub(crate) fn insert_nonempty(map: &mut Map<String, Value>, key: &str, value: &str) {
    if !value.is_empty() {
        map.insert(key.to_string(), Value::String(value.to_string()));
    }
}

pub(crate) fn string_field(map: &Map<String, Value>, key: &str) -> String {
    map.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

pub(crate) fn string_list_field(map: &Map<String, Value>, key: &str) -> Vec<String> {
    map.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
