//! Labeled relationships and their ontology-driven wire form.
//!
//! In memory every relationship is the same tagged record: a label, a target
//! UUID, and typed inline properties. On the wire each relationship group
//! serializes under its ontology `conceptField` key, with a shape dispatched
//! on the label's configuration:
//!
//! - `oneToOne`: a single UUID string
//! - list without inline properties: an array of UUID strings
//! - list with inline properties: an array of objects carrying the target
//!   UUID (under `uuid` or the configured override) plus the declared
//!   properties

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::property::PropertyValue;
use crate::ontology::OntologyConfig;

/// One relationship from a concept to a target node.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub label: String,
    pub target: Uuid,
    pub properties: BTreeMap<String, PropertyValue>,
}

impl Relationship {
    pub fn new(label: impl Into<String>, target: Uuid) -> Self {
        Self {
            label: label.into(),
            target,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(name.into(), value);
        self
    }
}

/// Serialize relationships into their wire keys, grouped by concept field.
///
/// Relationships with labels the ontology does not declare are dropped.
pub fn relationships_to_json(rels: &[Relationship], cfg: &OntologyConfig) -> Map<String, Value> {
    let mut out = Map::new();
    for rel in rels {
        if rel.target.is_nil() {
            continue;
        }
        let Some(rel_cfg) = cfg.relationship(&rel.label) else {
            continue;
        };
        let target = rel.target.to_string();

        if rel_cfg.one_to_one {
            out.insert(rel_cfg.concept_field.clone(), Value::String(target));
            continue;
        }

        let entry = out
            .entry(rel_cfg.concept_field.clone())
            .or_insert_with(|| Value::Array(Vec::new()));
        let Value::Array(items) = entry else {
            continue;
        };

        if rel_cfg.properties.is_empty() {
            items.push(Value::String(target));
        } else {
            let mut obj = Map::new();
            obj.insert(
                cfg.relationship_uuid_key(&rel.label).to_string(),
                Value::String(target),
            );
            for (name, _) in &rel_cfg.properties {
                if let Some(value) = rel.properties.get(name) {
                    obj.insert(name.clone(), value.to_json());
                }
            }
            items.push(Value::Object(obj));
        }
    }
    out
}

/// Read every declared relationship out of a wire-level JSON object.
///
/// Keys that are not declared concept fields are ignored; declared keys with
/// the wrong shape are an error.
pub fn relationships_from_json(map: &Map<String, Value>, cfg: &OntologyConfig) -> Result<Vec<Relationship>> {
    let mut out = Vec::new();
    for (label, rel_cfg) in &cfg.relationships {
        let Some(value) = map.get(&rel_cfg.concept_field) else {
            continue;
        };

        if rel_cfg.one_to_one {
            let target = value.as_str().ok_or_else(|| cast_error(label, value))?;
            out.push(Relationship::new(label.clone(), parse_target(label, target)?));
            continue;
        }

        let items = value.as_array().ok_or_else(|| cast_error(label, value))?;
        for item in items {
            if rel_cfg.properties.is_empty() {
                let target = item.as_str().ok_or_else(|| cast_error(label, item))?;
                out.push(Relationship::new(label.clone(), parse_target(label, target)?));
                continue;
            }

            let Some(obj) = item.as_object() else {
                continue;
            };
            let uuid_key = cfg.relationship_uuid_key(label);
            let Some(target) = obj.get(uuid_key).and_then(Value::as_str) else {
                continue;
            };
            let mut rel = Relationship::new(label.clone(), parse_target(label, target)?);
            for (name, kind) in &rel_cfg.properties {
                let Some(raw) = obj.get(name) else {
                    continue;
                };
                let value = PropertyValue::from_json(*kind, raw).ok_or_else(|| {
                    Error::InvalidPropertyValue {
                        name: name.clone(),
                        value: raw.clone(),
                    }
                })?;
                rel.properties.insert(name.clone(), value);
            }
            out.push(rel);
        }
    }
    Ok(out)
}

fn parse_target(label: &str, raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| {
        Error::Serialization(format!(
            "failed to parse '{raw}' as relationship '{label}' uuid"
        ))
    })
}

fn cast_error(label: &str, value: &Value) -> Error {
    Error::Serialization(format!(
        "failed to cast '{value}' for relationship '{label}'"
    ))
}
