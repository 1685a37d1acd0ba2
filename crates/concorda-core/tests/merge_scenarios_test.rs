//! End-to-end merge scenarios for the aggregation engine.

use std::collections::BTreeMap;

use uuid::Uuid;

use concorda_core::merge::aggregate;
use concorda_core::model::{PropertyValue, Relationship, SourceConcept};

fn uuid(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

fn source(n: u128, authority: &str, concept_type: &str, pref_label: &str) -> SourceConcept {
    SourceConcept {
        uuid: uuid(n),
        concept_type: concept_type.to_string(),
        pref_label: pref_label.to_string(),
        authority: authority.to_string(),
        authority_value: format!("{authority}-{n}"),
        ..Default::default()
    }
}

#[test]
fn smartlogic_and_tme_merge_collects_both_labels_as_aliases() {
    let primary = source(1, "Smartlogic", "TestConcept", "Root Concept");
    let secondary = source(2, "TME", "TestConcept", "TME Concept");

    let canonical = aggregate(primary, vec![secondary]);

    assert_eq!(canonical.pref_uuid, uuid(1));
    assert_eq!(canonical.pref_label, "Root Concept");
    assert_eq!(canonical.concept_type, "TestConcept");
    let mut aliases = canonical.aliases.clone();
    aliases.sort();
    assert_eq!(aliases, vec!["Root Concept", "TME Concept"]);
    assert_eq!(canonical.source_representations.len(), 2);
}

#[test]
fn public_company_survives_organisation_primary() {
    let primary = source(1, "Smartlogic", "Organisation", "Acme");
    let secondary = source(2, "FACTSET", "PublicCompany", "Acme Corp");

    let canonical = aggregate(primary, vec![secondary]);

    // The primary still owns identity, but the type keeps the more specific
    // secondary value.
    assert_eq!(canonical.pref_uuid, uuid(1));
    assert_eq!(canonical.pref_label, "Acme");
    assert_eq!(canonical.concept_type, "PublicCompany");
}

#[test]
fn thing_stub_does_not_wipe_type() {
    let primary = source(1, "Smartlogic", "Person", "Someone");
    let stub = source(2, "TME", "Thing", "Someone (TME)");

    let canonical = aggregate(primary, vec![stub]);
    assert_eq!(canonical.concept_type, "Person");
}

#[test]
fn location_scope_note_falls_back_to_tme_label() {
    let mut primary = source(1, "Smartlogic", "Location", "Belgium");
    primary.scope_note = None;
    let ml = source(2, "ManagedLocation", "Location", "Kingdom of Belgium");
    let tme = source(3, "TME", "Location", "Royaume de Belgique");

    let canonical = aggregate(primary, vec![ml, tme]);

    assert_eq!(canonical.scope_note.as_deref(), Some("Royaume de Belgique"));
}

#[test]
fn tme_scope_note_only_applies_to_locations() {
    let primary = source(1, "Smartlogic", "Brand", "Alphaville");
    let tme = source(3, "TME", "Brand", "Alphaville (TME)");

    let canonical = aggregate(primary, vec![tme]);
    assert_eq!(canonical.scope_note, None);
}

#[test]
fn smartlogic_scope_note_is_preferred() {
    let mut primary = source(1, "Smartlogic", "Location", "Belgium");
    primary.scope_note = Some("A country in Europe".to_string());
    let mut wikidata = source(2, "Wikidata", "Location", "Belgium");
    wikidata.scope_note = Some("wikidata note".to_string());
    let tme = source(3, "TME", "Location", "Royaume de Belgique");

    let canonical = aggregate(primary, vec![wikidata, tme]);
    assert_eq!(canonical.scope_note.as_deref(), Some("A country in Europe"));
}

#[test]
fn scope_note_entries_matching_pref_label_are_excluded() {
    let primary = source(1, "Smartlogic", "Location", "Belgium");
    let mut wikidata = source(2, "Wikidata", "Location", "Belgium (wiki)");
    wikidata.scope_note = Some("Belgium".to_string());

    // The only candidate equals the canonical prefLabel, so no scope note.
    let canonical = aggregate(primary, vec![wikidata]);
    assert_eq!(canonical.scope_note, None);
}

#[test]
fn last_secondary_wins_when_merged_without_primary_authority() {
    // Election happens in the pipeline; here the caller has already promoted
    // the last secondary to primary.
    let promoted = source(4, "TME", "Brand", "Second TME");
    let remaining = source(3, "TME", "Brand", "First TME");

    let canonical = aggregate(promoted, vec![remaining]);
    assert_eq!(canonical.pref_uuid, uuid(4));
    assert_eq!(canonical.pref_label, "Second TME");
}

#[test]
fn aliases_are_deduplicated_and_empty_free() {
    let mut primary = source(1, "Smartlogic", "Person", "Someone");
    primary.aliases = vec!["".to_string(), "Someone".to_string(), "S. One".to_string()];
    let mut secondary = source(2, "TME", "Person", "Someone");
    secondary.aliases = vec!["S. One".to_string()];

    let canonical = aggregate(primary, vec![secondary]);

    let mut expected = vec!["S. One".to_string(), "Someone".to_string()];
    expected.sort();
    let mut actual = canonical.aliases.clone();
    actual.sort();
    assert_eq!(actual, expected);
}

#[test]
fn primary_properties_overwrite_secondary_values() {
    let mut primary = source(1, "Smartlogic", "Person", "Someone");
    primary
        .properties
        .insert("birthYear".to_string(), PropertyValue::Int(1972));
    let mut secondary = source(2, "FACTSET", "Person", "Someone");
    secondary
        .properties
        .insert("birthYear".to_string(), PropertyValue::Int(1970));
    secondary
        .properties
        .insert("salutation".to_string(), PropertyValue::Str("Dr".to_string()));

    let canonical = aggregate(primary, vec![secondary]);

    assert_eq!(
        canonical.properties.get("birthYear"),
        Some(&PropertyValue::Int(1972))
    );
    // Values only the secondary carries survive.
    assert_eq!(
        canonical.properties.get("salutation"),
        Some(&PropertyValue::Str("Dr".to_string()))
    );
}

#[test]
fn overwrite_relationships_are_replaced_by_primary() {
    let mut primary = source(1, "Smartlogic", "Person", "Someone");
    primary.relationships = vec![Relationship::new("HAS_BROADER", uuid(10))];
    let mut secondary = source(2, "TME", "Person", "Someone");
    secondary.relationships = vec![
        Relationship::new("HAS_BROADER", uuid(11)),
        Relationship::new("HAS_BROADER", uuid(12)),
    ];

    let canonical = aggregate(primary, vec![secondary]);

    let broader: Vec<Uuid> = canonical
        .relationships
        .iter()
        .filter(|r| r.label == "HAS_BROADER")
        .map(|r| r.target)
        .collect();
    assert_eq!(broader, vec![uuid(10)]);
}

#[test]
fn aggregate_relationships_accumulate_across_sources() {
    let mut primary = source(1, "Smartlogic", "Membership", "Chief economist");
    primary.relationships = vec![Relationship::new("HAS_ROLE", uuid(20))
        .with_property("inceptionDate", PropertyValue::Date("2016-01-01".to_string()))];
    let mut secondary = source(2, "FACTSET", "Membership", "Chief economist");
    secondary.relationships = vec![Relationship::new("HAS_ROLE", uuid(21))];

    let canonical = aggregate(primary, vec![secondary]);

    let roles: Vec<Uuid> = canonical
        .relationships
        .iter()
        .filter(|r| r.label == "HAS_ROLE")
        .map(|r| r.target)
        .collect();
    assert_eq!(roles, vec![uuid(21), uuid(20)]);
}

#[test]
fn deprecation_flag_follows_the_primary() {
    let mut primary = source(1, "Smartlogic", "Person", "Someone");
    primary.is_deprecated = true;
    let secondary = source(2, "TME", "Person", "Someone");

    let canonical = aggregate(primary, vec![secondary]);
    assert!(canonical.is_deprecated);

    let mut primary = source(1, "Smartlogic", "Person", "Someone");
    primary.is_deprecated = false;
    let mut secondary = source(2, "TME", "Person", "Someone");
    secondary.is_deprecated = true;

    let canonical = aggregate(primary, vec![secondary]);
    assert!(!canonical.is_deprecated);
}

#[test]
fn source_representations_preserve_merge_order() {
    let primary = source(1, "Smartlogic", "Person", "Someone");
    let a = source(2, "TME", "Person", "Someone");
    let b = source(3, "FACTSET", "Person", "Someone");

    let canonical = aggregate(primary, vec![a, b]);

    let order: Vec<Uuid> = canonical
        .source_representations
        .iter()
        .map(|s| s.uuid)
        .collect();
    assert_eq!(order, vec![uuid(2), uuid(3), uuid(1)]);
}

#[test]
fn undeclared_properties_do_not_reach_the_canonical_bag() {
    let mut primary = source(1, "Smartlogic", "Person", "Someone");
    primary.properties = BTreeMap::from([
        ("salutation".to_string(), PropertyValue::Str("Dr".to_string())),
        ("notDeclared".to_string(), PropertyValue::Str("x".to_string())),
    ]);

    let canonical = aggregate(primary, vec![]);
    assert!(canonical.properties.contains_key("salutation"));
    assert!(!canonical.properties.contains_key("notDeclared"));
}
