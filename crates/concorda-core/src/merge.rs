//! Merging source concepts into one canonical concept.
//!
//! Sources merge in a fixed order: every secondary first, the primary last.
//! Scalar fields and `overwrite` relationships are last-writer-wins, so the
//! primary ends up owning the canonical identity, while `aggregate`
//! relationships accumulate across all sources. The concept type is promoted
//! to the most specific one seen.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{CanonicalConcept, SourceConcept};
use crate::ontology::{
    self, MergingStrategy, OntologyConfig, SMARTLOGIC_AUTHORITY, TME_AUTHORITY, WIKIDATA_AUTHORITY,
};

/// Candidate scope notes, bucketed by the authority that supplied them.
type ScopeNoteOptions = BTreeMap<String, Vec<String>>;

/// Merge the primary and secondary source concepts into one canonical
/// concept.
///
/// Callers elect the primary and order the secondaries; this function only
/// folds them together. The resulting `pref_uuid`, `pref_label`, and
/// deprecation flag are the primary's.
pub fn aggregate(primary: SourceConcept, secondaries: Vec<SourceConcept>) -> CanonicalConcept {
    let cfg = ontology::get();
    let mut scope_notes = ScopeNoteOptions::new();
    let mut canonical = CanonicalConcept::default();

    for source in secondaries {
        merge_source(&mut canonical, source, &mut scope_notes, &cfg);
    }
    merge_source(&mut canonical, primary, &mut scope_notes, &cfg);

    canonical.aliases = dedupe_aliases(std::mem::take(&mut canonical.aliases));
    canonical.scope_note = choose_scope_note(&canonical, &scope_notes);
    canonical
}

fn merge_source(
    canonical: &mut CanonicalConcept,
    source: SourceConcept,
    scope_notes: &mut ScopeNoteOptions,
    cfg: &OntologyConfig,
) {
    canonical.pref_uuid = source.uuid;
    canonical.pref_label = source.pref_label.clone();
    canonical.concept_type =
        more_specific_type(&canonical.concept_type, &source.concept_type).to_string();
    canonical.is_deprecated = source.is_deprecated;

    canonical.aliases.extend(source.aliases.iter().cloned());
    canonical.aliases.push(source.pref_label.clone());

    for (name, value) in &source.properties {
        if cfg.has_property(name) {
            canonical.properties.insert(name.clone(), value.clone());
        }
    }

    // For overwrite labels the current source replaces every previously
    // merged relationship of that label; aggregate labels extend.
    let mut replaced: BTreeSet<&str> = BTreeSet::new();
    for rel in &source.relationships {
        if cfg.merging_strategy(&rel.label) == MergingStrategy::Overwrite
            && replaced.insert(rel.label.as_str())
        {
            canonical.relationships.retain(|r| r.label != rel.label);
        }
        canonical.relationships.push(rel.clone());
    }

    collect_scope_note(scope_notes, &source);
    canonical.source_representations.push(source);
}

fn collect_scope_note(scope_notes: &mut ScopeNoteOptions, source: &SourceConcept) {
    // TME sources carry their local label as the scope-note candidate.
    let candidate = if source.authority == TME_AUTHORITY {
        source.pref_label.clone()
    } else {
        source.scope_note.clone().unwrap_or_default()
    };
    if !candidate.is_empty() {
        scope_notes
            .entry(source.authority.clone())
            .or_default()
            .push(candidate);
    }
}

fn choose_scope_note(
    canonical: &CanonicalConcept,
    scope_notes: &ScopeNoteOptions,
) -> Option<String> {
    if let Some(notes) = scope_notes.get(SMARTLOGIC_AUTHORITY) {
        return join_excluding(notes, &canonical.pref_label);
    }
    if let Some(notes) = scope_notes.get(WIKIDATA_AUTHORITY) {
        return join_excluding(notes, &canonical.pref_label);
    }
    if let Some(notes) = scope_notes.get(TME_AUTHORITY) {
        if canonical.concept_type == "Location" {
            return join_excluding(notes, &canonical.pref_label);
        }
    }
    None
}

fn join_excluding(notes: &[String], pref_label: &str) -> Option<String> {
    let joined = notes
        .iter()
        .filter(|note| note.as_str() != pref_label)
        .cloned()
        .collect::<Vec<_>>()
        .join(" | ");
    Some(joined).filter(|s| !s.is_empty())
}

/// Keep the more specific of two concept types.
///
/// `Thing` never overwrites a non-empty type, and `PublicCompany` is not
/// demoted to `Organisation` or `Company`; otherwise the newer type wins.
fn more_specific_type<'a>(existing: &'a str, new: &'a str) -> &'a str {
    if new == "Thing" && !existing.is_empty() {
        return existing;
    }
    if existing == "PublicCompany" && (new == "Organisation" || new == "Company") {
        return existing;
    }
    new
}

/// Drop empty aliases and duplicates; sorted for determinism.
fn dedupe_aliases(aliases: Vec<String>) -> Vec<String> {
    aliases
        .into_iter()
        .filter(|alias| !alias.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_more_specific_type_keeps_existing_over_thing() {
        assert_eq!(more_specific_type("Person", "Thing"), "Person");
        assert_eq!(more_specific_type("", "Thing"), "Thing");
    }

    #[test]
    fn test_more_specific_type_keeps_public_company() {
        assert_eq!(more_specific_type("PublicCompany", "Organisation"), "PublicCompany");
        assert_eq!(more_specific_type("PublicCompany", "Company"), "PublicCompany");
        assert_eq!(more_specific_type("PublicCompany", "Person"), "Person");
    }

    #[test]
    fn test_more_specific_type_later_wins_otherwise() {
        assert_eq!(more_specific_type("Organisation", "PublicCompany"), "PublicCompany");
        assert_eq!(more_specific_type("Brand", "Person"), "Person");
    }

    #[test]
    fn test_dedupe_aliases_strips_empties_and_duplicates() {
        let aliases = vec![
            "".to_string(),
            "Acme".to_string(),
            "Acme".to_string(),
            "Zed".to_string(),
        ];
        assert_eq!(
            dedupe_aliases(aliases),
            vec!["Acme".to_string(), "Zed".to_string()]
        );
    }

    #[test]
    fn test_join_excluding_filters_pref_label() {
        let notes = vec!["Belgium".to_string(), "Kingdom of Belgium".to_string()];
        assert_eq!(
            join_excluding(&notes, "Belgium"),
            Some("Kingdom of Belgium".to_string())
        );
        assert_eq!(join_excluding(&notes[..1], "Belgium"), None);
    }
}
