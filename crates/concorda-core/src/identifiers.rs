//! Composite-key and concept-type path codecs.
//!
//! A store key is either a bare concept UUID or `<publication>-<concept>`,
//! two UUIDs joined by `-`. Both are recovered by scanning for UUID-shaped
//! substrings: the last match is the concept, the first (when two are
//! present) is the publication scope.

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Canonical 8-4-4-4-12 lowercase hex UUID.
pub static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new("[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}").unwrap()
});

/// UUID with `/` separators, as it appears in blob-store object keys.
pub static SLASHED_UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new("[0-9a-f]{8}/[0-9a-f]{4}/[0-9a-f]{4}/[0-9a-f]{4}/[0-9a-f]{12}").unwrap()
});

static FIRST_CAP_RE: Lazy<Regex> = Lazy::new(|| Regex::new("(.)([A-Z][a-z]+)").unwrap());
static CAMEL_BOUNDARY_RE: Lazy<Regex> = Lazy::new(|| Regex::new("([a-z0-9])([A-Z])").unwrap());

const UUID_LEN: usize = 36;

/// A parsed composite key: the concept UUID plus its optional publication
/// scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConceptKey {
    pub concept: Uuid,
    pub publication: Option<Uuid>,
}

impl ConceptKey {
    /// Parse a composite key by scanning for UUID-shaped substrings.
    ///
    /// A well-formed key yields exactly one concept UUID. Prefixes that are
    /// not UUID-shaped are ignored.
    pub fn parse(key: &str) -> Result<Self> {
        let mut matches = UUID_RE.find_iter(key).take(2);
        let first = matches
            .next()
            .ok_or_else(|| Error::InvalidKey(key.to_string()))?;
        let second = matches.next();

        match second {
            Some(concept) => Ok(Self {
                concept: parse_uuid(concept.as_str(), key)?,
                publication: Some(parse_uuid(first.as_str(), key)?),
            }),
            None => Ok(Self {
                concept: parse_uuid(first.as_str(), key)?,
                publication: None,
            }),
        }
    }

    /// The concept UUID in canonical string form.
    pub fn concept_string(&self) -> String {
        self.concept.to_string()
    }
}

fn parse_uuid(s: &str, key: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|_| Error::InvalidKey(key.to_string()))
}

/// Extract the trailing concept UUID from a (possibly composite) key string.
///
/// Composite keys are always at least one UUID long, so the concept is the
/// final 36 characters.
pub fn trailing_uuid(key: &str) -> &str {
    if key.len() >= UUID_LEN {
        &key[key.len() - UUID_LEN..]
    } else {
        key
    }
}

/// Whether a string is exactly one canonical 8-4-4-4-12 lowercase hex UUID.
pub fn is_canonical_uuid(s: &str) -> bool {
    UUID_RE
        .find(s)
        .is_some_and(|m| m.start() == 0 && m.end() == s.len())
}

/// Convert a UUID to its blob-store object key form (`-` replaced by `/`).
pub fn slashify(uuid: Uuid) -> String {
    uuid.to_string().replace('-', "/")
}

/// Recover the dashed key from a blob-store object key (`/` replaced by `-`).
pub fn unslashify(key: &str) -> String {
    key.replace('/', "-")
}

/// Resolve a concept type to its plural URL path segment.
///
/// Irregular plurals come from a fixed table; everything else converts
/// CamelCase to kebab-case and appends `s`.
pub fn concept_type_path(concept_type: &str) -> String {
    match concept_type {
        "AlphavilleSeries" => "alphaville-series".to_string(),
        "BoardRole" => "membership-roles".to_string(),
        "Dummy" => "dummies".to_string(),
        "Person" => "people".to_string(),
        "PublicCompany" => "organisations".to_string(),
        "NAICSIndustryClassification" => "industry-classifications".to_string(),
        "FTAnIIndustryClassification" => "industry-classifications".to_string(),
        "SVCategory" => "sv-categories".to_string(),
        other => format!("{}s", kebab_case(other)),
    }
}

fn kebab_case(s: &str) -> String {
    // Two passes so runs of capitals split correctly (FTThing -> ft-thing).
    let first = FIRST_CAP_RE.replace_all(s, "${1}-${2}");
    CAMEL_BOUNDARY_RE
        .replace_all(&first, "${1}-${2}")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uuid(s: &str) -> Uuid {
        Uuid::parse_str(s).unwrap()
    }

    #[test]
    fn test_parse_bare_uuid() {
        let key = ConceptKey::parse("28090964-9997-4bc2-9638-7a11135aaff9").unwrap();
        assert_eq!(key.concept, uuid("28090964-9997-4bc2-9638-7a11135aaff9"));
        assert_eq!(key.publication, None);
    }

    #[test]
    fn test_parse_composite_key() {
        let key = ConceptKey::parse(
            "8e6c705e-1132-42a2-8db0-c295e29e8658-28090964-9997-4bc2-9638-7a11135aaff9",
        )
        .unwrap();
        assert_eq!(key.concept, uuid("28090964-9997-4bc2-9638-7a11135aaff9"));
        assert_eq!(
            key.publication,
            Some(uuid("8e6c705e-1132-42a2-8db0-c295e29e8658"))
        );
    }

    #[test]
    fn test_parse_ignores_non_uuid_prefix() {
        let key = ConceptKey::parse("prefix-28090964-9997-4bc2-9638-7a11135aaff9").unwrap();
        assert_eq!(key.concept, uuid("28090964-9997-4bc2-9638-7a11135aaff9"));
        assert_eq!(key.publication, None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = ConceptKey::parse("not-a-uuid").unwrap_err();
        assert!(err.to_string().contains("not-a-uuid"));
    }

    #[test]
    fn test_trailing_uuid_of_composite() {
        let composite =
            "8e6c705e-1132-42a2-8db0-c295e29e8658-28090964-9997-4bc2-9638-7a11135aaff9";
        assert_eq!(trailing_uuid(composite), "28090964-9997-4bc2-9638-7a11135aaff9");
    }

    #[test]
    fn test_is_canonical_uuid() {
        assert!(is_canonical_uuid("28090964-9997-4bc2-9638-7a11135aaff9"));
        assert!(!is_canonical_uuid("28090964-9997-4bc2-9638-7a11135aaff9x"));
        assert!(!is_canonical_uuid("x28090964-9997-4bc2-9638-7a11135aaff9"));
        assert!(!is_canonical_uuid("28090964-9997-4BC2-9638-7A11135AAFF9"));
        assert!(!is_canonical_uuid("not-a-uuid"));
    }

    #[test]
    fn test_slashify_round_trip() {
        let id = uuid("28090964-9997-4bc2-9638-7a11135aaff9");
        let slashed = slashify(id);
        assert_eq!(slashed, "28090964/9997/4bc2/9638/7a11135aaff9");
        assert_eq!(unslashify(&slashed), id.to_string());
    }

    #[test]
    fn test_irregular_plurals() {
        assert_eq!(concept_type_path("Person"), "people");
        assert_eq!(concept_type_path("PublicCompany"), "organisations");
        assert_eq!(concept_type_path("AlphavilleSeries"), "alphaville-series");
        assert_eq!(concept_type_path("BoardRole"), "membership-roles");
        assert_eq!(
            concept_type_path("NAICSIndustryClassification"),
            "industry-classifications"
        );
        assert_eq!(
            concept_type_path("FTAnIIndustryClassification"),
            "industry-classifications"
        );
        assert_eq!(concept_type_path("Dummy"), "dummies");
        assert_eq!(concept_type_path("SVCategory"), "sv-categories");
    }

    #[test]
    fn test_regular_plurals_kebab_cased() {
        assert_eq!(concept_type_path("Brand"), "brands");
        assert_eq!(concept_type_path("Organisation"), "organisations");
        assert_eq!(concept_type_path("FinancialInstrument"), "financial-instruments");
        assert_eq!(concept_type_path("Membership"), "memberships");
        assert_eq!(concept_type_path("Location"), "locations");
    }
}
