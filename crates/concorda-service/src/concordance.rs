//! Concordance bucketing and primary-authority election.

use std::collections::BTreeMap;

use tracing::error;

use concorda_core::logging::TAG_MULTIPLE_PRIMARY_AUTHORITIES;
use concorda_core::ontology::{MANAGED_LOCATION_AUTHORITY, SMARTLOGIC_AUTHORITY};
use concorda_core::{ConcordanceRecord, Error, Result};

/// Concordance records grouped by authority, plus the elected primary
/// authority (if any).
#[derive(Debug, Clone)]
pub struct ConcordanceBuckets {
    pub by_authority: BTreeMap<String, Vec<ConcordanceRecord>>,
    pub primary_authority: Option<String>,
}

impl ConcordanceBuckets {
    /// The concordance record of the elected primary authority.
    pub fn primary_record(&self) -> Option<&ConcordanceRecord> {
        let authority = self.primary_authority.as_deref()?;
        self.by_authority.get(authority)?.first()
    }

    /// Every record outside the primary authority bucket.
    pub fn secondary_records(&self) -> impl Iterator<Item = &ConcordanceRecord> {
        let primary = self.primary_authority.clone();
        self.by_authority
            .iter()
            .filter(move |(authority, _)| Some(authority.as_str()) != primary.as_deref())
            .flat_map(|(_, records)| records.iter())
    }
}

/// Group records by authority and elect the primary.
///
/// Exactly one Smartlogic record wins; failing that, exactly one
/// ManagedLocation record. Duplicates of either are an ambiguity failure,
/// and an empty record list is its own failure.
pub fn bucket_concordances(records: Vec<ConcordanceRecord>) -> Result<ConcordanceBuckets> {
    if records.is_empty() {
        let err = Error::NoConcordances;
        error!(error = %err, "error grouping concordance records");
        return Err(err);
    }

    let mut by_authority: BTreeMap<String, Vec<ConcordanceRecord>> = BTreeMap::new();
    for record in records {
        by_authority
            .entry(record.authority.clone())
            .or_default()
            .push(record);
    }

    let mut primary_authority = None;
    let mut ambiguous = false;
    for authority in [SMARTLOGIC_AUTHORITY, MANAGED_LOCATION_AUTHORITY] {
        match by_authority.get(authority).map(Vec::len) {
            Some(1) => {
                if primary_authority.is_none() {
                    primary_authority = Some(authority.to_string());
                }
            }
            Some(_) => ambiguous = true,
            None => {}
        }
    }

    if ambiguous {
        let err = Error::MultiplePrimaryAuthorities;
        error!(
            error = %err,
            alert_tag = TAG_MULTIPLE_PRIMARY_AUTHORITIES,
            smartlogic = by_authority.get(SMARTLOGIC_AUTHORITY).map(Vec::len).unwrap_or(0),
            managed_location = by_authority.get(MANAGED_LOCATION_AUTHORITY).map(Vec::len).unwrap_or(0),
            "error grouping concordance records"
        );
        return Err(err);
    }

    Ok(ConcordanceBuckets {
        by_authority,
        primary_authority,
    })
}
