//! Clients for the downstream graph and search writers.
//!
//! Both accept `PUT <base>/<plural-type>/<uuid>` with the canonical concept
//! JSON and treat `200` and `304` as success (`304` meaning "no change").
//! The graph writer returns a [`ConceptChanges`] body; the search writer
//! answers `404` for types it does not index, which is a skip rather than a
//! failure. Every request carries the transaction id in `X-Request-Id`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use concorda_core::{CanonicalConcept, ConceptChanges, Error, HealthCheck, Result};

const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Writer of canonical concepts into the concept graph.
#[derive(Clone)]
pub struct GraphWriterClient {
    http: Client,
    base_url: String,
}

impl GraphWriterClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Write the canonical concept, returning the change record.
    pub async fn write(
        &self,
        type_path: &str,
        concept: &CanonicalConcept,
        transaction_id: &str,
    ) -> Result<ConceptChanges> {
        let url = format!("{}/{type_path}/{}", self.base_url, concept.pref_uuid);
        let resp = self
            .http
            .put(&url)
            .header(REQUEST_ID_HEADER, transaction_id)
            .json(concept)
            .send()
            .await
            .map_err(|e| Error::Request(format!("writing concept to {url}: {e}")))?;

        match resp.status() {
            status if status.is_success() => resp
                .json::<ConceptChanges>()
                .await
                .map_err(|e| Error::Request(format!("decoding writer response from {url}: {e}"))),
            StatusCode::NOT_MODIFIED => Ok(ConceptChanges::default()),
            status => Err(Error::WriterStatus {
                url,
                status: status.as_u16(),
            }),
        }
    }
}

#[async_trait]
impl HealthCheck for GraphWriterClient {
    fn name(&self) -> &str {
        "Check connectivity to concept graph writer"
    }

    async fn check(&self) -> Result<()> {
        gtg(&self.http, &self.base_url).await
    }
}

/// Outcome of a search-writer call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchWriteOutcome {
    Written,
    /// The writer does not index this concept type; skip without failing.
    UnsupportedType,
}

/// Writer of canonical concepts into the search index.
#[derive(Clone)]
pub struct SearchWriterClient {
    http: Client,
    base_url: String,
}

impl SearchWriterClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn write(
        &self,
        type_path: &str,
        concept: &CanonicalConcept,
        transaction_id: &str,
    ) -> Result<SearchWriteOutcome> {
        let url = format!("{}/{type_path}/{}", self.base_url, concept.pref_uuid);
        let resp = self
            .http
            .put(&url)
            .header(REQUEST_ID_HEADER, transaction_id)
            .json(concept)
            .send()
            .await
            .map_err(|e| Error::Request(format!("writing concept to {url}: {e}")))?;

        match resp.status() {
            status if status.is_success() => Ok(SearchWriteOutcome::Written),
            StatusCode::NOT_MODIFIED => Ok(SearchWriteOutcome::Written),
            StatusCode::NOT_FOUND => {
                debug!(
                    concept_uuid = %concept.pref_uuid,
                    concept_type = %concept.concept_type,
                    "search writer does not support this type; skipping"
                );
                Ok(SearchWriteOutcome::UnsupportedType)
            }
            status => Err(Error::WriterStatus {
                url,
                status: status.as_u16(),
            }),
        }
    }
}

#[async_trait]
impl HealthCheck for SearchWriterClient {
    fn name(&self) -> &str {
        "Check connectivity to concept search writer"
    }

    async fn check(&self) -> Result<()> {
        gtg(&self.http, &self.base_url).await
    }
}

async fn gtg(http: &Client, base_url: &str) -> Result<()> {
    let url = format!("{base_url}/__gtg");
    let resp = http
        .get(&url)
        .send()
        .await
        .map_err(|e| Error::Request(format!("calling writer at {url}: {e}")))?;
    if resp.status().is_success() {
        Ok(())
    } else {
        Err(Error::Request(format!(
            "writer {url} returned status {}",
            resp.status().as_u16()
        )))
    }
}
