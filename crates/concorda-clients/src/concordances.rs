//! Client for the concordance service.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use uuid::Uuid;

use concorda_core::{ConcordanceClient, ConcordanceRecord, Error, HealthCheck, Result};

/// HTTP client for the concordance read service.
///
/// A lookup miss (404) yields an empty record list; the pipeline turns that
/// into its own "no concordances provided" failure.
#[derive(Clone)]
pub struct ConcordancesClient {
    http: Client,
    base_url: String,
}

impl ConcordancesClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ConcordanceClient for ConcordancesClient {
    async fn concordances(&self, uuid: Uuid, bookmark: &str) -> Result<Vec<ConcordanceRecord>> {
        let url = format!("{}/concordances/{uuid}", self.base_url);
        let mut req = self.http.get(&url);
        if !bookmark.is_empty() {
            req = req.query(&[("bookmark", bookmark)]);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| Error::Request(format!("fetching concordances from {url}: {e}")))?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            StatusCode::OK => resp
                .json::<Vec<ConcordanceRecord>>()
                .await
                .map_err(|e| Error::Request(format!("decoding concordances from {url}: {e}"))),
            status => Err(Error::Request(format!(
                "concordance lookup at {url} returned status {}",
                status.as_u16()
            ))),
        }
    }
}

#[async_trait]
impl HealthCheck for ConcordancesClient {
    fn name(&self) -> &str {
        "Check connectivity to concordances service"
    }

    async fn check(&self) -> Result<()> {
        let url = format!("{}/__gtg", self.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Request(format!("calling concordances at {url}: {e}")))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(Error::Request(format!(
                "concordances {url} returned status {}",
                resp.status().as_u16()
            )))
        }
    }
}
