//! Client for the cache purger.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use concorda_core::identifiers::concept_type_path;
use concorda_core::{Error, HealthCheck, Result};

/// Purges cached concept URLs after a graph write.
///
/// Every updated id is purged at `/things/<id>` and `/concepts/<id>`; types
/// surfaced on public endpoints are additionally purged at their plural path.
#[derive(Clone)]
pub struct PurgerClient {
    http: Client,
    base_url: String,
}

impl PurgerClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn purge(
        &self,
        concept_uuids: &[String],
        concept_type: &str,
        public_endpoint_types: &[String],
        transaction_id: &str,
    ) -> Result<()> {
        let mut targets: Vec<(&str, String)> = Vec::new();
        for uuid in concept_uuids {
            targets.push(("target", format!("/things/{uuid}")));
            targets.push(("target", format!("/concepts/{uuid}")));
        }
        if public_endpoint_types.iter().any(|t| t == concept_type) {
            let path = concept_type_path(concept_type);
            for uuid in concept_uuids {
                targets.push(("target", format!("/{path}/{uuid}")));
            }
        }

        let url = format!("{}/purge", self.base_url);
        let resp = self
            .http
            .post(&url)
            .query(&targets)
            .send()
            .await
            .map_err(|e| Error::Request(format!("purging at {url}: {e}")))?;

        if resp.status() != reqwest::StatusCode::OK {
            return Err(Error::Request(format!(
                "purge request to {url} returned status {}",
                resp.status().as_u16()
            )));
        }
        debug!(
            transaction_id,
            ?concept_uuids,
            "concepts purged from cache"
        );
        Ok(())
    }
}

#[async_trait]
impl HealthCheck for PurgerClient {
    fn name(&self) -> &str {
        "Check connectivity to cache purger"
    }

    async fn check(&self) -> Result<()> {
        let url = format!("{}/__gtg", self.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Request(format!("calling purger at {url}: {e}")))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(Error::Request(format!(
                "purger {url} returned status {}",
                resp.status().as_u16()
            )))
        }
    }
}
