//! Blob-store adapter for normalized source concepts.
//!
//! Objects live under `<bucket>/<uuid-slashified>`, or
//! `<bucket>/<publication>/<uuid-slashified>` for external publications. The
//! transaction id rides on the object as the `x-amz-meta-transaction_id`
//! metadata header.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use uuid::Uuid;

use concorda_core::identifiers::slashify;
use concorda_core::{ConceptStore, Error, HealthCheck, Result, SourceConcept, StoredConcept};

const TRANSACTION_ID_HEADER: &str = "x-amz-meta-transaction_id";

/// S3-compatible store of source concepts.
#[derive(Clone)]
pub struct BlobStoreClient {
    http: Client,
    endpoint: String,
    bucket: String,
    check_name: String,
}

impl BlobStoreClient {
    pub fn new(http: Client, endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        let bucket = bucket.into();
        Self {
            check_name: format!("Check connectivity to concept store bucket {bucket}"),
            http,
            endpoint,
            bucket,
        }
    }

    fn object_url(&self, publication: Option<Uuid>, uuid: Uuid) -> String {
        let key = slashify(uuid);
        match publication {
            Some(publication) => format!("{}/{}/{publication}/{key}", self.endpoint, self.bucket),
            None => format!("{}/{}/{key}", self.endpoint, self.bucket),
        }
    }
}

#[async_trait]
impl ConceptStore for BlobStoreClient {
    async fn fetch(&self, publication: Option<Uuid>, uuid: Uuid) -> Result<Option<StoredConcept>> {
        let url = self.object_url(publication, uuid);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Store(format!("fetching {url}: {e}")))?;

        match resp.status() {
            StatusCode::NOT_FOUND => {
                // A miss, not an error; the caller decides what it means.
                debug!(concept_uuid = %uuid, "source concept not in store");
                Ok(None)
            }
            StatusCode::OK => {
                let transaction_id = resp
                    .headers()
                    .get(TRANSACTION_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                if transaction_id.is_empty() {
                    warn!(concept_uuid = %uuid, "stored concept has no transaction id");
                }
                let concept = resp
                    .json::<SourceConcept>()
                    .await
                    .map_err(|e| Error::Store(format!("decoding object at {url}: {e}")))?;
                Ok(Some(StoredConcept {
                    concept,
                    transaction_id,
                }))
            }
            status => Err(Error::Store(format!(
                "object fetch from {url} returned status {}",
                status.as_u16()
            ))),
        }
    }
}

#[async_trait]
impl HealthCheck for BlobStoreClient {
    fn name(&self) -> &str {
        &self.check_name
    }

    async fn check(&self) -> Result<()> {
        let url = format!("{}/{}", self.endpoint, self.bucket);
        let resp = self
            .http
            .head(&url)
            .send()
            .await
            .map_err(|e| Error::Store(format!("bucket check at {url}: {e}")))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(Error::Store(format!(
                "bucket check at {url} returned status {}",
                resp.status().as_u16()
            )))
        }
    }
}
