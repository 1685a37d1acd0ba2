//! Shared AWS JSON 1.0 protocol plumbing for the queue, topic, and stream
//! adapters.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

use concorda_core::{Error, Result};

const CONTENT_TYPE: &str = "application/x-amz-json-1.0";

/// POST one operation to an AWS-JSON-protocol endpoint and decode the reply.
pub(crate) async fn call<T: DeserializeOwned>(
    http: &Client,
    endpoint: &str,
    target: &str,
    body: &Value,
) -> Result<T> {
    let resp = http
        .post(endpoint)
        .header("Content-Type", CONTENT_TYPE)
        .header("X-Amz-Target", target)
        .json(body)
        .send()
        .await
        .map_err(|e| Error::Request(format!("{target}: {e}")))?;

    let status = resp.status();
    if !status.is_success() {
        let detail = resp.text().await.unwrap_or_default();
        return Err(Error::Request(format!(
            "{target} returned status {}: {detail}",
            status.as_u16()
        )));
    }

    resp.json::<T>()
        .await
        .map_err(|e| Error::Request(format!("{target}: decoding response: {e}")))
}
