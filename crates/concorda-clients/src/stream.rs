//! Record-stream adapter for updated-id notifications.

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde_json::json;

use concorda_core::{Error, HealthCheck, RecordStream, Result};

use crate::aws;

/// Record stream speaking the Kinesis JSON wire protocol.
///
/// The payload is base64-encoded and partitioned by concept type.
#[derive(Clone)]
pub struct HttpStream {
    http: Client,
    endpoint: String,
    stream_name: String,
}

impl HttpStream {
    pub fn new(http: Client, endpoint: impl Into<String>, stream_name: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            stream_name: stream_name.into(),
        }
    }
}

#[async_trait]
impl RecordStream for HttpStream {
    async fn put_record(&self, payload: &[u8], concept_type: &str) -> Result<()> {
        let body = json!({
            "StreamName": self.stream_name,
            "Data": base64::engine::general_purpose::STANDARD.encode(payload),
            "PartitionKey": concept_type,
        });
        aws::call::<serde_json::Value>(
            &self.http,
            &self.endpoint,
            "Kinesis_20131202.PutRecord",
            &body,
        )
        .await
        .map_err(|e| Error::Stream(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl HealthCheck for HttpStream {
    fn name(&self) -> &str {
        "Check connectivity to record stream"
    }

    async fn check(&self) -> Result<()> {
        let body = json!({ "StreamName": self.stream_name });
        aws::call::<serde_json::Value>(
            &self.http,
            &self.endpoint,
            "Kinesis_20131202.DescribeStreamSummary",
            &body,
        )
        .await
        .map_err(|e| Error::Stream(e.to_string()))?;
        Ok(())
    }
}
