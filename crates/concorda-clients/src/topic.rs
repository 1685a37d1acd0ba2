//! Notification-topic adapter for concept-change events.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use concorda_core::{ConceptEvent, Error, EventPublisher, HealthCheck, Result};

use crate::aws;

/// Topic publisher speaking the SNS JSON wire protocol.
///
/// Events go out as one `PublishBatch` call; entries that the topic rejects
/// are folded into a single error so the pipeline retries the whole message.
#[derive(Clone)]
pub struct HttpTopic {
    http: Client,
    endpoint: String,
    topic_arn: String,
}

#[derive(Debug, Deserialize)]
struct PublishBatchResponse {
    #[serde(rename = "Failed", default)]
    failed: Vec<FailedEntry>,
}

#[derive(Debug, Deserialize)]
struct FailedEntry {
    #[serde(rename = "Id", default)]
    id: String,
    #[serde(rename = "Code", default)]
    code: String,
}

impl HttpTopic {
    pub fn new(http: Client, endpoint: impl Into<String>, topic_arn: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            topic_arn: topic_arn.into(),
        }
    }
}

#[async_trait]
impl EventPublisher for HttpTopic {
    async fn publish(&self, events: &[ConceptEvent]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let entries = events
            .iter()
            .enumerate()
            .map(|(i, event)| {
                let message = serde_json::to_string(event)?;
                Ok(json!({
                    "Id": format!("{}_{i}", event.concept_uuid),
                    "Message": message,
                }))
            })
            .collect::<Result<Vec<_>>>()?;

        let body = json!({
            "TopicArn": self.topic_arn,
            "PublishBatchRequestEntries": entries,
        });
        let resp: PublishBatchResponse =
            aws::call(&self.http, &self.endpoint, "AmazonSNS.PublishBatch", &body)
                .await
                .map_err(|e| Error::Publish(e.to_string()))?;

        if resp.failed.is_empty() {
            return Ok(());
        }
        let joined = resp
            .failed
            .iter()
            .map(|f| format!("publishing {} event failed: {}", f.id, f.code))
            .collect::<Vec<_>>()
            .join("; ");
        Err(Error::Publish(joined))
    }
}

#[async_trait]
impl HealthCheck for HttpTopic {
    fn name(&self) -> &str {
        "Check connectivity to events topic"
    }

    async fn check(&self) -> Result<()> {
        let body = json!({ "TopicArn": self.topic_arn });
        aws::call::<serde_json::Value>(
            &self.http,
            &self.endpoint,
            "AmazonSNS.GetTopicAttributes",
            &body,
        )
        .await
        .map_err(|e| Error::Publish(e.to_string()))?;
        Ok(())
    }
}
