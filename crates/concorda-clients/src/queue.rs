//! Update-queue adapter and notification wire format.
//!
//! Queue messages wrap an S3-notification payload: the outer body carries an
//! escaped inner JSON document whose first record names the changed object
//! key. The concept UUID is the key with `/` separators turned back into
//! `-`. Malformed messages are logged and dropped individually so one bad
//! message never poisons a batch.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, warn};

use concorda_core::identifiers::{unslashify, SLASHED_UUID_RE};
use concorda_core::{ConceptUpdate, Error, HealthCheck, Result, UpdateQueue};

use crate::aws;

/// Outer queue message body.
#[derive(Debug, Serialize, Deserialize)]
struct MessageBody {
    #[serde(rename = "Message")]
    message: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ObjectNotification {
    #[serde(rename = "Records")]
    records: Option<Vec<NotificationRecord>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct NotificationRecord {
    s3: ObjectEntity,
    #[serde(default)]
    bookmark: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ObjectEntity {
    object: ObjectRef,
}

#[derive(Debug, Serialize, Deserialize)]
struct ObjectRef {
    key: String,
}

/// Parse one raw queue message body into a notification.
///
/// Returns `None` (after logging) for bodies that do not match the expected
/// shape or whose key has no UUID-shaped substring.
pub fn parse_notification(body: &str, receipt_handle: String) -> Option<ConceptUpdate> {
    let outer: MessageBody = match serde_json::from_str(body) {
        Ok(outer) => outer,
        Err(e) => {
            error!(error = %e, "failed to unmarshal queue message");
            return None;
        }
    };

    let inner: ObjectNotification = match serde_json::from_str(&outer.message) {
        Ok(inner) => inner,
        Err(e) => {
            error!(error = %e, "failed to unmarshal object notification");
            return None;
        }
    };

    let Some(records) = inner.records.filter(|r| !r.is_empty()) else {
        error!("cannot map message to expected format, skipping");
        return None;
    };

    let key = &records[0].s3.object.key;
    if !SLASHED_UUID_RE.is_match(key) {
        warn!(key = %key, "no valid UUID in object key");
        return None;
    }

    Some(ConceptUpdate {
        uuid: unslashify(key),
        // The bookmark format belongs to the graph store, so it is passed
        // through unvalidated.
        bookmark: records[0].bookmark.clone(),
        receipt_handle,
    })
}

/// Build a wire-format message body for an object key. Used by tests and the
/// in-memory queue.
pub fn encode_notification(key: &str, bookmark: &str) -> String {
    let inner = serde_json::to_string(&ObjectNotification {
        records: Some(vec![NotificationRecord {
            s3: ObjectEntity {
                object: ObjectRef {
                    key: key.to_string(),
                },
            },
            bookmark: bookmark.to_string(),
        }]),
    })
    .expect("notification encodes");
    serde_json::to_string(&MessageBody { message: inner }).expect("message body encodes")
}

/// Update queue speaking the SQS JSON wire protocol.
#[derive(Clone)]
pub struct HttpQueue {
    http: Client,
    endpoint: String,
    queue_url: String,
    max_messages: usize,
    visibility_timeout: u32,
    wait_time: u32,
}

#[derive(Debug, Deserialize)]
struct ReceiveMessageResponse {
    #[serde(rename = "Messages", default)]
    messages: Vec<QueueMessage>,
}

#[derive(Debug, Deserialize)]
struct QueueMessage {
    #[serde(rename = "Body", default)]
    body: String,
    #[serde(rename = "ReceiptHandle", default)]
    receipt_handle: String,
}

impl HttpQueue {
    pub fn new(
        http: Client,
        endpoint: impl Into<String>,
        queue_url: impl Into<String>,
        max_messages: usize,
        visibility_timeout: u32,
        wait_time: u32,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            queue_url: queue_url.into(),
            max_messages,
            visibility_timeout,
            wait_time,
        }
    }
}

#[async_trait]
impl UpdateQueue for HttpQueue {
    async fn receive(&self) -> Result<Vec<ConceptUpdate>> {
        let body = json!({
            "QueueUrl": self.queue_url,
            "MaxNumberOfMessages": self.max_messages,
            "VisibilityTimeout": self.visibility_timeout,
            "WaitTimeSeconds": self.wait_time,
        });
        let resp: ReceiveMessageResponse =
            aws::call(&self.http, &self.endpoint, "AmazonSQS.ReceiveMessage", &body)
                .await
                .map_err(|e| Error::Queue(e.to_string()))?;

        Ok(resp
            .messages
            .into_iter()
            .filter_map(|msg| parse_notification(&msg.body, msg.receipt_handle))
            .collect())
    }

    async fn delete(&self, receipt_handle: &str) -> Result<()> {
        let body = json!({
            "QueueUrl": self.queue_url,
            "ReceiptHandle": receipt_handle,
        });
        aws::call::<serde_json::Value>(&self.http, &self.endpoint, "AmazonSQS.DeleteMessage", &body)
            .await
            .map_err(|e| Error::Queue(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl HealthCheck for HttpQueue {
    fn name(&self) -> &str {
        "Check connectivity to update queue"
    }

    async fn check(&self) -> Result<()> {
        let body = json!({
            "QueueUrl": self.queue_url,
            "AttributeNames": ["ApproximateNumberOfMessages"],
        });
        aws::call::<serde_json::Value>(
            &self.http,
            &self.endpoint,
            "AmazonSQS.GetQueueAttributes",
            &body,
        )
        .await
        .map_err(|e| Error::Queue(e.to_string()))?;
        Ok(())
    }
}
