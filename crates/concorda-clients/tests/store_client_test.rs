//! Integration tests for the blob-store adapter against a mock server.

use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use concorda_clients::BlobStoreClient;
use concorda_core::ConceptStore;

fn concept_uuid() -> Uuid {
    Uuid::parse_str("28090964-9997-4bc2-9638-7a11135aaff9").unwrap()
}

#[tokio::test]
async fn fetch_returns_concept_and_transaction_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/concepts/28090964/9997/4bc2/9638/7a11135aaff9"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-amz-meta-transaction_id", "tid_123")
                .set_body_json(serde_json::json!({
                    "uuid": concept_uuid().to_string(),
                    "type": "Person",
                    "prefLabel": "Someone",
                    "authority": "Smartlogic",
                    "authorityValue": "sl-1"
                })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = BlobStoreClient::new(reqwest::Client::new(), server.uri(), "concepts");
    let stored = client.fetch(None, concept_uuid()).await.unwrap().unwrap();

    assert_eq!(stored.transaction_id, "tid_123");
    assert_eq!(stored.concept.uuid, concept_uuid());
    assert_eq!(stored.concept.pref_label, "Someone");
    assert_eq!(stored.concept.authority, "Smartlogic");
}

#[tokio::test]
async fn fetch_folds_publication_into_the_key() {
    let server = MockServer::start().await;
    let publication = Uuid::parse_str("8e6c705e-1132-42a2-8db0-c295e29e8658").unwrap();
    Mock::given(method("GET"))
        .and(path(
            "/concepts/8e6c705e-1132-42a2-8db0-c295e29e8658/28090964/9997/4bc2/9638/7a11135aaff9",
        ))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-amz-meta-transaction_id", "tid_ext")
                .set_body_json(serde_json::json!({
                    "uuid": concept_uuid().to_string(),
                    "type": "Thing",
                    "prefLabel": "External",
                    "authority": publication.to_string(),
                    "authorityValue": "ext-1"
                })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = BlobStoreClient::new(reqwest::Client::new(), server.uri(), "concepts");
    let stored = client
        .fetch(Some(publication), concept_uuid())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.transaction_id, "tid_ext");
}

#[tokio::test]
async fn missing_object_is_a_miss_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = BlobStoreClient::new(reqwest::Client::new(), server.uri(), "concepts");
    assert!(client.fetch(None, concept_uuid()).await.unwrap().is_none());
}

#[tokio::test]
async fn server_error_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = BlobStoreClient::new(reqwest::Client::new(), server.uri(), "concepts");
    let err = client.fetch(None, concept_uuid()).await.unwrap_err();
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn missing_transaction_id_defaults_to_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "uuid": concept_uuid().to_string(),
            "type": "Person",
            "prefLabel": "Someone"
        })))
        .mount(&server)
        .await;

    let client = BlobStoreClient::new(reqwest::Client::new(), server.uri(), "concepts");
    let stored = client.fetch(None, concept_uuid()).await.unwrap().unwrap();
    assert_eq!(stored.transaction_id, "");
}
