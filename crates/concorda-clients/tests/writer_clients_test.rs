//! Integration tests for the graph writer, search writer, and purger
//! clients against a mock server.

use uuid::Uuid;
use wiremock::matchers::{header, method, path, query_param_contains};
use wiremock::{Mock, MockServer, ResponseTemplate};

use concorda_clients::{GraphWriterClient, PurgerClient, SearchWriteOutcome, SearchWriterClient};
use concorda_core::CanonicalConcept;

fn canonical(n: u128, concept_type: &str) -> CanonicalConcept {
    CanonicalConcept {
        pref_uuid: Uuid::from_u128(n),
        pref_label: "Someone".to_string(),
        concept_type: concept_type.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn graph_write_decodes_concept_changes() {
    let server = MockServer::start().await;
    let concept = canonical(1, "Person");
    Mock::given(method("PUT"))
        .and(path(format!("/people/{}", concept.pref_uuid)))
        .and(header("X-Request-Id", "tid_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "events": [{
                "type": "Person",
                "uuid": concept.pref_uuid.to_string(),
                "aggregateHash": "123",
                "transactionID": "tid_1",
                "eventDetails": {"type": "Concept Updated"}
            }],
            "updatedIDs": [concept.pref_uuid.to_string()]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GraphWriterClient::new(reqwest::Client::new(), server.uri());
    let changes = client.write("people", &concept, "tid_1").await.unwrap();

    assert_eq!(changes.updated_ids, vec![concept.pref_uuid.to_string()]);
    assert_eq!(changes.events.len(), 1);
}

#[tokio::test]
async fn graph_write_not_modified_is_success_with_no_changes() {
    let server = MockServer::start().await;
    let concept = canonical(2, "Brand");
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(304))
        .mount(&server)
        .await;

    let client = GraphWriterClient::new(reqwest::Client::new(), server.uri());
    let changes = client.write("brands", &concept, "tid").await.unwrap();
    assert!(changes.updated_ids.is_empty());
}

#[tokio::test]
async fn graph_write_failure_names_url_and_status() {
    let server = MockServer::start().await;
    let concept = canonical(3, "Person");
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = GraphWriterClient::new(reqwest::Client::new(), server.uri());
    let err = client.write("people", &concept, "tid").await.unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains(&format!("/people/{}", concept.pref_uuid)));
    assert!(msg.contains("503"));
}

#[tokio::test]
async fn search_write_404_is_an_unsupported_type_skip() {
    let server = MockServer::start().await;
    let concept = canonical(4, "FinancialInstrument");
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = SearchWriterClient::new(reqwest::Client::new(), server.uri());
    let outcome = client
        .write("financial-instruments", &concept, "tid")
        .await
        .unwrap();
    assert_eq!(outcome, SearchWriteOutcome::UnsupportedType);
}

#[tokio::test]
async fn search_write_success() {
    let server = MockServer::start().await;
    let concept = canonical(5, "Person");
    Mock::given(method("PUT"))
        .and(path(format!("/people/{}", concept.pref_uuid)))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = SearchWriterClient::new(reqwest::Client::new(), server.uri());
    let outcome = client.write("people", &concept, "tid").await.unwrap();
    assert_eq!(outcome, SearchWriteOutcome::Written);
}

#[tokio::test]
async fn purge_targets_things_and_concepts_for_every_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/purge"))
        .and(query_param_contains("target", "/things/id-1"))
        .and(query_param_contains("target", "/concepts/id-1"))
        .and(query_param_contains("target", "/things/id-2"))
        .and(query_param_contains("target", "/concepts/id-2"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = PurgerClient::new(reqwest::Client::new(), server.uri());
    client
        .purge(
            &["id-1".to_string(), "id-2".to_string()],
            "MembershipRole",
            &[],
            "tid",
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn purge_adds_plural_path_for_public_endpoint_types() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/purge"))
        .and(query_param_contains("target", "/things/id-1"))
        .and(query_param_contains("target", "/concepts/id-1"))
        .and(query_param_contains("target", "/people/id-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = PurgerClient::new(reqwest::Client::new(), server.uri());
    client
        .purge(
            &["id-1".to_string()],
            "Person",
            &["Person".to_string(), "Brand".to_string()],
            "tid",
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn purge_non_200_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = PurgerClient::new(reqwest::Client::new(), server.uri());
    let err = client
        .purge(&["id-1".to_string()], "Person", &[], "tid")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("500"));
}
