//! Request handlers.
//!
//! `GET /concept/{uuid}` runs the read-only resolve-and-aggregate path;
//! `POST /concept/{uuid}/send` triggers a full pipeline run. Both honor a
//! request deadline and answer `500` with `{"message": "<err>"}` on any
//! failure, including cancellation. Paths that are not canonical UUIDs 404.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::time::timeout;
use tracing::debug;

use concorda_core::identifiers::is_canonical_uuid;
use concorda_core::{Error, HealthCheck};
use concorda_service::health::{gtg, run_checks};
use concorda_service::AggregateService;

/// Shared state behind every handler.
pub struct AppState {
    pub service: Arc<AggregateService>,
    pub request_timeout: Duration,
    pub checks: Vec<Arc<dyn HealthCheck>>,
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/concept/{uuid}", get(get_concept))
        .route("/concept/{uuid}/send", post(send_concept))
        .route("/__health", get(health))
        .route("/__gtg", get(good_to_go))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct GetConceptParams {
    publication: Option<String>,
}

async fn get_concept(
    State(state): State<Arc<AppState>>,
    Path(uuid): Path<String>,
    Query(params): Query<GetConceptParams>,
) -> Response {
    if !is_canonical_uuid(&uuid) {
        return StatusCode::NOT_FOUND.into_response();
    }
    let key = match &params.publication {
        Some(publication) => format!("{publication}-{uuid}"),
        None => uuid.clone(),
    };
    debug!(concept_uuid = %uuid, "serving concept read");

    let result = match timeout(
        state.request_timeout,
        state.service.concorded_concept(&key, ""),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(Error::Canceled),
    };

    match result {
        Ok((concept, transaction_id)) => {
            (StatusCode::OK, [("x-request-id", transaction_id)], Json(concept)).into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn send_concept(
    State(state): State<Arc<AppState>>,
    Path(uuid): Path<String>,
) -> Response {
    if !is_canonical_uuid(&uuid) {
        return StatusCode::NOT_FOUND.into_response();
    }

    let result = match timeout(state.request_timeout, state.service.process_message(&uuid, "")).await
    {
        Ok(result) => result,
        Err(_) => Err(Error::Canceled),
    };

    match result {
        Ok(()) => Json(json!({
            "message": format!("Concept {uuid} updated successfully.")
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn health(State(state): State<Arc<AppState>>) -> Response {
    let checks = run_checks(&state.checks).await;
    let ok = checks.iter().all(|c| c.ok);
    Json(json!({
        "name": "concorda",
        "description": "Aggregates concepts from different sources into a canonical view",
        "ok": ok,
        "checks": checks,
    }))
    .into_response()
}

async fn good_to_go(State(state): State<Arc<AppState>>) -> Response {
    match gtg(&state.checks).await {
        Ok(()) => (StatusCode::OK, "OK").into_response(),
        Err(message) => (StatusCode::SERVICE_UNAVAILABLE, message).into_response(),
    }
}

fn error_response(err: Error) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"message": err.to_string()})),
    )
        .into_response()
}
