//! HTTP surface: token issuance, introspection, health and metrics.

mod introspect;
mod token;

use crate::error::IdpError;
use crate::introspection::IntrospectionEngine;
use crate::issuance::IssuanceEngine;
use crate::metrics;
use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Token issuance
    pub issuance: Arc<IssuanceEngine>,
    /// Token introspection
    pub introspection: Arc<IntrospectionEngine>,
}

/// Build the service router.
///
/// Every request runs under `request_timeout`; on expiry the in-flight work
/// is dropped and the caller gets `503 temporarily_unavailable`.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/token", post(token::issue_token))
        .route("/introspect", post(introspect::introspect_token))
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn_with_state(request_timeout, enforce_deadline)),
        )
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn render_metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render(),
    )
}

async fn enforce_deadline(State(budget): State<Duration>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    match tokio::time::timeout(budget, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            warn!(path = %path, ?budget, "request deadline exceeded");
            IdpError::InfrastructureUnavailable {
                service: "request",
                reason: format!("deadline of {budget:?} exceeded"),
            }
            .into_response()
        }
    }
}

/// Body encodings accepted on POST endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
}

fn body_kind(headers: &HeaderMap) -> Result<BodyKind, IdpError> {
    let Some(value) = headers.get(header::CONTENT_TYPE) else {
        return Ok(BodyKind::Json);
    };
    let value = value
        .to_str()
        .map_err(|_| IdpError::invalid_request("unreadable content type"))?;
    let essence = value.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    match essence.as_str() {
        "application/json" => Ok(BodyKind::Json),
        "application/x-www-form-urlencoded" => Ok(BodyKind::Form),
        _ => Err(IdpError::invalid_request("unsupported content type")),
    }
}

/// Parse a JSON or form body into `T`.
///
/// Form bodies are lifted into a JSON object first. Repeating a parameter
/// is an error, except `scopes`, which collects into a list.
fn parse_envelope<T: DeserializeOwned>(headers: &HeaderMap, body: &Bytes) -> Result<T, IdpError> {
    let value = match body_kind(headers)? {
        BodyKind::Json if body.iter().all(u8::is_ascii_whitespace) => Value::Object(Map::new()),
        BodyKind::Json => serde_json::from_slice(body)
            .map_err(|e| IdpError::invalid_request(format!("body is not valid JSON: {e}")))?,
        BodyKind::Form => form_to_json(body)?,
    };
    if !value.is_object() {
        return Err(IdpError::invalid_request("body must be an object"));
    }
    serde_json::from_value(value).map_err(|e| IdpError::invalid_request(e.to_string()))
}

fn form_to_json(body: &[u8]) -> Result<Value, IdpError> {
    let mut object = Map::new();
    for (key, value) in url::form_urlencoded::parse(body) {
        if key == "scopes" {
            if let Value::Array(list) = object
                .entry("scopes")
                .or_insert_with(|| Value::Array(Vec::new()))
            {
                list.push(Value::String(value.into_owned()));
            }
            continue;
        }
        if object.contains_key(key.as_ref()) {
            return Err(IdpError::invalid_request(format!("parameter {key} repeated")));
        }
        object.insert(key.into_owned(), Value::String(value.into_owned()));
    }
    Ok(Value::Object(object))
}
