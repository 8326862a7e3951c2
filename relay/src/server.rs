// Copyright 2026 The Relay Project
// SPDX-License-Identifier: Apache-2.0

// HTTP surface
//
// Responsibilities:
// - POST /api/chat: parse `{ input }`, open the upstream run, stream deltas
// - GET /v1/heartbeat: liveness
// - Pre-stream failures as JSON error bodies; post-stream failures in-band

use crate::config::{Config, Environment};
use crate::stream::spawn_session;
use crate::upstream::{AssistantsClient, Credentials, SetupError};
use axum::body::Body;
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Route of the relay endpoint.
pub const CHAT_PATH: &str = "/api/chat";

/// Route of the liveness endpoint.
pub const HEARTBEAT_PATH: &str = "/v1/heartbeat";

// ---------------------------------------------------------------------------
// Request and error bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Message content, forwarded to the upstream message call unchanged.
    pub input: Value,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    pub details: String,
}

/// Errors reported before the event stream starts.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Setup(#[from] SetupError),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            RelayError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "Invalid request"),
            RelayError::Setup(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };
        let body = ErrorBody {
            error: error.to_string(),
            details: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

/// Shared, read-only state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub client: Arc<AssistantsClient>,
    pub env: Arc<dyn Environment>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Heartbeat endpoint: GET /v1/heartbeat -> 200 OK
pub async fn heartbeat() -> StatusCode {
    StatusCode::OK
}

/// Relay endpoint.
///
/// Everything up to and including the run call happens before the response
/// is committed, so those failures become a 4xx/5xx. Once the run stream is
/// open the response is always 200 and the session reports problems in-band.
pub async fn chat_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("chat", %request_id);

    match open_stream(&state, &body).instrument(span.clone()).await {
        Ok(run) => {
            let events = spawn_session(run, span);
            event_stream_response(Body::from_stream(events.map(Ok::<Bytes, Infallible>)))
        }
        Err(e) => {
            span.in_scope(|| match &e {
                RelayError::InvalidRequest(reason) => {
                    tracing::warn!(%reason, "rejected chat request");
                }
                RelayError::Setup(setup) => {
                    tracing::error!(error = %setup, "chat setup failed");
                }
            });
            e.into_response()
        }
    }
}

async fn open_stream(
    state: &AppState,
    body: &Bytes,
) -> Result<crate::upstream::ByteStream, RelayError> {
    let request = parse_request(body)?;
    let credentials = Credentials::resolve(&state.config.credentials, state.env.as_ref())?;
    Ok(state.client.open_run(&credentials, &request.input).await?)
}

fn parse_request(body: &Bytes) -> Result<ChatRequest, RelayError> {
    if body.is_empty() {
        return Err(RelayError::InvalidRequest("request body is empty".to_string()));
    }
    serde_json::from_slice(body)
        .map_err(|e| RelayError::InvalidRequest(format!("request body is not valid JSON: {e}")))
}

fn event_stream_response(body: Body) -> Response {
    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, "text/event-stream"),
            (CACHE_CONTROL, "no-cache, no-transform"),
            (CONNECTION, "keep-alive"),
        ],
        body,
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Router construction
// ---------------------------------------------------------------------------

/// Build the axum router. All dependencies arrive through `state`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(HEARTBEAT_PATH, get(heartbeat))
        .route(CHAT_PATH, post(chat_handler))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
