// Copyright 2026 The Relay Project
// SPDX-License-Identifier: Apache-2.0

// Assistants API client
//
// Opens a streaming run in three sequential calls:
// - POST /threads                      -> thread id
// - POST /threads/{id}/messages        -> user message appended
// - POST /threads/{id}/runs (stream)   -> run body as a byte stream
//
// Any non-success status aborts the sequence. Nothing is retried.

pub mod transport;

use crate::config::{CredentialSettings, Environment, UpstreamSettings};
use crate::stream::SessionPhase;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub use transport::{
    BodyMode, ByteStream, ReplyBody, ReqwestTransport, Transport, TransportError, UpstreamCall,
    UpstreamReply,
};

/// Header that opts in to the Assistants beta.
pub const BETA_HEADER: &str = "openai-beta";

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Per-request credentials, read from the environment when a request arrives.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub assistant_id: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("assistant_id", &self.assistant_id)
            .finish()
    }
}

impl Credentials {
    /// Look up the API key and assistant id.
    ///
    /// A missing or blank API key is fatal; a missing assistant id falls back
    /// to the configured default.
    pub fn resolve(
        settings: &CredentialSettings,
        env: &dyn Environment,
    ) -> Result<Self, SetupError> {
        let api_key = env
            .var(&settings.api_key_var)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| SetupError::MissingCredential {
                var: settings.api_key_var.clone(),
            })?;

        let assistant_id = env
            .var(&settings.assistant_id_var)
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| settings.default_assistant_id.clone());

        Ok(Self {
            api_key,
            assistant_id,
        })
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// The three setup calls, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStage {
    Thread,
    Message,
    Run,
}

impl fmt::Display for SetupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SetupStage::Thread => "Thread creation",
            SetupStage::Message => "Message addition",
            SetupStage::Run => "Run creation",
        };
        f.write_str(label)
    }
}

/// An upstream setup call answered with a non-success status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{stage} failed: {} {body}", .status.as_u16())]
pub struct UpstreamFailure {
    pub stage: SetupStage,
    pub status: StatusCode,
    pub body: String,
}

/// Failures before the response is committed. All of them are reported to
/// the caller as a status code, never in-band.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("{var} environment variable not set")]
    MissingCredential { var: String },

    #[error("{0}")]
    Upstream(#[from] UpstreamFailure),

    #[error("{stage} failed: {source}")]
    Transport {
        stage: SetupStage,
        #[source]
        source: TransportError,
    },

    #[error("{stage} failed: unexpected response: {message}")]
    InvalidResponse { stage: SetupStage, message: String },

    #[error("invalid {name} header value")]
    InvalidHeader { name: &'static str },
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ThreadObject {
    id: String,
}

/// Issues the setup calls for one streaming run.
pub struct AssistantsClient {
    transport: Arc<dyn Transport>,
    settings: UpstreamSettings,
}

impl AssistantsClient {
    pub fn new(transport: Arc<dyn Transport>, settings: UpstreamSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    /// Create a thread, add the user message, and start a streaming run.
    ///
    /// Returns the run's response body, unread.
    pub async fn open_run(
        &self,
        credentials: &Credentials,
        input: &Value,
    ) -> Result<ByteStream, SetupError> {
        tracing::debug!(phase = %SessionPhase::Opening, "opening upstream run");

        let thread_id = self.create_thread(credentials).await?;
        tracing::debug!(thread_id = %thread_id, "thread created");

        self.add_message(credentials, &thread_id, input).await?;
        let run = self.start_run(credentials, &thread_id).await?;

        tracing::info!(
            thread_id = %thread_id,
            assistant_id = %credentials.assistant_id,
            "run stream opened"
        );
        Ok(run.body.into_stream())
    }

    async fn create_thread(&self, credentials: &Credentials) -> Result<String, SetupError> {
        let stage = SetupStage::Thread;
        let call = self.call_for(stage, credentials, "/threads".to_string(), None)?;
        let reply = self.send(stage, call).await?;

        let body = reply
            .body
            .read_all()
            .await
            .map_err(|source| SetupError::Transport { stage, source })?;
        let thread: ThreadObject =
            serde_json::from_slice(&body).map_err(|e| SetupError::InvalidResponse {
                stage,
                message: e.to_string(),
            })?;
        Ok(thread.id)
    }

    async fn add_message(
        &self,
        credentials: &Credentials,
        thread_id: &str,
        input: &Value,
    ) -> Result<(), SetupError> {
        let stage = SetupStage::Message;
        let body = json!({ "role": "user", "content": input });
        let call = self.call_for(
            stage,
            credentials,
            format!("/threads/{thread_id}/messages"),
            Some(body),
        )?;
        self.send(stage, call).await?;
        Ok(())
    }

    async fn start_run(
        &self,
        credentials: &Credentials,
        thread_id: &str,
    ) -> Result<UpstreamReply, SetupError> {
        let stage = SetupStage::Run;
        let body = json!({ "assistant_id": credentials.assistant_id, "stream": true });
        let mut call = self.call_for(
            stage,
            credentials,
            format!("/threads/{thread_id}/runs"),
            Some(body),
        )?;
        // A deadline would cut the run body off mid-stream.
        call.mode = BodyMode::Streaming;
        call.deadline = None;
        self.send(stage, call).await
    }

    fn call_for(
        &self,
        stage: SetupStage,
        credentials: &Credentials,
        path: String,
        body: Option<Value>,
    ) -> Result<UpstreamCall, SetupError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", credentials.api_key))
            .map_err(|_| SetupError::InvalidHeader {
                name: "authorization",
            })?;
        headers.insert(AUTHORIZATION, bearer);
        let beta = HeaderValue::from_str(&self.settings.beta)
            .map_err(|_| SetupError::InvalidHeader { name: BETA_HEADER })?;
        headers.insert(BETA_HEADER, beta);

        let json = match body {
            Some(value) => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                let encoded = serde_json::to_vec(&value).map_err(|e| SetupError::InvalidResponse {
                    stage,
                    message: e.to_string(),
                })?;
                Some(Bytes::from(encoded))
            }
            None => None,
        };

        Ok(UpstreamCall {
            url: format!("{}{path}", self.settings.base_url),
            headers,
            json,
            deadline: self.settings.timeout_ms.map(Duration::from_millis),
            mode: BodyMode::Buffered,
        })
    }

    async fn send(&self, stage: SetupStage, call: UpstreamCall) -> Result<UpstreamReply, SetupError> {
        let reply = self
            .transport
            .post(call)
            .await
            .map_err(|source| SetupError::Transport { stage, source })?;
        check_status(stage, reply).await
    }
}

/// Turn a non-success reply into an [`UpstreamFailure`] carrying the
/// status and body text.
pub async fn check_status(
    stage: SetupStage,
    reply: UpstreamReply,
) -> Result<UpstreamReply, SetupError> {
    if reply.status.is_success() {
        return Ok(reply);
    }

    let status = reply.status;
    let body = match reply.body.read_all().await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            tracing::warn!(stage = %stage, error = %e, "failed to read upstream error body");
            String::new()
        }
    };

    tracing::error!(stage = %stage, status = status.as_u16(), "upstream setup call failed");
    Err(UpstreamFailure { stage, status, body }.into())
}
