// Copyright 2026 The Relay Project
// SPDX-License-Identifier: Apache-2.0

// Upstream transport
//
// The Assistants client reaches the network only through `Transport`, so
// tests can script upstream replies without a socket. Every setup call is a
// POST; only the run call keeps its reply body open as a stream.

use async_trait::async_trait;
use axum::http::{HeaderMap, StatusCode};
use bytes::{Bytes, BytesMut};
use futures_util::stream::{Stream, TryStreamExt};
use std::pin::Pin;
use std::time::Duration;

/// Upstream reply body as a stream of raw chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// How the reply body should be handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMode {
    /// Read the whole body before returning.
    Buffered,
    /// Return as soon as the status arrives; the body is read by the caller.
    Streaming,
}

/// One POST to the upstream service.
#[derive(Debug, Clone)]
pub struct UpstreamCall {
    pub url: String,
    pub headers: HeaderMap,
    /// Serialized JSON body, if the call carries one.
    pub json: Option<Bytes>,
    /// Overall deadline for the call. `None` leaves it to the client.
    pub deadline: Option<Duration>,
    pub mode: BodyMode,
}

pub enum ReplyBody {
    Buffered(Bytes),
    Streaming(ByteStream),
}

impl ReplyBody {
    /// Collect the body in memory, draining the stream if there is one.
    pub async fn read_all(self) -> Result<Bytes, TransportError> {
        match self {
            ReplyBody::Buffered(bytes) => Ok(bytes),
            ReplyBody::Streaming(stream) => stream
                .try_fold(BytesMut::new(), |mut acc, chunk| async move {
                    acc.extend_from_slice(&chunk);
                    Ok(acc)
                })
                .await
                .map(BytesMut::freeze),
        }
    }

    /// View the body as a chunk stream. A buffered body is a single chunk.
    pub fn into_stream(self) -> ByteStream {
        match self {
            ReplyBody::Buffered(bytes) => {
                Box::pin(futures_util::stream::once(async move { Ok(bytes) }))
            }
            ReplyBody::Streaming(stream) => stream,
        }
    }
}

pub struct UpstreamReply {
    pub status: StatusCode,
    pub body: ReplyBody,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("could not reach upstream: {0}")]
    Connect(String),
    #[error("upstream timed out: {0}")]
    Timeout(String),
    #[error("upstream body interrupted: {0}")]
    Body(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else if e.is_body() || e.is_decode() {
            TransportError::Body(e.to_string())
        } else {
            TransportError::Connect(e.to_string())
        }
    }
}

/// Sends setup and run calls to the upstream service.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, call: UpstreamCall) -> Result<UpstreamReply, TransportError>;
}

// ---------------------------------------------------------------------------
// reqwest transport
// ---------------------------------------------------------------------------

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post(&self, call: UpstreamCall) -> Result<UpstreamReply, TransportError> {
        let UpstreamCall {
            url,
            headers,
            json,
            deadline,
            mode,
        } = call;

        let mut builder = self.client.post(url).headers(headers);
        if let Some(body) = json {
            builder = builder.body(body);
        }
        if let Some(deadline) = deadline {
            builder = builder.timeout(deadline);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = match mode {
            BodyMode::Buffered => ReplyBody::Buffered(response.bytes().await?),
            BodyMode::Streaming => {
                ReplyBody::Streaming(Box::pin(response.bytes_stream().map_err(TransportError::from)))
            }
        };

        Ok(UpstreamReply { status, body })
    }
}
