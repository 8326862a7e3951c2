// Copyright 2026 The Relay Project
// SPDX-License-Identifier: Apache-2.0

// Output re-framer
//
// Writes outbound frames to the response channel one at a time. Each frame
// is its own `Bytes` message, so the body yields it as soon as it is sent.

use super::types::{OutboundFrame, STREAM_ERROR_MESSAGE};
use bytes::Bytes;
use serde_json::Value;
use tokio::sync::mpsc;

/// The response body's receiver was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("downstream consumer disconnected")]
pub struct Disconnected;

/// Frames deltas, error indicators, and the sentinel onto the response stream.
///
/// At most one sentinel is ever written; later calls to
/// [`FrameWriter::emit_sentinel`] are no-ops.
pub struct FrameWriter {
    tx: mpsc::Sender<Bytes>,
    sentinel_sent: bool,
    frames_written: usize,
}

impl FrameWriter {
    pub fn new(tx: mpsc::Sender<Bytes>) -> Self {
        Self {
            tx,
            sentinel_sent: false,
            frames_written: 0,
        }
    }

    pub async fn emit_delta(&mut self, delta: Option<Value>) -> Result<(), Disconnected> {
        self.write(OutboundFrame::Delta(delta)).await
    }

    pub async fn emit_error(&mut self) -> Result<(), Disconnected> {
        self.write(OutboundFrame::Error(STREAM_ERROR_MESSAGE.to_string()))
            .await
    }

    /// Write the terminal `[DONE]` frame. Returns `false` if one was already written.
    pub async fn emit_sentinel(&mut self) -> Result<bool, Disconnected> {
        if self.sentinel_sent {
            return Ok(false);
        }
        self.write(OutboundFrame::Done).await?;
        self.sentinel_sent = true;
        Ok(true)
    }

    pub fn sentinel_sent(&self) -> bool {
        self.sentinel_sent
    }

    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    /// True once the response body has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once the response body has been dropped.
    pub async fn closed(&self) {
        self.tx.closed().await
    }

    async fn write(&mut self, frame: OutboundFrame) -> Result<(), Disconnected> {
        self.tx.send(frame.encode()).await.map_err(|_| Disconnected)?;
        self.frames_written += 1;
        Ok(())
    }
}
