// Copyright 2026 The Relay Project
// SPDX-License-Identifier: Apache-2.0

// Stream types
//
// Wire constants, decoded record outcomes, outbound frames, and the
// per-session bookkeeping the driver reports when a stream closes.

use bytes::Bytes;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use std::fmt;

// ---------------------------------------------------------------------------
// Wire constants
// ---------------------------------------------------------------------------

/// Boundary between logical event records, inbound and outbound.
pub const RECORD_SEPARATOR: &str = "\n\n";

/// Field marker that prefixes every record payload.
pub const DATA_PREFIX: &str = "data: ";

/// Literal completion marker.
pub const SENTINEL: &str = "[DONE]";

/// The only upstream event kind whose payload is forwarded.
pub const THREAD_MESSAGE_DELTA: &str = "thread.message.delta";

/// Message carried by the in-band error frame.
pub const STREAM_ERROR_MESSAGE: &str = "Stream error";

/// Capacity of the channel between the session task and the response body.
pub const STREAM_CHANNEL_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Upstream records
// ---------------------------------------------------------------------------

/// JSON payload of one upstream record.
///
/// Only the fields the relay inspects are modelled; everything else in the
/// payload is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamEvent {
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub data: Option<EventData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    /// `None` when the field is absent. An explicit `null` is kept as
    /// `Some(Value::Null)`.
    #[serde(default, deserialize_with = "present")]
    pub delta: Option<Value>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

/// Outcome of decoding one logical event record.
///
/// `Filtered` and `Malformed` carry no payload for the client; they exist so
/// the session can count and log what it dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A message-content delta to forward. `None` if the event had no
    /// `delta` field at all.
    Delta(Option<Value>),
    /// The record carried the completion marker.
    Sentinel,
    /// Valid record of a kind the relay does not forward.
    Filtered { kind: Option<String> },
    /// Record payload could not be understood.
    Malformed { reason: String },
}

// ---------------------------------------------------------------------------
// Outbound frames
// ---------------------------------------------------------------------------

/// One frame of the outbound event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundFrame {
    /// `{"delta": <payload>}`, or `{}` when the payload was absent.
    Delta(Option<Value>),
    /// `{"error": <message>}`
    Error(String),
    /// `[DONE]`
    Done,
}

impl OutboundFrame {
    /// The text between the `data: ` prefix and the record separator.
    pub fn payload(&self) -> String {
        match self {
            OutboundFrame::Delta(Some(delta)) => json!({ "delta": delta }).to_string(),
            OutboundFrame::Delta(None) => json!({}).to_string(),
            OutboundFrame::Error(message) => json!({ "error": message }).to_string(),
            OutboundFrame::Done => SENTINEL.to_string(),
        }
    }

    /// Serialize as `data: <payload>\n\n`.
    pub fn encode(&self) -> Bytes {
        Bytes::from(format!("{DATA_PREFIX}{}{RECORD_SEPARATOR}", self.payload()))
    }
}

// ---------------------------------------------------------------------------
// Session bookkeeping
// ---------------------------------------------------------------------------

/// Lifecycle of one relay session.
///
/// `Opening` covers the upstream setup calls made before the response is
/// committed; the driver itself starts in `Streaming`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Opening,
    Streaming,
    Finalizing,
    Closed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Opening => "opening",
            SessionPhase::Streaming => "streaming",
            SessionPhase::Finalizing => "finalizing",
            SessionPhase::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// How a session left the streaming phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Upstream reached end of data.
    Completed,
    /// Upstream read failed mid-stream; an error frame was written.
    Failed,
    /// The downstream consumer went away.
    Disconnected,
}

/// Summary of one finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    /// Whether the upstream stream carried its own completion marker.
    pub run_completed: bool,
    /// Complete records split out of the upstream stream.
    pub records: usize,
    /// Deltas written to the client.
    pub deltas: usize,
    /// Deltas dropped because they arrived after the sentinel.
    pub suppressed: usize,
    /// Records dropped as malformed.
    pub malformed: usize,
    /// Frames written to the client, sentinel and error frames included.
    pub frames_written: usize,
}
