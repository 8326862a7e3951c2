// Copyright 2026 The Relay Project
// SPDX-License-Identifier: Apache-2.0

// Stream transcoding
//
// Responsibilities:
// - Split the upstream run body into `\n\n`-delimited records
// - Forward `thread.message.delta` payloads as `{"delta": ...}` frames
// - Drop malformed and irrelevant records with a diagnostic
// - Terminate every session with exactly one `[DONE]` frame
// - Report mid-stream upstream failures in-band, then close

mod decoder;
mod driver;
mod frame;
mod types;
mod writer;

pub use decoder::decode_record;
pub use driver::{drive, spawn_session};
pub use frame::FrameBuffer;
pub use types::{
    Decoded, OutboundFrame, SessionOutcome, SessionPhase, SessionReport, DATA_PREFIX,
    RECORD_SEPARATOR, SENTINEL, STREAM_CHANNEL_CAPACITY, STREAM_ERROR_MESSAGE,
    THREAD_MESSAGE_DELTA,
};
pub use writer::{Disconnected, FrameWriter};

#[cfg(test)]
mod tests;
