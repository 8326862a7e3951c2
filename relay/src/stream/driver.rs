// Copyright 2026 The Relay Project
// SPDX-License-Identifier: Apache-2.0

// Session driver
//
// Pumps the upstream run body through the frame buffer, decoder and writer,
// then finalizes: exactly one sentinel reaches the client whether the
// upstream ended cleanly, ended without a marker, or failed mid-read. The
// writer and the upstream body are dropped on every exit path, which closes
// the response and releases the upstream connection.

use super::decoder::decode_record;
use super::frame::FrameBuffer;
use super::types::{
    Decoded, SessionOutcome, SessionPhase, SessionReport, STREAM_CHANNEL_CAPACITY,
};
use super::writer::{Disconnected, FrameWriter};
use bytes::Bytes;
use std::fmt::Display;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tracing::Instrument;

/// Run a session on its own task and return the response body stream.
///
/// The task owns the upstream stream, the frame buffer and the completion
/// flag; nothing is shared with other sessions.
pub fn spawn_session<S, E>(input: S, span: tracing::Span) -> ReceiverStream<Bytes>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin + Send + 'static,
    E: Display + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<Bytes>(STREAM_CHANNEL_CAPACITY);

    tokio::spawn(
        async move {
            let report = drive(input, FrameWriter::new(tx)).await;
            tracing::info!(
                outcome = ?report.outcome,
                run_completed = report.run_completed,
                records = report.records,
                deltas = report.deltas,
                suppressed = report.suppressed,
                malformed = report.malformed,
                frames = report.frames_written,
                "session closed"
            );
        }
        .instrument(span),
    );

    ReceiverStream::new(rx)
}

/// Drive one session to completion.
///
/// Consumes both the upstream stream and the writer; both are dropped before
/// this returns.
pub async fn drive<S, E>(mut input: S, mut writer: FrameWriter) -> SessionReport
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    let mut state = SessionState::new();
    state.enter(SessionPhase::Streaming);
    let mut frames = FrameBuffer::new();

    let pumped = pump(&mut input, &mut frames, &mut state, &mut writer).await;
    drop(input);

    state.enter(SessionPhase::Finalizing);
    let outcome = match pumped {
        Ok(StreamEnd::Exhausted) => {
            if !frames.is_empty() {
                tracing::debug!(
                    pending_bytes = frames.pending().len(),
                    "upstream ended inside a record, dropping remainder"
                );
            }
            finish_clean(&state, &mut writer).await
        }
        Ok(StreamEnd::Failed(message)) => {
            tracing::error!(error = %message, "upstream stream failed");
            finish_failed(&mut writer).await
        }
        Err(Disconnected) => {
            tracing::info!("client disconnected, upstream released");
            SessionOutcome::Disconnected
        }
    };

    let report = SessionReport {
        outcome,
        run_completed: state.run_completed,
        records: state.records,
        deltas: state.deltas,
        suppressed: state.suppressed,
        malformed: state.malformed,
        frames_written: writer.frames_written(),
    };
    drop(writer);
    state.enter(SessionPhase::Closed);
    report
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

struct SessionState {
    run_completed: bool,
    records: usize,
    deltas: usize,
    malformed: usize,
    suppressed: usize,
}

impl SessionState {
    fn new() -> Self {
        Self {
            run_completed: false,
            records: 0,
            deltas: 0,
            malformed: 0,
            suppressed: 0,
        }
    }

    fn enter(&self, phase: SessionPhase) {
        tracing::debug!(phase = %phase, "session phase");
    }
}

enum StreamEnd {
    Exhausted,
    Failed(String),
}

// ---------------------------------------------------------------------------
// Streaming
// ---------------------------------------------------------------------------

/// Read, split, decode and write until the upstream ends or fails.
///
/// Each chunk's records are fully written before the next read. A read that
/// is still pending when the response body is dropped is abandoned.
async fn pump<S, E>(
    input: &mut S,
    frames: &mut FrameBuffer,
    state: &mut SessionState,
    writer: &mut FrameWriter,
) -> Result<StreamEnd, Disconnected>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    loop {
        let next = tokio::select! {
            biased;
            _ = writer.closed() => return Err(Disconnected),
            next = input.next() => next,
        };

        let chunk = match next {
            Some(Ok(chunk)) => chunk,
            Some(Err(e)) => return Ok(StreamEnd::Failed(e.to_string())),
            None => return Ok(StreamEnd::Exhausted),
        };

        for record in frames.append(&chunk) {
            state.records += 1;
            process_record(&record, state, writer).await?;
        }
    }
}

async fn process_record(
    record: &str,
    state: &mut SessionState,
    writer: &mut FrameWriter,
) -> Result<(), Disconnected> {
    match decode_record(record) {
        Decoded::Sentinel => {
            state.run_completed = true;
            if !writer.emit_sentinel().await? {
                tracing::debug!("repeated upstream sentinel not forwarded");
            }
        }
        Decoded::Delta(delta) => {
            // The client stops reading at the first sentinel.
            if writer.sentinel_sent() {
                state.suppressed += 1;
                tracing::debug!(suppressed = state.suppressed, "delta after sentinel not forwarded");
            } else {
                writer.emit_delta(delta).await?;
                state.deltas += 1;
            }
        }
        Decoded::Malformed { .. } => state.malformed += 1,
        Decoded::Filtered { .. } => {}
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Finalizing
// ---------------------------------------------------------------------------

async fn finish_clean(state: &SessionState, writer: &mut FrameWriter) -> SessionOutcome {
    if !state.run_completed {
        tracing::debug!("upstream ended without sentinel, synthesizing one");
        if writer.emit_sentinel().await.is_err() {
            return SessionOutcome::Disconnected;
        }
    }
    SessionOutcome::Completed
}

async fn finish_failed(writer: &mut FrameWriter) -> SessionOutcome {
    // After a sentinel the client has stopped reading; an error frame would
    // land past the end of the stream.
    if writer.sentinel_sent() {
        return SessionOutcome::Failed;
    }
    if writer.emit_error().await.is_err() || writer.emit_sentinel().await.is_err() {
        return SessionOutcome::Disconnected;
    }
    SessionOutcome::Failed
}
