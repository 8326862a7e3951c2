// Copyright 2026 The Relay Project
// SPDX-License-Identifier: Apache-2.0

// Tests for stream transcoding
//
// Covers:
//  1. Record splitting independent of chunk boundaries
//  2. Incremental UTF-8 decoding across chunks
//  3. Sentinel precedence, delta extraction, kind filtering
//  4. Outbound frame format and single-sentinel guarantee
//  5. Session endings: sentinel, no sentinel, mid-stream error
//  6. Downstream disconnect releases the upstream stream

use super::*;
use bytes::Bytes;
use serde_json::{json, Value};
use std::fmt;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

/// Upstream read failure.
#[derive(Debug)]
struct ReadError(&'static str);

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

type Item = Result<Bytes, ReadError>;

const HI_DELTA: &str =
    "data: {\"event\":\"thread.message.delta\",\"data\":{\"delta\":{\"content\":\"Hi\"}}}\n\n";
const DONE: &str = "data: [DONE]\n\n";

fn ok(chunk: &str) -> Item {
    Ok(Bytes::copy_from_slice(chunk.as_bytes()))
}

/// In-memory upstream body; each string becomes one chunk.
fn upstream(items: Vec<Item>) -> impl tokio_stream::Stream<Item = Item> + Unpin + Send {
    tokio_stream::iter(items)
}

fn chunks(parts: &[&str]) -> Vec<Item> {
    parts.iter().map(|p| ok(p)).collect()
}

fn delta_record(text: &str) -> String {
    format!(
        "data: {}\n\n",
        json!({"event": "thread.message.delta", "data": {"delta": {"content": text}}})
    )
}

/// Run a session on its own task and collect the whole response body.
async fn run_session(items: Vec<Item>) -> String {
    let body = spawn_session(upstream(items), tracing::Span::none());
    collect_output(body).await
}

async fn collect_output(mut stream: ReceiverStream<Bytes>) -> String {
    let mut output = String::new();
    while let Some(chunk) = stream.next().await {
        output.push_str(&String::from_utf8_lossy(&chunk));
    }
    output
}

/// Drive a session inline and return its report plus output.
async fn drive_session(items: Vec<Item>) -> (SessionReport, String) {
    let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
    let report = drive(upstream(items), FrameWriter::new(tx)).await;
    let output = collect_output(ReceiverStream::new(rx)).await;
    (report, output)
}

fn count_sentinels(output: &str) -> usize {
    output.matches(DONE).count()
}

// ---------------------------------------------------------------------------
// Frame buffer
// ---------------------------------------------------------------------------

#[test]
fn single_chunk_with_two_records_splits_in_order() {
    let mut buffer = FrameBuffer::new();
    let records = buffer.append(b"data: one\n\ndata: two\n\n");
    assert_eq!(records, vec!["data: one", "data: two"]);
    assert!(buffer.is_empty());
}

#[test]
fn chunk_without_boundary_only_grows_pending() {
    let mut buffer = FrameBuffer::new();
    assert!(buffer.append(b"data: {\"par").is_empty());
    assert!(buffer.append(b"tial\":true}").is_empty());
    assert_eq!(buffer.pending(), b"data: {\"partial\":true}");
}

#[test]
fn zero_length_chunk_is_a_no_op() {
    let mut buffer = FrameBuffer::new();
    buffer.append(b"data: x");
    assert!(buffer.append(b"").is_empty());
    assert_eq!(buffer.pending(), b"data: x");
}

#[test]
fn boundary_split_between_chunks_is_found() {
    let mut buffer = FrameBuffer::new();
    assert!(buffer.append(b"data: a\n").is_empty());
    assert_eq!(buffer.append(b"\ndata: b"), vec!["data: a"]);
    assert_eq!(buffer.pending(), b"data: b");
}

#[test]
fn extra_newlines_stay_with_the_following_record() {
    let mut buffer = FrameBuffer::new();
    let records = buffer.append(b"a\n\n\nb\n\n\n\n");
    assert_eq!(records, vec!["a", "\nb", ""]);
    assert!(buffer.is_empty());
}

#[test]
fn every_two_way_split_yields_the_same_records() {
    let input = "data: first\n\ndata: second record\n\ndata: [DONE]\n\ntrailing";
    let expected = vec!["data: first", "data: second record", "data: [DONE]"];

    for split in 0..=input.len() {
        let mut buffer = FrameBuffer::new();
        let mut records = buffer.append(&input.as_bytes()[..split]);
        records.extend(buffer.append(&input.as_bytes()[split..]));
        assert_eq!(records, expected, "split at byte {split}");
        assert_eq!(buffer.pending(), b"trailing", "split at byte {split}");
    }
}

#[test]
fn one_byte_at_a_time_yields_the_same_records() {
    let input = format!("{}{}{}", delta_record("a"), delta_record("b"), DONE);
    let mut buffer = FrameBuffer::new();
    let mut records = Vec::new();
    for byte in input.as_bytes() {
        records.extend(buffer.append(std::slice::from_ref(byte)));
    }
    assert_eq!(records.len(), 3);
    assert_eq!(records[2], "data: [DONE]");
    assert!(buffer.is_empty());
}

#[test]
fn multibyte_character_split_across_chunks_decodes_intact() {
    let input = "data: caf\u{e9} \u{65e5}\u{672c}\n\n".as_bytes();
    // Cut inside the two-byte 'é'.
    let cut = input.iter().position(|b| *b == 0xC3).unwrap() + 1;

    let mut buffer = FrameBuffer::new();
    assert!(buffer.append(&input[..cut]).is_empty());
    let records = buffer.append(&input[cut..]);
    assert_eq!(records, vec!["data: caf\u{e9} \u{65e5}\u{672c}"]);
}

// ---------------------------------------------------------------------------
// Event decoder
// ---------------------------------------------------------------------------

#[test]
fn done_record_is_sentinel() {
    assert_eq!(decode_record("data: [DONE]"), Decoded::Sentinel);
}

#[test]
fn sentinel_wins_over_parseable_payload() {
    let record = r#"data: {"event":"thread.message.delta","data":{"delta":{"content":"[DONE]"}}}"#;
    assert_eq!(decode_record(record), Decoded::Sentinel);
}

#[test]
fn message_delta_payload_is_extracted() {
    let record = r#"data: {"event":"thread.message.delta","data":{"id":"msg_1","delta":{"content":[{"index":0,"type":"text","text":{"value":"Hi"}}]}}}"#;
    assert_eq!(
        decode_record(record),
        Decoded::Delta(Some(json!({"content": [{"index": 0, "type": "text", "text": {"value": "Hi"}}]})))
    );
}

#[test]
fn record_without_prefix_still_parses() {
    let record = r#"{"event":"thread.message.delta","data":{"delta":{"content":"x"}}}"#;
    assert_eq!(decode_record(record), Decoded::Delta(Some(json!({"content": "x"}))));
}

#[test]
fn run_step_delta_is_filtered() {
    let record = r#"data: {"event":"thread.run.step.delta","data":{"delta":{"step_details":{}}}}"#;
    assert_eq!(
        decode_record(record),
        Decoded::Filtered {
            kind: Some("thread.run.step.delta".to_string())
        }
    );
}

#[test]
fn record_without_kind_is_filtered() {
    assert_eq!(
        decode_record(r#"data: {"object":"thread.run"}"#),
        Decoded::Filtered { kind: None }
    );
}

#[test]
fn invalid_json_is_malformed() {
    assert!(matches!(
        decode_record("data: {not json"),
        Decoded::Malformed { .. }
    ));
    assert!(matches!(decode_record(""), Decoded::Malformed { .. }));
}

#[test]
fn message_delta_without_data_is_malformed() {
    assert!(matches!(
        decode_record(r#"data: {"event":"thread.message.delta"}"#),
        Decoded::Malformed { .. }
    ));
}

#[test]
fn message_delta_with_null_delta_keeps_null() {
    assert_eq!(
        decode_record(r#"data: {"event":"thread.message.delta","data":{"delta":null}}"#),
        Decoded::Delta(Some(Value::Null))
    );
}

#[test]
fn message_delta_without_delta_field_has_no_payload() {
    assert_eq!(
        decode_record(r#"data: {"event":"thread.message.delta","data":{"id":"msg_1"}}"#),
        Decoded::Delta(None)
    );
}

#[tokio::test]
async fn null_delta_is_forwarded_as_null() {
    let output = run_session(chunks(&[
        "data: {\"event\":\"thread.message.delta\",\"data\":{\"delta\":null}}\n\n",
    ]))
    .await;
    assert_eq!(output, "data: {\"delta\":null}\n\ndata: [DONE]\n\n");
}

#[tokio::test]
async fn absent_delta_is_forwarded_as_empty_object() {
    let output = run_session(chunks(&[
        "data: {\"event\":\"thread.message.delta\",\"data\":{}}\n\n",
    ]))
    .await;
    assert_eq!(output, "data: {}\n\ndata: [DONE]\n\n");
}

// ---------------------------------------------------------------------------
// Outbound frames and writer
// ---------------------------------------------------------------------------

#[test]
fn frames_encode_with_prefix_and_blank_line() {
    assert_eq!(
        OutboundFrame::Delta(Some(json!({"content": "Hi"}))).encode(),
        Bytes::from_static(b"data: {\"delta\":{\"content\":\"Hi\"}}\n\n")
    );
    assert_eq!(
        OutboundFrame::Error(STREAM_ERROR_MESSAGE.to_string()).encode(),
        Bytes::from_static(b"data: {\"error\":\"Stream error\"}\n\n")
    );
    assert_eq!(OutboundFrame::Done.encode(), Bytes::from_static(b"data: [DONE]\n\n"));
}

#[tokio::test]
async fn writer_emits_sentinel_once() {
    let (tx, mut rx) = mpsc::channel(8);
    let mut writer = FrameWriter::new(tx);

    assert_eq!(writer.emit_sentinel().await, Ok(true));
    assert_eq!(writer.emit_sentinel().await, Ok(false));
    assert_eq!(writer.frames_written(), 1);
    drop(writer);

    assert_eq!(rx.recv().await, Some(Bytes::from_static(b"data: [DONE]\n\n")));
    assert_eq!(rx.recv().await, None);
}

#[tokio::test]
async fn writer_reports_disconnect() {
    let (tx, rx) = mpsc::channel(8);
    let mut writer = FrameWriter::new(tx);
    drop(rx);

    assert!(writer.is_closed());
    assert_eq!(writer.emit_delta(Some(json!({"content": "x"}))).await, Err(Disconnected));
    assert_eq!(writer.frames_written(), 0);
}

// ---------------------------------------------------------------------------
// Session driver
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delta_then_sentinel_is_relayed_verbatim() {
    let output = run_session(chunks(&[HI_DELTA, DONE])).await;
    assert_eq!(
        output,
        "data: {\"delta\":{\"content\":\"Hi\"}}\n\ndata: [DONE]\n\n"
    );
}

#[tokio::test]
async fn missing_upstream_sentinel_is_synthesized() {
    let (report, output) = drive_session(chunks(&[HI_DELTA])).await;
    assert_eq!(
        output,
        "data: {\"delta\":{\"content\":\"Hi\"}}\n\ndata: [DONE]\n\n"
    );
    assert_eq!(report.outcome, SessionOutcome::Completed);
    assert!(!report.run_completed);
}

#[tokio::test]
async fn empty_upstream_still_terminates() {
    let (report, output) = drive_session(Vec::new()).await;
    assert_eq!(output, DONE);
    assert_eq!(report.frames_written, 1);
}

#[tokio::test]
async fn malformed_record_does_not_abort_session() {
    let (report, output) =
        drive_session(chunks(&["data: {\"event\": oops\n\n", HI_DELTA])).await;
    assert_eq!(
        output,
        "data: {\"delta\":{\"content\":\"Hi\"}}\n\ndata: [DONE]\n\n"
    );
    assert_eq!(report.malformed, 1);
    assert_eq!(report.deltas, 1);
}

#[tokio::test]
async fn non_message_kinds_produce_no_frames() {
    let step = "data: {\"event\":\"thread.run.step.delta\",\"data\":{\"delta\":{}}}\n\n";
    let created = "data: {\"event\":\"thread.run.created\",\"data\":{\"id\":\"run_1\"}}\n\n";
    let (report, output) = drive_session(chunks(&[created, step, DONE])).await;
    assert_eq!(output, DONE);
    assert_eq!(report.records, 3);
    assert_eq!(report.deltas, 0);
}

#[tokio::test]
async fn error_after_delta_reports_in_band_then_terminates() {
    let (report, output) =
        drive_session(vec![ok(HI_DELTA), Err(ReadError("connection reset"))]).await;
    assert_eq!(
        output,
        "data: {\"delta\":{\"content\":\"Hi\"}}\n\n\
         data: {\"error\":\"Stream error\"}\n\n\
         data: [DONE]\n\n"
    );
    assert_eq!(report.outcome, SessionOutcome::Failed);
}

#[tokio::test]
async fn error_stops_reading_upstream() {
    let (report, output) = drive_session(vec![
        Err(ReadError("boom")),
        ok(HI_DELTA),
    ])
    .await;
    assert!(!output.contains("delta"));
    assert_eq!(report.records, 0);
    assert_eq!(count_sentinels(&output), 1);
}

#[tokio::test]
async fn reading_continues_after_upstream_sentinel() {
    let trailing = delta_record("late");
    let (report, output) =
        drive_session(chunks(&[HI_DELTA, DONE, trailing.as_str(), DONE])).await;

    // Everything is read, but nothing follows the first sentinel.
    assert_eq!(report.records, 4);
    assert!(report.run_completed);
    assert!(output.ends_with(DONE));
    assert_eq!(count_sentinels(&output), 1);
    assert!(!output.contains("late"));
}

#[tokio::test]
async fn error_after_sentinel_adds_nothing() {
    let (report, output) = drive_session(vec![
        ok(HI_DELTA),
        ok(DONE),
        Err(ReadError("late failure")),
    ])
    .await;
    assert_eq!(
        output,
        "data: {\"delta\":{\"content\":\"Hi\"}}\n\ndata: [DONE]\n\n"
    );
    assert_eq!(report.outcome, SessionOutcome::Failed);
}

#[tokio::test]
async fn every_ending_carries_exactly_one_sentinel() {
    let endings: Vec<Vec<Item>> = vec![
        chunks(&[HI_DELTA, DONE]),
        chunks(&[HI_DELTA]),
        chunks(&[DONE, DONE]),
        vec![ok(HI_DELTA), Err(ReadError("reset"))],
        vec![Err(ReadError("reset"))],
        chunks(&[HI_DELTA, "data: {\"event\":\"thread.message.delta\""]),
    ];

    for (i, items) in endings.into_iter().enumerate() {
        let output = run_session(items).await;
        assert_eq!(count_sentinels(&output), 1, "ending {i}: {output:?}");
        assert!(output.ends_with(DONE), "ending {i}: {output:?}");
    }
}

#[tokio::test]
async fn byte_at_a_time_delivery_matches_single_chunk() {
    let body = format!("{}{}{}", delta_record("a"), delta_record("\u{e9}"), DONE);
    let whole = run_session(chunks(&[body.as_str()])).await;

    let bytes: Vec<Item> = body
        .as_bytes()
        .iter()
        .map(|b| Ok(Bytes::copy_from_slice(std::slice::from_ref(b))))
        .collect();
    let trickled = run_session(bytes).await;

    assert_eq!(whole, trickled);
    assert!(trickled.contains("\u{e9}"));
}

#[tokio::test]
async fn disconnect_before_first_read_releases_upstream() {
    let (up_tx, up_rx) = mpsc::channel::<Item>(4);
    let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
    drop(rx);

    let report = drive(ReceiverStream::new(up_rx), FrameWriter::new(tx)).await;

    assert_eq!(report.outcome, SessionOutcome::Disconnected);
    assert_eq!(report.frames_written, 0);
    assert!(up_tx.is_closed());
}

#[tokio::test]
async fn disconnect_mid_stream_stops_reading_upstream() {
    let (up_tx, up_rx) = mpsc::channel::<Item>(4);
    let mut body = spawn_session(ReceiverStream::new(up_rx), tracing::Span::none());

    up_tx.send(ok(HI_DELTA)).await.unwrap();
    let first = body.next().await.unwrap();
    assert!(first.starts_with(b"data: {\"delta\""));
    drop(body);

    // The driver notices on its next write or before its next read.
    let _ = up_tx.send(ok(HI_DELTA)).await;
    timeout(Duration::from_secs(1), up_tx.closed())
        .await
        .expect("upstream should be released after disconnect");
}

#[tokio::test]
async fn disconnect_while_upstream_is_idle_releases_upstream() {
    let (up_tx, up_rx) = mpsc::channel::<Item>(4);
    let mut body = spawn_session(ReceiverStream::new(up_rx), tracing::Span::none());

    up_tx.send(ok(HI_DELTA)).await.unwrap();
    assert!(body.next().await.is_some());
    drop(body);

    // No further upstream data: the pending read must be abandoned.
    timeout(Duration::from_secs(2), up_tx.closed())
        .await
        .expect("upstream should be released without another chunk");
}

#[tokio::test]
async fn deltas_after_sentinel_are_reported_as_suppressed() {
    let (report, output) = drive_session(chunks(&[HI_DELTA, DONE, HI_DELTA, HI_DELTA])).await;
    assert_eq!(count_sentinels(&output), 1);
    assert_eq!(report.deltas, 1);
    assert_eq!(report.suppressed, 2);
}

#[tokio::test]
async fn concurrent_sessions_are_independent() {
    let (a_tx, a_rx) = mpsc::channel::<Item>(4);
    let (b_tx, b_rx) = mpsc::channel::<Item>(4);
    let a = spawn_session(ReceiverStream::new(a_rx), tracing::Span::none());
    let b = spawn_session(ReceiverStream::new(b_rx), tracing::Span::none());

    // Interleave half-records between the two sessions.
    let a_record = delta_record("from a");
    let b_record = delta_record("from b");
    let (a_head, a_tail) = a_record.split_at(10);
    let (b_head, b_tail) = b_record.split_at(17);

    a_tx.send(ok(a_head)).await.unwrap();
    b_tx.send(ok(b_head)).await.unwrap();
    b_tx.send(ok(b_tail)).await.unwrap();
    a_tx.send(ok(a_tail)).await.unwrap();
    drop(a_tx);
    drop(b_tx);

    let (a_out, b_out) = tokio::join!(collect_output(a), collect_output(b));
    assert_eq!(
        a_out,
        "data: {\"delta\":{\"content\":\"from a\"}}\n\ndata: [DONE]\n\n"
    );
    assert_eq!(
        b_out,
        "data: {\"delta\":{\"content\":\"from b\"}}\n\ndata: [DONE]\n\n"
    );
}
