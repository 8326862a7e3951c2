// Copyright 2026 The Relay Project
// SPDX-License-Identifier: Apache-2.0

// Event decoder
//
// Classifies one logical event record. Never fails: anything the relay
// cannot use comes back as `Filtered` or `Malformed` with a diagnostic.

use super::types::{Decoded, UpstreamEvent, DATA_PREFIX, SENTINEL, THREAD_MESSAGE_DELTA};

/// Decode a logical event record.
///
/// Sentinel detection runs first and wins over any payload the record also
/// carries. Otherwise the leading `data: ` marker is stripped and the rest is
/// parsed as JSON; only `thread.message.delta` events produce a delta.
pub fn decode_record(record: &str) -> Decoded {
    if record.contains(SENTINEL) {
        return Decoded::Sentinel;
    }

    let payload = record.strip_prefix(DATA_PREFIX).unwrap_or(record);

    let event: UpstreamEvent = match serde_json::from_str(payload) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, record_len = record.len(), "dropping unparseable upstream record");
            return Decoded::Malformed {
                reason: e.to_string(),
            };
        }
    };

    if event.event.as_deref() != Some(THREAD_MESSAGE_DELTA) {
        tracing::trace!(kind = ?event.event, "filtered upstream event");
        return Decoded::Filtered { kind: event.event };
    }

    match event.data {
        Some(data) => Decoded::Delta(data.delta),
        None => {
            tracing::warn!("dropping message delta without a data object");
            Decoded::Malformed {
                reason: "message delta has no data object".to_string(),
            }
        }
    }
}
