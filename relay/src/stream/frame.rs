// Copyright 2026 The Relay Project
// SPDX-License-Identifier: Apache-2.0

// Frame buffer
//
// Splits the raw upstream byte stream into logical event records at the
// `\n\n` boundary. Splitting happens on bytes, so a multi-byte UTF-8
// sequence cut across two chunks is only decoded once its record is whole.

use super::types::RECORD_SEPARATOR;

/// Accumulates upstream bytes until they form complete records.
///
/// Holds at most one partial record between calls to [`FrameBuffer::append`].
#[derive(Debug, Default)]
pub struct FrameBuffer {
    pending: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every record it completed, in arrival order.
    ///
    /// The trailing remainder after the last boundary stays pending.
    pub fn append(&mut self, chunk: &[u8]) -> Vec<String> {
        if chunk.is_empty() {
            return Vec::new();
        }

        // The pending bytes contain no boundary, but their last byte may pair
        // with the first byte of this chunk.
        let mut cursor = self.pending.len().saturating_sub(1);
        self.pending.extend_from_slice(chunk);

        let separator = RECORD_SEPARATOR.as_bytes();
        let mut start = 0;
        let mut records = Vec::new();

        while let Some(offset) = find(&self.pending[cursor..], separator) {
            let end = cursor + offset;
            records.push(String::from_utf8_lossy(&self.pending[start..end]).into_owned());
            start = end + separator.len();
            cursor = start;
        }

        if start > 0 {
            self.pending.drain(..start);
        }
        records
    }

    /// Bytes received but not yet resolved into a record.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
