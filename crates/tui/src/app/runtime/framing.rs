use super::protocol::{decode_line, BridgeMessage};
use tracing::debug;

/// Reassembles newline-delimited messages from arbitrary stdout chunks.
///
/// Splitting happens on raw bytes, so a chunk boundary inside a multi-byte character is
/// harmless: `\n` never occurs inside a UTF-8 sequence and lines are only decoded once
/// they are complete.
#[derive(Default)]
pub struct LineDecoder {
    pending: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<BridgeMessage> {
        self.pending.extend_from_slice(chunk);
        let Some(last_newline) = self.pending.iter().rposition(|byte| *byte == b'\n') else {
            return Vec::new();
        };
        // Swap the retained tail in before decoding anything.
        let tail = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, tail);
        complete
            .split(|byte| *byte == b'\n')
            .filter_map(decode_bytes)
            .collect()
    }

    /// Stream closed: whatever is left is treated as a final unterminated line.
    pub fn finish(&mut self) -> Option<BridgeMessage> {
        let rest = std::mem::take(&mut self.pending);
        decode_bytes(&rest)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn decode_bytes(line: &[u8]) -> Option<BridgeMessage> {
    match std::str::from_utf8(line) {
        Ok(text) => decode_line(text),
        Err(error) => {
            debug!(%error, len = line.len(), "dropping non-utf8 bridge line");
            None
        }
    }
}
