//! Bracket-balance message framing.
//!
//! Messages are not length-prefixed: a message is complete when every
//! opening bracket has been matched by its closer. Bracket characters that
//! appear inside JSON string literals do not count.

use crate::error::ProtocolError;

/// Opening bracket → expected closer.
const SCOPE_DECLARATORS: [(u8, u8); 3] = [(b'{', b'}'), (b'[', b']'), (b'<', b'>')];

fn closer_for(byte: u8) -> Option<u8> {
    SCOPE_DECLARATORS
        .iter()
        .find(|(open, _)| *open == byte)
        .map(|(_, close)| *close)
}

fn is_closer(byte: u8) -> bool {
    SCOPE_DECLARATORS.iter().any(|(_, close)| *close == byte)
}

/// Determine whether `data` starts with one complete message.
///
/// Returns `Ok(Some(len))` with the number of leading bytes that make up the
/// message (including any whitespace before it), `Ok(None)` when more data
/// is needed, and an error when a closer does not match the innermost open
/// bracket or non-whitespace appears outside any bracket.
pub fn frame_length(data: &[u8]) -> Result<Option<usize>, ProtocolError> {
    let mut scopes: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (index, &byte) in data.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        if let Some(close) = closer_for(byte) {
            scopes.push(close);
        } else if is_closer(byte) {
            match scopes.pop() {
                Some(expected) if expected == byte => {}
                _ => return Err(ProtocolError::Malformed { index }),
            }
            if scopes.is_empty() {
                return Ok(Some(index + 1));
            }
        } else if scopes.is_empty() {
            if byte.is_ascii_whitespace() {
                continue;
            }
            return Err(ProtocolError::Malformed { index });
        } else if byte == b'"' {
            in_string = true;
        }
    }

    Ok(None)
}

/// Per-connection receive buffer that yields complete frames.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    data: Vec<u8>,
}

impl FrameBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append freshly received bytes.
    pub fn append(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Remove and return the next complete frame, if any.
    ///
    /// On a framing error the whole buffer is discarded: there is no way to
    /// find the next boundary inside corrupted data.
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>, ProtocolError> {
        match frame_length(&self.data) {
            Ok(Some(len)) => Ok(Some(self.data.drain(..len).collect())),
            Ok(None) => Ok(None),
            Err(e) => {
                self.data.clear();
                Err(e)
            }
        }
    }

    /// Discard all buffered bytes.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
