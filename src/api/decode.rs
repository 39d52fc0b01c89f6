//! Incremental text decoding and record buffering for streamed response bodies
//!
//! Transport chunks are split on arbitrary byte boundaries, so a multi-byte
//! character or a record delimiter may straddle two chunks. Everything here is
//! written so that feeding a body in pieces yields the same text and the same
//! records as feeding it in one go.

/// Streaming UTF-8 decoder that carries incomplete sequences between calls
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of `bytes` (plus any held-over bytes) as forms complete
    /// characters. Invalid sequences become U+FFFD; an incomplete trailing
    /// sequence is kept for the next call.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut out = String::with_capacity(self.pending.len());
        let mut start = 0;
        while start < self.pending.len() {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(valid) => {
                    out.push_str(valid);
                    start = self.pending.len();
                }
                Err(err) => {
                    let end = start + err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[start..end]));
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            start = end + len;
                        }
                        None => {
                            // Truncated sequence at the end; wait for more bytes
                            start = end;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..start);
        out
    }

    /// Flush held bytes at end of stream
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }

    /// Whether bytes are waiting for the rest of a character
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// Accumulates decoded text and hands out blank-line-terminated records
#[derive(Debug, Default)]
pub struct RecordBuffer {
    decoder: Utf8Decoder,
    text: String,
}

impl RecordBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes from the transport
    pub fn push(&mut self, bytes: &[u8]) {
        let decoded = self.decoder.decode(bytes);
        self.text.push_str(&decoded);
    }

    /// Remove and return the next complete record, without its delimiter
    pub fn next_record(&mut self) -> Option<String> {
        let (pos, len) = find_boundary(&self.text)?;
        let record = self.text[..pos].to_string();
        self.text.drain(..pos + len);
        Some(record)
    }

    /// Flush the decoder and return whatever is left, unless it is blank
    pub fn finish(mut self) -> Option<String> {
        let tail = self.decoder.finish();
        self.text.push_str(&tail);
        if self.text.trim().is_empty() {
            None
        } else {
            Some(self.text)
        }
    }

    /// Text received but not yet returned as a record
    pub fn residue(&self) -> &str {
        &self.text
    }
}

/// Earliest record delimiter as `(position, length)`.
/// Both `\n\n` and `\r\n\r\n` terminate a record.
fn find_boundary(text: &str) -> Option<(usize, usize)> {
    let lf = text.find("\n\n").map(|pos| (pos, 2));
    let crlf = text.find("\r\n\r\n").map(|pos| (pos, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if b.0 < a.0 { b } else { a }),
        (a, b) => a.or(b),
    }
}
