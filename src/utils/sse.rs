//! Incremental event-stream decoding
//!
//! Byte chunks arrive at arbitrary boundaries: a multi-byte character or a
//! `data: ...` line may be split across two reads. `Utf8Decoder` and
//! `LineBuffer` reassemble them so callers only ever see whole lines.

/// Marker every event line starts with
pub const DATA_PREFIX: &str = "data: ";

/// Payload of the terminal event
pub const DONE_MARKER: &str = "[DONE]";

/// Streaming UTF-8 decoder
///
/// Holds back an incomplete trailing sequence until the next chunk completes
/// it. Invalid sequences decode to U+FFFD instead of failing the stream.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one chunk, keeping any partial character for later
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut out = String::with_capacity(self.pending.len());
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        // Truncated sequence at the end: wait for more bytes
                        None => {
                            self.pending.drain(..valid);
                            break;
                        }
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                    }
                }
            }
        }

        out
    }

    /// Flush whatever is still held back at end of stream
    pub fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }

    /// Number of bytes waiting for the rest of their character
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Newline splitter that retains the unterminated tail
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: String,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append decoded text and return every line it completed
    ///
    /// A trailing `\r` is removed so CRLF-framed streams parse the same as LF.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        self.buffer.push_str(text);

        let Some(last_newline) = self.buffer.rfind('\n') else {
            return Vec::new();
        };

        let tail = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, tail);

        // `complete` ends with '\n', so the final split element is always empty
        let mut lines: Vec<String> = complete
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect();
        lines.pop();
        lines
    }

    /// Take the unterminated remainder, if any
    pub fn take_remainder(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        let rest = rest.strip_suffix('\r').unwrap_or(&rest).to_string();
        if rest.is_empty() {
            None
        } else {
            Some(rest)
        }
    }

    /// Text received but not yet terminated by a newline
    pub fn pending(&self) -> &str {
        &self.buffer
    }
}

/// Classified event line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine<'a> {
    /// Blank separator between events
    Blank,
    /// `data: [DONE]`
    Done,
    /// `data: <payload>` with the marker stripped
    Data(&'a str),
    /// Comments, `event:` fields and anything else without the data marker
    Other,
}

/// Classify a single complete line
pub fn classify_line(line: &str) -> SseLine<'_> {
    if line.trim().is_empty() {
        return SseLine::Blank;
    }

    match line.strip_prefix(DATA_PREFIX) {
        Some(payload) if payload == DONE_MARKER => SseLine::Done,
        Some(payload) => SseLine::Data(payload),
        None => SseLine::Other,
    }
}
