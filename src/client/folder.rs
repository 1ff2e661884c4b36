//! Incremental event fold
//!
//! Turns relay body bytes into the accumulated response text without any
//! network code.

use crate::utils::sse::{classify_line, LineBuffer, SseLine, Utf8Decoder};
use tracing::warn;

/// Result of feeding one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldStep {
    /// Keep reading; `deltas` content events were folded from this chunk
    Continue { deltas: usize },
    /// Terminal event seen, stop reading
    Finished,
}

/// Accumulates `content` deltas from a relay event stream
#[derive(Debug, Default)]
pub struct StreamFolder {
    decoder: Utf8Decoder,
    lines: LineBuffer,
    accumulated: String,
    deltas: usize,
    malformed: usize,
    terminal: bool,
    finished: bool,
}

impl StreamFolder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk
    pub fn push(&mut self, chunk: &[u8]) -> FoldStep {
        self.push_with(chunk, |_| {})
    }

    /// Feed one chunk, calling `on_update` with the accumulated text after
    /// every folded delta
    ///
    /// Lines queued after `[DONE]` in the same chunk are not processed.
    pub fn push_with(&mut self, chunk: &[u8], mut on_update: impl FnMut(&str)) -> FoldStep {
        if self.finished {
            return FoldStep::Finished;
        }

        let text = self.decoder.decode(chunk);
        let mut folded = 0;
        for line in self.lines.push(&text) {
            if self.fold_line(&line, &mut on_update) {
                folded += 1;
            }
            if self.finished {
                return FoldStep::Finished;
            }
        }

        FoldStep::Continue { deltas: folded }
    }

    /// End of body: fold any unterminated last line and return the result
    pub fn finish(&mut self) -> String {
        if !self.finished {
            let tail = self.decoder.finish();
            let mut rest = self.lines.push(&tail);
            rest.extend(self.lines.take_remainder());
            for line in rest {
                self.fold_line(&line, &mut |_| {});
                if self.finished {
                    break;
                }
            }
        }
        self.finished = true;
        self.accumulated.clone()
    }

    /// Returns true when a content delta was folded
    fn fold_line(&mut self, line: &str, on_update: &mut impl FnMut(&str)) -> bool {
        let payload = match classify_line(line) {
            SseLine::Blank | SseLine::Other => return false,
            SseLine::Done => {
                self.terminal = true;
                self.finished = true;
                return false;
            }
            SseLine::Data(payload) => payload,
        };

        let parsed = match serde_json::from_str::<serde_json::Value>(payload) {
            Ok(value) => value,
            Err(e) => {
                warn!("Error parsing chunk: {} - data: {}", e, payload);
                self.malformed += 1;
                return false;
            }
        };

        match parsed.get("content").and_then(|c| c.as_str()) {
            Some(content) if !content.is_empty() => {
                self.accumulated.push_str(content);
                self.deltas += 1;
                on_update(&self.accumulated);
                true
            }
            _ => false,
        }
    }

    /// Text folded so far
    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    /// Content deltas folded so far
    pub fn deltas(&self) -> usize {
        self.deltas
    }

    /// Event lines skipped because their payload was not JSON
    pub fn malformed(&self) -> usize {
        self.malformed
    }

    /// Whether the terminal event was seen
    pub fn saw_terminal(&self) -> bool {
        self.terminal
    }
}
