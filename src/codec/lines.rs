//! Newline framing over an incremental UTF-8 decoder.

use crate::codec::utf8::Utf8Decoder;

/// Splits a byte stream into `\n`-terminated lines.
///
/// Each instance is owned by exactly one stream; the trailing partial line is
/// kept until a later read completes it or [`LineBuffer::finish`] flushes it.
#[derive(Debug, Default)]
pub struct LineBuffer {
    decoder: Utf8Decoder,
    buffer: String,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes; returns every line completed by them, without the
    /// terminating `\n`.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let text = self.decoder.decode(bytes);
        self.buffer.push_str(&text);

        let Some(last_newline) = self.buffer.rfind('\n') else {
            return Vec::new();
        };

        let partial = self.buffer.split_off(last_newline + 1);
        let mut complete = std::mem::replace(&mut self.buffer, partial);
        complete.pop();

        complete.split('\n').map(str::to_owned).collect()
    }

    /// End of input: return the remaining partial line if it holds anything
    /// besides whitespace.
    pub fn finish(&mut self) -> Option<String> {
        let tail = self.decoder.finish();
        self.buffer.push_str(&tail);
        let rest = std::mem::take(&mut self.buffer);
        if rest.trim().is_empty() {
            None
        } else {
            Some(rest)
        }
    }
}
