//! Fixed-window text chunking with overlap

/// Text chunker with a fixed character window and stride
///
/// Windows are measured in Unicode scalar values, not bytes, so multibyte
/// text never splits inside a character. With the default window of 1000
/// and stride of 800, consecutive chunks share a 200-character overlap.
pub struct TextChunker {
    /// Window size in characters
    window: usize,
    /// Distance between consecutive window starts
    stride: usize,
}

impl TextChunker {
    /// Create a new chunker
    ///
    /// `stride` must be non-zero and no larger than `window`; callers
    /// construct this from validated config.
    pub fn new(window: usize, stride: usize) -> Self {
        Self { window, stride }
    }

    /// Split text into overlapping windows
    ///
    /// Emits one chunk per window start until a window reaches the end of
    /// the text. Text no longer than one window yields exactly one chunk;
    /// empty text yields none.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every character, plus the end sentinel, so window
        // boundaries can be sliced without walking the string repeatedly.
        let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        offsets.push(text.len());
        let n_chars = offsets.len() - 1;

        let mut chunks = Vec::new();
        let mut start = 0usize;
        loop {
            let end = (start + self.window).min(n_chars);
            chunks.push(text[offsets[start]..offsets[end]].to_string());
            if end == n_chars {
                break;
            }
            start += self.stride;
        }

        chunks
    }
}
