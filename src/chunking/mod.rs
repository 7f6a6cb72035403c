//! Transcript chunking into overlapping, searchable windows.
//!
//! A window of `max_size` characters slides over the transcript, advancing by
//! `max_size - overlap` each step, so adjacent chunks share `overlap`
//! characters of context. Sizes are counted in characters, not bytes.

use crate::config::ChunkingSettings;
use crate::error::{Result, ScribeError};
use serde::{Deserialize, Serialize};

/// A bounded slice of a transcript, used as the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Trimmed window text.
    pub text: String,
    /// Position of the originating transcript within its session.
    pub source_index: usize,
}

/// Window parameters for the chunker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    max_size: usize,
    overlap: usize,
}

impl ChunkingConfig {
    /// Create a validated config. Fails unless `overlap < max_size`.
    pub fn new(max_size: usize, overlap: usize) -> Result<Self> {
        if max_size == 0 {
            return Err(ScribeError::Config("chunk size must be positive".into()));
        }
        if overlap >= max_size {
            return Err(ScribeError::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, max_size
            )));
        }
        Ok(Self { max_size, overlap })
    }

    pub fn from_settings(settings: &ChunkingSettings) -> Result<Self> {
        Self::new(settings.max_chunk_size, settings.overlap)
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance between consecutive window starts.
    pub fn stride(&self) -> usize {
        self.max_size - self.overlap
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_size: 500,
            overlap: 100,
        }
    }
}

/// Split `text` into overlapping windows.
///
/// Emits `ceil(len / stride)` chunks for a text of `len` characters, the last
/// of which may be shorter than `max_size`. Whitespace at either end of each
/// window is trimmed, so a window made only of whitespace yields an empty chunk.
/// Empty input yields no chunks.
pub fn chunk_text(text: &str, source_index: usize, config: &ChunkingConfig) -> Vec<Chunk> {
    // Byte offset of every char, plus the end of the string.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_len = boundaries.len() - 1;

    let stride = config.stride();
    let mut chunks = Vec::with_capacity(char_len.div_ceil(stride));
    let mut start = 0;

    while start < char_len {
        let end = (start + config.max_size).min(char_len);
        let window = &text[boundaries[start]..boundaries[end]];
        chunks.push(Chunk {
            text: window.trim().to_string(),
            source_index,
        });
        start += stride;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Undo the chunking: take each window's non-overlapping prefix, then the
    /// whole last window.
    fn reassemble(chunks: &[Chunk], config: &ChunkingConfig) -> String {
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i + 1 == chunks.len() {
                out.push_str(&chunk.text);
            } else {
                out.extend(chunk.text.chars().take(config.stride()));
            }
        }
        out
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        let chunks = chunk_text("", 0, &ChunkingConfig::default());
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let text = "Gradient descent minimizes loss by updating weights using computed gradients.";
        let chunks = chunk_text(text, 2, &ChunkingConfig::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
        assert_eq!(chunks[0].source_index, 2);
    }

    #[test]
    fn test_chunk_count_and_overlap() {
        let config = ChunkingConfig::new(10, 4).unwrap();
        let text: String = ('a'..='z').collect();
        let chunks = chunk_text(&text, 0, &config);

        // ceil(26 / 6) windows starting at 0, 6, 12, 18, 24
        assert_eq!(chunks.len(), 5);
        assert_eq!(chunks[0].text, "abcdefghij");
        assert_eq!(chunks[1].text, "ghijklmnop");
        assert_eq!(chunks[4].text, "yz");
        assert!(chunks[0].text.ends_with(&chunks[1].text[..4]));
    }

    #[test]
    fn test_reassembly_reconstructs_text() {
        let config = ChunkingConfig::new(7, 3).unwrap();
        let text = "the_quick_brown_fox_jumps_over_the_lazy_dog";
        let chunks = chunk_text(text, 0, &config);
        assert_eq!(reassemble(&chunks, &config), text);

        let config = ChunkingConfig::new(500, 100).unwrap();
        let long = "x".repeat(1234);
        let chunks = chunk_text(&long, 0, &config);
        assert_eq!(chunks.len(), 4);
        assert_eq!(reassemble(&chunks, &config), long);
    }

    #[test]
    fn test_windows_count_characters_not_bytes() {
        let config = ChunkingConfig::new(3, 1).unwrap();
        let chunks = chunk_text("héllo wörld", 0, &config);
        assert_eq!(chunks[0].text, "hél");
        assert_eq!(chunks[1].text, "llo");
        assert_eq!(reassemble(&chunks, &config), "héllo wörld");
    }

    #[test]
    fn test_chunks_are_trimmed() {
        let config = ChunkingConfig::new(6, 0).unwrap();
        let chunks = chunk_text("  abc   def ", 0, &config);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "abc");
        assert_eq!(chunks[1].text, "def");
    }

    #[test]
    fn test_whitespace_text_is_not_empty_output() {
        let chunks = chunk_text("     ", 0, &ChunkingConfig::default());
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.is_empty());
    }

    #[test]
    fn test_chunking_is_deterministic() {
        let config = ChunkingConfig::new(8, 2).unwrap();
        let text = "Backpropagation pushes gradients layer by layer.";
        assert_eq!(chunk_text(text, 1, &config), chunk_text(text, 1, &config));
    }

    #[test]
    fn test_invalid_overlap_fails_fast() {
        assert!(matches!(ChunkingConfig::new(100, 100), Err(ScribeError::Config(_))));
        assert!(matches!(ChunkingConfig::new(100, 150), Err(ScribeError::Config(_))));
        assert!(matches!(ChunkingConfig::new(0, 0), Err(ScribeError::Config(_))));
    }
}
