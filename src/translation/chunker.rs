/*!
 * Text chunking for bounded-size translation requests.
 *
 * Long input is split into ordered segments no longer than a configured
 * character budget, so each segment fits a single backend request. Two
 * policies are available:
 *
 * - `Paragraph`: accumulates whole lines, skipping blank ones. A line is
 *   never split, so a single oversized line becomes its own chunk.
 * - `Word`: accumulates whitespace-separated words, discarding paragraph
 *   structure. A single oversized word becomes its own chunk.
 *
 * Lengths are counted in characters, not bytes.
 */

use serde::{Deserialize, Serialize};

/// Splitting policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkPolicy {
    /// Accumulate non-blank lines
    #[default]
    Paragraph,
    /// Accumulate whitespace-separated words
    Word,
}

impl std::fmt::Display for ChunkPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Paragraph => write!(f, "paragraph"),
            Self::Word => write!(f, "word"),
        }
    }
}

/// An ordered segment of the input text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position in the reconstruction order, starting at 0
    pub index: usize,
    /// Segment text (normalized per policy)
    pub text: String,
    /// Length of `text` in characters
    pub char_len: usize,
}

impl Chunk {
    fn new(index: usize, text: String, char_len: usize) -> Self {
        Self { index, text, char_len }
    }

    /// Length of the text with surrounding whitespace removed
    pub fn trimmed_len(&self) -> usize {
        self.text.trim().chars().count()
    }
}

/// Deterministic splitter for raw text
#[derive(Debug, Clone)]
pub struct Chunker {
    max_chars: usize,
    policy: ChunkPolicy,
}

impl Chunker {
    /// Create a chunker; a zero budget is treated as 1
    pub fn new(max_chars: usize, policy: ChunkPolicy) -> Self {
        Self {
            max_chars: max_chars.max(1),
            policy,
        }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn policy(&self) -> ChunkPolicy {
        self.policy
    }

    /// Split `text` into chunks with contiguous indices starting at 0
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        match self.policy {
            ChunkPolicy::Paragraph => self.chunk_by_paragraph(text),
            ChunkPolicy::Word => self.chunk_by_word(text),
        }
    }

    fn chunk_by_paragraph(&self, text: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut buffer = String::new();
        let mut buffer_len = 0;

        for line in text.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.trim().is_empty() {
                continue;
            }

            // +1 for the newline appended after every accepted line
            let line_len = line.chars().count() + 1;
            if !buffer.is_empty() && buffer_len + line_len >= self.max_chars {
                chunks.push(Chunk::new(chunks.len(), std::mem::take(&mut buffer), buffer_len));
                buffer_len = 0;
            }

            buffer.push_str(line);
            buffer.push('\n');
            buffer_len += line_len;
        }

        if !buffer.is_empty() {
            chunks.push(Chunk::new(chunks.len(), buffer, buffer_len));
        }

        chunks
    }

    fn chunk_by_word(&self, text: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut words: Vec<&str> = Vec::new();
        let mut running = 0;

        for word in text.split_whitespace() {
            words.push(word);
            running += word.chars().count() + 1;

            if running >= self.max_chars {
                let joined = words.join(" ");
                let len = joined.chars().count();
                chunks.push(Chunk::new(chunks.len(), joined, len));
                words.clear();
                running = 0;
            }
        }

        if !words.is_empty() {
            let joined = words.join(" ");
            let len = joined.chars().count();
            chunks.push(Chunk::new(chunks.len(), joined, len));
        }

        chunks
    }
}
