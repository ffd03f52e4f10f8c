//! Document chunking.
//!
//! Chunks are contiguous slices of the source text: concatenating them gives
//! back the content exactly. Split points prefer structural boundaries so a
//! chunk rarely ends mid-sentence.

use aiops_core::{ChunkingConfig, Document};

/// Smallest usable chunk size; any UTF-8 scalar fits in it.
const MIN_CHUNK_SIZE: usize = 4;

/// Boundaries tried in order, each only accepted in the latter half of the
/// window so chunks do not degenerate into slivers.
const SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", "? ", "! "];

/// Splits documents into bounded-size passages.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
}

impl Chunker {
    /// Create a chunker producing chunks of at most `chunk_size` bytes.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(MIN_CHUNK_SIZE),
        }
    }

    /// Maximum chunk length in bytes.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Chunk a document's content.
    pub fn chunk<'a>(&self, document: &'a Document) -> Vec<&'a str> {
        self.chunk_text(&document.content)
    }

    /// Chunk raw text. Empty text yields no chunks.
    pub fn chunk_text<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut chunks = Vec::new();
        let mut rest = text;

        while !rest.is_empty() {
            if rest.len() <= self.chunk_size {
                chunks.push(rest);
                break;
            }

            let window = &rest[..floor_char_boundary(rest, self.chunk_size)];
            let (head, tail) = rest.split_at(split_point(window));
            chunks.push(head);
            rest = tail;
        }

        chunks
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::from(ChunkingConfig::default())
    }
}

impl From<ChunkingConfig> for Chunker {
    fn from(config: ChunkingConfig) -> Self {
        Self::new(config.chunk_size)
    }
}

/// Largest char boundary `<= index`. Never 0 for non-empty `text` since
/// `index >= MIN_CHUNK_SIZE`.
fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut i = index.min(text.len());
    while !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Where to cut `window`; always in `1..=window.len()`.
fn split_point(window: &str) -> usize {
    let half = window.len() / 2;

    for sep in SEPARATORS {
        if let Some(pos) = window.rfind(sep) {
            let cut = pos + sep.len();
            if cut >= half {
                return cut;
            }
        }
    }

    if let Some((pos, ch)) = window.char_indices().rev().find(|(_, c)| c.is_whitespace()) {
        let cut = pos + ch.len_utf8();
        if cut > 0 {
            return cut;
        }
    }

    window.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiops_core::Topic;

    fn assert_covers(text: &str, chunks: &[&str], chunk_size: usize) {
        assert_eq!(chunks.concat(), text);
        for chunk in chunks {
            assert!(!chunk.is_empty());
            assert!(chunk.len() <= chunk_size, "chunk of {} bytes > {}", chunk.len(), chunk_size);
        }
    }

    #[test]
    fn test_empty_content_yields_nothing() {
        let chunker = Chunker::new(100);
        assert!(chunker.chunk_text("").is_empty());
    }

    #[test]
    fn test_short_content_is_single_chunk() {
        let chunker = Chunker::new(100);
        let doc = Document::new("nmap", "nmap -sn 10.0.0.0/24", Topic::Network);
        assert_eq!(chunker.chunk(&doc), vec!["nmap -sn 10.0.0.0/24"]);
    }

    #[test]
    fn test_prefers_paragraph_breaks() {
        let chunker = Chunker::new(40);
        let text = "First paragraph about recon.\n\nSecond paragraph about scanning.";
        let chunks = chunker.chunk_text(text);
        assert_eq!(chunks[0], "First paragraph about recon.\n\n");
        assert_covers(text, &chunks, 40);
    }

    #[test]
    fn test_falls_back_to_sentences_then_words() {
        let chunker = Chunker::new(32);
        let text = "Reflected XSS echoes input. Stored XSS persists it in the database for later victims";
        let chunks = chunker.chunk_text(text);
        assert_eq!(chunks[0], "Reflected XSS echoes input. ");
        assert!(chunks[1..].iter().all(|c| !c.starts_with(' ')));
        assert_covers(text, &chunks, 32);
    }

    #[test]
    fn test_hard_cut_without_whitespace() {
        let chunker = Chunker::new(10);
        let text = "a".repeat(35);
        let chunks = chunker.chunk_text(&text);
        assert_eq!(chunks.len(), 4);
        assert_covers(&text, &chunks, 10);
    }

    #[test]
    fn test_multibyte_text_cut_on_char_boundary() {
        let chunker = Chunker::new(7);
        let text = "ééééééééééé漢字漢字漢字";
        let chunks = chunker.chunk_text(text);
        assert_covers(text, &chunks, 7);
    }

    #[test]
    fn test_tiny_chunk_size_is_clamped() {
        let chunker = Chunker::new(0);
        assert_eq!(chunker.chunk_size(), MIN_CHUNK_SIZE);
        let chunks = chunker.chunk_text("漢字");
        assert_eq!(chunks, vec!["漢", "字"]);
    }

    #[test]
    fn test_deterministic() {
        let chunker = Chunker::new(50);
        let text = "Line one of the playbook.\nLine two of it. And more words follow here.\n\nEnd.".repeat(5);
        assert_eq!(chunker.chunk_text(&text), chunker.chunk_text(&text));
        assert_covers(&text, &chunker.chunk_text(&text), 50);
    }
}
