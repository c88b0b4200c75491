//! Character-window text splitter.
//!
//! Windows hold at most `chunk_size` characters. A window that does not reach
//! the end of the text is cut back to the last sentence ending in its final
//! fifth when there is one, and the next window starts `chunk_overlap`
//! characters before the end of what was kept.

use serde::{Deserialize, Serialize};

/// A text chunk with source information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    pub text: String,
    /// Source identifier (file name).
    pub source: String,
    /// Character offset in the original document
    pub start_offset: usize,
    pub chunk_index: usize,
}

#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    pub fn split(&self, text: &str, source: &str) -> Vec<TextChunk> {
        let chars: Vec<char> = text.chars().collect();
        let total_chars = chars.len();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < total_chars {
            let end = (start + self.chunk_size).min(total_chars);
            let window: String = chars[start..end].iter().collect();

            let window = if end < total_chars {
                cut_at_sentence_boundary(&window)
            } else {
                window
            };

            let trimmed = window.trim();
            if !trimmed.is_empty() {
                chunks.push(TextChunk {
                    text: trimmed.to_string(),
                    source: source.to_string(),
                    start_offset: start,
                    chunk_index: chunks.len(),
                });
            }

            if end == total_chars {
                break;
            }
            // The next window overlaps the end of what was kept, not the uncut window.
            let kept = window.chars().count();
            start += kept.saturating_sub(self.chunk_overlap).max(1);
        }

        chunks
    }
}

fn cut_at_sentence_boundary(text: &str) -> String {
    const SENTENCE_ENDINGS: [&str; 6] = [". ", "! ", "? ", ".\n", "!\n", "?\n"];

    let mut search_start = (text.len() * 80) / 100;
    while !text.is_char_boundary(search_start) {
        search_start += 1;
    }
    let search_text = &text[search_start..];

    for ending in SENTENCE_ENDINGS.iter() {
        if let Some(pos) = search_text.rfind(ending) {
            let cut_pos = search_start + pos + ending.len();
            return text[..cut_pos].to_string();
        }
    }

    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = TextSplitter::new(1000, 200).split("Just one line.", "sample.txt");

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Just one line.");
        assert_eq!(chunks[0].source, "sample.txt");
        assert_eq!(chunks[0].start_offset, 0);
    }

    #[test]
    fn windows_overlap_and_respect_size() {
        let text = "abcdefghij".repeat(25);
        let chunks = TextSplitter::new(100, 20).split(&text, "doc");

        let offsets: Vec<usize> = chunks.iter().map(|c| c.start_offset).collect();
        assert_eq!(offsets, vec![0, 80, 160]);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 100));

        // The overlapping region appears at the end of one chunk and the start of the next.
        let tail: String = chunks[0].text.chars().skip(80).collect();
        assert!(chunks[1].text.starts_with(&tail));
        assert_eq!(chunks.last().unwrap().text.chars().count(), 90);
    }

    #[test]
    fn exact_fit_does_not_emit_trailing_fragment() {
        let text = "x".repeat(100);
        let chunks = TextSplitter::new(100, 20).split(&text, "doc");

        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn cuts_at_late_sentence_boundary() {
        let text = format!("{}. {}", "a".repeat(85), "b".repeat(100));
        let chunks = TextSplitter::new(100, 10).split(&text, "doc");

        assert_eq!(chunks[0].text, format!("{}.", "a".repeat(85)));
        assert_eq!(chunks[1].start_offset, 77);
        assert_full_coverage(&text, &chunks);
    }

    #[test]
    fn small_overlap_after_sentence_cut_keeps_every_character() {
        let text = format!("{}. {}", "a".repeat(85), "b".repeat(100));
        let chunks = TextSplitter::new(100, 5).split(&text, "doc");
        assert_full_coverage(&text, &chunks);

        let prose = "Ownership moves values. Borrowing lends them! Lifetimes bound borrows? "
            .repeat(60);
        let chunks = TextSplitter::new(1000, 50).split(&prose, "doc");
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 1000));
        assert_full_coverage(&prose, &chunks);
    }

    /// Every non-whitespace character must appear in some chunk at its own offset.
    fn assert_full_coverage(text: &str, chunks: &[TextChunk]) {
        let chars: Vec<char> = text.chars().collect();
        let mut covered = vec![false; chars.len()];
        for chunk in chunks {
            let lead = chars[chunk.start_offset..]
                .iter()
                .take_while(|c| c.is_whitespace())
                .count();
            let from = chunk.start_offset + lead;
            let to = from + chunk.text.chars().count();
            assert_eq!(chars[from..to].iter().collect::<String>(), chunk.text);
            covered[from..to].iter_mut().for_each(|flag| *flag = true);
        }

        let missing: Vec<usize> = chars
            .iter()
            .enumerate()
            .filter(|(i, c)| !c.is_whitespace() && !covered[*i])
            .map(|(i, _)| i)
            .collect();
        assert!(missing.is_empty(), "characters in no chunk: {:?}", missing);
    }

    #[test]
    fn multibyte_text_does_not_panic() {
        let text = "日本語のテキスト。".repeat(40);
        let chunks = TextSplitter::new(50, 10).split(&text, "doc");

        assert!(!chunks.is_empty());
        let indices: Vec<usize> = chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indices, (0..chunks.len()).collect::<Vec<_>>());
    }

    #[test]
    fn blank_text_has_no_chunks() {
        assert!(TextSplitter::new(100, 10).split("", "doc").is_empty());
        assert!(TextSplitter::new(100, 10).split("   \n  ", "doc").is_empty());
    }
}
