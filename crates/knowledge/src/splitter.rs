//! Recursive character splitting.
//!
//! Text is split on the coarsest separator that occurs in it (paragraphs,
//! then lines, then words, then characters). Pieces that still exceed the
//! chunk size are split again with the next separator; small neighbouring
//! pieces are merged back up to the chunk size, carrying `chunk_overlap`
//! characters of context into the next chunk. Lengths are counted in chars.

use std::collections::VecDeque;

const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveSplitter {
    /// `chunk_overlap` is clamped below `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_separators(mut self, separators: Vec<String>) -> Self {
        self.separators = separators;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into trimmed, non-empty chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        let separators: Vec<&str> = self.separators.iter().map(String::as_str).collect();
        self.split_with(text, &separators)
    }

    fn split_with(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (separator, remaining) = match separators
            .iter()
            .position(|s| s.is_empty() || text.contains(s))
        {
            Some(idx) => (separators[idx], &separators[idx + 1..]),
            None => ("", &[][..]),
        };

        let pieces: Vec<&str> = if separator.is_empty() {
            text.char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect()
        } else {
            text.split(separator).filter(|p| !p.is_empty()).collect()
        };

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();

        for piece in pieces {
            if char_len(piece) <= self.chunk_size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting, separator));
                fitting.clear();
            }
            if remaining.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_with(piece, remaining));
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting, separator));
        }
        chunks
    }

    /// Greedily join pieces up to `chunk_size`, keeping a tail of at most
    /// `chunk_overlap` chars as the start of the next chunk.
    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            let joined_len = |window: &VecDeque<&str>, total: usize| {
                total + len + if window.is_empty() { 0 } else { sep_len }
            };

            if joined_len(&window, total) > self.chunk_size && !window.is_empty() {
                push_joined(&mut chunks, &window, separator);

                while total > self.chunk_overlap
                    || (total > 0 && joined_len(&window, total) > self.chunk_size)
                {
                    let Some(front) = window.pop_front() else {
                        break;
                    };
                    total -= char_len(front) + if window.is_empty() { 0 } else { sep_len };
                }
            }

            total += len + if window.is_empty() { 0 } else { sep_len };
            window.push_back(piece);
        }

        push_joined(&mut chunks, &window, separator);
        chunks
    }
}

impl Default for RecursiveSplitter {
    fn default() -> Self {
        Self::new(1000, 200)
    }
}

fn push_joined(chunks: &mut Vec<String>, window: &VecDeque<&str>, separator: &str) {
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        let splitter = RecursiveSplitter::default();
        let chunks = splitter.split("Squats build leg strength.");
        assert_eq!(chunks, vec!["Squats build leg strength."]);
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(RecursiveSplitter::default().split("  \n\n ").is_empty());
    }

    #[test]
    fn paragraphs_are_preferred_boundaries() {
        let splitter = RecursiveSplitter::new(30, 0);
        let text = "Warm up for ten minutes.\n\nThen lift heavy weights.";
        let chunks = splitter.split(text);
        assert_eq!(chunks, vec!["Warm up for ten minutes.", "Then lift heavy weights."]);
    }

    #[test]
    fn chunks_respect_size_and_overlap() {
        let splitter = RecursiveSplitter::new(20, 8);
        let text = "one two three four five six seven eight nine ten eleven twelve";
        let chunks = splitter.split(text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 20, "chunk too long: {chunk:?}");
        }
        // Consecutive chunks share at least one word of context
        for pair in chunks.windows(2) {
            let last_word = pair[0].split(' ').next_back().unwrap();
            assert!(pair[1].contains(last_word), "{pair:?}");
        }
    }

    #[test]
    fn unbroken_text_falls_back_to_characters() {
        let splitter = RecursiveSplitter::new(10, 2);
        let text = "a".repeat(25);
        let chunks = splitter.split(&text);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert!(chunks.len() >= 3);
    }

    #[test]
    fn multibyte_text_is_split_on_char_boundaries() {
        let splitter = RecursiveSplitter::new(5, 1);
        let chunks = splitter.split("şınavşınavşınav");
        assert!(chunks.iter().all(|c| c.chars().count() <= 5));
    }

    #[test]
    fn overlap_is_clamped() {
        let splitter = RecursiveSplitter::new(10, 50);
        assert_eq!(splitter.chunk_overlap(), 9);
    }
}
