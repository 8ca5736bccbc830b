//! Overlapping fixed-size chunking.
//!
//! Cuts prefer, in order, a paragraph break, a sentence end and a word
//! boundary inside the back half of the window; when none exists the text is
//! cut hard at `chunk_size` characters. Consecutive chunks share exactly
//! `overlap` characters, so dropping the first `overlap` characters of every
//! chunk after the first and concatenating reconstructs the input. Windows
//! holding only whitespace are dropped.

use crate::ingest::DocumentMetadata;

#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    /// `chunk_size` is clamped to at least 1 and `overlap` to below it.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let mut chunks = Vec::new();
        if chars.iter().all(|c| c.is_whitespace()) {
            return chunks;
        }

        let mut start = 0;
        loop {
            if chars.len() - start <= self.chunk_size {
                push_non_blank(&mut chunks, &chars[start..]);
                break;
            }

            let end = self.find_cut(&chars, start);
            push_non_blank(&mut chunks, &chars[start..end]);
            start = end - self.overlap;
        }

        chunks
    }

    /// Picks the end (exclusive) of the chunk starting at `start`.
    ///
    /// The cut never lands before `start + overlap + 1`, which guarantees the
    /// next chunk starts strictly after this one.
    fn find_cut(&self, chars: &[char], start: usize) -> usize {
        let hard_end = start + self.chunk_size;
        let min_end = start + (self.overlap + 1).max(self.chunk_size / 2);

        let boundaries: [fn(&[char], usize) -> bool; 3] =
            [is_paragraph_break, is_sentence_end, is_word_boundary];

        for is_boundary in boundaries {
            if let Some(end) = (min_end..=hard_end).rev().find(|&p| is_boundary(chars, p)) {
                return end;
            }
        }

        hard_end
    }
}

/// Splits `text` into overlapping chunks of at most `chunk_size` characters.
pub fn chunk(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    Chunker::new(chunk_size, overlap).chunk(text)
}

/// Jurisdiction header prepended to every chunk before embedding, so a query
/// naming a country or level can match passages whose body never mentions it.
pub fn provenance_header(metadata: &DocumentMetadata) -> String {
    format!(
        "Level: {}\nCountry: {}\nSchool: {}\n",
        metadata.level, metadata.country, metadata.school
    )
}

fn push_non_blank(chunks: &mut Vec<String>, window: &[char]) {
    if window.iter().any(|c| !c.is_whitespace()) {
        chunks.push(window.iter().collect());
    }
}

fn is_paragraph_break(chars: &[char], end: usize) -> bool {
    end >= 2 && chars[end - 1] == '\n' && chars[end - 2] == '\n'
}

fn is_sentence_end(chars: &[char], end: usize) -> bool {
    if end >= 1 && chars[end - 1] == '\n' {
        return true;
    }
    end >= 2 && chars[end - 1].is_whitespace() && matches!(chars[end - 2], '.' | '!' | '?')
}

fn is_word_boundary(chars: &[char], end: usize) -> bool {
    end >= 1 && chars[end - 1].is_whitespace()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn reconstruct(chunks: &[String], overlap: usize) -> String {
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(chunk);
            } else {
                out.extend(chunk.chars().skip(overlap));
            }
        }
        out
    }

    #[test]
    fn short_text_is_a_single_identical_chunk() {
        let text = "Students may use AI tools with teacher approval.";
        let chunks = chunk(text, 1000, 100);
        assert_eq!(chunks, vec![text.to_string()]);
    }

    #[test]
    fn blank_text_produces_no_chunks() {
        assert!(chunk("", 100, 10).is_empty());
        assert!(chunk("   \n\n  ", 100, 10).is_empty());
    }

    #[test]
    fn prefers_sentence_boundaries() {
        let text = "This is a test. ".repeat(20);
        let chunks = chunk(&text, 100, 20);

        assert!(chunks.len() > 1);
        for piece in &chunks[..chunks.len() - 1] {
            assert!(piece.ends_with(". "), "cut mid-sentence: {:?}", piece);
            assert!(piece.chars().count() <= 100);
        }
        assert_eq!(reconstruct(&chunks, 20), text);
    }

    #[test]
    fn prefers_paragraph_over_sentence_break() {
        let text = format!("{}\n\n{}", "One sentence. ".repeat(5).trim_end(), "Another. ".repeat(10));
        let chunks = chunk(&text, 90, 0);
        assert!(chunks[0].ends_with("\n\n"));
    }

    #[test]
    fn hard_cuts_text_without_boundaries() {
        let text = "x".repeat(250);
        let chunks = chunk(&text, 100, 10);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 100);
        assert_eq!(chunks[1].len(), 100);
        assert_eq!(chunks[2].len(), 70);
        assert_eq!(reconstruct(&chunks, 10), text);
    }

    #[test]
    fn overlap_is_clamped_below_chunk_size() {
        let chunker = Chunker::new(10, 50);
        assert_eq!(chunker.overlap(), 9);
        let chunks = chunker.chunk(&"abcdefghij".repeat(5));
        assert_eq!(reconstruct(&chunks, 9), "abcdefghij".repeat(5));
    }

    #[test]
    fn handles_multibyte_characters() {
        let text = "Les élèves utilisent l'IA générative. ".repeat(10);
        let chunks = chunk(&text, 60, 12);
        assert_eq!(reconstruct(&chunks, 12), text);
    }

    #[test]
    fn header_names_level_country_and_school() {
        let header = provenance_header(&DocumentMetadata {
            school: "Lycée Hoche".to_string(),
            country: "France".to_string(),
            level: "secondary".to_string(),
            source: "x.pdf".to_string(),
        });
        assert_eq!(header, "Level: secondary\nCountry: France\nSchool: Lycée Hoche\n");
    }

    proptest! {
        #[test]
        fn chunks_are_bounded_non_empty_and_lossless(
            text in "([a-z]{1,12}([ ]|[.!?] |\n\n)){0,80}[a-z]{1,12}",
            chunk_size in 20usize..200,
            overlap_ratio in 0usize..50,
        ) {
            let overlap = chunk_size * overlap_ratio / 100;
            let chunks = chunk(&text, chunk_size, overlap);

            prop_assert!(!chunks.is_empty());
            for piece in &chunks {
                prop_assert!(!piece.trim().is_empty());
                prop_assert!(piece.chars().count() <= chunk_size);
            }
            for pair in chunks.windows(2) {
                let tail: String = pair[0].chars().skip(pair[0].chars().count() - overlap).collect();
                let head: String = pair[1].chars().take(overlap).collect();
                prop_assert_eq!(tail, head);
            }
            prop_assert_eq!(reconstruct(&chunks, overlap), text);
        }
    }
}
