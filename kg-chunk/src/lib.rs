//! The Chunker (C2, §4.1): splits a document into an ordered sequence of
//! word-bounded chunks with overlap, preferring natural boundaries
//! (paragraph, then sentence) over a hard word-count cut.
//!
//! Chunking is pure and deterministic: the same `(document, params)` pair
//! always produces bitwise-identical output (spec §8, P1), which is what
//! lets the ingestion engine treat `chunk_index` as a stable resumption
//! point across restarts.

mod error;
mod words;

pub use error::{ChunkError, Result};

use kg_config::ChunkingConfig;
use words::WordSpan;

/// One chunk of a document, with offsets into the *original* byte
/// sequence so the source's provenance fields can be reconstructed
/// exactly (spec §3, Source fields).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub chunk_index: usize,
    pub char_offset_start: usize,
    pub char_offset_end: usize,
    /// 1-indexed, inclusive.
    pub line_start: usize,
    /// 1-indexed, inclusive.
    pub line_end: usize,
    /// How many characters of this chunk's text overlap with the
    /// preceding chunk; 0 for the first chunk.
    pub overlap_chars: usize,
}

/// Split `document` into chunks per `config`. Deterministic: identical
/// inputs always yield an identical `Vec<Chunk>` (property P1).
///
/// # Errors
/// Returns [`ChunkError::InvalidConfig`] if `config` fails validation
/// (e.g. `min_words > max_words`).
pub fn chunk_document(document: &str, config: &ChunkingConfig) -> Result<Vec<Chunk>> {
    config
        .validate()
        .map_err(|e| ChunkError::InvalidConfig(e.to_string()))?;

    let words = words::scan_words(document);
    if words.is_empty() {
        return Ok(Vec::new());
    }

    let line_starts = line_start_offsets(document);
    let mut chunks = Vec::new();
    let mut start_word = 0usize;
    let mut prev_char_end: Option<usize> = None;
    let mut chunk_index = 0usize;

    while start_word < words.len() {
        let end_word = choose_end_word(document, &words, start_word, config);
        let char_offset_start = words[start_word].start;
        let char_offset_end = words[end_word - 1].end;
        let text = document[char_offset_start..char_offset_end].to_string();

        let overlap_chars = prev_char_end
            .filter(|&prev_end| prev_end > char_offset_start)
            .map_or(0, |prev_end| prev_end - char_offset_start);

        chunks.push(Chunk {
            text,
            chunk_index,
            char_offset_start,
            char_offset_end,
            line_start: line_for_offset(&line_starts, char_offset_start),
            line_end: line_for_offset(&line_starts, char_offset_end.saturating_sub(1).max(char_offset_start)),
            overlap_chars,
        });

        chunk_index += 1;
        prev_char_end = Some(char_offset_end);

        if end_word >= words.len() {
            break;
        }

        // Next chunk starts `overlap_words` behind this chunk's end, but
        // must make forward progress.
        let next_start = end_word.saturating_sub(config.overlap_words).max(start_word + 1);
        start_word = next_start;
    }

    Ok(chunks)
}

/// Decide where chunk `[start_word, end_word)` ends, per §4.1: prefer a
/// paragraph boundary within `[min_words, max_words]`, else a sentence
/// terminator in that window, else hard-cut at `max_words`.
///
/// Ties are broken deterministically by scanning the window from the
/// widest allowed end (`max_words`) down to the narrowest (`min_words`)
/// and taking the first boundary found, so a chunk uses as much of its
/// budget as the natural structure of the text allows.
fn choose_end_word(
    document: &str,
    words: &[WordSpan],
    start_word: usize,
    config: &ChunkingConfig,
) -> usize {
    let max_end = (start_word + config.max_words).min(words.len());
    let min_end = (start_word + config.min_words).min(max_end);

    if max_end >= words.len() {
        return words.len();
    }

    for candidate in (min_end..=max_end).rev() {
        if candidate == 0 || candidate >= words.len() {
            continue;
        }
        if has_paragraph_boundary(document, words, candidate) {
            return candidate;
        }
    }

    for candidate in (min_end..=max_end).rev() {
        if candidate == 0 {
            continue;
        }
        if ends_at_sentence_terminator(document, words[candidate - 1]) {
            return candidate;
        }
    }

    max_end
}

/// Whether the gap between word `idx - 1` and word `idx` contains a blank
/// line (`\n\n`), i.e. a paragraph break.
fn has_paragraph_boundary(document: &str, words: &[WordSpan], idx: usize) -> bool {
    if idx == 0 || idx >= words.len() {
        return false;
    }
    let gap = &document[words[idx - 1].end..words[idx].start];
    gap.contains("\n\n")
}

fn ends_at_sentence_terminator(document: &str, word: WordSpan) -> bool {
    document[word.start..word.end]
        .ends_with(['.', '!', '?'])
}

fn line_start_offsets(document: &str) -> Vec<usize> {
    let mut starts = vec![0usize];
    for (idx, ch) in document.char_indices() {
        if ch == '\n' {
            starts.push(idx + 1);
        }
    }
    starts
}

/// 1-indexed line number containing byte offset `pos`.
fn line_for_offset(line_starts: &[usize], pos: usize) -> usize {
    match line_starts.binary_search(&pos) {
        Ok(idx) => idx + 1,
        Err(idx) => idx, // idx - 1 is the line start <= pos; idx itself is 1-indexed line number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ChunkingConfig {
        ChunkingConfig {
            target_words: 10,
            min_words: 6,
            max_words: 14,
            overlap_words: 3,
            checkpoint_interval: 1,
        }
    }

    fn words_text(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn empty_document_yields_zero_chunks() {
        assert_eq!(chunk_document("", &cfg()).unwrap(), Vec::new());
    }

    #[test]
    fn short_document_is_a_single_chunk() {
        let doc = words_text(5);
        let chunks = chunk_document(&doc, &cfg()).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].overlap_chars, 0);
        assert_eq!(chunks[0].text, doc);
    }

    #[test]
    fn determinism_across_runs() {
        let doc = words_text(200);
        let a = chunk_document(&doc, &cfg()).unwrap();
        let b = chunk_document(&doc, &cfg()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn chunks_overlap_and_cover_the_document() {
        let doc = words_text(50);
        let chunks = chunk_document(&doc, &cfg()).unwrap();
        assert!(chunks.len() > 1);
        for w in chunks.windows(2) {
            assert!(w[1].char_offset_start <= w[0].char_offset_end);
            assert!(w[1].overlap_chars > 0 || w[1].char_offset_start == w[0].char_offset_end);
        }
        assert_eq!(chunks.last().unwrap().char_offset_end, doc.len());
    }

    #[test]
    fn prefers_paragraph_boundary_within_window() {
        // First paragraph is 8 words, falls within [min=6, max=14].
        let doc = format!("{}\n\n{}", words_text(8), words_text(20));
        let chunks = chunk_document(&doc, &cfg()).unwrap();
        assert_eq!(chunks[0].text, words_text(8));
    }

    #[test]
    fn hard_cuts_at_max_words_when_no_boundary_found() {
        // No punctuation, no blank lines anywhere: must hard-cut at max_words.
        let doc = words_text(100);
        let chunks = chunk_document(&doc, &cfg()).unwrap();
        let first_chunk_words = chunks[0].text.split_whitespace().count();
        assert_eq!(first_chunk_words, cfg().max_words);
    }

    #[test]
    fn rejects_invalid_config() {
        let bad = ChunkingConfig {
            min_words: 20,
            max_words: 10,
            target_words: 15,
            overlap_words: 2,
            checkpoint_interval: 1,
        };
        assert!(chunk_document("hello world", &bad).is_err());
    }

    proptest::proptest! {
        #[test]
        fn chunking_never_panics_on_arbitrary_text(doc in "\\PC{0,500}") {
            let _ = chunk_document(&doc, &cfg());
        }
    }
}
