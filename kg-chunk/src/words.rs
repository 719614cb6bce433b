//! Word scanning: splits a document into whitespace-delimited word spans
//! with exact byte offsets, so downstream offset arithmetic never has to
//! re-derive positions from a lossily-reconstructed string.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordSpan {
    pub start: usize,
    pub end: usize,
}

/// Scan `document` into word spans. A "word" is a maximal run of
/// non-whitespace characters; runs of whitespace (including newlines) are
/// gaps between words and are never themselves returned.
pub fn scan_words(document: &str) -> Vec<WordSpan> {
    let mut words = Vec::new();
    let mut current_start: Option<usize> = None;

    for (idx, ch) in document.char_indices() {
        if ch.is_whitespace() {
            if let Some(start) = current_start.take() {
                words.push(WordSpan { start, end: idx });
            }
        } else if current_start.is_none() {
            current_start = Some(idx);
        }
    }
    if let Some(start) = current_start {
        words.push(WordSpan {
            start,
            end: document.len(),
        });
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_simple_words() {
        let words = scan_words("hello world");
        assert_eq!(words, vec![WordSpan { start: 0, end: 5 }, WordSpan { start: 6, end: 11 }]);
    }

    #[test]
    fn handles_leading_and_trailing_whitespace() {
        let words = scan_words("  hi  ");
        assert_eq!(words, vec![WordSpan { start: 2, end: 4 }]);
    }

    #[test]
    fn handles_multibyte_characters() {
        let doc = "café naïve";
        let words = scan_words(doc);
        assert_eq!(words.len(), 2);
        assert_eq!(&doc[words[0].start..words[0].end], "café");
        assert_eq!(&doc[words[1].start..words[1].end], "naïve");
    }

    #[test]
    fn empty_document_has_no_words() {
        assert!(scan_words("").is_empty());
        assert!(scan_words("   \n\n  ").is_empty());
    }
}
