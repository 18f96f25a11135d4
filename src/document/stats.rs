//! Word count statistics for a document.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// WordCount
// ─────────────────────────────────────────────────────────────────────────────

/// Word count shown in the status bar.
///
/// The rich editor reports these numbers with every content change; the
/// same counts are computed here for documents loaded from disk so a tab
/// shows correct numbers before the editor first renders it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WordCount {
    /// Number of paragraphs (non-empty text blocks separated by blank lines)
    pub paragraph: usize,
    /// Number of words (sequences of non-whitespace characters)
    pub word: usize,
    /// Number of characters excluding whitespace
    pub character: usize,
    /// Number of characters including whitespace
    pub all: usize,
}

impl WordCount {
    /// Calculate statistics from the given text in a single pass.
    pub fn from_text(text: &str) -> Self {
        let mut count = Self::default();
        let mut in_word = false;
        let mut in_paragraph = false;
        let mut consecutive_newlines = 0;
        let mut line_has_content = false;

        for ch in text.chars() {
            count.all += 1;

            if ch.is_whitespace() {
                in_word = false;

                if ch == '\n' {
                    consecutive_newlines += 1;

                    if line_has_content && !in_paragraph {
                        in_paragraph = true;
                        count.paragraph += 1;
                    }

                    // Two or more consecutive newlines end a paragraph
                    if consecutive_newlines >= 2 {
                        in_paragraph = false;
                    }

                    line_has_content = false;
                } else if ch != '\r' {
                    consecutive_newlines = 0;
                }
            } else {
                count.character += 1;
                consecutive_newlines = 0;
                line_has_content = true;

                if !in_word {
                    in_word = true;
                    count.word += 1;
                }
            }
        }

        // Final paragraph without trailing newline
        if line_has_content && !in_paragraph {
            count.paragraph += 1;
        }

        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text() {
        assert_eq!(WordCount::from_text(""), WordCount::default());
    }

    #[test]
    fn test_words_and_characters() {
        let count = WordCount::from_text("Hello, World!");
        assert_eq!(count.word, 2);
        assert_eq!(count.character, 12);
        assert_eq!(count.all, 13);
        assert_eq!(count.paragraph, 1);
    }

    #[test]
    fn test_paragraphs() {
        let count = WordCount::from_text("# Title\n\nFirst line\nsecond line\n\n\nLast");
        assert_eq!(count.paragraph, 3);
        assert_eq!(count.word, 7);
    }

    #[test]
    fn test_crlf_blank_line_ends_paragraph() {
        let count = WordCount::from_text("one\r\n\r\ntwo");
        assert_eq!(count.paragraph, 2);
    }

    #[test]
    fn test_unicode_counts_chars() {
        let count = WordCount::from_text("på deg 🎉");
        assert_eq!(count.word, 3);
        assert_eq!(count.all, 8);
    }
}
