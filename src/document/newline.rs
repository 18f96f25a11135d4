//! Final-newline normalization policies.

use serde::{Deserialize, Serialize};

/// How trailing newlines are treated on every edit and load.
///
/// Serialized as the numeric values `0..=3` used by the host. Unknown values
/// keep the text as it is and are sent back unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum TrailingNewline {
    /// Remove all trailing newlines.
    Trim,
    /// Ensure exactly one trailing newline.
    EnsureSingle,
    /// Keep the text as it is.
    #[default]
    Disabled,
    /// Follow the editor default; behaves like `Disabled`.
    Auto,
    /// Value this version does not know; behaves like `Disabled`.
    Other(u8),
}

impl From<u8> for TrailingNewline {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Trim,
            1 => Self::EnsureSingle,
            2 => Self::Disabled,
            3 => Self::Auto,
            other => Self::Other(other),
        }
    }
}

impl From<TrailingNewline> for u8 {
    fn from(value: TrailingNewline) -> Self {
        match value {
            TrailingNewline::Trim => 0,
            TrailingNewline::EnsureSingle => 1,
            TrailingNewline::Disabled => 2,
            TrailingNewline::Auto => 3,
            TrailingNewline::Other(other) => other,
        }
    }
}

/// Strip all trailing `\r` and `\n` characters.
pub fn trim_trailing_newlines(text: &str) -> &str {
    text.trim_end_matches(|c: char| c == '\r' || c == '\n')
}

/// Apply `policy` to `markdown`.
///
/// An empty text stays empty for every policy, and a single newline is never
/// appended to a text that is empty after trimming.
pub fn adjust_trailing_newlines(markdown: &str, policy: TrailingNewline) -> String {
    if markdown.is_empty() {
        return String::new();
    }

    match policy {
        TrailingNewline::Trim => trim_trailing_newlines(markdown).to_string(),
        TrailingNewline::EnsureSingle => {
            let bytes = markdown.as_bytes();
            let last = bytes.len() - 1;
            if bytes[last] == b'\n' {
                if bytes.len() == 1 {
                    return String::new();
                } else if bytes[last - 1] != b'\n' {
                    return markdown.to_string();
                }
            }

            let trimmed = trim_trailing_newlines(markdown);
            if trimmed.is_empty() {
                String::new()
            } else {
                format!("{}\n", trimmed)
            }
        }
        TrailingNewline::Disabled | TrailingNewline::Auto | TrailingNewline::Other(_) => {
            markdown.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TrailingNewline; 5] = [
        TrailingNewline::Trim,
        TrailingNewline::EnsureSingle,
        TrailingNewline::Disabled,
        TrailingNewline::Auto,
        TrailingNewline::Other(9),
    ];

    #[test]
    fn test_empty_stays_empty_for_every_policy() {
        for policy in ALL {
            assert_eq!(adjust_trailing_newlines("", policy), "");
        }
    }

    #[test]
    fn test_trim_policy() {
        assert_eq!(adjust_trailing_newlines("# a\n\n\n", TrailingNewline::Trim), "# a");
        assert_eq!(adjust_trailing_newlines("# a\r\n", TrailingNewline::Trim), "# a");
        assert_eq!(adjust_trailing_newlines("\n\n", TrailingNewline::Trim), "");
    }

    #[test]
    fn test_ensure_single_policy() {
        let p = TrailingNewline::EnsureSingle;
        assert_eq!(adjust_trailing_newlines("text", p), "text\n");
        assert_eq!(adjust_trailing_newlines("text\n", p), "text\n");
        assert_eq!(adjust_trailing_newlines("text\n\n\n", p), "text\n");
        assert_eq!(adjust_trailing_newlines("\n", p), "");
        assert_eq!(adjust_trailing_newlines("\n\n", p), "");
    }

    #[test]
    fn test_ensure_single_is_idempotent() {
        let p = TrailingNewline::EnsureSingle;
        for input in ["a", "a\n", "a\n\n", "a\r\n", "a\r\n\r\n", "\n", "x\ny\n\n"] {
            let once = adjust_trailing_newlines(input, p);
            assert_eq!(adjust_trailing_newlines(&once, p), once, "input {:?}", input);
        }
    }

    #[test]
    fn test_pass_through_policies() {
        assert_eq!(adjust_trailing_newlines("a\n\n", TrailingNewline::Disabled), "a\n\n");
        assert_eq!(adjust_trailing_newlines("a", TrailingNewline::Auto), "a");
    }

    #[test]
    fn test_policy_serialization() {
        assert_eq!(serde_json::to_string(&TrailingNewline::EnsureSingle).unwrap(), "1");
        assert_eq!(
            serde_json::from_str::<TrailingNewline>("0").unwrap(),
            TrailingNewline::Trim
        );
    }

    #[test]
    fn test_unknown_policy_passes_through() {
        let policy: TrailingNewline = serde_json::from_str("7").unwrap();
        assert_eq!(policy, TrailingNewline::Other(7));
        assert_eq!(serde_json::to_string(&policy).unwrap(), "7");
        assert_eq!(adjust_trailing_newlines("a\n\n", policy), "a\n\n");
        assert!(serde_json::from_str::<TrailingNewline>("300").is_err());
    }
}
