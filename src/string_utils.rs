//! UTF-16 Offset String Utilities
//!
//! The rich editor reports selection offsets in UTF-16 code units, while Rust
//! strings are UTF-8. Characters like `å`, `中` and `🎉` have different
//! lengths in the two encodings, so these offsets cannot be used as byte
//! indices directly. The helpers here convert them and never panic, even for
//! offsets past the end or inside a surrogate pair.
//!
//! # Example
//! ```ignore
//! use crate::string_utils::slice_utf16;
//!
//! let text = "Hei 🎉 på deg";
//! assert_eq!(slice_utf16(text, 4, 6), "🎉");
//! ```

// ─────────────────────────────────────────────────────────────────────────────
// Index Conversion
// ─────────────────────────────────────────────────────────────────────────────

/// Convert a UTF-16 code unit offset to a byte index.
///
/// An offset inside a surrogate pair is rounded down to the start of the
/// character. Offsets beyond the text return the text length.
pub fn utf16_offset_to_byte_index(s: &str, offset: usize) -> usize {
    let mut units = 0;
    for (byte_index, ch) in s.char_indices() {
        let next = units + ch.len_utf16();
        if next > offset {
            return byte_index;
        }
        units = next;
    }
    s.len()
}

/// Number of UTF-16 code units in `s`.
pub fn utf16_len(s: &str) -> usize {
    s.chars().map(char::len_utf16).sum()
}

// ─────────────────────────────────────────────────────────────────────────────
// Slicing
// ─────────────────────────────────────────────────────────────────────────────

/// Slice `s` between two UTF-16 offsets.
///
/// Offsets are clamped to the text and swapped when `start > end`, so any
/// pair of offsets yields a valid slice.
pub fn slice_utf16(s: &str, start: usize, end: usize) -> &str {
    let (start, end) = if start <= end {
        (start, end)
    } else {
        (end, start)
    };
    let start = utf16_offset_to_byte_index(s, start);
    let end = utf16_offset_to_byte_index(s, end);
    &s[start..end]
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_offsets_match_bytes() {
        let s = "Hello";
        assert_eq!(utf16_offset_to_byte_index(s, 0), 0);
        assert_eq!(utf16_offset_to_byte_index(s, 3), 3);
        assert_eq!(utf16_offset_to_byte_index(s, 10), 5);
        assert_eq!(utf16_len(s), 5);
    }

    #[test]
    fn test_multibyte_offsets() {
        // 'å' is one UTF-16 unit but two UTF-8 bytes
        let s = "på deg";
        assert_eq!(utf16_offset_to_byte_index(s, 2), 3);
        assert_eq!(slice_utf16(s, 0, 2), "på");
        assert_eq!(slice_utf16(s, 3, 6), "deg");
    }

    #[test]
    fn test_surrogate_pairs() {
        // '🎉' is two UTF-16 units and four UTF-8 bytes
        let s = "a🎉b";
        assert_eq!(utf16_len(s), 4);
        assert_eq!(slice_utf16(s, 1, 3), "🎉");
        assert_eq!(slice_utf16(s, 3, 4), "b");
        // Inside the pair rounds down
        assert_eq!(utf16_offset_to_byte_index(s, 2), 1);
    }

    #[test]
    fn test_slice_clamps_and_swaps() {
        let s = "中文字";
        assert_eq!(slice_utf16(s, 2, 1), "文");
        assert_eq!(slice_utf16(s, 1, 99), "文字");
        assert_eq!(slice_utf16(s, 5, 9), "");
        assert_eq!(slice_utf16("", 0, 3), "");
    }
}
