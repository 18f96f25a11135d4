//! Charset and line-ending metadata for documents.
//!
//! Buffers are always held with LF line endings; the original line ending and
//! charset are kept alongside so that saving can restore them.

use crate::error::{Error, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

// ─────────────────────────────────────────────────────────────────────────────
// Encoding
// ─────────────────────────────────────────────────────────────────────────────

/// Charset name plus whether the file started with a byte order mark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encoding {
    pub encoding: String,
    #[serde(default)]
    pub is_bom: bool,
}

impl Encoding {
    pub const UTF8: &'static str = "utf8";
    pub const UTF16LE: &'static str = "utf16le";
    pub const UTF16BE: &'static str = "utf16be";

    pub fn new(encoding: impl Into<String>, is_bom: bool) -> Self {
        Self {
            encoding: encoding.into(),
            is_bom,
        }
    }
}

impl Default for Encoding {
    fn default() -> Self {
        Self::new(Self::UTF8, false)
    }
}

/// Charset label in the host's spelling, e.g. `utf8`, `utf16le`, `windows1252`.
fn label(encoding: &'static encoding_rs::Encoding) -> String {
    encoding
        .name()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Decode raw file bytes.
///
/// A leading BOM decides the charset. Without one, valid UTF-8 is taken as
/// UTF-8 and anything else is detected statistically (Latin-1, GBK, ...).
pub fn decode_bytes(path: &Path, bytes: &[u8]) -> Result<(String, Encoding)> {
    let decode_error = |encoding: &'static encoding_rs::Encoding| Error::Decode {
        path: path.to_path_buf(),
        encoding: label(encoding),
    };

    if let Some((encoding, bom_len)) = encoding_rs::Encoding::for_bom(bytes) {
        let text = encoding
            .decode_without_bom_handling_and_without_replacement(&bytes[bom_len..])
            .ok_or_else(|| decode_error(encoding))?;
        return Ok((text.into_owned(), Encoding::new(label(encoding), true)));
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok((text.to_string(), Encoding::default()));
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, false);
    debug!("Detected {} for {}", encoding.name(), path.display());

    let text = encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .ok_or_else(|| decode_error(encoding))?;
    Ok((text.into_owned(), Encoding::new(label(encoding), false)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Line Endings
// ─────────────────────────────────────────────────────────────────────────────

/// Line ending of a document on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    Lf,
    Crlf,
}

impl Default for LineEnding {
    #[cfg(windows)]
    fn default() -> Self {
        LineEnding::Crlf
    }

    #[cfg(not(windows))]
    fn default() -> Self {
        LineEnding::Lf
    }
}

impl LineEnding {
    /// Buffers are LF internally, so anything else has to be converted on save.
    pub fn needs_adjust_on_save(self) -> bool {
        self != LineEnding::Lf
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "lf",
            LineEnding::Crlf => "crlf",
        }
    }
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

/// Result of scanning a text for its line endings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEndingInfo {
    pub line_ending: LineEnding,
    pub is_mixed: bool,
}

/// Detect the dominant line ending of `text`.
///
/// Ties and texts without any line break use `fallback`.
pub fn detect_line_ending(text: &str, fallback: LineEnding) -> LineEndingInfo {
    let bytes = text.as_bytes();
    let mut crlf = 0usize;
    let mut lf = 0usize;

    for (i, &b) in bytes.iter().enumerate() {
        if b == b'\n' {
            if i > 0 && bytes[i - 1] == b'\r' {
                crlf += 1;
            } else {
                lf += 1;
            }
        }
    }

    let line_ending = match crlf.cmp(&lf) {
        std::cmp::Ordering::Greater => LineEnding::Crlf,
        std::cmp::Ordering::Less => LineEnding::Lf,
        std::cmp::Ordering::Equal => fallback,
    };

    LineEndingInfo {
        line_ending,
        is_mixed: crlf > 0 && lf > 0,
    }
}

/// Convert all CRLF sequences to LF.
pub fn normalize_line_endings(text: &str) -> String {
    if text.contains('\r') {
        text.replace("\r\n", "\n")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plain_utf8() {
        let (text, encoding) = decode_bytes(Path::new("a.md"), "# Hei på deg".as_bytes()).unwrap();
        assert_eq!(text, "# Hei på deg");
        assert_eq!(encoding, Encoding::default());
    }

    #[test]
    fn test_decode_utf8_bom() {
        let bytes = [0xEF, 0xBB, 0xBF, b'#', b' ', b'a'];
        let (text, encoding) = decode_bytes(Path::new("a.md"), &bytes).unwrap();
        assert_eq!(text, "# a");
        assert_eq!(encoding, Encoding::new(Encoding::UTF8, true));
    }

    #[test]
    fn test_decode_utf16le_bom() {
        let bytes = [0xFF, 0xFE, b'h', 0, b'i', 0];
        let (text, encoding) = decode_bytes(Path::new("a.md"), &bytes).unwrap();
        assert_eq!(text, "hi");
        assert_eq!(encoding.encoding, Encoding::UTF16LE);
        assert!(encoding.is_bom);
    }

    #[test]
    fn test_decode_utf16be_bom() {
        let bytes = [0xFE, 0xFF, 0, b'h', 0, b'i'];
        let (text, encoding) = decode_bytes(Path::new("a.md"), &bytes).unwrap();
        assert_eq!(text, "hi");
        assert_eq!(encoding, Encoding::new(Encoding::UTF16BE, true));
    }

    #[test]
    fn test_decode_truncated_utf16_fails() {
        let err = decode_bytes(Path::new("bad.md"), &[0xFF, 0xFE, b'h']).unwrap_err();
        assert!(matches!(err, Error::Decode { ref encoding, .. } if encoding == "utf16le"));
    }

    #[test]
    fn test_decode_latin1_without_bom() {
        let (text, encoding) = decode_bytes(
            Path::new("a.md"),
            b"# Caf\xe9\n\nLe caf\xe9 est tr\xe8s bon, \xe0 la fran\xe7aise.\n",
        )
        .unwrap();
        assert_eq!(text, "# Café\n\nLe café est très bon, à la française.\n");
        assert_eq!(encoding, Encoding::new("windows1252", false));
    }

    #[test]
    fn test_decode_gbk_without_bom() {
        let source = "# 标题\n\n这是一个中文文档，用来测试编码检测是否正确。\n";
        let (bytes, _, _) = encoding_rs::GBK.encode(source);
        let (text, encoding) = decode_bytes(Path::new("a.md"), &bytes).unwrap();
        assert_eq!(text, source);
        assert_ne!(encoding.encoding, Encoding::UTF8);
        assert!(!encoding.is_bom);
    }

    #[test]
    fn test_label_spelling() {
        assert_eq!(label(encoding_rs::UTF_8), Encoding::UTF8);
        assert_eq!(label(encoding_rs::UTF_16LE), Encoding::UTF16LE);
        assert_eq!(label(encoding_rs::SHIFT_JIS), "shiftjis");
    }

    #[test]
    fn test_detect_line_ending() {
        let info = detect_line_ending("a\r\nb\r\nc\n", LineEnding::Lf);
        assert_eq!(info.line_ending, LineEnding::Crlf);
        assert!(info.is_mixed);

        let info = detect_line_ending("a\nb\n", LineEnding::Crlf);
        assert_eq!(info.line_ending, LineEnding::Lf);
        assert!(!info.is_mixed);

        let info = detect_line_ending("no breaks", LineEnding::Crlf);
        assert_eq!(info.line_ending, LineEnding::Crlf);
    }

    #[test]
    fn test_normalize_line_endings() {
        assert_eq!(normalize_line_endings("a\r\nb\nc\r\n"), "a\nb\nc\n");
        assert_eq!(normalize_line_endings("plain"), "plain");
    }

    #[test]
    fn test_line_ending_serialization() {
        assert_eq!(serde_json::to_string(&LineEnding::Crlf).unwrap(), "\"crlf\"");
        assert_eq!(
            serde_json::from_str::<LineEnding>("\"lf\"").unwrap(),
            LineEnding::Lf
        );
        assert_eq!(LineEnding::Crlf.to_string(), "CRLF");
        assert!(LineEnding::Crlf.needs_adjust_on_save());
        assert!(!LineEnding::Lf.needs_adjust_on_save());
    }
}
