//! Reading markdown files from disk into raw documents.

use super::encoding::{decode_bytes, detect_line_ending, normalize_line_endings, LineEnding};
use super::newline::TrailingNewline;
use super::RawMarkdownDocument;
use crate::error::{Error, Result};
use crate::paths;
use log::debug;
use std::path::Path;

/// Load a markdown file and normalize it for the editor.
///
/// The charset is detected from the BOM, the dominant line ending is recorded
/// and the buffer is converted to LF. `default_line_ending` decides ties and
/// files without any line break.
pub fn load_markdown_file(
    path: &Path,
    default_line_ending: LineEnding,
    trim_trailing_newline: TrailingNewline,
) -> Result<RawMarkdownDocument> {
    let bytes = std::fs::read(path).map_err(|source| Error::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let (text, encoding) = decode_bytes(path, &bytes)?;
    let info = detect_line_ending(&text, default_line_ending);
    let markdown = normalize_line_endings(&text);

    debug!(
        "Loaded {} ({} bytes, {}, {}{})",
        path.display(),
        bytes.len(),
        encoding.encoding,
        info.line_ending,
        if info.is_mixed { ", mixed" } else { "" }
    );

    Ok(RawMarkdownDocument {
        markdown,
        filename: paths::filename_of(path),
        pathname: Some(path.to_path_buf()),
        encoding,
        line_ending: info.line_ending,
        adjust_line_ending_on_save: info.line_ending.needs_adjust_on_save(),
        trim_trailing_newline,
        is_mixed_line_endings: info.is_mixed,
        history: None,
        cursor: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_crlf_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "# Notes\r\n\r\ntext\r\n").unwrap();

        let raw = load_markdown_file(&path, LineEnding::Lf, TrailingNewline::Disabled).unwrap();
        assert_eq!(raw.markdown, "# Notes\n\ntext\n");
        assert_eq!(raw.line_ending, LineEnding::Crlf);
        assert!(raw.adjust_line_ending_on_save);
        assert!(!raw.is_mixed_line_endings);
        assert_eq!(raw.filename, "notes.md");
        assert_eq!(raw.pathname.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_load_bom_and_mixed_endings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bom.md");
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"a\nb\nc\r\n");
        std::fs::write(&path, bytes).unwrap();

        let raw = load_markdown_file(&path, LineEnding::Crlf, TrailingNewline::Disabled).unwrap();
        assert!(raw.encoding.is_bom);
        assert_eq!(raw.encoding.encoding, "utf8");
        assert_eq!(raw.markdown, "a\nb\nc\n");
        assert_eq!(raw.line_ending, LineEnding::Lf);
        assert!(raw.is_mixed_line_endings);
    }

    #[test]
    fn test_load_latin1_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("menu.md");
        std::fs::write(&path, b"# Caf\xe9\r\n\nCr\xe8me br\xfbl\xe9e et th\xe9 \xe0 volont\xe9.\r\n").unwrap();

        let raw = load_markdown_file(&path, LineEnding::Lf, TrailingNewline::Disabled).unwrap();
        assert_eq!(raw.markdown, "# Café\n\nCrème brûlée et thé à volonté.\n");
        assert_ne!(raw.encoding.encoding, "utf8");
        assert!(!raw.encoding.is_bom);
        assert!(raw.is_mixed_line_endings);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.md");
        let err = load_markdown_file(&path, LineEnding::Lf, TrailingNewline::Disabled).unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }
}
