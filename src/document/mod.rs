//! Document model for marktabs
//!
//! One `Document` record exists per open tab. This module holds the record
//! type and the pure constructors that build a normalized record from raw
//! file content, charset and line-ending inputs.

mod encoding;
mod history;
mod loader;
mod newline;
mod stats;

pub use encoding::{
    decode_bytes, detect_line_ending, normalize_line_endings, Encoding, LineEnding,
    LineEndingInfo,
};
pub use history::History;
pub use loader::load_markdown_file;
pub use newline::{adjust_trailing_newlines, trim_trailing_newlines, TrailingNewline};
pub use stats::WordCount;

use crate::notifications::NotificationQueue;
use crate::paths::{self, optional_path};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

// ─────────────────────────────────────────────────────────────────────────────
// Document Identity
// ─────────────────────────────────────────────────────────────────────────────

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of an open document. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(u64);

impl DocumentId {
    /// Allocate a fresh id.
    pub fn next() -> Self {
        Self(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transient Editing State
// ─────────────────────────────────────────────────────────────────────────────

/// Line/column position inside the editor buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub ch: usize,
}

/// Editor selection; `anchor == focus` for a collapsed cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub anchor: Position,
    pub focus: Position,
}

/// Current search term and its matches in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchMatches {
    pub index: i64,
    pub matches: Vec<Value>,
    pub value: String,
}

impl Default for SearchMatches {
    fn default() -> Self {
        Self {
            index: -1,
            matches: Vec::new(),
            value: String::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Raw Input And Save Options
// ─────────────────────────────────────────────────────────────────────────────

/// A markdown document as loaded by the host (or the local disk loader).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMarkdownDocument {
    pub markdown: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default, with = "optional_path")]
    pub pathname: Option<PathBuf>,
    #[serde(default)]
    pub encoding: Encoding,
    #[serde(default)]
    pub line_ending: LineEnding,
    #[serde(default)]
    pub adjust_line_ending_on_save: bool,
    #[serde(default)]
    pub trim_trailing_newline: TrailingNewline,
    #[serde(default)]
    pub is_mixed_line_endings: bool,
    #[serde(default)]
    pub history: Option<History>,
    #[serde(default)]
    pub cursor: Option<Cursor>,
}

/// Options the host needs to write a document back to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOptions {
    pub encoding: Encoding,
    pub line_ending: LineEnding,
    pub adjust_line_ending_on_save: bool,
    pub trim_trailing_newline: TrailingNewline,
}

/// Fields of an existing record that survive a reload from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepField {
    Id,
    Notifications,
    /// Keep only the current undo entry of the old history.
    LatestHistoryEntry,
}

// ─────────────────────────────────────────────────────────────────────────────
// Document Record
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory state of one open tab.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    /// Absolute file path (`None` for untitled documents)
    pub pathname: Option<PathBuf>,
    /// Display name
    pub filename: String,
    /// Current content, always with LF line endings
    pub markdown: String,
    /// False whenever `markdown` diverges from the persisted content
    pub is_saved: bool,
    pub cursor: Option<Cursor>,
    pub word_count: WordCount,
    pub search_matches: SearchMatches,
    pub encoding: Encoding,
    pub line_ending: LineEnding,
    pub trim_trailing_newline: TrailingNewline,
    pub adjust_line_ending_on_save: bool,
    pub history: History,
    pub notifications: NotificationQueue,
}

impl Document {
    /// Create an untitled document named `Untitled-{number}`.
    pub fn blank(
        number: usize,
        default_encoding: &str,
        line_ending: LineEnding,
        trim_trailing_newline: TrailingNewline,
        markdown: Option<String>,
    ) -> Self {
        let markdown = markdown.unwrap_or_default();
        Self {
            id: DocumentId::next(),
            pathname: None,
            filename: format!("Untitled-{}", number),
            word_count: WordCount::from_text(&markdown),
            markdown,
            is_saved: true,
            cursor: None,
            search_matches: SearchMatches::default(),
            encoding: Encoding::new(default_encoding, false),
            line_ending,
            trim_trailing_newline,
            adjust_line_ending_on_save: line_ending.needs_adjust_on_save(),
            history: History::new(),
            notifications: NotificationQueue::new(),
        }
    }

    /// Create a document record from loaded content.
    ///
    /// The trailing-newline policy of the document is applied to the content.
    pub fn from_raw(raw: RawMarkdownDocument) -> Self {
        if raw.adjust_line_ending_on_save != raw.line_ending.needs_adjust_on_save() {
            warn!(
                "Line ending of '{}' is {} but adjust-on-save is {}",
                raw.filename, raw.line_ending, raw.adjust_line_ending_on_save
            );
        }

        let filename = if raw.filename.is_empty() {
            raw.pathname
                .as_deref()
                .map(paths::filename_of)
                .unwrap_or_default()
        } else {
            raw.filename
        };
        let markdown = adjust_trailing_newlines(&raw.markdown, raw.trim_trailing_newline);

        Self {
            id: DocumentId::next(),
            pathname: raw.pathname,
            filename,
            word_count: WordCount::from_text(&markdown),
            markdown,
            is_saved: true,
            cursor: raw.cursor,
            search_matches: SearchMatches::default(),
            encoding: raw.encoding,
            line_ending: raw.line_ending,
            trim_trailing_newline: raw.trim_trailing_newline,
            adjust_line_ending_on_save: raw.adjust_line_ending_on_save,
            history: raw.history.unwrap_or_default(),
            notifications: NotificationQueue::new(),
        }
    }

    /// Replace this record with `fresh`, keeping the listed fields of the old one.
    ///
    /// With `LatestHistoryEntry` only the current undo entry survives; without
    /// a current entry the fresh history is used.
    pub fn reload(&mut self, mut fresh: Document, keep: &[KeepField]) {
        for field in keep {
            match field {
                KeepField::Id => fresh.id = self.id,
                KeepField::Notifications => {
                    fresh.notifications = std::mem::take(&mut self.notifications)
                }
                KeepField::LatestHistoryEntry => {
                    if let Some(history) = self.history.latest_only() {
                        fresh.history = history;
                    }
                }
            }
        }
        *self = fresh;
    }

    pub fn is_untitled(&self) -> bool {
        self.pathname.is_none()
    }

    /// Number N of an `Untitled-N` document, if this is one.
    pub fn untitled_number(&self) -> Option<usize> {
        if !self.is_untitled() {
            return None;
        }
        self.filename
            .strip_prefix("Untitled-")
            .and_then(|n| n.parse().ok())
    }

    /// Directory used to resolve relative image paths.
    pub fn dirname(&self) -> Option<PathBuf> {
        self.pathname.as_deref().and_then(paths::dirname_of)
    }

    pub fn save_options(&self) -> SaveOptions {
        SaveOptions {
            encoding: self.encoding.clone(),
            line_ending: self.line_ending,
            adjust_line_ending_on_save: self.adjust_line_ending_on_save,
            trim_trailing_newline: self.trim_trailing_newline,
        }
    }

    /// Update path and display name after a rename or "save as".
    pub fn set_path(&mut self, pathname: &Path) {
        self.filename = paths::filename_of(pathname);
        self.pathname = Some(pathname.to_path_buf());
    }

    /// Whether the buffer contains anything besides newlines.
    pub fn has_content(&self) -> bool {
        self.markdown.chars().any(|c| c != '\n')
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
