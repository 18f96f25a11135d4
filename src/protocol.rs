//! Message contracts between the editor state and its collaborators.
//!
//! - `HostCommand`: commands from the host shell (menus, file watcher, save results)
//! - `EditorAction`: input from the rendering surface (edits, tab bar, selection)
//! - `OutboundCommand`: requests sent back to the host
//! - `EditorEvent`: in-process events for the rendering surface
//!
//! All messages are JSON objects tagged with a kebab-case `type` field.

use crate::document::{
    Cursor, DocumentId, History, LineEnding, RawMarkdownDocument, SaveOptions, SearchMatches,
    TrailingNewline, WordCount,
};
use crate::editor::selection::{ApplicationMenuState, FormatItem, SelectionChange};
use crate::editor::toc::TocItem;
use crate::editor::Layout;
use crate::notifications::NotificationStyle;
use crate::paths::optional_path;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

fn yes() -> bool {
    true
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared Payloads
// ─────────────────────────────────────────────────────────────────────────────

/// Kind of change the file watcher observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileChangeKind {
    Add,
    Change,
    Unlink,
}

/// A file change on disk, with the reloaded content for `add`/`change`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileChange {
    pub pathname: PathBuf,
    #[serde(default)]
    pub data: Option<RawMarkdownDocument>,
}

/// Window configuration sent once when the window is created.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BootstrapConfig {
    pub add_blank_tab: bool,
    pub markdown_list: Vec<String>,
    pub line_ending: LineEnding,
    pub side_bar_visibility: bool,
    pub tab_bar_visibility: bool,
    pub source_code_mode_enabled: bool,
}

/// Content update reported by the rich or source editor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentChange {
    /// Document the change belongs to; required.
    pub id: Option<DocumentId>,
    pub markdown: String,
    pub word_count: Option<WordCount>,
    pub cursor: Option<Cursor>,
    pub history: Option<History>,
    pub toc: Option<Vec<TocItem>>,
}

/// Everything the host needs to write one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub id: DocumentId,
    pub filename: String,
    #[serde(with = "optional_path", default)]
    pub pathname: Option<PathBuf>,
    pub markdown: String,
    pub options: SaveOptions,
    #[serde(with = "optional_path", default)]
    pub default_path: Option<PathBuf>,
}

/// A document that still has to be saved, listed in close/save-all requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsavedFile {
    pub id: DocumentId,
    pub filename: String,
    #[serde(with = "optional_path", default)]
    pub pathname: Option<PathBuf>,
    pub markdown: String,
    pub options: SaveOptions,
}

/// Global notification that is not bound to a tab.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub title: String,
    pub message: String,
    pub style: NotificationStyle,
}

// ─────────────────────────────────────────────────────────────────────────────
// Inbound
// ─────────────────────────────────────────────────────────────────────────────

/// Commands sent by the host shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum HostCommand {
    Bootstrap(BootstrapConfig),
    /// Open a loaded document; without a document a blank tab is opened.
    OpenNewTab {
        #[serde(default)]
        document: Option<RawMarkdownDocument>,
        #[serde(default = "yes")]
        selected: bool,
    },
    NewUntitledTab {
        #[serde(default = "yes")]
        selected: bool,
        #[serde(default)]
        markdown: Option<String>,
    },
    /// Close the active tab.
    CloseTab,
    /// Close tabs after the host saved (or discarded) them.
    ForceCloseTabs { ids: Vec<DocumentId> },
    SetPathname {
        id: DocumentId,
        pathname: PathBuf,
        #[serde(default)]
        filename: String,
    },
    TabSaved { id: DocumentId },
    TabSaveFailure { id: DocumentId, message: String },
    UpdateFile { kind: FileChangeKind, change: FileChange },
    SetLineEnding { line_ending: LineEnding },
    SetFileEncoding { encoding: String },
    SetFinalNewline { value: TrailingNewline },
    WindowZoom { zoom_factor: f64 },
    AskFileSave,
    AskFileSaveAs,
    AskForClose,
    MoveFile,
    RenameFile,
    CycleTabs {
        #[serde(default = "yes")]
        next: bool,
    },
    SwitchTab { index: usize },
    InvalidateImageCache,
    RenameIfNeeded { src: PathBuf, dest: PathBuf },
    ExportSuccess { file_path: PathBuf },
}

/// Input from the rendering surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum EditorAction {
    ContentChange(ContentChange),
    /// Drag a tab before `to_id`, or to the end when `to_id` is absent.
    MoveTab {
        from_id: DocumentId,
        #[serde(default)]
        to_id: Option<DocumentId>,
    },
    SelectTab { id: DocumentId },
    CloseTabById { id: DocumentId },
    CloseOtherTabs { id: DocumentId },
    CloseSavedTabs,
    CloseAllTabs,
    SaveAll {
        #[serde(default)]
        close: bool,
    },
    /// Rename the active document to `filename` in its directory.
    Rename { filename: String },
    /// Make a tab active and open the rename prompt for it.
    RenameTab { id: DocumentId },
    SelectionChange(SelectionChange),
    SelectionFormats { formats: Vec<FormatItem> },
    Search(SearchMatches),
    NotificationResponse {
        id: DocumentId,
        index: usize,
        accepted: bool,
    },
    Export {
        kind: String,
        #[serde(default)]
        content: Option<String>,
        #[serde(default)]
        page_options: Option<Value>,
    },
}

/// One line read by the host bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InboundMessage {
    Host(HostCommand),
    Editor(EditorAction),
}

// ─────────────────────────────────────────────────────────────────────────────
// Outbound
// ─────────────────────────────────────────────────────────────────────────────

/// Requests for the host shell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum OutboundCommand {
    ResponseFileSave(SaveRequest),
    ResponseFileSaveAs(SaveRequest),
    ResponseFileMoveTo {
        id: DocumentId,
        pathname: PathBuf,
    },
    Rename {
        id: DocumentId,
        pathname: PathBuf,
        new_pathname: PathBuf,
    },
    WindowTabClosed {
        pathname: PathBuf,
    },
    SaveAndCloseTabs {
        files: Vec<UnsavedFile>,
    },
    SaveTabs {
        files: Vec<UnsavedFile>,
    },
    CloseWindowConfirm {
        files: Vec<UnsavedFile>,
    },
    CloseWindow,
    UpdateLineEndingMenu {
        line_ending: LineEnding,
    },
    EditorSelectionChanged(ApplicationMenuState),
    UpdateFormatMenu {
        formats: BTreeMap<String, bool>,
    },
    WindowInitialized,
    UpdateLayoutMenu(Layout),
    ResponseExport {
        kind: String,
        title: String,
        content: Option<String>,
        filename: String,
        #[serde(with = "optional_path")]
        pathname: Option<PathBuf>,
        page_options: Option<Value>,
    },
}

/// In-process events for the rendering surface, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum EditorEvent {
    /// Swap the editor buffer to another document.
    FileChanged {
        id: DocumentId,
        markdown: String,
        cursor: Option<Cursor>,
        render_cursor: bool,
        history: History,
    },
    FileLoaded {
        id: DocumentId,
        markdown: String,
        cursor: Option<Cursor>,
    },
    Rename,
    InvalidateImageCache,
    ZoomChanged {
        zoom_factor: f64,
    },
    Notice(Notice),
}

/// One line written by the host bridge.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboundMessage {
    Host(OutboundCommand),
    Event(EditorEvent),
}
