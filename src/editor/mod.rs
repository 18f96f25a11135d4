//! Editor state machine for marktabs
//!
//! `EditorState` owns the open documents, the active document and the
//! autosave deadlines. Every operation is a synchronous `&mut self` step;
//! requests for the host and events for the rendering surface are queued and
//! drained by the caller with `take_outbound()` and `take_events()` after the
//! step completed.
//!
//! The operations are split over several files:
//! - `mod.rs`: active document, content changes, autosave firing
//! - `reconcile.rs`: file changes on disk and host save results
//! - `commands.rs`: command dispatch, tab creation, close and save flows

mod autosave;
mod commands;
mod reconcile;
pub mod selection;
mod tabs;
pub mod toc;

pub use autosave::AutosaveScheduler;
pub use tabs::TabCollection;

use crate::config::Preferences;
use crate::document::{adjust_trailing_newlines, Document, DocumentId, SearchMatches};
use crate::error::{Error, Result};
use crate::notifications::TabNotification;
use crate::protocol::{ContentChange, EditorEvent, OutboundCommand, SaveRequest, UnsavedFile};
use log::{debug, error, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use toc::{list_to_tree, TocItem, TocNode};

// ─────────────────────────────────────────────────────────────────────────────
// Layout
// ─────────────────────────────────────────────────────────────────────────────

/// Window layout flags mirrored into the host's view menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub right_column: String,
    pub show_side_bar: bool,
    pub show_tab_bar: bool,
    pub source_code_mode: bool,
}

impl Layout {
    fn from_preferences(preferences: &Preferences) -> Self {
        Self {
            right_column: "files".to_string(),
            show_side_bar: preferences.side_bar_visibility,
            show_tab_bar: preferences.tab_bar_visibility,
            source_code_mode: preferences.source_code_mode_enabled,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// EditorState
// ─────────────────────────────────────────────────────────────────────────────

/// State of one editor window.
#[derive(Debug)]
pub struct EditorState {
    tabs: TabCollection,
    /// Active document; always a member of `tabs`
    current: Option<DocumentId>,
    /// Headings of the active document as reported by the editor
    list_toc: Vec<TocItem>,
    toc: Vec<TocNode>,
    /// Base directory for relative image paths of the active document
    working_dir: Option<PathBuf>,
    /// Opened project folder, offered as default location in save dialogs
    project_root: Option<PathBuf>,
    preferences: Preferences,
    preferences_changed: bool,
    layout: Layout,
    autosave: AutosaveScheduler,
    outbound: Vec<OutboundCommand>,
    events: Vec<EditorEvent>,
}

impl EditorState {
    pub fn new(preferences: Preferences) -> Self {
        Self {
            tabs: TabCollection::new(),
            current: None,
            list_toc: Vec::new(),
            toc: Vec::new(),
            working_dir: None,
            project_root: None,
            layout: Layout::from_preferences(&preferences),
            preferences,
            preferences_changed: false,
            autosave: AutosaveScheduler::new(),
            outbound: Vec::new(),
            events: Vec::new(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn tabs(&self) -> &TabCollection {
        &self.tabs
    }

    pub fn current_id(&self) -> Option<DocumentId> {
        self.current
    }

    /// The active document.
    pub fn current_file(&self) -> Option<&Document> {
        self.current.and_then(|id| self.tabs.get(id))
    }

    pub fn document(&self, id: DocumentId) -> Option<&Document> {
        self.tabs.get(id)
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    pub fn set_project_root(&mut self, root: Option<PathBuf>) {
        self.project_root = root;
    }

    pub fn list_toc(&self) -> &[TocItem] {
        &self.list_toc
    }

    pub fn toc(&self) -> &[TocNode] {
        &self.toc
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Whether preferences changed since the last call (e.g. zoom).
    pub fn take_preferences_changed(&mut self) -> bool {
        std::mem::take(&mut self.preferences_changed)
    }

    /// Drain queued host requests in emission order.
    pub fn take_outbound(&mut self) -> Vec<OutboundCommand> {
        std::mem::take(&mut self.outbound)
    }

    /// Drain queued rendering events in emission order.
    pub fn take_events(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn next_autosave_deadline(&self) -> Option<Instant> {
        self.autosave.next_deadline()
    }

    pub fn has_pending_autosave(&self, id: DocumentId) -> bool {
        self.autosave.is_scheduled(id)
    }

    fn send(&mut self, command: OutboundCommand) {
        self.outbound.push(command);
    }

    fn emit(&mut self, event: EditorEvent) {
        self.events.push(event);
    }

    fn current_mut(&mut self) -> Option<&mut Document> {
        let id = self.current?;
        self.tabs.get_mut(id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Active Document
    // ─────────────────────────────────────────────────────────────────────────

    /// Make `id` the active document and tell the editor to swap its buffer.
    ///
    /// Selecting the already active document does nothing.
    pub fn set_current_file(&mut self, id: DocumentId) {
        if self.current == Some(id) {
            return;
        }
        let Some(doc) = self.tabs.get(id) else {
            warn!("Cannot select unknown tab {}", id);
            return;
        };

        let event = file_changed_event(doc);
        self.working_dir = doc.dirname();
        self.current = Some(id);
        self.emit(event);
    }

    /// Select a tab and update the line ending menu for it.
    pub fn select_tab(&mut self, id: DocumentId) {
        self.set_current_file(id);
        self.update_line_ending_menu();
    }

    fn update_line_ending_menu(&mut self) {
        if let Some(line_ending) = self.current_file().map(|doc| doc.line_ending) {
            self.send(OutboundCommand::UpdateLineEndingMenu { line_ending });
        }
    }

    /// Select the tab at `index`.
    pub fn switch_tab(&mut self, index: usize) {
        if index >= self.tabs.len() {
            warn!("Invalid tab index: {}", index);
            return;
        }
        if self.current.and_then(|id| self.tabs.index_of(id)).is_none() {
            error!("Cannot find current tab index");
            return;
        }
        if let Some(id) = self.tabs.at(index).map(|doc| doc.id) {
            self.select_tab(id);
        }
    }

    /// Select the next (or previous) tab, wrapping around at the ends.
    pub fn cycle_tab(&mut self, next: bool) {
        let count = self.tabs.len();
        if count <= 1 {
            return;
        }
        let Some(index) = self.current.and_then(|id| self.tabs.index_of(id)) else {
            error!("Cannot cycle tabs: current tab not found");
            return;
        };

        let next_index = if next {
            (index + 1) % count
        } else if index == 0 {
            count - 1
        } else {
            index - 1
        };
        if let Some(id) = self.tabs.at(next_index).map(|doc| doc.id) {
            self.select_tab(id);
        }
    }

    fn refresh_working_dir(&mut self) {
        self.working_dir = self.current_file().and_then(Document::dirname);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Closing Tabs
    // ─────────────────────────────────────────────────────────────────────────

    /// Remove a tab without asking. If it was active, the tab now at the same
    /// position (or the previous, or the first) becomes active.
    pub fn remove_tab(&mut self, id: DocumentId) -> Option<Document> {
        let Some((index, doc)) = self.tabs.remove(id) else {
            warn!("Cannot remove unknown tab {}", id);
            return None;
        };
        self.autosave.cancel(id);

        if self.current == Some(id) {
            self.current = None;
            self.working_dir = None;
            if let Some(next) = self.tabs.fallback_after_removal(index) {
                self.set_current_file(next);
            }
        }
        if self.tabs.is_empty() {
            self.clear_toc();
        }
        Some(doc)
    }

    /// Remove a tab and let the host release the file.
    pub fn force_close_tab(&mut self, id: DocumentId) {
        if let Some(pathname) = self.remove_tab(id).and_then(|doc| doc.pathname) {
            self.send(OutboundCommand::WindowTabClosed { pathname });
        }
    }

    /// Remove several tabs. The active document is chosen once afterwards.
    pub fn close_many(&mut self, ids: &[DocumentId]) {
        if ids.is_empty() {
            return;
        }

        let mut fallback_index = 0;
        for &id in ids {
            let Some((index, doc)) = self.tabs.remove(id) else {
                warn!("Cannot close unknown tab {}", id);
                continue;
            };
            self.autosave.cancel(id);
            if let Some(pathname) = doc.pathname {
                self.send(OutboundCommand::WindowTabClosed { pathname });
            }
            if self.current == Some(id) {
                self.current = None;
                self.working_dir = None;
                if ids.len() == 1 {
                    fallback_index = index;
                }
            }
        }

        if self.current.is_none() {
            if let Some(next) = self.tabs.fallback_after_removal(fallback_index) {
                self.set_current_file(next);
            }
        }
        if self.tabs.is_empty() {
            self.clear_toc();
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Content Changes
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply a content change reported by the editor.
    ///
    /// Changes for a background tab only update its markdown, cursor and
    /// history. Changes for the active tab also update word count and TOC,
    /// and mark the tab unsaved (scheduling an autosave) when the markdown
    /// differs.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingDocumentId` if the change carries no id.
    pub fn update_content_from_editor(&mut self, change: ContentChange, now: Instant) -> Result<()> {
        let Some(id) = change.id else {
            return Err(Error::MissingDocumentId);
        };
        let Some(current_id) = self.current else {
            debug!("Discarding content change without active document");
            return Ok(());
        };
        if self.tabs.is_empty() {
            return Ok(());
        }

        if id != current_id {
            // Source mode commits after a tab switch
            match self.tabs.get_mut(id) {
                Some(tab) => {
                    tab.markdown = adjust_trailing_newlines(&change.markdown, tab.trim_trailing_newline);
                    if let Some(cursor) = change.cursor {
                        tab.cursor = Some(cursor);
                    }
                    if let Some(history) = change.history {
                        tab.history = history;
                    }
                }
                None => debug!("Discarding content change of closed tab {}", id),
            }
            return Ok(());
        }

        let auto_save = self.preferences.auto_save;
        let Some(doc) = self.tabs.get_mut(current_id) else {
            return Ok(());
        };

        let markdown = adjust_trailing_newlines(&change.markdown, doc.trim_trailing_newline);
        // The editor adds a newline to an empty document
        if doc.markdown.is_empty() && markdown == "\n" {
            return Ok(());
        }

        let old_markdown = std::mem::replace(&mut doc.markdown, markdown);
        if let Some(word_count) = change.word_count {
            doc.word_count = word_count;
        }
        if let Some(cursor) = change.cursor {
            doc.cursor = Some(cursor);
        }
        if let Some(history) = change.history {
            doc.history = history;
        }

        let changed = doc.markdown != old_markdown;
        if changed {
            doc.is_saved = false;
        }
        let schedule_save = changed && auto_save && doc.pathname.is_some();

        if let Some(toc) = change.toc {
            if toc != self.list_toc {
                self.set_toc(toc);
            }
        }
        if schedule_save {
            self.autosave
                .schedule(current_id, now, self.preferences.auto_save_delay());
        }
        Ok(())
    }

    /// Replace the heading list of the active document.
    pub fn set_toc(&mut self, list: Vec<TocItem>) {
        self.toc = list_to_tree(&list);
        self.list_toc = list;
    }

    fn clear_toc(&mut self) {
        self.list_toc.clear();
        self.toc.clear();
    }

    pub fn set_search(&mut self, matches: SearchMatches) {
        if let Some(doc) = self.current_mut() {
            doc.search_matches = matches;
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Autosave
    // ─────────────────────────────────────────────────────────────────────────

    /// Fire due autosaves. A save is only requested if the tab still exists
    /// and is unsaved; the request carries the tab's current content.
    ///
    /// Returns the number of save requests sent.
    pub fn tick_autosave(&mut self, now: Instant) -> usize {
        let mut sent = 0;
        for id in self.autosave.take_due(now) {
            let request = match self.tabs.get(id) {
                Some(doc) if !doc.is_saved && doc.pathname.is_some() => Some(self.save_request(doc)),
                _ => None,
            };
            match request {
                Some(request) => {
                    debug!("Autosaving tab {}", id);
                    self.send(OutboundCommand::ResponseFileSave(request));
                    sent += 1;
                }
                None => debug!("Skipping autosave of tab {}", id),
            }
        }
        sent
    }

    fn save_request(&self, doc: &Document) -> SaveRequest {
        SaveRequest {
            id: doc.id,
            filename: doc.filename.clone(),
            pathname: doc.pathname.clone(),
            markdown: doc.markdown.clone(),
            options: doc.save_options(),
            default_path: self.project_root.clone(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Notifications
    // ─────────────────────────────────────────────────────────────────────────

    /// Attach a notification to a tab. Returns `false` for an unknown tab.
    pub fn push_tab_notification(&mut self, id: DocumentId, notification: TabNotification) -> bool {
        match self.tabs.get_mut(id) {
            Some(tab) => {
                tab.notifications.push(notification);
                true
            }
            None => {
                error!("Cannot push notification to unknown tab {}", id);
                false
            }
        }
    }
}

fn file_changed_event(doc: &Document) -> EditorEvent {
    EditorEvent::FileChanged {
        id: doc.id,
        markdown: doc.markdown.clone(),
        cursor: doc.cursor,
        render_cursor: true,
        history: doc.history.clone(),
    }
}

fn unsaved_file(doc: &Document) -> UnsavedFile {
    UnsavedFile {
        id: doc.id,
        filename: doc.filename.clone(),
        pathname: doc.pathname.clone(),
        markdown: doc.markdown.clone(),
        options: doc.save_options(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────


// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
