//! Command dispatch and the tab flows behind it.
//!
//! `handle_host_command` and `handle_action` map every inbound message onto
//! one state operation.

use super::reconcile::mixed_line_endings_notification;
use super::selection::{
    create_application_menu_state, create_selection_format_state, search_value, SelectionChange,
};
use super::toc::document_title;
use super::{unsaved_file, EditorState};
use crate::config::Preferences;
use crate::document::{
    Document, DocumentId, Encoding, LineEnding, RawMarkdownDocument, SearchMatches,
    TrailingNewline,
};
use crate::error::Result;
use crate::notifications::NotificationStyle;
use crate::paths;
use crate::protocol::{
    BootstrapConfig, EditorAction, EditorEvent, HostCommand, Notice, OutboundCommand,
};
use log::{debug, info, warn};
use serde_json::Value;
use std::path::Path;
use std::time::Instant;

impl EditorState {
    // ─────────────────────────────────────────────────────────────────────────
    // Dispatch
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply a command from the host shell.
    pub fn handle_host_command(&mut self, command: HostCommand) {
        debug!("Host command: {:?}", command);
        match command {
            HostCommand::Bootstrap(config) => self.bootstrap(config),
            HostCommand::OpenNewTab {
                document: Some(document),
                selected,
            } => self.new_tab_with_content(document, selected),
            HostCommand::OpenNewTab { document: None, .. } => self.new_untitled_tab(true, None),
            HostCommand::NewUntitledTab { selected, markdown } => {
                self.new_untitled_tab(selected, markdown)
            }
            HostCommand::CloseTab => {
                if let Some(id) = self.current {
                    self.close_tab(id);
                }
            }
            HostCommand::ForceCloseTabs { ids } => self.close_many(&ids),
            HostCommand::SetPathname {
                id,
                pathname,
                filename,
            } => self.set_pathname(id, &pathname, filename),
            HostCommand::TabSaved { id } => self.tab_saved(id),
            HostCommand::TabSaveFailure { id, message } => self.tab_save_failure(id, &message),
            HostCommand::UpdateFile { kind, change } => self.handle_file_change(kind, change),
            HostCommand::SetLineEnding { line_ending } => self.set_line_ending(line_ending),
            HostCommand::SetFileEncoding { encoding } => self.set_file_encoding(&encoding),
            HostCommand::SetFinalNewline { value } => self.set_final_newline(value),
            HostCommand::WindowZoom { zoom_factor } => self.window_zoom(zoom_factor),
            HostCommand::AskFileSave => self.ask_file_save(),
            HostCommand::AskFileSaveAs => self.ask_file_save_as(),
            HostCommand::AskForClose => self.ask_for_close(),
            HostCommand::MoveFile => self.move_file(),
            HostCommand::RenameFile => self.response_for_rename(),
            HostCommand::CycleTabs { next } => self.cycle_tab(next),
            HostCommand::SwitchTab { index } => self.switch_tab(index),
            HostCommand::InvalidateImageCache => self.emit(EditorEvent::InvalidateImageCache),
            HostCommand::RenameIfNeeded { src, dest } => self.rename_if_needed(&src, &dest),
            HostCommand::ExportSuccess { file_path } => self.export_success(&file_path),
        }
    }

    /// Apply input from the rendering surface.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingDocumentId` for a content change without id.
    pub fn handle_action(&mut self, action: EditorAction, now: Instant) -> Result<()> {
        match action {
            EditorAction::ContentChange(change) => return self.update_content_from_editor(change, now),
            EditorAction::MoveTab { from_id, to_id } => self.tabs.move_tab(from_id, to_id),
            EditorAction::SelectTab { id } => self.select_tab(id),
            EditorAction::CloseTabById { id } => self.close_tab(id),
            EditorAction::CloseOtherTabs { id } => self.close_other_tabs(id),
            EditorAction::CloseSavedTabs => self.close_saved_tabs(),
            EditorAction::CloseAllTabs => self.close_all_tabs(),
            EditorAction::SaveAll { close } => self.ask_for_save_all(close),
            EditorAction::Rename { filename } => self.rename(&filename),
            EditorAction::RenameTab { id } => self.rename_tab(id),
            EditorAction::SelectionChange(selection) => self.selection_change(&selection),
            EditorAction::SelectionFormats { formats } => {
                self.send(OutboundCommand::UpdateFormatMenu {
                    formats: create_selection_format_state(&formats),
                });
            }
            EditorAction::Search(matches) => self.set_search(matches),
            EditorAction::NotificationResponse {
                id,
                index,
                accepted,
            } => self.respond_to_notification(id, index, accepted),
            EditorAction::Export {
                kind,
                content,
                page_options,
            } => self.export(kind, content, page_options),
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Window Setup
    // ─────────────────────────────────────────────────────────────────────────

    /// Initialize a fresh window: layout, default line ending and the first
    /// tabs (one blank tab, or one untitled tab per markdown string).
    pub fn bootstrap(&mut self, config: BootstrapConfig) {
        self.send(OutboundCommand::WindowInitialized);

        self.preferences.end_of_line = config.line_ending;
        self.layout.right_column = "files".to_string();
        self.layout.show_side_bar = config.side_bar_visibility;
        self.layout.show_tab_bar = config.tab_bar_visibility;
        self.layout.source_code_mode = config.source_code_mode_enabled;
        self.send(OutboundCommand::UpdateLayoutMenu(self.layout.clone()));

        if config.add_blank_tab {
            self.new_untitled_tab(true, None);
        } else {
            for (index, markdown) in config.markdown_list.into_iter().enumerate() {
                self.new_untitled_tab(index == 0, Some(markdown));
            }
        }
        info!("Window bootstrapped with {} tab(s)", self.tabs.len());
    }

    /// Show the tab bar once a second tab is about to open.
    fn show_tab_view(&mut self) {
        if self.tabs.len() == 1 {
            self.layout.show_tab_bar = true;
            self.send(OutboundCommand::UpdateLayoutMenu(self.layout.clone()));
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Opening Tabs
    // ─────────────────────────────────────────────────────────────────────────

    /// Open an untitled document `Untitled-N` with N one above the highest
    /// open untitled number.
    pub fn new_untitled_tab(&mut self, selected: bool, markdown: Option<String>) {
        self.show_tab_view();

        let number = self.tabs.max_untitled_number().map_or(1, |n| n + 1);
        let doc = blank_document(&self.preferences, number, markdown);
        let id = doc.id;
        let markdown = doc.markdown.clone();
        self.tabs.insert(doc);

        if selected {
            self.select_tab(id);
            self.emit(EditorEvent::FileLoaded {
                id,
                markdown,
                cursor: None,
            });
        }
    }

    /// Open a loaded document. A tab already showing the file is selected
    /// instead, and a selected untitled tab without edits is replaced.
    pub fn new_tab_with_content(&mut self, raw: RawMarkdownDocument, selected: bool) {
        let existing = raw
            .pathname
            .as_deref()
            .and_then(|path| self.tabs.find_by_path(path))
            .map(|doc| doc.id);
        if let Some(existing) = existing {
            self.select_tab(existing);
            return;
        }

        let replaceable = self
            .current_file()
            .filter(|doc| doc.is_saved && doc.is_untitled())
            .map(|doc| doc.id);
        match replaceable {
            Some(id) => self.force_close_tab(id),
            None => self.show_tab_view(),
        }

        let mixed_line_ending = raw.is_mixed_line_endings.then_some(raw.line_ending);
        let doc = Document::from_raw(raw);
        let id = doc.id;
        let markdown = doc.markdown.clone();
        let cursor = doc.cursor;
        let notification = mixed_line_ending
            .map(|line_ending| mixed_line_endings_notification(&doc.filename, line_ending));
        self.tabs.insert(doc);

        if selected {
            self.select_tab(id);
            self.emit(EditorEvent::FileLoaded {
                id,
                markdown,
                cursor,
            });
        }
        if let Some(notification) = notification {
            self.push_tab_notification(id, notification);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Closing Tabs
    // ─────────────────────────────────────────────────────────────────────────

    /// Close a saved tab directly; ask the host to save an unsaved one first.
    pub fn close_tab(&mut self, id: DocumentId) {
        let Some(doc) = self.tabs.get(id) else {
            warn!("Cannot close unknown tab {}", id);
            return;
        };
        if doc.is_saved {
            self.force_close_tab(id);
        } else {
            let file = unsaved_file(doc);
            self.send(OutboundCommand::SaveAndCloseTabs { files: vec![file] });
        }
    }

    pub fn close_other_tabs(&mut self, keep: DocumentId) {
        let others: Vec<_> = self.tabs.ids().into_iter().filter(|&id| id != keep).collect();
        for id in others {
            self.close_tab(id);
        }
    }

    pub fn close_saved_tabs(&mut self) {
        let saved: Vec<_> = self
            .tabs
            .iter()
            .filter(|doc| doc.is_saved)
            .map(|doc| doc.id)
            .collect();
        for id in saved {
            self.close_tab(id);
        }
    }

    pub fn close_all_tabs(&mut self) {
        for id in self.tabs.ids() {
            self.close_tab(id);
        }
    }

    /// Ask the host to save every tab with unsaved or untitled content.
    ///
    /// With `close`, tabs that need no saving are closed right away and the
    /// rest are closed by the host after saving.
    pub fn ask_for_save_all(&mut self, close: bool) {
        let files: Vec<_> = self
            .tabs
            .iter()
            .filter(|doc| needs_saving(doc))
            .map(unsaved_file)
            .collect();

        if !close {
            self.send(OutboundCommand::SaveTabs { files });
            return;
        }

        let done: Vec<_> = self
            .tabs
            .iter()
            .filter(|doc| !needs_saving(doc))
            .map(|doc| doc.id)
            .collect();
        self.close_many(&done);
        if !files.is_empty() {
            self.send(OutboundCommand::SaveAndCloseTabs { files });
        }
    }

    /// Close the window, or list the unsaved tabs for confirmation.
    pub fn ask_for_close(&mut self) {
        let files: Vec<_> = self
            .tabs
            .iter()
            .filter(|doc| !doc.is_saved)
            .map(unsaved_file)
            .collect();
        if files.is_empty() {
            self.send(OutboundCommand::CloseWindow);
        } else {
            self.send(OutboundCommand::CloseWindowConfirm { files });
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Save, Move And Rename Requests
    // ─────────────────────────────────────────────────────────────────────────

    pub fn ask_file_save(&mut self) {
        if let Some(request) = self.current_file().map(|doc| self.save_request(doc)) {
            self.send(OutboundCommand::ResponseFileSave(request));
        }
    }

    pub fn ask_file_save_as(&mut self) {
        if let Some(request) = self.current_file().map(|doc| self.save_request(doc)) {
            self.send(OutboundCommand::ResponseFileSaveAs(request));
        }
    }

    /// Move the active file; an untitled document is saved instead.
    pub fn move_file(&mut self) {
        let Some(doc) = self.current_file() else {
            return;
        };
        let command = match &doc.pathname {
            Some(pathname) => OutboundCommand::ResponseFileMoveTo {
                id: doc.id,
                pathname: pathname.clone(),
            },
            None => OutboundCommand::ResponseFileSave(self.save_request(doc)),
        };
        self.send(command);
    }

    /// Open the rename prompt; an untitled document is saved instead.
    pub fn response_for_rename(&mut self) {
        let Some(doc) = self.current_file() else {
            return;
        };
        if doc.is_untitled() {
            let request = self.save_request(doc);
            self.send(OutboundCommand::ResponseFileSave(request));
        } else {
            self.emit(EditorEvent::Rename);
        }
    }

    /// Rename the active file within its directory.
    pub fn rename(&mut self, new_filename: &str) {
        let Some(doc) = self.current_file() else {
            return;
        };
        if doc.filename == new_filename {
            return;
        }
        let Some(pathname) = doc.pathname.clone() else {
            warn!("Cannot rename untitled document {}", doc.filename);
            return;
        };

        let new_pathname = paths::dirname_of(&pathname)
            .map(|dir| dir.join(new_filename))
            .unwrap_or_else(|| new_filename.into());
        let id = doc.id;
        self.send(OutboundCommand::Rename {
            id,
            pathname,
            new_pathname,
        });
    }

    /// Select a tab and open the rename prompt for it.
    pub fn rename_tab(&mut self, id: DocumentId) {
        if !self.tabs.contains(id) {
            warn!("Cannot rename unknown tab {}", id);
            return;
        }
        self.select_tab(id);
        self.emit(EditorEvent::Rename);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Document Format
    // ─────────────────────────────────────────────────────────────────────────

    pub fn set_line_ending(&mut self, line_ending: LineEnding) {
        if let Some(doc) = self.current_mut() {
            if doc.line_ending != line_ending {
                doc.line_ending = line_ending;
                doc.adjust_line_ending_on_save = line_ending.needs_adjust_on_save();
                doc.is_saved = false;
            }
        }
    }

    pub fn set_file_encoding(&mut self, encoding: &str) {
        if let Some(doc) = self.current_mut() {
            if doc.encoding.encoding != encoding {
                doc.encoding = Encoding::new(encoding, false);
                doc.is_saved = false;
            }
        }
    }

    pub fn set_final_newline(&mut self, value: TrailingNewline) {
        if let Some(doc) = self.current_mut() {
            if doc.trim_trailing_newline != value {
                doc.trim_trailing_newline = value;
                doc.is_saved = false;
            }
        }
    }

    /// Persist a new zoom factor, rounded to three decimals.
    pub fn window_zoom(&mut self, zoom_factor: f64) {
        let zoom = ((zoom_factor * 1000.0).round() / 1000.0)
            .clamp(Preferences::MIN_ZOOM, Preferences::MAX_ZOOM);
        if (self.preferences.zoom - zoom).abs() > f64::EPSILON {
            self.preferences.zoom = zoom;
            self.preferences_changed = true;
        }
        self.emit(EditorEvent::ZoomChanged { zoom_factor: zoom });
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Selection And Export
    // ─────────────────────────────────────────────────────────────────────────

    fn selection_change(&mut self, selection: &SelectionChange) {
        if let Some(value) = search_value(selection) {
            self.set_search(SearchMatches {
                value,
                ..SearchMatches::default()
            });
        }
        self.send(OutboundCommand::EditorSelectionChanged(
            create_application_menu_state(selection),
        ));
    }

    /// Hand the active document to the host for export.
    pub fn export(&mut self, kind: String, content: Option<String>, page_options: Option<Value>) {
        let Some(doc) = self.current_file() else {
            warn!("Nothing to export");
            return;
        };
        let command = OutboundCommand::ResponseExport {
            kind,
            title: document_title(&self.list_toc),
            content,
            filename: doc.filename.clone(),
            pathname: doc.pathname.clone(),
            page_options,
        };
        self.send(command);
    }

    fn export_success(&mut self, file_path: &Path) {
        self.emit(EditorEvent::Notice(Notice {
            title: "Exported successfully".to_string(),
            message: format!("Exported \"{}\" successfully!", paths::filename_of(file_path)),
            style: NotificationStyle::Info,
        }));
    }
}

/// Saved documents with content can be closed without asking.
fn needs_saving(doc: &Document) -> bool {
    !(doc.is_saved && doc.has_content())
}

fn blank_document(preferences: &Preferences, number: usize, markdown: Option<String>) -> Document {
    Document::blank(
        number,
        &preferences.default_encoding,
        preferences.end_of_line,
        preferences.trim_trailing_newline,
        markdown,
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
