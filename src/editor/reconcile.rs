//! Reconciling open tabs with the file system.
//!
//! Handles changes observed on disk and the host's answers to save, rename
//! and move requests.

use super::{file_changed_event, EditorState};
use crate::document::{Document, DocumentId, KeepField, LineEnding, RawMarkdownDocument};
use crate::notifications::{
    ExclusiveType, NotificationAction, NotificationStyle, TabNotification,
};
use crate::paths;
use crate::protocol::{EditorEvent, FileChange, FileChangeKind, Notice};
use log::{debug, error, info, warn};
use std::path::Path;

/// Notification shown when a loaded file had mixed line endings.
pub(super) fn mixed_line_endings_notification(filename: &str, line_ending: LineEnding) -> TabNotification {
    TabNotification::info(format!(
        "\"{}\" has mixed line endings which are automatically normalized to {}.",
        filename, line_ending
    ))
}

impl EditorState {
    /// React to a change of an open file on disk.
    ///
    /// Removal marks the tab unsaved and warns. Modification reloads the tab
    /// silently when autosave is on and the tab has no pending edits;
    /// otherwise the tab is marked unsaved and the user is asked to reload.
    pub fn handle_file_change(&mut self, kind: FileChangeKind, change: FileChange) {
        let auto_save = self.preferences.auto_save;
        let Some(tab) = self.tabs.find_by_path(&change.pathname) else {
            error!(
                "Cannot find tab for changed file {}",
                change.pathname.display()
            );
            return;
        };
        let id = tab.id;
        let is_saved = tab.is_saved;
        let filename = tab.filename.clone();

        let notification = match kind {
            FileChangeKind::Unlink => {
                TabNotification::info(format!("\"{}\" has been removed on disk.", filename))
                    .with_style(NotificationStyle::Warn)
                    .exclusive(ExclusiveType::FileChanged)
            }
            FileChangeKind::Add | FileChangeKind::Change => {
                if auto_save {
                    if self.autosave.cancel(id) {
                        debug!("Cancelled pending autosave of tab {} after disk change", id);
                    }
                    if is_saved {
                        self.load_change(change);
                        return;
                    }
                }
                TabNotification::info(format!(
                    "\"{}\" has been changed on disk. Do you want to reload it?",
                    filename
                ))
                .exclusive(ExclusiveType::FileChanged)
                .confirm(NotificationAction::ReloadFromDisk(Box::new(change)))
            }
        };

        if let Some(tab) = self.tabs.get_mut(id) {
            tab.is_saved = false;
            tab.notifications.push(notification);
        }
    }

    /// Replace a tab's content with the reloaded file content.
    ///
    /// The tab keeps its id, its notifications and its latest undo entry.
    pub fn load_change(&mut self, change: FileChange) {
        let Some(data) = change.data else {
            error!(
                "File change of {} carries no content",
                change.pathname.display()
            );
            return;
        };
        let Some(tab) = self.tabs.find_by_path_mut(&change.pathname) else {
            error!(
                "Cannot load change of {}: tab not found",
                change.pathname.display()
            );
            self.emit(EditorEvent::Notice(Notice {
                title: "Error loading tab".to_string(),
                message: "There was an error while loading the file change because the tab cannot be found.".to_string(),
                style: NotificationStyle::Crit,
            }));
            return;
        };

        let mixed_line_ending = data.is_mixed_line_endings.then_some(data.line_ending);
        let raw = RawMarkdownDocument {
            pathname: Some(change.pathname),
            history: None,
            cursor: None,
            ..data
        };
        tab.reload(
            Document::from_raw(raw),
            &[
                KeepField::Id,
                KeepField::Notifications,
                KeepField::LatestHistoryEntry,
            ],
        );
        if let Some(line_ending) = mixed_line_ending {
            let notification = mixed_line_endings_notification(&tab.filename, line_ending);
            tab.notifications.push(notification);
        }

        let id = tab.id;
        info!("Reloaded tab {} from disk", id);
        if self.current == Some(id) {
            if let Some(event) = self.tabs.get(id).map(file_changed_event) {
                self.refresh_working_dir();
                self.emit(event);
            }
        }
    }

    /// Follow a rename done outside the editor (e.g. in the side bar).
    pub fn rename_if_needed(&mut self, src: &Path, dest: &Path) {
        let mut renamed = false;
        for tab in self.tabs.iter_mut() {
            if tab
                .pathname
                .as_deref()
                .map_or(false, |p| paths::is_same_path(p, src))
            {
                tab.set_path(dest);
                renamed = true;
            }
        }
        if renamed {
            self.refresh_working_dir();
        }
    }

    /// Assign a path after "save as" or a move. Another tab showing the same
    /// file is closed first.
    pub fn set_pathname(&mut self, id: DocumentId, pathname: &Path, filename: String) {
        if !self.tabs.contains(id) {
            error!("Cannot set path of unknown tab {}", id);
            return;
        }

        let duplicate = self
            .tabs
            .iter()
            .find(|doc| {
                doc.id != id
                    && doc
                        .pathname
                        .as_deref()
                        .map_or(false, |p| paths::is_same_path(p, pathname))
            })
            .map(|doc| doc.id);
        if let Some(duplicate) = duplicate {
            debug!("Closing tab {} that shows the same file", duplicate);
            self.close_tab(duplicate);
        }

        if let Some(tab) = self.tabs.get_mut(id) {
            tab.set_path(pathname);
            if !filename.is_empty() {
                tab.filename = filename;
            }
            tab.is_saved = true;
        }
        if self.current == Some(id) {
            self.refresh_working_dir();
        }
    }

    pub fn tab_saved(&mut self, id: DocumentId) {
        match self.tabs.get_mut(id) {
            Some(tab) => tab.is_saved = true,
            None => debug!("Saved tab {} is no longer open", id),
        }
    }

    pub fn tab_save_failure(&mut self, id: DocumentId, message: &str) {
        let Some(tab) = self.tabs.get_mut(id) else {
            warn!("Save of closed tab {} failed: {}", id, message);
            self.emit(EditorEvent::Notice(Notice {
                title: "Save failure".to_string(),
                message: message.to_string(),
                style: NotificationStyle::Crit,
            }));
            return;
        };

        tab.is_saved = false;
        tab.notifications.push(
            TabNotification::info(format!("There was an error while saving: {}", message))
                .with_style(NotificationStyle::Crit),
        );
    }

    /// Dismiss a tab notification, running its action if accepted.
    pub fn respond_to_notification(&mut self, id: DocumentId, index: usize, accepted: bool) {
        let Some(tab) = self.tabs.get_mut(id) else {
            warn!("Notification response for unknown tab {}", id);
            return;
        };
        let Some(notification) = tab.notifications.take(index) else {
            warn!("Tab {} has no notification at index {}", id, index);
            return;
        };

        if accepted {
            match notification.action {
                NotificationAction::ReloadFromDisk(change) => self.load_change(*change),
                NotificationAction::None => {}
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
