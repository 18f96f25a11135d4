//! Per-tab notification queue.
//!
//! Notifications are attached to one tab, live as long as the tab, and are
//! independent of the document content. Reloading a tab from disk keeps them.

use crate::protocol::FileChange;
use serde::Serialize;

/// Visual severity of a tab notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStyle {
    #[default]
    Info,
    Warn,
    Crit,
}

/// Kinds of notification of which at most one may exist per tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusiveType {
    FileChanged,
}

/// What happens when the user accepts a confirmable notification.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum NotificationAction {
    #[default]
    None,
    /// Replace the buffer with the on-disk content carried by the change.
    ReloadFromDisk(Box<FileChange>),
}

/// A persistent notification shown on top of a tab.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabNotification {
    pub msg: String,
    pub show_confirm: bool,
    pub style: NotificationStyle,
    pub exclusive_type: Option<ExclusiveType>,
    #[serde(skip)]
    pub action: NotificationAction,
}

impl TabNotification {
    /// A plain informational notification.
    pub fn info(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            show_confirm: false,
            style: NotificationStyle::Info,
            exclusive_type: None,
            action: NotificationAction::None,
        }
    }

    pub fn with_style(mut self, style: NotificationStyle) -> Self {
        self.style = style;
        self
    }

    pub fn exclusive(mut self, kind: ExclusiveType) -> Self {
        self.exclusive_type = Some(kind);
        self
    }

    /// Ask the user for a decision; `action` runs only if they accept.
    pub fn confirm(mut self, action: NotificationAction) -> Self {
        self.show_confirm = true;
        self.action = action;
        self
    }
}

/// Ordered list of notifications of one tab.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NotificationQueue {
    items: Vec<TabNotification>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a notification. An exclusive notification replaces the
    /// existing one of the same kind and moves to the end.
    pub fn push(&mut self, notification: TabNotification) {
        if let Some(kind) = notification.exclusive_type {
            self.items.retain(|n| n.exclusive_type != Some(kind));
        }
        self.items.push(notification);
    }

    /// Remove and return the notification at `index` (dismiss or respond).
    pub fn take(&mut self, index: usize) -> Option<TabNotification> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    pub fn get(&self, index: usize) -> Option<&TabNotification> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TabNotification> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_exclusive(&self, kind: ExclusiveType) -> bool {
        self.items.iter().any(|n| n.exclusive_type == Some(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_push_keeps_order() {
        let mut queue = NotificationQueue::new();
        queue.push(TabNotification::info("first"));
        queue.push(TabNotification::info("second"));
        let msgs: Vec<_> = queue.iter().map(|n| n.msg.as_str()).collect();
        assert_eq!(msgs, vec!["first", "second"]);
    }

    #[test]
    fn test_exclusive_replaces_previous() {
        let mut queue = NotificationQueue::new();
        queue.push(TabNotification::info("removed").exclusive(ExclusiveType::FileChanged));
        queue.push(TabNotification::info("other"));
        queue.push(
            TabNotification::info("changed")
                .with_style(NotificationStyle::Warn)
                .exclusive(ExclusiveType::FileChanged),
        );

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.get(0).unwrap().msg, "other");
        assert_eq!(queue.get(1).unwrap().msg, "changed");
        assert!(queue.has_exclusive(ExclusiveType::FileChanged));
    }

    #[test]
    fn test_take_removes_entry() {
        let mut queue = NotificationQueue::new();
        let change = FileChange {
            pathname: PathBuf::from("/x.md"),
            data: None,
        };
        queue.push(
            TabNotification::info("reload?")
                .confirm(NotificationAction::ReloadFromDisk(Box::new(change))),
        );

        let taken = queue.take(0).unwrap();
        assert!(taken.show_confirm);
        assert!(matches!(taken.action, NotificationAction::ReloadFromDisk(_)));
        assert!(queue.is_empty());
        assert!(queue.take(0).is_none());
    }

    #[test]
    fn test_serialization_skips_action() {
        let n = TabNotification::info("hi").exclusive(ExclusiveType::FileChanged);
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["exclusiveType"], "file_changed");
        assert_eq!(json["showConfirm"], false);
        assert!(json.get("action").is_none());
    }
}
