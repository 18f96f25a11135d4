//! Undo/redo history as reported by the rich editor.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Undo stack of the rendering engine plus the current position in it.
///
/// Entries are opaque engine snapshots; this crate only stores and trims them.
/// `index` is `-1` when the stack is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    #[serde(default)]
    pub stack: Vec<Value>,
    #[serde(default = "History::empty_index")]
    pub index: i64,
}

impl History {
    fn empty_index() -> i64 {
        -1
    }

    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            index: Self::empty_index(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// The entry at `index`, if the index points into the stack.
    pub fn current_entry(&self) -> Option<&Value> {
        usize::try_from(self.index)
            .ok()
            .and_then(|index| self.stack.get(index))
    }

    /// A history containing only the current entry, so the document state
    /// before a reload can still be restored with a single undo.
    pub fn latest_only(&self) -> Option<History> {
        self.current_entry().map(|entry| History {
            stack: vec![entry.clone()],
            index: 0,
        })
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
