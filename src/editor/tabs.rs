//! Ordered collection of open documents.
//!
//! The order of `tabs` is the visual order in the tab bar. It only changes
//! through `insert`, `move_tab` and `remove`.

use crate::document::{Document, DocumentId};
use crate::paths;
use log::warn;
use std::path::Path;

#[derive(Debug, Default)]
pub struct TabCollection {
    tabs: Vec<Document>,
}

impl TabCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.tabs.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Document> {
        self.tabs.iter_mut()
    }

    pub fn ids(&self) -> Vec<DocumentId> {
        self.tabs.iter().map(|doc| doc.id).collect()
    }

    pub fn contains(&self, id: DocumentId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn index_of(&self, id: DocumentId) -> Option<usize> {
        self.tabs.iter().position(|doc| doc.id == id)
    }

    pub fn get(&self, id: DocumentId) -> Option<&Document> {
        self.tabs.iter().find(|doc| doc.id == id)
    }

    pub fn get_mut(&mut self, id: DocumentId) -> Option<&mut Document> {
        self.tabs.iter_mut().find(|doc| doc.id == id)
    }

    pub fn at(&self, index: usize) -> Option<&Document> {
        self.tabs.get(index)
    }

    /// First tab showing the file at `path`.
    fn position_by_path(&self, path: &Path) -> Option<usize> {
        paths::position_of_same_path(self.tabs.iter().map(|doc| doc.pathname.as_deref()), path)
    }

    pub fn find_by_path(&self, path: &Path) -> Option<&Document> {
        self.position_by_path(path).map(|index| &self.tabs[index])
    }

    pub fn find_by_path_mut(&mut self, path: &Path) -> Option<&mut Document> {
        let index = self.position_by_path(path)?;
        self.tabs.get_mut(index)
    }

    /// Append a document at the end of the tab bar.
    pub fn insert(&mut self, doc: Document) {
        self.tabs.push(doc);
    }

    /// Move tab `from` to the position before `to`, or to the end if `to`
    /// is absent or unknown.
    pub fn move_tab(&mut self, from: DocumentId, to: Option<DocumentId>) {
        if Some(from) == to {
            return;
        }
        let Some(from_index) = self.index_of(from) else {
            warn!("Cannot move unknown tab {}", from);
            return;
        };

        let target = match to.and_then(|to| self.index_of(to)) {
            // The target shifts left once `from` is taken out in front of it
            Some(to_index) if from_index < to_index => to_index - 1,
            Some(to_index) => to_index,
            None => self.tabs.len() - 1,
        };
        if target == from_index {
            return;
        }

        let doc = self.tabs.remove(from_index);
        self.tabs.insert(target, doc);
    }

    /// Remove a document and return it together with its former index.
    pub fn remove(&mut self, id: DocumentId) -> Option<(usize, Document)> {
        let index = self.index_of(id)?;
        Some((index, self.tabs.remove(index)))
    }

    /// Tab to select after the tab at `index` was removed: the tab now at the
    /// same index, else the previous one, else the first.
    pub fn fallback_after_removal(&self, index: usize) -> Option<DocumentId> {
        self.tabs
            .get(index)
            .or_else(|| index.checked_sub(1).and_then(|prev| self.tabs.get(prev)))
            .or_else(|| self.tabs.first())
            .map(|doc| doc.id)
    }

    /// Highest `N` of the open `Untitled-N` documents.
    pub fn max_untitled_number(&self) -> Option<usize> {
        self.tabs.iter().filter_map(Document::untitled_number).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{LineEnding, TrailingNewline};
    use std::path::PathBuf;

    fn untitled(n: usize) -> Document {
        Document::blank(n, "utf8", LineEnding::Lf, TrailingNewline::Disabled, None)
    }

    fn collection(count: usize) -> (TabCollection, Vec<DocumentId>) {
        let mut tabs = TabCollection::new();
        for n in 1..=count {
            tabs.insert(untitled(n));
        }
        let ids = tabs.ids();
        (tabs, ids)
    }

    #[test]
    fn test_move_to_same_id_is_noop() {
        let (mut tabs, ids) = collection(3);
        for id in &ids {
            tabs.move_tab(*id, Some(*id));
            assert_eq!(tabs.ids(), ids);
        }
    }

    #[test]
    fn test_move_forward_lands_before_target() {
        let (mut tabs, ids) = collection(4);
        tabs.move_tab(ids[0], Some(ids[2]));
        assert_eq!(tabs.ids(), vec![ids[1], ids[0], ids[2], ids[3]]);
    }

    #[test]
    fn test_move_backward() {
        let (mut tabs, ids) = collection(4);
        tabs.move_tab(ids[3], Some(ids[1]));
        assert_eq!(tabs.ids(), vec![ids[0], ids[3], ids[1], ids[2]]);
    }

    #[test]
    fn test_move_without_target_goes_to_end() {
        let (mut tabs, ids) = collection(3);
        tabs.move_tab(ids[0], None);
        assert_eq!(tabs.ids(), vec![ids[1], ids[2], ids[0]]);

        tabs.move_tab(ids[1], Some(DocumentId::next()));
        assert_eq!(tabs.ids(), vec![ids[2], ids[0], ids[1]]);
    }

    #[test]
    fn test_move_unknown_source_is_noop() {
        let (mut tabs, ids) = collection(2);
        tabs.move_tab(DocumentId::next(), Some(ids[0]));
        assert_eq!(tabs.ids(), ids);
    }

    #[test]
    fn test_fallback_after_removal() {
        let (mut tabs, ids) = collection(3);
        let (index, _) = tabs.remove(ids[1]).unwrap();
        assert_eq!(index, 1);
        assert_eq!(tabs.fallback_after_removal(index), Some(ids[2]));

        let (index, _) = tabs.remove(ids[2]).unwrap();
        assert_eq!(tabs.fallback_after_removal(index), Some(ids[0]));

        tabs.remove(ids[0]);
        assert_eq!(tabs.fallback_after_removal(0), None);
        assert!(tabs.remove(ids[0]).is_none());
    }

    #[test]
    fn test_find_by_path() {
        let (mut tabs, ids) = collection(2);
        tabs.get_mut(ids[1]).unwrap().set_path(&PathBuf::from("/docs/a.md"));
        let found = tabs.find_by_path(&PathBuf::from("/docs/./a.md")).unwrap();
        assert_eq!(found.id, ids[1]);
        assert!(tabs.find_by_path(&PathBuf::from("/docs/b.md")).is_none());
    }

    #[test]
    fn test_max_untitled_number() {
        let (mut tabs, ids) = collection(3);
        tabs.remove(ids[2]);
        assert_eq!(tabs.max_untitled_number(), Some(2));
        assert_eq!(TabCollection::new().max_untitled_number(), None);
    }
}
