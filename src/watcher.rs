//! File system watcher for open tabs.
//!
//! Watches the directories of all open files (non-recursively) and reports
//! changes to the open files themselves. Watching the directory instead of
//! the file keeps the watch alive when another program saves by replacing
//! the file.

use crate::error::Result;
use crate::protocol::FileChangeKind;
use log::{debug, warn};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::Duration;

/// Raw event forwarded from the notify callback.
#[derive(Debug, Clone)]
enum RawEvent {
    Changed(FileChangeKind, PathBuf),
    Error(String),
}

/// Watches the files shown in tabs.
#[derive(Debug)]
pub struct FileWatcher {
    watcher: RecommendedWatcher,
    receiver: Receiver<RawEvent>,
    /// Files whose changes are reported
    files: HashSet<PathBuf>,
    /// Watched directories and the number of watched files in each
    directories: BTreeMap<PathBuf, usize>,
}

impl FileWatcher {
    /// Create a watcher. `poll_interval` only matters for the polling backend.
    ///
    /// # Errors
    ///
    /// Returns `Error::Watcher` if the platform watcher cannot be created.
    pub fn new(poll_interval: Duration) -> Result<Self> {
        let (tx, rx) = channel();
        let watcher = RecommendedWatcher::new(
            move |result: notify::Result<Event>| Self::handle_event(result, &tx),
            Config::default().with_poll_interval(poll_interval),
        )?;

        Ok(Self {
            watcher,
            receiver: rx,
            files: HashSet::new(),
            directories: BTreeMap::new(),
        })
    }

    fn handle_event(result: notify::Result<Event>, tx: &Sender<RawEvent>) {
        match result {
            Ok(event) => {
                let Some(kind) = classify(&event.kind) else {
                    return;
                };
                for path in event.paths {
                    let _ = tx.send(RawEvent::Changed(kind, path));
                }
            }
            Err(e) => {
                let _ = tx.send(RawEvent::Error(e.to_string()));
            }
        }
    }

    pub fn is_watching(&self, path: &Path) -> bool {
        self.files.contains(path)
    }

    /// Start reporting changes of `path`.
    pub fn watch(&mut self, path: &Path) -> Result<()> {
        if self.files.contains(path) {
            return Ok(());
        }
        let Some(dir) = path.parent().map(Path::to_path_buf) else {
            warn!("Cannot watch {} without parent directory", path.display());
            return Ok(());
        };

        match self.directories.get_mut(&dir) {
            Some(count) => *count += 1,
            None => {
                self.watcher.watch(&dir, RecursiveMode::NonRecursive)?;
                debug!("Watching directory {}", dir.display());
                self.directories.insert(dir, 1);
            }
        }
        self.files.insert(path.to_path_buf());
        Ok(())
    }

    /// Stop reporting changes of `path`.
    pub fn unwatch(&mut self, path: &Path) {
        if !self.files.remove(path) {
            return;
        }
        let Some(dir) = path.parent() else {
            return;
        };
        let remaining = match self.directories.get_mut(dir) {
            Some(count) => {
                *count -= 1;
                *count
            }
            None => return,
        };
        if remaining == 0 {
            self.directories.remove(dir);
            if let Err(e) = self.watcher.unwatch(dir) {
                debug!("Failed to unwatch {}: {}", dir.display(), e);
            }
        }
    }

    /// Watch exactly `paths`: new paths are added and others dropped.
    pub fn sync<'a>(&mut self, paths: impl IntoIterator<Item = &'a Path>) {
        let wanted: HashSet<PathBuf> = paths.into_iter().map(Path::to_path_buf).collect();

        let stale: Vec<PathBuf> = self.files.difference(&wanted).cloned().collect();
        for path in stale {
            self.unwatch(&path);
        }
        for path in &wanted {
            if let Err(e) = self.watch(path) {
                warn!("Failed to watch {}: {}", path.display(), e);
            }
        }
    }

    /// Drain pending changes of watched files.
    ///
    /// This is non-blocking. Several events for the same file are merged
    /// into one, see `coalesce`.
    pub fn poll_changes(&self) -> Vec<(FileChangeKind, PathBuf)> {
        let mut changes = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            match event {
                RawEvent::Changed(kind, path) if self.files.contains(&path) => {
                    changes.push((kind, path))
                }
                RawEvent::Changed(..) => {}
                RawEvent::Error(message) => warn!("File watcher error: {}", message),
            }
        }
        coalesce(changes)
    }
}

/// Map a notify event kind onto the changes we report.
fn classify(kind: &EventKind) -> Option<FileChangeKind> {
    match kind {
        EventKind::Create(_) => Some(FileChangeKind::Add),
        EventKind::Modify(_) => Some(FileChangeKind::Change),
        EventKind::Remove(_) => Some(FileChangeKind::Unlink),
        _ => None,
    }
}

/// Merge events per file, keeping the order in which files first appeared.
///
/// The last event wins, except that a removal followed by a creation (a
/// replacing save) is a change, and a creation followed by modifications
/// stays a creation.
pub fn coalesce(events: Vec<(FileChangeKind, PathBuf)>) -> Vec<(FileChangeKind, PathBuf)> {
    let mut merged: Vec<(FileChangeKind, PathBuf)> = Vec::new();
    for (kind, path) in events {
        match merged.iter_mut().find(|(_, p)| *p == path) {
            Some(entry) => {
                entry.0 = match (entry.0, kind) {
                    (FileChangeKind::Unlink, FileChangeKind::Add) => FileChangeKind::Change,
                    (FileChangeKind::Add, FileChangeKind::Change) => FileChangeKind::Add,
                    (_, kind) => kind,
                };
            }
            None => merged.push((kind, path)),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};
    use tempfile::TempDir;

    fn path(name: &str) -> PathBuf {
        PathBuf::from(format!("/docs/{}", name))
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify(&EventKind::Create(CreateKind::File)),
            Some(FileChangeKind::Add)
        );
        assert_eq!(
            classify(&EventKind::Modify(ModifyKind::Any)),
            Some(FileChangeKind::Change)
        );
        assert_eq!(
            classify(&EventKind::Remove(RemoveKind::File)),
            Some(FileChangeKind::Unlink)
        );
        assert_eq!(classify(&EventKind::Any), None);
    }

    #[test]
    fn test_coalesce_replacing_save_is_change() {
        let merged = coalesce(vec![
            (FileChangeKind::Unlink, path("a.md")),
            (FileChangeKind::Change, path("b.md")),
            (FileChangeKind::Add, path("a.md")),
        ]);
        assert_eq!(
            merged,
            vec![
                (FileChangeKind::Change, path("a.md")),
                (FileChangeKind::Change, path("b.md")),
            ]
        );
    }

    #[test]
    fn test_coalesce_keeps_add_and_final_unlink() {
        let merged = coalesce(vec![
            (FileChangeKind::Add, path("a.md")),
            (FileChangeKind::Change, path("a.md")),
            (FileChangeKind::Change, path("b.md")),
            (FileChangeKind::Unlink, path("b.md")),
        ]);
        assert_eq!(
            merged,
            vec![
                (FileChangeKind::Add, path("a.md")),
                (FileChangeKind::Unlink, path("b.md")),
            ]
        );
    }

    #[test]
    fn test_watch_and_sync_bookkeeping() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.md");
        let b = dir.path().join("b.md");
        std::fs::write(&a, "a").unwrap();
        std::fs::write(&b, "b").unwrap();

        let mut watcher = FileWatcher::new(Duration::from_millis(50)).unwrap();
        watcher.watch(&a).unwrap();
        watcher.watch(&b).unwrap();
        watcher.watch(&a).unwrap();
        assert!(watcher.is_watching(&a));
        assert_eq!(watcher.directories.get(dir.path()), Some(&2));

        watcher.sync([b.as_path()]);
        assert!(!watcher.is_watching(&a));
        assert!(watcher.is_watching(&b));
        assert_eq!(watcher.directories.get(dir.path()), Some(&1));

        watcher.sync(std::iter::empty());
        assert!(watcher.directories.is_empty());
    }
}
