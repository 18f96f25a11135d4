//! JSON-lines bridge between the editor state and the host shell.
//!
//! Every input line is one `InboundMessage`; every output line is one
//! `OutboundMessage`. Between messages the bridge fires due autosaves and
//! feeds disk changes of open files into the state machine.

use crate::config::save_preferences_to;
use crate::document::{adjust_trailing_newlines, load_markdown_file};
use crate::editor::EditorState;
use crate::error::{Error, Result};
use crate::protocol::{
    FileChange, FileChangeKind, InboundMessage, OutboundCommand, OutboundMessage,
};
use crate::watcher::FileWatcher;
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// Longest wait for input when nothing else is pending.
const IDLE_WAIT: Duration = Duration::from_secs(1);

/// Maximum length of a rejected line quoted in logs.
const MAX_QUOTED_LEN: usize = 120;

// ─────────────────────────────────────────────────────────────────────────────
// Bridge
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the editor state and writes its output as JSON lines.
#[derive(Debug)]
pub struct Bridge<W: Write> {
    state: EditorState,
    output: W,
    watcher: Option<FileWatcher>,
    /// Markdown last handed to the host for writing, per path
    written: HashMap<PathBuf, String>,
    /// Where changed preferences are saved (none: not persisted)
    preferences_dir: Option<PathBuf>,
}

impl<W: Write> Bridge<W> {
    pub fn new(state: EditorState, output: W) -> Self {
        Self {
            state,
            output,
            watcher: None,
            written: HashMap::new(),
            preferences_dir: None,
        }
    }

    /// Report disk changes of open files through `watcher`.
    pub fn with_watcher(mut self, watcher: FileWatcher) -> Self {
        self.watcher = Some(watcher);
        self
    }

    /// Save changed preferences (e.g. zoom) into `dir`.
    pub fn with_preferences_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.preferences_dir = dir;
        self
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    /// Decode and apply one input line, then flush the resulting output.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` for an undecodable line, the state machine's
    /// error for a rejected action and `Error::Io` if writing fails.
    pub fn handle_line(&mut self, line: &str, now: Instant) -> Result<()> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }

        let message: InboundMessage =
            serde_json::from_str(line).map_err(|source| Error::Protocol {
                message: format!("Invalid message: {}", quote(line)),
                source,
            })?;

        let result = match message {
            InboundMessage::Host(command) => {
                self.state.handle_host_command(command);
                Ok(())
            }
            InboundMessage::Editor(action) => self.state.handle_action(action, now),
        };
        // Output of the steps that ran before a rejection still goes out
        self.flush()?;
        result
    }

    /// Fire due autosaves and process disk changes.
    pub fn tick(&mut self, now: Instant) -> Result<()> {
        let saves = self.state.tick_autosave(now);
        if saves > 0 {
            debug!("Requested {} autosave(s)", saves);
        }
        self.poll_watcher();
        self.flush()
    }

    /// Time until the bridge has work to do without new input.
    pub fn next_wakeup(&self, now: Instant) -> Duration {
        let mut wait = IDLE_WAIT;
        if self.watcher.is_some() {
            wait = wait.min(self.state.preferences().watch_poll_interval());
        }
        if let Some(deadline) = self.state.next_autosave_deadline() {
            wait = wait.min(deadline.saturating_duration_since(now));
        }
        wait
    }

    fn poll_watcher(&mut self) {
        let Some(watcher) = self.watcher.as_ref() else {
            return;
        };
        for (kind, path) in watcher.poll_changes() {
            if let Some((kind, change)) = self.file_change_for(kind, &path) {
                debug!("{:?} on disk: {}", kind, path.display());
                self.state.handle_file_change(kind, change);
            }
        }
    }

    /// Build the change to report for `path`, or `None` if the open tab
    /// already shows the content on disk or the disk holds what we last
    /// asked the host to write there.
    fn file_change_for(
        &self,
        kind: FileChangeKind,
        path: &Path,
    ) -> Option<(FileChangeKind, FileChange)> {
        let Some(doc) = self.state.tabs().find_by_path(path) else {
            debug!("Ignoring change of {} without open tab", path.display());
            return None;
        };

        // A replacing save can be split over two polls
        let kind = match kind {
            FileChangeKind::Unlink if path.exists() => FileChangeKind::Change,
            kind => kind,
        };
        if kind == FileChangeKind::Unlink {
            return Some((
                kind,
                FileChange {
                    pathname: path.to_path_buf(),
                    data: None,
                },
            ));
        }

        let raw = match load_markdown_file(
            path,
            self.state.preferences().end_of_line,
            doc.trim_trailing_newline,
        ) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to load changed file: {}", e);
                return None;
            }
        };
        let policy = raw.trim_trailing_newline;
        let on_disk = adjust_trailing_newlines(&raw.markdown, policy);
        if on_disk == doc.markdown {
            return None;
        }
        if doc
            .pathname
            .as_deref()
            .and_then(|pathname| self.written.get(pathname))
            .is_some_and(|sent| adjust_trailing_newlines(sent, policy) == on_disk)
        {
            debug!("Ignoring own save of {}", path.display());
            return None;
        }

        Some((
            kind,
            FileChange {
                pathname: path.to_path_buf(),
                data: Some(raw),
            },
        ))
    }

    fn remember_write(&mut self, command: &OutboundCommand) {
        match command {
            OutboundCommand::ResponseFileSave(request)
            | OutboundCommand::ResponseFileSaveAs(request) => {
                if let Some(pathname) = &request.pathname {
                    self.written.insert(pathname.clone(), request.markdown.clone());
                }
            }
            OutboundCommand::SaveTabs { files } => {
                for file in files {
                    if let Some(pathname) = &file.pathname {
                        self.written.insert(pathname.clone(), file.markdown.clone());
                    }
                }
            }
            _ => {}
        }
    }

    /// Write queued output, then update the watcher and preferences.
    pub fn flush(&mut self) -> Result<()> {
        let commands = self.state.take_outbound();
        let events = self.state.take_events();
        if !commands.is_empty() || !events.is_empty() {
            for command in commands {
                self.remember_write(&command);
                write_message(&mut self.output, &OutboundMessage::Host(command))?;
            }
            for event in events {
                write_message(&mut self.output, &OutboundMessage::Event(event))?;
            }
            self.output.flush()?;
        }

        let tabs = self.state.tabs();
        self.written.retain(|path, _| tabs.find_by_path(path).is_some());

        if let Some(watcher) = self.watcher.as_mut() {
            watcher.sync(
                self.state
                    .tabs()
                    .iter()
                    .filter_map(|doc| doc.pathname.as_deref()),
            );
        }

        if self.state.take_preferences_changed() {
            if let Some(dir) = self.preferences_dir.as_deref() {
                if let Err(e) = save_preferences_to(dir, self.state.preferences()) {
                    warn!("Failed to save preferences: {}", e);
                }
            }
        }
        Ok(())
    }
}

fn write_message<W: Write>(output: &mut W, message: &OutboundMessage) -> Result<()> {
    serde_json::to_writer(&mut *output, message).map_err(|e| Error::Io(e.into()))?;
    output.write_all(b"\n")?;
    Ok(())
}

fn quote(line: &str) -> String {
    match line.char_indices().nth(MAX_QUOTED_LEN) {
        Some((end, _)) => format!("{}...", &line[..end]),
        None => line.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Run Loop
// ─────────────────────────────────────────────────────────────────────────────

/// Run the bridge until `input` is closed.
///
/// Lines are read on a separate thread so that autosaves and disk changes
/// are handled while the host is idle. Undecodable lines and rejected
/// actions are logged and skipped.
///
/// # Errors
///
/// Returns `Error::Io` if reading input or writing output fails.
pub fn run<R, W>(input: R, mut bridge: Bridge<W>) -> Result<()>
where
    R: BufRead + Send + 'static,
    W: Write,
{
    let (tx, rx) = channel();
    thread::spawn(move || {
        for line in input.lines() {
            let failed = line.is_err();
            if tx.send(line).is_err() || failed {
                break;
            }
        }
    });

    info!("Bridge running");
    loop {
        let now = Instant::now();
        match rx.recv_timeout(bridge.next_wakeup(now)) {
            Ok(Ok(line)) => match bridge.handle_line(&line, Instant::now()) {
                Ok(()) => {}
                Err(e @ (Error::Protocol { .. } | Error::MissingDocumentId)) => {
                    warn!("Rejected message: {}", e)
                }
                Err(e) => return Err(e),
            },
            Ok(Err(e)) => {
                error!("Failed to read input: {}", e);
                return Err(e.into());
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        bridge.tick(Instant::now())?;
    }

    info!("Input closed, shutting down");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
