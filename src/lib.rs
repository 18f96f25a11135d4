//! marktabs - document and tab state for a desktop markdown editor
//!
//! The crate keeps one record per open tab, decides when tabs are saved,
//! closed or reloaded, and talks to the host shell through JSON messages.
//!
//! - [`editor::EditorState`]: the tab state machine
//! - [`document`]: document records, charset and line-ending handling
//! - [`protocol`]: messages exchanged with the host and the renderer
//! - [`host`]: JSON-lines bridge used by the `marktabs` binary

pub mod config;
pub mod document;
pub mod editor;
pub mod error;
pub mod host;
pub mod notifications;
pub mod paths;
pub mod protocol;
pub mod string_utils;
pub mod watcher;

pub use error::{Error, Result};
