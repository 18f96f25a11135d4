//! User preferences for marktabs
//!
//! This module defines the preferences that influence tab handling: autosave,
//! defaults for new documents, window layout and disk watching.

use crate::document::{LineEnding, TrailingNewline};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// Preferences Struct
// ─────────────────────────────────────────────────────────────────────────────

/// Persisted user preferences.
///
/// All fields have sensible defaults via the `Default` trait and `#[serde(default)]`,
/// so older or partial preference files still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    // ─────────────────────────────────────────────────────────────────────────
    // Saving
    // ─────────────────────────────────────────────────────────────────────────
    /// Save documents with a path automatically after edits
    pub auto_save: bool,

    /// Idle time after the last edit before an autosave fires
    pub auto_save_delay_ms: u64,

    // ─────────────────────────────────────────────────────────────────────────
    // New Documents
    // ─────────────────────────────────────────────────────────────────────────
    /// Line ending for new documents and ambiguous files
    pub end_of_line: LineEnding,

    /// Charset for new documents
    pub default_encoding: String,

    /// Final newline policy for new documents
    pub trim_trailing_newline: TrailingNewline,

    // ─────────────────────────────────────────────────────────────────────────
    // Window
    // ─────────────────────────────────────────────────────────────────────────
    /// Window zoom factor
    pub zoom: f64,

    pub side_bar_visibility: bool,

    pub tab_bar_visibility: bool,

    pub source_code_mode_enabled: bool,

    // ─────────────────────────────────────────────────────────────────────────
    // Disk Watching
    // ─────────────────────────────────────────────────────────────────────────
    /// Watch open files for changes made by other programs
    pub watch_files: bool,

    /// How often the bridge checks the watcher for events
    pub watch_poll_interval_ms: u64,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            auto_save: false,
            auto_save_delay_ms: 5000,
            end_of_line: LineEnding::default(),
            default_encoding: "utf8".to_string(),
            trim_trailing_newline: TrailingNewline::Disabled,
            zoom: 1.0,
            side_bar_visibility: false,
            tab_bar_visibility: false,
            source_code_mode_enabled: false,
            watch_files: true,
            watch_poll_interval_ms: 500,
        }
    }
}

impl Preferences {
    pub const MIN_AUTO_SAVE_DELAY_MS: u64 = 100;
    pub const MIN_ZOOM: f64 = 0.5;
    pub const MAX_ZOOM: f64 = 3.0;
    pub const MIN_WATCH_POLL_INTERVAL_MS: u64 = 50;

    /// Clamp values into their valid ranges.
    pub fn sanitize(&mut self) {
        self.auto_save_delay_ms = self.auto_save_delay_ms.max(Self::MIN_AUTO_SAVE_DELAY_MS);

        self.zoom = if self.zoom.is_finite() {
            self.zoom.clamp(Self::MIN_ZOOM, Self::MAX_ZOOM)
        } else {
            1.0
        };

        if self.default_encoding.trim().is_empty() {
            self.default_encoding = "utf8".to_string();
        }

        self.watch_poll_interval_ms = self
            .watch_poll_interval_ms
            .max(Self::MIN_WATCH_POLL_INTERVAL_MS);
    }

    /// Parse preferences from JSON and sanitize them.
    pub fn from_json_sanitized(json: &str) -> Result<Self, serde_json::Error> {
        let mut preferences: Self = serde_json::from_str(json)?;
        preferences.sanitize();
        Ok(preferences)
    }

    pub fn auto_save_delay(&self) -> Duration {
        Duration::from_millis(self.auto_save_delay_ms)
    }

    pub fn watch_poll_interval(&self) -> Duration {
        Duration::from_millis(self.watch_poll_interval_ms)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let preferences = Preferences::default();
        assert!(!preferences.auto_save);
        assert_eq!(preferences.auto_save_delay(), Duration::from_secs(5));
        assert_eq!(preferences.default_encoding, "utf8");
        assert_eq!(preferences.trim_trailing_newline, TrailingNewline::Disabled);
        assert!(preferences.watch_files);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let preferences =
            Preferences::from_json_sanitized(r#"{"auto_save": true, "end_of_line": "crlf"}"#)
                .unwrap();
        assert!(preferences.auto_save);
        assert_eq!(preferences.end_of_line, LineEnding::Crlf);
        assert_eq!(preferences.auto_save_delay_ms, 5000);
        assert_eq!(preferences.zoom, 1.0);
    }

    #[test]
    fn test_sanitize_clamps() {
        let preferences = Preferences::from_json_sanitized(
            r#"{"auto_save_delay_ms": 3, "zoom": 9.5, "default_encoding": " ", "watch_poll_interval_ms": 0}"#,
        )
        .unwrap();
        assert_eq!(
            preferences.auto_save_delay_ms,
            Preferences::MIN_AUTO_SAVE_DELAY_MS
        );
        assert_eq!(preferences.zoom, Preferences::MAX_ZOOM);
        assert_eq!(preferences.default_encoding, "utf8");
        assert_eq!(
            preferences.watch_poll_interval_ms,
            Preferences::MIN_WATCH_POLL_INTERVAL_MS
        );
    }

    #[test]
    fn test_trailing_newline_as_number() {
        let preferences =
            Preferences::from_json_sanitized(r#"{"trim_trailing_newline": 1}"#).unwrap();
        assert_eq!(preferences.trim_trailing_newline, TrailingNewline::EnsureSingle);

        let preferences = Preferences::from_json_sanitized(
            r#"{"trim_trailing_newline": 4, "auto_save": true}"#,
        )
        .unwrap();
        assert_eq!(preferences.trim_trailing_newline, TrailingNewline::Other(4));
        assert!(preferences.auto_save);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let preferences =
            Preferences::from_json_sanitized(r#"{"theme": "dark", "zoom": 1.5}"#).unwrap();
        assert_eq!(preferences.zoom, 1.5);
    }
}
