//! Preference file persistence for marktabs
//!
//! Preferences live in a platform-specific directory. Loading never fails:
//! missing or corrupted files fall back to defaults with a warning.

use crate::config::Preferences;
use crate::error::{Error, Result, ResultExt};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Application name used for the config directory
const APP_NAME: &str = "marktabs";

/// Preferences file name
const PREFERENCES_FILE_NAME: &str = "preferences.json";

/// Temporary file name used during atomic writes
const PREFERENCES_BACKUP_NAME: &str = "preferences.json.bak";

// ─────────────────────────────────────────────────────────────────────────────
// Platform-Specific Directory Resolution
// ─────────────────────────────────────────────────────────────────────────────

/// Get the platform-specific configuration directory for marktabs.
///
/// - **Windows**: `%APPDATA%\marktabs\`
/// - **macOS**: `~/Library/Application Support/marktabs/`
/// - **Linux**: `~/.config/marktabs/`
///
/// # Errors
///
/// Returns `Error::ConfigDirNotFound` if the config directory cannot be determined.
pub fn get_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|base| base.join(APP_NAME))
        .ok_or(Error::ConfigDirNotFound)
}

/// Get the full path to the preferences file.
pub fn get_preferences_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(PREFERENCES_FILE_NAME))
}

// ─────────────────────────────────────────────────────────────────────────────
// Load Preferences
// ─────────────────────────────────────────────────────────────────────────────

/// Load preferences from the default location, falling back to defaults.
pub fn load_preferences() -> Preferences {
    get_preferences_path()
        .and_then(|path| load_preferences_from(&path))
        .unwrap_or_warn_default(Preferences::default(), "Failed to load preferences")
}

/// Load preferences from `path`.
///
/// A missing or empty file yields the defaults.
pub fn load_preferences_from(path: &Path) -> Result<Preferences> {
    if !path.exists() {
        debug!(
            "Preferences file not found at {}, using defaults",
            path.display()
        );
        return Ok(Preferences::default());
    }

    let contents = fs::read_to_string(path).map_err(|e| Error::ConfigLoad {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;

    if contents.trim().is_empty() {
        debug!("Preferences file is empty, using defaults");
        return Ok(Preferences::default());
    }

    let preferences = Preferences::from_json_sanitized(&contents).map_err(|e| {
        warn!(
            "Preferences file at {} contains invalid JSON: {}",
            path.display(),
            e
        );
        Error::ConfigParse {
            message: format!("Failed to parse preferences file: {}", e),
            source: Some(Box::new(e)),
        }
    })?;

    info!("Preferences loaded from {}", path.display());
    Ok(preferences)
}

// ─────────────────────────────────────────────────────────────────────────────
// Save Preferences
// ─────────────────────────────────────────────────────────────────────────────

/// Save preferences into `dir`, creating it if necessary.
///
/// The JSON is written to a temporary file first and then renamed over the
/// preferences file, so a crash never leaves a half-written file behind.
pub fn save_preferences_to(dir: &Path, preferences: &Preferences) -> Result<()> {
    if !dir.exists() {
        debug!("Creating config directory: {}", dir.display());
        fs::create_dir_all(dir).map_err(|e| Error::ConfigSave {
            path: dir.to_path_buf(),
            source: Box::new(e),
        })?;
    }

    let path = dir.join(PREFERENCES_FILE_NAME);
    let backup_path = dir.join(PREFERENCES_BACKUP_NAME);

    let json = serde_json::to_string_pretty(preferences).map_err(|e| Error::ConfigSave {
        path: path.clone(),
        source: Box::new(e),
    })?;

    fs::write(&backup_path, &json).map_err(|e| Error::ConfigSave {
        path: backup_path.clone(),
        source: Box::new(e),
    })?;

    fs::rename(&backup_path, &path).map_err(|e| Error::ConfigSave {
        path: path.clone(),
        source: Box::new(e),
    })?;

    info!("Preferences saved to {}", path.display());
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
