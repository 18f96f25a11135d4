//! marktabs - Main Entry Point
//!
//! Runs the editor state behind a JSON-lines bridge: commands are read from
//! stdin, requests and events are written to stdout and logs go to stderr.

use log::{error, info, warn};
use marktabs::config::{get_config_dir, load_preferences};
use marktabs::editor::EditorState;
use marktabs::host::{run, Bridge};
use marktabs::watcher::FileWatcher;
use std::io::{self, BufReader};
use std::process::ExitCode;

/// Application name constant.
const APP_NAME: &str = "marktabs";

fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting {} {}", APP_NAME, env!("CARGO_PKG_VERSION"));

    let preferences = load_preferences();
    info!(
        "Preferences: auto save {} ({} ms), line ending {}",
        preferences.auto_save, preferences.auto_save_delay_ms, preferences.end_of_line
    );

    let watcher = if preferences.watch_files {
        match FileWatcher::new(preferences.watch_poll_interval()) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!("Disk watching disabled: {}", e);
                None
            }
        }
    } else {
        None
    };

    let mut bridge = Bridge::new(EditorState::new(preferences), io::stdout())
        .with_preferences_dir(get_config_dir().ok());
    if let Some(watcher) = watcher {
        bridge = bridge.with_watcher(watcher);
    }

    match run(BufReader::new(io::stdin()), bridge) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
