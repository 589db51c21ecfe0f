//! Path utilities for finding data directories

use std::env;
use std::path::PathBuf;

use directories::ProjectDirs;

/// Returns the folder where config, logs and history are stored.
///
/// Prefers the executable's directory when a `config` folder sits next
/// to it (portable install), then the platform data directory, then the
/// working directory.
pub fn get_data_dir() -> PathBuf {
    if let Ok(exe_path) = env::current_exe() {
        if let Some(parent) = exe_path.parent() {
            if parent.join("config").exists() {
                return parent.to_path_buf();
            }
        }
    }

    if let Some(dirs) = ProjectDirs::from("", "", "reel-client") {
        return dirs.data_dir().to_path_buf();
    }

    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
