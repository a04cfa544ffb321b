//! Platform-specific logging and data directory resolution.

use std::path::PathBuf;

/// Returns the platform-appropriate directory for log files.
///
/// | Platform | Directory |
/// |----------|-----------|
/// | Linux | `$XDG_STATE_HOME/vericap/logs` or `~/.local/state/vericap/logs` |
/// | macOS | `~/Library/Logs/vericap` |
pub fn log_dir() -> PathBuf {
    let base = directories::ProjectDirs::from("", "", "vericap")
        .expect("Failed to determine project directories");

    #[cfg(target_os = "linux")]
    {
        base.state_dir()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| base.data_local_dir().join("state"))
            .join("logs")
    }

    #[cfg(target_os = "macos")]
    {
        // ~/Library/Logs/<app>/ is the standard macOS log location; derive
        // it from data_local_dir (~/Library/Application Support/vericap).
        let library = base
            .data_local_dir()
            .parent()
            .and_then(|p| p.parent())
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| base.data_local_dir().to_path_buf());
        library.join("Logs").join("vericap")
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        base.data_local_dir().join("logs")
    }
}

/// Ensures the log directory exists, creating it if necessary.
pub fn ensure_log_dir() -> Result<(), std::io::Error> {
    std::fs::create_dir_all(log_dir())
}
