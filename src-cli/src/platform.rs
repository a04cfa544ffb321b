//! Locating and spawning the background service.

use std::path::PathBuf;
use std::time::Duration;

/// How long to wait for the freshly spawned service's socket.
const SPAWN_WAIT: Duration = Duration::from_millis(250);
const SPAWN_ATTEMPTS: u32 = 20;

/// Find the service binary: next to this executable first, then on PATH.
fn find_service_binary() -> Option<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("vericap-service");
            if sibling.is_file() {
                return Some(sibling);
            }
        }
    }
    which::which("vericap-service").ok()
}

/// Spawn the service detached and wait for its socket to appear.
pub async fn spawn_service() -> Result<(), String> {
    let binary = find_service_binary()
        .ok_or_else(|| "vericap-service not found next to the CLI or on PATH".to_string())?;

    std::process::Command::new(&binary)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| format!("failed to start {}: {}", binary.display(), e))?;

    let socket_path = vericap_common::ipc::get_socket_path();
    for _ in 0..SPAWN_ATTEMPTS {
        if socket_path.exists() {
            return Ok(());
        }
        tokio::time::sleep(SPAWN_WAIT).await;
    }

    Err(format!(
        "service started but {} never appeared",
        socket_path.display()
    ))
}
