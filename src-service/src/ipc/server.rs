//! IPC server with secure socket setup.

use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixListener;
use tracing::{error, info, warn};

use std::os::unix::fs::PermissionsExt;

use vericap_common::ipc::{get_socket_path, read_json, write_json, IpcError, Request, Response};

use crate::state::FlowManager;

use super::handlers::handle_request;

/// Socket file permissions (owner read/write only)
const SOCKET_MODE: u32 = 0o600;

/// Socket directory permissions (owner read/write/execute only)
const DIRECTORY_MODE: u32 = 0o700;

/// Create socket directory with secure permissions.
fn create_secure_socket_dir(socket_path: &Path) -> std::io::Result<()> {
    let socket_dir = socket_path
        .parent()
        .expect("Socket must have parent directory");

    std::fs::create_dir_all(socket_dir)?;
    std::fs::set_permissions(socket_dir, std::fs::Permissions::from_mode(DIRECTORY_MODE))?;

    // Remove stale socket if exists
    if socket_path.exists() {
        std::fs::remove_file(socket_path)?;
    }

    Ok(())
}

/// Set socket file permissions after binding.
fn secure_socket_file(socket_path: &Path) -> std::io::Result<()> {
    std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(SOCKET_MODE))?;

    let actual = std::fs::metadata(socket_path)?.permissions().mode() & 0o777;
    if actual != SOCKET_MODE {
        warn!("Socket mode is {:o}, expected {:o}", actual, SOCKET_MODE);
    }

    Ok(())
}

/// Handle a single client connection.
async fn handle_client<S>(state: Arc<FlowManager>, mut stream: S)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    info!("Client connected");

    loop {
        // Read request
        let request: Request = match read_json(&mut stream).await {
            Ok(req) => req,
            Err(IpcError::ConnectionClosed) => {
                info!("Client disconnected");
                break;
            }
            Err(e) => {
                error!("Error reading request: {}", e);
                break;
            }
        };

        // Validate request parameters before dispatch
        if let Err(e) = request.validate() {
            warn!("Invalid request: {}", e);
            let response = Response::error(format!("Invalid request: {}", e));
            if let Err(e) = write_json(&mut stream, &response).await {
                error!("Error writing response: {}", e);
                break;
            }
            continue;
        }

        let response = handle_request(&state, request).await;

        if let Err(e) = write_json(&mut stream, &response).await {
            error!("Error writing response: {}", e);
            break;
        }
    }
}

/// Run the IPC server until shutdown is requested.
pub async fn run_server(state: Arc<FlowManager>) -> Result<(), String> {
    let socket_path = get_socket_path();

    create_secure_socket_dir(&socket_path)
        .map_err(|e| format!("Failed to prepare socket directory: {}", e))?;

    let listener = UnixListener::bind(&socket_path)
        .map_err(|e| format!("Failed to bind {}: {}", socket_path.display(), e))?;

    secure_socket_file(&socket_path)
        .map_err(|e| format!("Failed to secure socket file: {}", e))?;

    info!("IPC server listening on {}", socket_path.display());

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _addr)) => {
                        let state = Arc::clone(&state);
                        tokio::spawn(async move {
                            handle_client(state, stream).await;
                        });
                    }
                    Err(e) => {
                        error!("Accept failed: {}", e);
                    }
                }
            }
            _ = crate::shutdown_requested() => {
                info!("IPC server shutting down");
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{ContrastDetector, SimCamera};
    use crate::verify::VerifyClient;
    use vericap_common::ipc::FlowSnapshot;
    use vericap_common::FlowStep;

    fn state() -> Arc<FlowManager> {
        Arc::new(FlowManager::new(
            Arc::new(SimCamera::new()),
            Arc::new(ContrastDetector::new()),
            VerifyClient::new("https://kyc.invalid", None),
        ))
    }

    async fn roundtrip(
        client: &mut tokio::io::DuplexStream,
        request: &Request,
    ) -> Response {
        write_json(client, request).await.unwrap();
        read_json(client).await.unwrap()
    }

    // Drive the request loop over an in-memory duplex pipe.
    #[tokio::test]
    async fn client_loop_answers_requests() {
        let state = state();
        let (mut client, server) = tokio::io::duplex(vericap_common::ipc::MAX_MESSAGE_SIZE * 2);
        let server_task = tokio::spawn(handle_client(state, server));

        match roundtrip(&mut client, &Request::Ping).await {
            Response::Pong => {}
            other => panic!("unexpected response: {:?}", other),
        }

        match roundtrip(&mut client, &Request::ListDocumentTypes).await {
            Response::DocumentTypes { types } => assert_eq!(types.len(), 4),
            other => panic!("unexpected response: {:?}", other),
        }

        match roundtrip(&mut client, &Request::BeginFlow).await {
            Response::FlowState(FlowSnapshot { step, .. }) => {
                assert_eq!(step, FlowStep::DocumentSelection)
            }
            other => panic!("unexpected response: {:?}", other),
        }

        // Invalid parameters are rejected without dropping the connection.
        let bad = Request::SelectDocument {
            document_type: "zine".to_string(),
            country: "IN".to_string(),
        };
        match roundtrip(&mut client, &bad).await {
            Response::Error { message } => assert!(message.contains("Invalid request")),
            other => panic!("unexpected response: {:?}", other),
        }

        match roundtrip(&mut client, &Request::Ping).await {
            Response::Pong => {}
            other => panic!("unexpected response: {:?}", other),
        }

        drop(client);
        server_task.await.unwrap();
    }
}
