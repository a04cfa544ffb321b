//! IPC client for communicating with vericap-service.

use tokio::net::UnixStream;
use tokio::sync::Mutex;

use vericap_common::ipc::{read_json, write_json, Request, Response};

use crate::exit_codes::ExitCode;
use crate::platform;

/// Error type for service client operations.
#[derive(Debug, Clone)]
pub enum ServiceError {
    /// Connection to service failed
    ConnectionFailed(String),
    /// Failed to send request
    SendFailed(String),
    /// Failed to receive response
    ReceiveFailed(String),
    /// Service returned an error
    RemoteError(String),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            ServiceError::SendFailed(msg) => write!(f, "Send failed: {}", msg),
            ServiceError::ReceiveFailed(msg) => write!(f, "Receive failed: {}", msg),
            ServiceError::RemoteError(msg) => write!(f, "Service error: {}", msg),
        }
    }
}

impl std::error::Error for ServiceError {}

impl ServiceError {
    /// Convert to an appropriate exit code.
    pub fn to_exit_code(&self) -> ExitCode {
        match self {
            ServiceError::ConnectionFailed(_)
            | ServiceError::SendFailed(_)
            | ServiceError::ReceiveFailed(_) => ExitCode::ServiceConnectionFailed,
            ServiceError::RemoteError(msg) => {
                if msg.contains("access denied") || msg.contains("Camera access") {
                    ExitCode::PermissionDenied
                } else {
                    ExitCode::GeneralError
                }
            }
        }
    }
}

/// Client for communicating with the VeriCap service.
pub struct ServiceClient {
    connection: Mutex<Option<UnixStream>>,
}

impl ServiceClient {
    /// Create a new service client.
    pub fn new() -> Self {
        Self {
            connection: Mutex::new(None),
        }
    }

    /// Connect to a running service.
    pub async fn connect(&self) -> Result<(), ServiceError> {
        let socket_path = vericap_common::ipc::get_socket_path();
        let stream = UnixStream::connect(&socket_path)
            .await
            .map_err(|e| ServiceError::ConnectionFailed(format!("{}: {}", socket_path.display(), e)))?;

        let mut connection = self.connection.lock().await;
        *connection = Some(stream);
        Ok(())
    }

    /// Connect, spawning the service first if it isn't running.
    pub async fn connect_or_spawn(&self) -> Result<(), ServiceError> {
        if self.connect().await.is_ok() {
            return Ok(());
        }

        platform::spawn_service()
            .await
            .map_err(ServiceError::ConnectionFailed)?;

        self.connect().await
    }

    /// Send a request and await its response.
    ///
    /// `Response::Error` becomes `ServiceError::RemoteError`, so callers
    /// only see successful responses.
    pub async fn request(&self, request: Request) -> Result<Response, ServiceError> {
        let mut connection = self.connection.lock().await;
        let stream = connection
            .as_mut()
            .ok_or_else(|| ServiceError::ConnectionFailed("not connected".to_string()))?;

        write_json(stream, &request)
            .await
            .map_err(|e| ServiceError::SendFailed(e.to_string()))?;

        let response: Response = read_json(stream)
            .await
            .map_err(|e| ServiceError::ReceiveFailed(e.to_string()))?;

        match response {
            Response::Error { message } => Err(ServiceError::RemoteError(message)),
            other => Ok(other),
        }
    }
}

impl Default for ServiceClient {
    fn default() -> Self {
        Self::new()
    }
}
