//! VeriCap Background Service
//!
//! Owns the identity-verification capture flow: camera sessions, the
//! geometry engine, wizard state, and submission to the verification
//! backend. Frontends talk to it over the Unix-socket IPC protocol.

mod artifacts;
mod capture;
mod ipc;
mod state;
mod verify;
mod wizard;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::Notify;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use capture::{ContrastDetector, SimCamera};
use state::FlowManager;
use verify::VerifyClient;

/// Global shutdown signal
static SHUTDOWN_FLAG: AtomicBool = AtomicBool::new(false);
static SHUTDOWN_NOTIFY: OnceLock<Notify> = OnceLock::new();

fn shutdown_notify() -> &'static Notify {
    SHUTDOWN_NOTIFY.get_or_init(Notify::new)
}

/// Request service shutdown.
pub fn request_shutdown() {
    info!("Shutdown requested");
    SHUTDOWN_FLAG.store(true, Ordering::SeqCst);
    shutdown_notify().notify_waiters();
}

/// Check if shutdown has been requested.
pub fn is_shutdown_requested() -> bool {
    SHUTDOWN_FLAG.load(Ordering::SeqCst)
}

/// Wait until shutdown is requested.
pub async fn shutdown_requested() {
    let notified = shutdown_notify().notified();
    tokio::pin!(notified);
    notified.as_mut().enable();
    if is_shutdown_requested() {
        return;
    }
    notified.await;
}

fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match vericap_common::logging::ensure_log_dir() {
        Ok(()) => {
            let appender = tracing_appender::rolling::daily(
                vericap_common::logging::log_dir(),
                "vericap-service.log",
            );
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            Some((fmt::layer().with_ansi(false).with_writer(non_blocking), guard))
        }
        Err(e) => {
            eprintln!("Warning: no log directory available: {}", e);
            None
        }
    };

    match file_layer {
        Some((layer, guard)) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer())
                .with(layer)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer())
                .init();
            None
        }
    }
}

fn main() {
    // Hold the appender guard so buffered log lines flush on exit
    let _log_guard = init_logging();

    info!("VeriCap Service starting (pid: {})...", std::process::id());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create Tokio runtime");

    runtime.block_on(async {
        setup_signal_handlers();

        let verifier = VerifyClient::from_env();
        info!("Verification backend: {}", verifier.base_url());

        // VERICAP_DENY_CAMERA=1 exercises the permission-denied path
        let camera: Arc<dyn capture::CameraBackend> =
            if std::env::var("VERICAP_DENY_CAMERA").is_ok() {
                warn!("Camera access will be denied (VERICAP_DENY_CAMERA set)");
                Arc::new(SimCamera::denied())
            } else {
                Arc::new(SimCamera::new())
            };

        let manager = Arc::new(FlowManager::new(
            camera,
            Arc::new(ContrastDetector::new()),
            verifier,
        ));

        if let Err(e) = ipc::run_server(manager).await {
            if !is_shutdown_requested() {
                error!("IPC server error: {}", e);
                std::process::exit(1);
            }
        }
    });

    cleanup_on_shutdown();
    info!("VeriCap Service stopped");
}

/// Set up signal handlers for graceful shutdown.
fn setup_signal_handlers() {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async {
        let mut sigterm = signal(SignalKind::terminate()).expect("SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("SIGINT handler");
        let mut sighup = signal(SignalKind::hangup()).expect("SIGHUP handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
            _ = sighup.recv() => {
                info!("Received SIGHUP");
            }
        }

        request_shutdown();
    });
}

/// Cleanup resources on shutdown.
fn cleanup_on_shutdown() {
    let socket_path = vericap_common::ipc::get_socket_path();
    if socket_path.exists() {
        if let Err(e) = std::fs::remove_file(&socket_path) {
            warn!("Failed to remove socket file: {}", e);
        } else {
            info!("Removed socket file: {:?}", socket_path);
        }
    }
}
