//! IPC server for client-service communication.

mod handlers;
mod server;

pub use server::run_server;
