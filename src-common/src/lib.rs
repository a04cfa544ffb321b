//! VeriCap Common Library
//!
//! Shared types and IPC protocol for communication between the VeriCap
//! client frontends and the capture service.

pub mod constants;
pub mod ipc;
pub mod logging;
pub mod types;
pub mod validation;

pub use types::*;
