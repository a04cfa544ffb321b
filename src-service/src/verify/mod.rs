//! Verification backend collaborator.

mod client;

pub use client::{VerifyClient, VerifyError};
