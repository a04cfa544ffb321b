//! HTTP client for the remote verification backend.
//!
//! Submits both encoded stills as a single multipart request and hands the
//! structured result back untouched; interpreting it is the frontend's job.

use reqwest::multipart::{Form, Part};
use std::fmt;
use std::time::Duration;
use tracing::info;

use vericap_common::VerificationResult;

use crate::capture::CapturedStill;

/// Default backend base URL, overridable via `VERICAP_BASE_URL`.
const DEFAULT_BASE_URL: &str =
    "https://kycv1-ashjgwdweacxcrfn.canadacentral-01.azurewebsites.net";

/// Submission endpoint, relative to the base URL.
const VERIFY_PATH: &str = "/verify_identity";

/// Overall request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Error type for verification submissions.
#[derive(Debug)]
pub enum VerifyError {
    /// Transport-level failure (connect, timeout, TLS)
    Transport(String),
    /// Backend answered with a non-success status
    Status { code: u16, body: String },
    /// Response body was not a valid result payload
    Decode(String),
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyError::Transport(msg) => write!(f, "verification request failed: {}", msg),
            VerifyError::Status { code, body } => {
                write!(f, "verification backend returned {}: {}", code, body)
            }
            VerifyError::Decode(msg) => write!(f, "unreadable verification response: {}", msg),
        }
    }
}

impl std::error::Error for VerifyError {}

/// Client for the identity-verification backend.
pub struct VerifyClient {
    http: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl VerifyClient {
    pub fn new(base_url: impl Into<String>, auth_token: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");
        Self {
            http,
            base_url: normalize_base_url(base_url.into()),
            auth_token,
        }
    }

    /// Build a client from `VERICAP_BASE_URL` / `VERICAP_AUTH_TOKEN`.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("VERICAP_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let auth_token = std::env::var("VERICAP_AUTH_TOKEN").ok();
        Self::new(base_url, auth_token)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submit both stills and return the backend's structured verdict.
    pub async fn submit(
        &self,
        document: &CapturedStill,
        selfie: &CapturedStill,
    ) -> Result<VerificationResult, VerifyError> {
        let form = Form::new()
            .part("id_file", jpeg_part(document, "document.jpg")?)
            .part("selfie_file", jpeg_part(selfie, "selfie.jpg")?);

        let url = format!("{}{}", self.base_url, VERIFY_PATH);
        info!(
            "submitting verification: document {} bytes, selfie {} bytes",
            document.jpeg.len(),
            selfie.jpeg.len()
        );

        let mut request = self
            .http
            .post(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .multipart(form);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| VerifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VerifyError::Status {
                code: status.as_u16(),
                body,
            });
        }

        response
            .json::<VerificationResult>()
            .await
            .map_err(|e| VerifyError::Decode(e.to_string()))
    }
}

fn jpeg_part(still: &CapturedStill, filename: &str) -> Result<Part, VerifyError> {
    Part::bytes(still.jpeg.clone())
        .file_name(filename.to_string())
        .mime_str("image/jpeg")
        .map_err(|e| VerifyError::Decode(e.to_string()))
}

fn normalize_base_url(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let client = VerifyClient::new("https://kyc.example/", None);
        assert_eq!(client.base_url(), "https://kyc.example");

        let client = VerifyClient::new("https://kyc.example", None);
        assert_eq!(client.base_url(), "https://kyc.example");
    }

    #[test]
    fn default_base_url_is_well_formed() {
        assert!(DEFAULT_BASE_URL.starts_with("https://"));
        assert!(!DEFAULT_BASE_URL.ends_with('/'));
    }
}
