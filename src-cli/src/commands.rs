//! CLI command implementations.
//!
//! Each command renders one slice of the verification wizard in the
//! terminal: the catalogs, the capture screens (with live countdown and
//! readiness feedback), and the final result screen.

use std::time::Duration;
use tokio::time::Instant;

use vericap_common::ipc::{Request, Response};
use vericap_common::{
    CaptureMode, FitMode, SessionPhase, VerificationResult, ViewportLayout,
};

use crate::client::{ServiceClient, ServiceError};
use crate::colors;
use crate::exit_codes::ExitCode;

/// Session polling interval while a capture screen is active.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Options shared by the capture commands.
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// Simulated on-screen video box, display pixels
    pub width: f64,
    pub height: f64,
    pub fit: FitMode,
    /// Retake this many times before confirming
    pub retakes: u32,
    /// Give up after this many seconds
    pub timeout_secs: u64,
}

impl CaptureOptions {
    fn viewport(&self) -> ViewportLayout {
        ViewportLayout {
            width: self.width,
            height: self.height,
            fit: self.fit,
        }
    }
}

async fn connected_client(quiet: bool) -> Result<ServiceClient, ExitCode> {
    let client = ServiceClient::new();
    if let Err(e) = client.connect_or_spawn().await {
        if !quiet {
            eprintln!("{}", colors::error(&e.to_string()));
        }
        return Err(e.to_exit_code());
    }
    Ok(client)
}

fn report(error: &ServiceError, quiet: bool) -> ExitCode {
    if !quiet {
        eprintln!("{}", colors::error(&error.to_string()));
    }
    error.to_exit_code()
}

fn unexpected(response: &Response, quiet: bool) -> ExitCode {
    if !quiet {
        eprintln!(
            "{}",
            colors::error(&format!("Unexpected response: {:?}", response))
        );
    }
    ExitCode::GeneralError
}

/// List accepted document types.
pub async fn list_types(json: bool, quiet: bool) -> ExitCode {
    let client = match connected_client(quiet).await {
        Ok(client) => client,
        Err(code) => return code,
    };

    match client.request(Request::ListDocumentTypes).await {
        Ok(Response::DocumentTypes { types }) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&types).unwrap());
            } else {
                let id_width = types.iter().map(|t| t.id.len()).max().unwrap_or(2).max(2);
                println!(
                    "{}  {}",
                    colors::pad_left("ID", id_width, colors::header),
                    colors::header("DESCRIPTION")
                );
                for doc in types {
                    println!(
                        "{}  {}  {}",
                        colors::pad_left(&doc.id, id_width, colors::number),
                        doc.label,
                        colors::dim(&doc.description),
                    );
                }
            }
            ExitCode::Success
        }
        Ok(other) => unexpected(&other, quiet),
        Err(e) => report(&e, quiet),
    }
}

/// List supported countries.
pub async fn list_countries(json: bool, quiet: bool) -> ExitCode {
    let client = match connected_client(quiet).await {
        Ok(client) => client,
        Err(code) => return code,
    };

    match client.request(Request::ListCountries).await {
        Ok(Response::Countries { countries }) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&countries).unwrap());
            } else {
                for country in countries {
                    println!("{}  {}", colors::number(&country.code), country.name);
                }
            }
            ExitCode::Success
        }
        Ok(other) => unexpected(&other, quiet),
        Err(e) => report(&e, quiet),
    }
}

/// Show wizard and session state.
pub async fn status(json: bool, quiet: bool) -> ExitCode {
    let client = match connected_client(quiet).await {
        Ok(client) => client,
        Err(code) => return code,
    };

    let flow = match client.request(Request::GetFlowState).await {
        Ok(Response::FlowState(flow)) => flow,
        Ok(other) => return unexpected(&other, quiet),
        Err(e) => return report(&e, quiet),
    };
    let session = match client.request(Request::GetSessionState).await {
        Ok(Response::SessionState(snapshot)) => Some(snapshot),
        Ok(Response::NoSession) => None,
        Ok(other) => return unexpected(&other, quiet),
        Err(e) => return report(&e, quiet),
    };

    if json {
        let combined = serde_json::json!({ "flow": flow, "session": session });
        println!("{}", serde_json::to_string_pretty(&combined).unwrap());
        return ExitCode::Success;
    }

    println!(
        "{} {} ({}/7)",
        colors::header("Step:"),
        flow.step.display_name(),
        flow.step.ordinal()
    );
    if let Some(doc) = &flow.document_type {
        println!(
            "{} {} ({})",
            colors::header("Document:"),
            doc,
            flow.country.as_deref().unwrap_or("?")
        );
    }
    println!(
        "{} document {}, selfie {}",
        colors::header("Stills:"),
        if flow.has_document_still { "✓" } else { "—" },
        if flow.has_selfie_still { "✓" } else { "—" },
    );
    println!("{} {:?}", colors::header("Status:"), flow.status);

    match session {
        Some(snapshot) => {
            println!("{} {:?}", colors::header("Session:"), snapshot.phase);
            if let Some((w, h)) = snapshot.intrinsic {
                println!("{} {}x{}", colors::header("Camera:"), w, h);
            }
            if snapshot.document_ready {
                println!("{}", colors::success("Document framed"));
            }
            if let Some(tick) = snapshot.countdown {
                println!("{} {}", colors::header("Countdown:"), tick);
            }
        }
        None => println!("{}", colors::dim("No capture session open")),
    }

    ExitCode::Success
}

/// Leave the landing page.
pub async fn begin(quiet: bool) -> ExitCode {
    simple_flow_request(Request::BeginFlow, "Flow started", quiet).await
}

/// Choose document type and country.
pub async fn select(document_type: &str, country: &str, quiet: bool) -> ExitCode {
    simple_flow_request(
        Request::SelectDocument {
            document_type: document_type.to_string(),
            country: country.to_string(),
        },
        "Document selected",
        quiet,
    )
    .await
}

/// Abandon the flow.
pub async fn reset(quiet: bool) -> ExitCode {
    simple_flow_request(Request::ResetFlow, "Flow reset", quiet).await
}

async fn simple_flow_request(request: Request, done: &str, quiet: bool) -> ExitCode {
    let client = match connected_client(quiet).await {
        Ok(client) => client,
        Err(code) => return code,
    };
    match client.request(request).await {
        Ok(Response::FlowState(flow)) => {
            if !quiet {
                println!(
                    "{} {}",
                    colors::success(done),
                    colors::dim(&format!("(step: {})", flow.step.display_name()))
                );
            }
            ExitCode::Success
        }
        Ok(other) => unexpected(&other, quiet),
        Err(e) => report(&e, quiet),
    }
}

/// Drive one capture session to a confirmed still.
pub async fn capture(mode: CaptureMode, options: &CaptureOptions, quiet: bool) -> ExitCode {
    let client = match connected_client(quiet).await {
        Ok(client) => client,
        Err(code) => return code,
    };
    run_capture(&client, mode, options, quiet).await
}

async fn run_capture(
    client: &ServiceClient,
    mode: CaptureMode,
    options: &CaptureOptions,
    quiet: bool,
) -> ExitCode {
    match client
        .request(Request::OpenSession {
            mode,
            viewport: options.viewport(),
        })
        .await
    {
        Ok(Response::Ok) => {}
        Ok(other) => return unexpected(&other, quiet),
        Err(e) => return report(&e, quiet),
    }

    let deadline = Instant::now() + Duration::from_secs(options.timeout_secs);
    let mut last_phase: Option<SessionPhase> = None;
    let mut last_tick: Option<u8> = None;
    let mut capture_sent = false;
    let mut retakes_left = options.retakes;

    loop {
        if Instant::now() > deadline {
            if !quiet {
                eprintln!("{}", colors::error("capture timed out"));
            }
            let _ = client.request(Request::CloseSession).await;
            return ExitCode::CaptureFailed;
        }

        let snapshot = match client.request(Request::GetSessionState).await {
            Ok(Response::SessionState(snapshot)) => snapshot,
            Ok(Response::NoSession) => {
                if !quiet {
                    eprintln!("{}", colors::error("session disappeared"));
                }
                return ExitCode::CaptureFailed;
            }
            Ok(other) => return unexpected(&other, quiet),
            Err(e) => return report(&e, quiet),
        };

        if last_phase != Some(snapshot.phase) {
            last_phase = Some(snapshot.phase);
            if !quiet {
                println!("{}", colors::info(&format!("{:?}", snapshot.phase)));
            }
        }
        if snapshot.countdown != last_tick {
            last_tick = snapshot.countdown;
            if let (Some(tick), false) = (snapshot.countdown, quiet) {
                println!("{}", colors::number(&format!("  {}...", tick)));
            }
        }

        match snapshot.phase {
            SessionPhase::Live => {
                if mode == CaptureMode::DocumentSide && snapshot.document_ready && !capture_sent {
                    match client.request(Request::Capture).await {
                        Ok(Response::StillCaptured { width, height, .. }) => {
                            capture_sent = true;
                            if !quiet {
                                println!(
                                    "{}",
                                    colors::success(&format!("Captured {}x{}", width, height))
                                );
                            }
                        }
                        // Readiness can lapse between poll and capture;
                        // keep polling and try again.
                        Err(ServiceError::RemoteError(msg)) if msg.contains("Not ready") => {}
                        Ok(other) => return unexpected(&other, quiet),
                        Err(e) => return report(&e, quiet),
                    }
                }
            }
            SessionPhase::Reviewing => {
                if retakes_left > 0 {
                    retakes_left -= 1;
                    capture_sent = false;
                    if !quiet {
                        println!("{}", colors::info("Retaking..."));
                    }
                    match client.request(Request::Retake).await {
                        Ok(Response::Ok) => {}
                        Ok(other) => return unexpected(&other, quiet),
                        Err(e) => return report(&e, quiet),
                    }
                } else {
                    return match client.request(Request::Confirm).await {
                        Ok(Response::FlowState(flow)) => {
                            if !quiet {
                                println!(
                                    "{} {}",
                                    colors::success("Still confirmed"),
                                    colors::dim(&format!(
                                        "(next: {})",
                                        flow.step.display_name()
                                    ))
                                );
                            }
                            ExitCode::Success
                        }
                        Ok(other) => unexpected(&other, quiet),
                        Err(e) => report(&e, quiet),
                    };
                }
            }
            SessionPhase::PermissionDenied => {
                if !quiet {
                    eprintln!(
                        "{}",
                        colors::error(
                            "Camera access is required. Allow camera permissions and try again."
                        )
                    );
                }
                let _ = client.request(Request::CloseSession).await;
                return ExitCode::PermissionDenied;
            }
            SessionPhase::Closed => {
                if !quiet {
                    eprintln!("{}", colors::error("session closed unexpectedly"));
                }
                return ExitCode::CaptureFailed;
            }
            _ => {}
        }

        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Save a confirmed still's preview to disk (or report its size).
pub async fn preview(mode: CaptureMode, output: Option<&std::path::Path>, quiet: bool) -> ExitCode {
    use base64::{engine::general_purpose::STANDARD, Engine};

    let client = match connected_client(quiet).await {
        Ok(client) => client,
        Err(code) => return code,
    };

    match client.request(Request::GetStillPreview { mode }).await {
        Ok(Response::Preview {
            data,
            width,
            height,
        }) => {
            let bytes = match STANDARD.decode(&data) {
                Ok(bytes) => bytes,
                Err(e) => {
                    if !quiet {
                        eprintln!("{}", colors::error(&format!("bad preview payload: {}", e)));
                    }
                    return ExitCode::GeneralError;
                }
            };
            match output {
                Some(path) => {
                    if let Err(e) = std::fs::write(path, &bytes) {
                        if !quiet {
                            eprintln!("{}", colors::error(&e.to_string()));
                        }
                        return ExitCode::GeneralError;
                    }
                    if !quiet {
                        println!(
                            "{}",
                            colors::success(&format!(
                                "Wrote {}x{} preview to {}",
                                width,
                                height,
                                path.display()
                            ))
                        );
                    }
                }
                None => {
                    println!("{}x{} JPEG, {} bytes", width, height, bytes.len());
                }
            }
            ExitCode::Success
        }
        Ok(other) => unexpected(&other, quiet),
        Err(e) => report(&e, quiet),
    }
}

/// Submit both stills and render the result screen.
pub async fn submit(json: bool, quiet: bool) -> ExitCode {
    let client = match connected_client(quiet).await {
        Ok(client) => client,
        Err(code) => return code,
    };
    submit_with(&client, json, quiet).await
}

/// Re-render the result screen of a completed verification.
pub async fn result(json: bool, quiet: bool) -> ExitCode {
    let client = match connected_client(quiet).await {
        Ok(client) => client,
        Err(code) => return code,
    };
    match client.request(Request::GetResult).await {
        Ok(Response::VerificationOutcome { result }) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&result).unwrap());
            } else {
                render_result(&result);
            }
            ExitCode::Success
        }
        Ok(other) => unexpected(&other, quiet),
        Err(e) => report(&e, quiet),
    }
}

/// Run the whole wizard in one go: select, capture both, submit.
pub async fn run_flow(
    document_type: &str,
    country: &str,
    options: &CaptureOptions,
    json: bool,
    quiet: bool,
) -> ExitCode {
    let client = match connected_client(quiet).await {
        Ok(client) => client,
        Err(code) => return code,
    };

    for request in [
        Request::ResetFlow,
        Request::BeginFlow,
        Request::SelectDocument {
            document_type: document_type.to_string(),
            country: country.to_string(),
        },
    ] {
        match client.request(request).await {
            Ok(Response::FlowState(_)) => {}
            Ok(other) => return unexpected(&other, quiet),
            Err(e) => return report(&e, quiet),
        }
    }

    if !quiet {
        println!("{}", colors::header("Document photo"));
    }
    let code = run_capture(&client, CaptureMode::DocumentSide, options, quiet).await;
    if code != ExitCode::Success {
        return code;
    }

    if !quiet {
        println!("{}", colors::header("Selfie capture"));
    }
    let code = run_capture(&client, CaptureMode::Selfie, options, quiet).await;
    if code != ExitCode::Success {
        return code;
    }

    submit_with(&client, json, quiet).await
}

async fn submit_with(client: &ServiceClient, json: bool, quiet: bool) -> ExitCode {
    if !quiet && !json {
        println!("{}", colors::info("Submitting for verification..."));
    }
    match client.request(Request::Submit).await {
        Ok(Response::VerificationOutcome { result }) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&result).unwrap());
            } else {
                render_result(&result);
            }
            if result.document_valid {
                ExitCode::Success
            } else {
                ExitCode::DocumentRejected
            }
        }
        Ok(other) => unexpected(&other, quiet),
        Err(e) => {
            if !quiet {
                eprintln!("{}", colors::error(&e.to_string()));
            }
            ExitCode::SubmissionFailed
        }
    }
}

/// Ask the service to exit.
pub async fn shutdown(quiet: bool) -> ExitCode {
    let client = ServiceClient::new();
    if client.connect().await.is_err() {
        if !quiet {
            println!("{}", colors::dim("Service is not running."));
        }
        return ExitCode::Success;
    }
    match client.request(Request::Shutdown).await {
        Ok(Response::Ok) => {
            if !quiet {
                println!("{}", colors::success("Service shutting down"));
            }
            ExitCode::Success
        }
        Ok(other) => unexpected(&other, quiet),
        Err(e) => report(&e, quiet),
    }
}

/// The result screen.
fn render_result(result: &VerificationResult) {
    println!();
    if result.document_valid {
        println!("{}", colors::success("✓ Verification successful"));
    } else {
        println!("{}", colors::failure("✗ Verification failed"));
    }
    println!();

    if let Some(id_type) = &result.id_type {
        println!("{} {}", colors::header("Document type:"), id_type);
    }
    let doc_number = result
        .field("DocumentNumber")
        .map(str::to_string)
        .or_else(|| result.document_number.clone());
    if let Some(number) = doc_number {
        println!("{} {}", colors::header("Document number:"), number);
    }

    let mut fields: Vec<_> = result
        .extracted_fields
        .iter()
        .map(|(name, field)| (name.as_str(), field.value.as_str()))
        .collect();
    fields.sort();
    if !fields.is_empty() {
        println!();
        println!("{}", colors::header("Extracted fields"));
        let name_width = fields.iter().map(|(n, _)| n.len()).max().unwrap_or(4);
        for (name, value) in fields {
            println!("  {}  {}", colors::pad_left(name, name_width, colors::dim), value);
        }
    }

    println!();
    match result.face_match_confidence {
        Some(confidence) => {
            let pct = (confidence * 100.0).round() as i64;
            let label = format!(
                "{}% ({})",
                pct,
                confidence_bucket(pct)
            );
            let styled = match confidence_bucket(pct) {
                "strong" => colors::success(&label),
                "fair" => colors::info(&label),
                "weak" => colors::warning(&label),
                _ => colors::failure(&label),
            };
            println!(
                "{} {}, {}",
                colors::header("Face match:"),
                if result.is_face_match { "yes" } else { "no" },
                styled
            );
        }
        None => println!("{} {}", colors::header("Face match:"), colors::dim("N/A")),
    }

    if let Some(url) = &result.id_blob_url {
        println!("{}", colors::dim(&format!("Document image: {}", url)));
    }
    if let Some(url) = &result.selfie_blob_url {
        println!("{}", colors::dim(&format!("Selfie image: {}", url)));
    }
}

/// Bucket a face-match percentage the way the result page grades it.
fn confidence_bucket(pct: i64) -> &'static str {
    if pct >= 80 {
        "strong"
    } else if pct >= 60 {
        "fair"
    } else if pct >= 40 {
        "weak"
    } else {
        "poor"
    }
}
