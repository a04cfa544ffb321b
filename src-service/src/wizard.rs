//! Wizard flow context.
//!
//! One verification attempt's worth of state: the ordinal step the user is
//! on, what they selected, and the stills they confirmed. The context is an
//! explicit object owned by the flow manager and threaded through every
//! operation; nothing here is global.

use std::fmt;

use vericap_common::ipc::FlowSnapshot;
use vericap_common::{CaptureMode, FlowStep, VerificationResult, VerificationStatus};

use crate::capture::CapturedStill;

/// Error produced by an out-of-order wizard operation.
#[derive(Debug)]
pub enum FlowError {
    /// Operation not valid at the current step
    WrongStep { step: FlowStep, operation: String },
    /// A required input is missing (e.g. submitting without both stills)
    Missing(String),
}

impl fmt::Display for FlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowError::WrongStep { step, operation } => {
                write!(f, "cannot {} at step {:?}", operation, step)
            }
            FlowError::Missing(what) => write!(f, "missing {}", what),
        }
    }
}

impl std::error::Error for FlowError {}

/// State of one verification attempt.
#[derive(Default)]
pub struct FlowContext {
    step: FlowStep,
    document_type: Option<String>,
    country: Option<String>,
    document_still: Option<CapturedStill>,
    selfie_still: Option<CapturedStill>,
    status: VerificationStatus,
    result: Option<VerificationResult>,
}

impl FlowContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> FlowStep {
        self.step
    }

    pub fn status(&self) -> VerificationStatus {
        self.status
    }

    pub fn result(&self) -> Option<&VerificationResult> {
        self.result.as_ref()
    }

    /// The still confirmed for a capture mode, if any.
    pub fn still(&self, mode: CaptureMode) -> Option<&CapturedStill> {
        match mode {
            CaptureMode::DocumentSide => self.document_still.as_ref(),
            CaptureMode::Selfie => self.selfie_still.as_ref(),
        }
    }

    /// Snapshot for IPC reporting.
    pub fn snapshot(&self) -> FlowSnapshot {
        FlowSnapshot {
            step: self.step,
            document_type: self.document_type.clone(),
            country: self.country.clone(),
            has_document_still: self.document_still.is_some(),
            has_selfie_still: self.selfie_still.is_some(),
            status: self.status,
        }
    }

    /// Leave the landing page.
    pub fn begin(&mut self) -> Result<(), FlowError> {
        if self.step != FlowStep::Landing {
            return Err(FlowError::WrongStep {
                step: self.step,
                operation: "begin".to_string(),
            });
        }
        self.step = FlowStep::DocumentSelection;
        Ok(())
    }

    /// Record the document choice and move to preparation.
    pub fn select_document(&mut self, document_type: &str, country: &str) -> Result<(), FlowError> {
        if self.step != FlowStep::DocumentSelection {
            return Err(FlowError::WrongStep {
                step: self.step,
                operation: "select document".to_string(),
            });
        }
        self.document_type = Some(document_type.to_string());
        self.country = Some(country.to_string());
        self.step = FlowStep::DocumentPreparation;
        Ok(())
    }

    /// The capture step a mode belongs to, used to gate session opening.
    fn capture_step(mode: CaptureMode) -> (FlowStep, FlowStep) {
        match mode {
            CaptureMode::DocumentSide => (FlowStep::DocumentPreparation, FlowStep::DocumentCapture),
            CaptureMode::Selfie => (FlowStep::SelfiePreparation, FlowStep::SelfieCapture),
        }
    }

    /// Enter the capture step for a mode.
    ///
    /// Allowed from that mode's preparation page, or from the capture step
    /// itself (a reopened session after close/denial).
    pub fn enter_capture(&mut self, mode: CaptureMode) -> Result<(), FlowError> {
        let (preparation, capture) = Self::capture_step(mode);
        if self.step != preparation && self.step != capture {
            return Err(FlowError::WrongStep {
                step: self.step,
                operation: format!("open {:?} capture", mode),
            });
        }
        self.step = capture;
        Ok(())
    }

    /// Store a confirmed still and advance to the next page.
    pub fn attach_still(&mut self, mode: CaptureMode, still: CapturedStill) -> Result<(), FlowError> {
        let (_, capture) = Self::capture_step(mode);
        if self.step != capture {
            return Err(FlowError::WrongStep {
                step: self.step,
                operation: format!("attach {:?} still", mode),
            });
        }
        match mode {
            CaptureMode::DocumentSide => {
                self.document_still = Some(still);
                self.step = FlowStep::SelfiePreparation;
            }
            CaptureMode::Selfie => {
                self.selfie_still = Some(still);
                self.step = FlowStep::Processing;
            }
        }
        Ok(())
    }

    /// Both stills, as required for submission.
    pub fn submission_payload(&self) -> Result<(&CapturedStill, &CapturedStill), FlowError> {
        if self.step != FlowStep::Processing {
            return Err(FlowError::WrongStep {
                step: self.step,
                operation: "submit".to_string(),
            });
        }
        let document = self
            .document_still
            .as_ref()
            .ok_or_else(|| FlowError::Missing("document still".to_string()))?;
        let selfie = self
            .selfie_still
            .as_ref()
            .ok_or_else(|| FlowError::Missing("selfie still".to_string()))?;
        Ok((document, selfie))
    }

    /// Record the backend's verdict and finish the flow.
    pub fn complete(&mut self, result: VerificationResult) {
        self.status = if result.document_valid {
            VerificationStatus::Verified
        } else {
            VerificationStatus::Failed
        };
        self.result = Some(result);
        self.step = FlowStep::Complete;
    }

    /// Step back one page, where that makes sense.
    pub fn back(&mut self) -> Result<(), FlowError> {
        match self.step.previous() {
            Some(previous) => {
                self.step = previous;
                Ok(())
            }
            None => Err(FlowError::WrongStep {
                step: self.step,
                operation: "step back".to_string(),
            }),
        }
    }

    /// Abandon everything and return to the landing page.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vericap_common::StillShape;

    fn still() -> CapturedStill {
        CapturedStill {
            width: 4,
            height: 4,
            shape: StillShape::Rectangular,
            pixels: vec![255; 64],
            jpeg: vec![0xFF, 0xD8, 0xFF, 0xD9],
        }
    }

    fn result(valid: bool) -> VerificationResult {
        VerificationResult {
            document_valid: valid,
            ..Default::default()
        }
    }

    #[test]
    fn happy_path_walks_every_step() {
        let mut flow = FlowContext::new();
        assert_eq!(flow.step(), FlowStep::Landing);

        flow.begin().unwrap();
        flow.select_document("passport", "IN").unwrap();
        assert_eq!(flow.step(), FlowStep::DocumentPreparation);

        flow.enter_capture(CaptureMode::DocumentSide).unwrap();
        flow.attach_still(CaptureMode::DocumentSide, still()).unwrap();
        assert_eq!(flow.step(), FlowStep::SelfiePreparation);

        flow.enter_capture(CaptureMode::Selfie).unwrap();
        flow.attach_still(CaptureMode::Selfie, still()).unwrap();
        assert_eq!(flow.step(), FlowStep::Processing);

        assert!(flow.submission_payload().is_ok());
        flow.complete(result(true));
        assert_eq!(flow.step(), FlowStep::Complete);
        assert_eq!(flow.status(), VerificationStatus::Verified);
    }

    #[test]
    fn rejected_document_fails_the_flow() {
        let mut flow = FlowContext::new();
        flow.begin().unwrap();
        flow.select_document("pan-card", "IN").unwrap();
        flow.enter_capture(CaptureMode::DocumentSide).unwrap();
        flow.attach_still(CaptureMode::DocumentSide, still()).unwrap();
        flow.enter_capture(CaptureMode::Selfie).unwrap();
        flow.attach_still(CaptureMode::Selfie, still()).unwrap();

        flow.complete(result(false));
        assert_eq!(flow.status(), VerificationStatus::Failed);
    }

    #[test]
    fn out_of_order_operations_are_refused() {
        let mut flow = FlowContext::new();

        assert!(matches!(
            flow.select_document("passport", "IN"),
            Err(FlowError::WrongStep { .. })
        ));
        assert!(matches!(
            flow.enter_capture(CaptureMode::Selfie),
            Err(FlowError::WrongStep { .. })
        ));
        assert!(matches!(
            flow.submission_payload(),
            Err(FlowError::WrongStep { .. })
        ));

        // Selfie before the document is blocked by the step ordering.
        flow.begin().unwrap();
        flow.select_document("passport", "IN").unwrap();
        assert!(flow.enter_capture(CaptureMode::Selfie).is_err());
    }

    #[test]
    fn capture_step_can_be_reentered() {
        let mut flow = FlowContext::new();
        flow.begin().unwrap();
        flow.select_document("passport", "IN").unwrap();
        flow.enter_capture(CaptureMode::DocumentSide).unwrap();
        // e.g. session closed after a permission denial, then reopened
        flow.enter_capture(CaptureMode::DocumentSide).unwrap();
        assert_eq!(flow.step(), FlowStep::DocumentCapture);
    }

    #[test]
    fn back_and_reset() {
        let mut flow = FlowContext::new();
        flow.begin().unwrap();
        flow.select_document("passport", "ES").unwrap();
        flow.back().unwrap();
        assert_eq!(flow.step(), FlowStep::DocumentSelection);

        flow.reset();
        assert_eq!(flow.step(), FlowStep::Landing);
        assert!(flow.snapshot().document_type.is_none());

        let mut at_landing = FlowContext::new();
        assert!(at_landing.back().is_err());
    }
}
