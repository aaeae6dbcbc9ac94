//! Three-step upload wizard: Intake → Verify → Success.
//!
//! The wizard owns the session draft and drives a `VerificationBackend`. Every
//! mutating operation takes `&mut self`, so at most one backend call is in flight.
//! Failures set a single user-facing error and leave the step unchanged.

use crate::backend::VerificationBackend;
use verifile_core::constants::{MAX_FILE_SIZE_BYTES, OTP_EXPIRY_MINUTES};
use verifile_core::models::{FileDraft, SessionDraft, UploadResult, WizardStep};
use verifile_core::validation::{
    is_complete_otp, sanitize_otp_input, validate_email, validate_file_size,
};
use verifile_core::ValidationError;

const ISSUE_FAILED: &str = "Failed to send OTP. Please try again.";
const VERIFY_FAILED: &str = "An error occurred during verification. Please try again.";
const UPLOAD_FAILED: &str = "Failed to upload file. Please try again.";
const RESEND_FAILED: &str = "Failed to resend OTP. Please try again.";

pub struct Wizard<B: VerificationBackend> {
    backend: B,
    max_file_size_bytes: u64,
    step: WizardStep,
    draft: SessionDraft,
    otp_input: String,
    /// Held after a successful verification so a failed upload can be retried
    /// without a fresh code.
    upload_token: Option<String>,
    expiry_minutes: i64,
    message: Option<String>,
    error: Option<String>,
    upload_result: Option<UploadResult>,
}

impl<B: VerificationBackend> Wizard<B> {
    pub fn new(backend: B) -> Self {
        Self::with_max_file_size(backend, MAX_FILE_SIZE_BYTES)
    }

    pub fn with_max_file_size(backend: B, max_file_size_bytes: u64) -> Self {
        Self {
            backend,
            max_file_size_bytes,
            step: WizardStep::Intake,
            draft: SessionDraft::default(),
            otp_input: String::new(),
            upload_token: None,
            expiry_minutes: OTP_EXPIRY_MINUTES,
            message: None,
            error: None,
            upload_result: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_bytes
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn draft(&self) -> &SessionDraft {
        &self.draft
    }

    pub fn otp_input(&self) -> &str {
        &self.otp_input
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn upload_result(&self) -> Option<&UploadResult> {
        self.upload_result.as_ref()
    }

    /// Code lifetime reported by the last issue call.
    pub fn expiry_minutes(&self) -> i64 {
        self.expiry_minutes
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.draft.email = email.into();
        self.error = None;
    }

    /// Store the chosen file. An oversized file is refused and any earlier
    /// selection is dropped.
    pub fn select_file(&mut self, file: FileDraft) -> Result<(), ValidationError> {
        if let Err(err) = validate_file_size(file.size, self.max_file_size_bytes) {
            self.draft.file = None;
            self.error = Some(err.to_string());
            return Err(err);
        }
        self.draft.file = Some(file);
        self.error = None;
        Ok(())
    }

    pub fn clear_file(&mut self) {
        self.draft.file = None;
    }

    /// Validate the draft, request a code, and move to Verify.
    pub async fn submit_intake(&mut self) -> WizardStep {
        if self.step != WizardStep::Intake {
            return self.step;
        }
        self.message = None;
        self.error = None;

        if let Err(err) = self.validate_intake() {
            self.error = Some(err.to_string());
            return self.step;
        }

        let email = self.draft.email.trim().to_string();
        match self.backend.issue_otp(&email).await {
            Ok(issued) => {
                self.draft.email = email;
                self.expiry_minutes = issued.expiry_minutes;
                self.message = Some(issued.message);
                self.otp_input.clear();
                self.upload_token = None;
                self.step = WizardStep::Verify;
            }
            Err(err) => {
                tracing::warn!(error = %err, "OTP request failed");
                self.error = Some(err.user_message(ISSUE_FAILED));
            }
        }
        self.step
    }

    fn validate_intake(&self) -> Result<(), ValidationError> {
        validate_email(self.draft.email.trim())?;
        let file = self.draft.file.as_ref().ok_or(ValidationError::MissingFile)?;
        validate_file_size(file.size, self.max_file_size_bytes)
    }

    /// Keep digits only, at most six of them.
    pub fn enter_otp(&mut self, input: &str) {
        self.otp_input = sanitize_otp_input(input);
    }

    pub fn can_submit_otp(&self) -> bool {
        is_complete_otp(&self.otp_input)
    }

    /// Verify the entered code, upload the file, and move to Success.
    pub async fn submit_otp(&mut self) -> WizardStep {
        if self.step != WizardStep::Verify {
            return self.step;
        }
        self.message = None;
        self.error = None;

        let Some(file) = self.draft.file.clone() else {
            self.error = Some(ValidationError::MissingFile.to_string());
            return self.step;
        };

        let upload_token = match self.upload_token.clone() {
            Some(token) => token,
            None => match self.verify().await {
                Some(token) => token,
                None => return self.step,
            },
        };

        match self
            .backend
            .upload(&self.draft.email, &upload_token, &file)
            .await
        {
            Ok(result) => {
                tracing::info!(
                    file_name = %result.file_name,
                    size_bytes = result.file_size_bytes,
                    "Upload complete"
                );
                self.message = Some(format!(
                    "File \"{}\" uploaded successfully!",
                    result.file_name
                ));
                self.upload_result = Some(result);
                self.step = WizardStep::Success;
            }
            Err(err) => {
                tracing::warn!(error = %err, "Upload failed");
                self.error = Some(err.user_message(UPLOAD_FAILED));
            }
        }
        self.step
    }

    async fn verify(&mut self) -> Option<String> {
        if !self.can_submit_otp() {
            self.error = Some(ValidationError::InvalidOtp.to_string());
            return None;
        }

        match self
            .backend
            .verify_otp(&self.draft.email, &self.otp_input)
            .await
        {
            Ok(response) if response.verified => match response.upload_token {
                Some(token) => {
                    self.upload_token = Some(token.clone());
                    Some(token)
                }
                None => {
                    tracing::error!("Verification succeeded without an upload token");
                    self.error = Some(VERIFY_FAILED.to_string());
                    None
                }
            },
            Ok(response) => {
                self.error = Some(response.message);
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, "OTP verification failed");
                self.error = Some(err.user_message(VERIFY_FAILED));
                None
            }
        }
    }

    /// Request a fresh code while on Verify.
    pub async fn resend_otp(&mut self) -> WizardStep {
        if self.step != WizardStep::Verify {
            return self.step;
        }
        self.message = None;
        self.error = None;

        match self.backend.issue_otp(&self.draft.email).await {
            Ok(issued) => {
                self.expiry_minutes = issued.expiry_minutes;
                self.otp_input.clear();
                self.upload_token = None;
                self.message = Some("A new OTP has been sent to your email".to_string());
            }
            Err(err) => {
                tracing::warn!(error = %err, "OTP resend failed");
                self.error = Some(err.user_message(RESEND_FAILED));
            }
        }
        self.step
    }

    /// Abandon verification and start over. No backend call is made.
    pub fn cancel(&mut self) {
        self.clear();
    }

    /// Start a new session after a completed upload.
    pub fn reset(&mut self) {
        self.clear();
    }

    fn clear(&mut self) {
        self.step = WizardStep::Intake;
        self.draft = SessionDraft::default();
        self.otp_input.clear();
        self.upload_token = None;
        self.expiry_minutes = OTP_EXPIRY_MINUTES;
        self.message = None;
        self.error = None;
        self.upload_result = None;
    }
}
