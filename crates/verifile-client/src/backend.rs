//! Backends the wizard can drive: the real HTTP API or a local simulation.

use crate::{ApiClient, ApiFailure};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use verifile_core::constants::OTP_EXPIRY_MINUTES;
use verifile_core::models::{
    FileDraft, GenerateOtpResponse, UploadResult, UploadUrlRequest, VerifyOtpResponse,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The server understood the request and said no; the message is for the user.
    #[error("{0}")]
    Rejected(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl BackendError {
    /// Message to show the user, with `generic` standing in for anything unexpected.
    pub fn user_message(&self, generic: &str) -> String {
        match self {
            BackendError::Rejected(msg) => msg.clone(),
            BackendError::Network(_) => {
                "Unable to reach the server. Please check your connection and try again."
                    .to_string()
            }
            BackendError::Unexpected(_) => generic.to_string(),
        }
    }
}

impl From<anyhow::Error> for BackendError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(failure) = err.downcast_ref::<ApiFailure>() {
            return if failure.is_client_error() {
                BackendError::Rejected(failure.message.clone())
            } else {
                BackendError::Unexpected(format!("{} ({})", failure.message, failure.status))
            };
        }

        let unreachable = err.chain().any(|cause| {
            cause
                .downcast_ref::<reqwest::Error>()
                .is_some_and(|e| e.is_connect() || e.is_timeout())
        });
        if unreachable {
            BackendError::Network(format!("{:#}", err))
        } else {
            BackendError::Unexpected(format!("{:#}", err))
        }
    }
}

/// The three calls the wizard makes. Each is a fallible operation with an explicit
/// outcome; verification reports `verified` rather than succeeding by absence.
#[async_trait]
pub trait VerificationBackend: Send + Sync {
    async fn issue_otp(&self, email: &str) -> Result<GenerateOtpResponse, BackendError>;

    async fn verify_otp(&self, email: &str, code: &str) -> Result<VerifyOtpResponse, BackendError>;

    /// Obtain a write target with `upload_token`, write the file, and confirm it landed.
    async fn upload(
        &self,
        email: &str,
        upload_token: &str,
        file: &FileDraft,
    ) -> Result<UploadResult, BackendError>;
}

/// Backend over the Verifile HTTP API.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: ApiClient,
}

impl HttpBackend {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }
}

#[async_trait]
impl VerificationBackend for HttpBackend {
    async fn issue_otp(&self, email: &str) -> Result<GenerateOtpResponse, BackendError> {
        Ok(self.client.generate_otp(email).await?)
    }

    async fn verify_otp(&self, email: &str, code: &str) -> Result<VerifyOtpResponse, BackendError> {
        Ok(self.client.verify_otp(email, code).await?)
    }

    async fn upload(
        &self,
        email: &str,
        upload_token: &str,
        file: &FileDraft,
    ) -> Result<UploadResult, BackendError> {
        let target = self
            .client
            .get_upload_url(&UploadUrlRequest {
                email: email.to_string(),
                file_name: file.name.clone(),
                file_type: file.mime_type.clone(),
                file_size: Some(file.size),
                upload_token: upload_token.to_string(),
            })
            .await?;

        tracing::debug!(key = %target.storage_key, size_bytes = file.size, "Writing file");
        self.client
            .put_upload(&target.upload_url, &file.mime_type, file.bytes.clone())
            .await?;

        let confirmed = self
            .client
            .confirm_upload(&target.storage_key, upload_token)
            .await?;

        Ok(UploadResult {
            file_name: file.name.clone(),
            file_size_bytes: confirmed.file_size_bytes,
        })
    }
}

const SIMULATED_DELAY: Duration = Duration::from_millis(1000);

/// Backend call a simulated failure can be armed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulatedOperation {
    Issue,
    Verify,
    Upload,
}

impl SimulatedOperation {
    const ALL: [SimulatedOperation; 3] = [Self::Issue, Self::Verify, Self::Upload];
}

/// Offline backend: waits a fixed delay, then succeeds.
///
/// Any well-formed code verifies. Failures can be armed per operation to
/// exercise error paths.
#[derive(Debug)]
pub struct SimulatedBackend {
    delay: Duration,
    failures: Mutex<HashMap<SimulatedOperation, String>>,
    issued: AtomicUsize,
    verify_calls: AtomicUsize,
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::with_delay(SIMULATED_DELAY)
    }
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            failures: Mutex::new(HashMap::new()),
            issued: AtomicUsize::new(0),
            verify_calls: AtomicUsize::new(0),
        }
    }

    /// Make every following call fail with `message`, or succeed again with `None`.
    pub fn set_failure(&self, message: Option<&str>) {
        for operation in SimulatedOperation::ALL {
            self.set_operation_failure(operation, message);
        }
    }

    /// Arm or clear a failure for one operation only.
    pub fn set_operation_failure(&self, operation: SimulatedOperation, message: Option<&str>) {
        if let Ok(mut failures) = self.failures.lock() {
            match message {
                Some(message) => {
                    failures.insert(operation, message.to_string());
                }
                None => {
                    failures.remove(&operation);
                }
            }
        }
    }

    /// How many codes have been "sent".
    pub fn issue_count(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }

    /// How many verify calls reached the backend, failed ones included.
    pub fn verify_count(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    async fn simulate(&self, operation: SimulatedOperation) -> Result<(), BackendError> {
        tokio::time::sleep(self.delay).await;
        let failure = self
            .failures
            .lock()
            .ok()
            .and_then(|failures| failures.get(&operation).cloned());
        match failure {
            Some(message) => Err(BackendError::Rejected(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl VerificationBackend for SimulatedBackend {
    async fn issue_otp(&self, email: &str) -> Result<GenerateOtpResponse, BackendError> {
        self.simulate(SimulatedOperation::Issue).await?;
        self.issued.fetch_add(1, Ordering::SeqCst);
        Ok(GenerateOtpResponse {
            message: "OTP sent to your email. Please check your inbox.".to_string(),
            email: email.to_string(),
            expiry_minutes: OTP_EXPIRY_MINUTES,
            otp: None,
        })
    }

    async fn verify_otp(&self, _email: &str, code: &str) -> Result<VerifyOtpResponse, BackendError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate(SimulatedOperation::Verify).await?;
        if verifile_core::validation::is_complete_otp(code) {
            Ok(VerifyOtpResponse::verified("simulated-upload-token".to_string()))
        } else {
            Ok(VerifyOtpResponse::rejected("Invalid OTP"))
        }
    }

    async fn upload(
        &self,
        _email: &str,
        _upload_token: &str,
        file: &FileDraft,
    ) -> Result<UploadResult, BackendError> {
        self.simulate(SimulatedOperation::Upload).await?;
        Ok(UploadResult {
            file_name: file.name.clone(),
            file_size_bytes: file.size,
        })
    }
}
