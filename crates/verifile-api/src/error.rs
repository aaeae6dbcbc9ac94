//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Any `AppError`, or a
//! type that converts into one, renders with the same status, body, and logging.

use axum::{
    extract::rejection::JsonRejection,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use utoipa::ToSchema;
use verifile_core::{AppError, ErrorMetadata, LogLevel, ValidationError};
use verifile_services::TokenError;
use verifile_storage::StorageError;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    /// Suggested action for the client (e.g., "Request a new code")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

/// `IntoResponse` cannot be implemented for the foreign `AppError`, so it is wrapped.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

/// Convert JSON body deserialization failures into a 400 with our ErrorResponse format.
impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        HttpAppError(AppError::InvalidInput(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

/// JSON body extractor that returns our ErrorResponse format (400 + JSON) on deserialization failure.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        Ok(ValidatedJson(inner))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
        .unwrap_or(false)
}

impl ErrorResponse {
    fn from_app_error(app_error: &AppError, include_details: bool) -> Self {
        Self {
            error: app_error.client_message(),
            details: include_details.then(|| app_error.detailed_message()),
            error_type: include_details.then(|| app_error.error_type().to_string()),
            code: app_error.error_code().to_string(),
            recoverable: app_error.is_recoverable(),
            suggested_action: app_error.suggested_action().map(String::from),
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        // Details only outside production, and never for sensitive errors.
        let include_details = !is_production_env() && !app_error.is_sensitive();

        (
            status,
            Json(ErrorResponse::from_app_error(app_error, include_details)),
        )
            .into_response()
    }
}

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        let app = match err {
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            StorageError::IoError(err) => AppError::Internal(format!("IO error: {}", err)),
            StorageError::ConfigError(msg) => AppError::Internal(msg),
            StorageError::UploadFailed(msg) | StorageError::BackendError(msg) => AppError::Storage(msg),
        };
        HttpAppError(app)
    }
}

impl From<ValidationError> for HttpAppError {
    fn from(err: ValidationError) -> Self {
        HttpAppError(AppError::from(err))
    }
}

impl From<TokenError> for HttpAppError {
    fn from(err: TokenError) -> Self {
        HttpAppError(AppError::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_storage_error_not_found() {
        let HttpAppError(app_err) = StorageError::NotFound("uploads/x".to_string()).into();
        match app_err {
            AppError::NotFound(msg) => assert_eq!(msg, "uploads/x"),
            _ => panic!("Expected NotFound variant"),
        }
    }

    #[test]
    fn test_from_storage_error_backend_failures() {
        for err in [
            StorageError::UploadFailed("boom".to_string()),
            StorageError::BackendError("boom".to_string()),
        ] {
            let HttpAppError(app_err) = err.into();
            assert!(matches!(app_err, AppError::Storage(ref msg) if msg == "boom"));
        }
    }

    #[test]
    fn test_from_storage_error_invalid_key() {
        let HttpAppError(app_err) = StorageError::InvalidKey("Invalid key".to_string()).into();
        assert!(matches!(app_err, AppError::InvalidInput(ref msg) if msg == "Invalid key"));
    }

    #[test]
    fn test_from_validation_error_file_too_large() {
        let HttpAppError(app_err) = ValidationError::FileTooLarge {
            size: 1000,
            max: 500,
        }
        .into();
        match app_err {
            AppError::PayloadTooLarge(msg) => {
                assert!(msg.contains("1000"));
                assert!(msg.contains("500"));
            }
            _ => panic!("Expected PayloadTooLarge variant"),
        }
    }

    #[test]
    fn test_from_token_error_is_unauthorized() {
        let HttpAppError(app_err) = TokenError::Expired.into();
        assert_eq!(app_err.http_status_code(), 401);
    }

    #[test]
    fn test_sensitive_errors_hide_details() {
        let body = ErrorResponse::from_app_error(&AppError::OtpStore("pg down".to_string()), false);
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json["error"], "Failed to store OTP");
        assert_eq!(json["code"], "OTP_STORE_ERROR");
        assert!(json.get("details").is_none());
        assert!(json.get("error_type").is_none());
    }

    /// Public contract: "error", "code", "recoverable", and optionally
    /// "details" / "error_type" / "suggested_action".
    #[test]
    fn test_error_response_shape() {
        let body = ErrorResponse::from_app_error(&AppError::OtpExpired, true);
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json["error"], "OTP expired");
        assert_eq!(json["code"], "OTP_EXPIRED");
        assert_eq!(json["recoverable"], false);
        assert_eq!(json["error_type"], "OtpExpired");
        assert!(json["details"].as_str().is_some());
        assert_eq!(json["suggested_action"], "Request a new code");
    }
}
