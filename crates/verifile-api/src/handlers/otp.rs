use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use validator::Validate;
use verifile_core::models::{
    GenerateOtpRequest, GenerateOtpResponse, VerifyOtpRequest, VerifyOtpResponse,
};
use verifile_core::{AppError, ErrorMetadata};

/// Issue a passcode and send it to the given email
#[utoipa::path(
    post,
    path = "/generate-otp",
    tag = "otp",
    request_body = GenerateOtpRequest,
    responses(
        (status = 200, description = "Passcode issued", body = GenerateOtpResponse),
        (status = 400, description = "Invalid email", body = ErrorResponse),
        (status = 500, description = "Passcode could not be stored", body = ErrorResponse),
        (status = 502, description = "Passcode could not be delivered", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(operation = "generate_otp"))]
pub async fn generate_otp(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<GenerateOtpRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate().map_err(AppError::from)?;

    let issued = state.otp.issue(&request.email).await?;

    Ok(Json(GenerateOtpResponse {
        message: "OTP sent successfully".to_string(),
        email: issued.email,
        expiry_minutes: state.otp.expiry_minutes(),
        otp: state.config.otp_echo_enabled().then_some(issued.code),
    }))
}

/// Check a passcode. Success returns an upload grant.
///
/// Well-formed codes that do not verify answer 400 with `verified: false`.
#[utoipa::path(
    post,
    path = "/verify-otp",
    tag = "otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Passcode verified", body = VerifyOtpResponse),
        (status = 400, description = "Passcode rejected (not found, expired, wrong, or burned)", body = VerifyOtpResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(operation = "verify_otp"))]
pub async fn verify_otp(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<VerifyOtpRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    match state.otp.verify(&request.email, &request.otp).await {
        Ok(email) => {
            let grant = state.uploads.issue_grant(&email);
            Ok((StatusCode::OK, Json(VerifyOtpResponse::verified(grant))))
        }
        Err(err) if err.is_otp_rejection() => {
            tracing::debug!(code = err.error_code(), "OTP rejected");
            Ok((
                StatusCode::BAD_REQUEST,
                Json(VerifyOtpResponse::rejected(err.client_message())),
            ))
        }
        Err(err) => Err(err.into()),
    }
}
