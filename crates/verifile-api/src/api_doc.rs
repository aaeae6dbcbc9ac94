//! OpenAPI documentation, served at `/api/openapi.json` and rendered at `/docs`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use verifile_core::models;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Verifile API",
        version = "0.1.0",
        description = "Email-verified file uploads: request a one-time passcode, verify it, then upload straight to storage with a pre-authorized URL."
    ),
    paths(
        // Passcodes
        handlers::otp::generate_otp,
        handlers::otp::verify_otp,
        // Uploads
        handlers::upload::get_upload_url,
        handlers::upload::direct_write,
        handlers::upload::confirm_upload,
    ),
    components(
        schemas(
            models::GenerateOtpRequest,
            models::GenerateOtpResponse,
            models::VerifyOtpRequest,
            models::VerifyOtpResponse,
            models::UploadUrlRequest,
            models::UploadUrlResponse,
            models::ConfirmUploadRequest,
            models::ConfirmUploadResponse,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "otp", description = "One-time passcode issue and verification"),
        (name = "uploads", description = "Pre-authorized upload targets and confirmation"),
    )
)]
pub struct ApiDoc;
