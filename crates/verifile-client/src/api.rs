//! Domain methods for the Verifile API client.
//!
//! Request and response types come from `verifile_core::models`.

use crate::{ensure_success, parse_json, ApiClient};
use anyhow::{Context, Result};
use reqwest::StatusCode;
use verifile_core::models::{
    ConfirmUploadRequest, ConfirmUploadResponse, GenerateOtpRequest, GenerateOtpResponse,
    UploadUrlRequest, UploadUrlResponse, VerifyOtpRequest, VerifyOtpResponse,
};

impl ApiClient {
    /// Ask the server to issue and send a passcode.
    pub async fn generate_otp(&self, email: &str) -> Result<GenerateOtpResponse> {
        self.post_json(
            "/generate-otp",
            &GenerateOtpRequest {
                email: email.to_string(),
            },
        )
        .await
    }

    /// Check a passcode.
    ///
    /// A rejected code is not an error: the server answers 400 with `verified: false`
    /// and that body is returned as-is.
    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<VerifyOtpResponse> {
        let response = self
            .post_json_raw(
                "/verify-otp",
                &VerifyOtpRequest {
                    email: email.to_string(),
                    otp: otp.to_string(),
                },
            )
            .await?;

        if response.status() == StatusCode::BAD_REQUEST {
            let text = response.text().await.context("Failed to read response")?;
            if let Ok(rejected) = serde_json::from_str::<VerifyOtpResponse>(&text) {
                return Ok(rejected);
            }
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
                .unwrap_or(text);
            return Err(crate::ApiFailure {
                status: StatusCode::BAD_REQUEST.as_u16(),
                message,
            }
            .into());
        }

        parse_json(ensure_success(response).await?).await
    }

    pub async fn get_upload_url(&self, request: &UploadUrlRequest) -> Result<UploadUrlResponse> {
        self.post_json("/get-upload-url", request).await
    }

    /// PUT file bytes to a write target returned by `get_upload_url`.
    ///
    /// The URL is absolute: either the API's own direct-write route or a presigned
    /// object store URL.
    pub async fn put_upload(&self, upload_url: &str, content_type: &str, bytes: Vec<u8>) -> Result<()> {
        let response = self
            .client()
            .put(upload_url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .context("Failed to send upload")?;

        ensure_success(response).await?;
        Ok(())
    }

    pub async fn confirm_upload(
        &self,
        storage_key: &str,
        upload_token: &str,
    ) -> Result<ConfirmUploadResponse> {
        self.post_json(
            "/confirm-upload",
            &ConfirmUploadRequest {
                storage_key: storage_key.to_string(),
                upload_token: upload_token.to_string(),
            },
        )
        .await
    }

    pub async fn health(&self) -> Result<serde_json::Value> {
        self.get("/health").await
    }
}
