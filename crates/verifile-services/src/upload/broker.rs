use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use verifile_core::models::{ConfirmUploadResponse, UploadUrlRequest, UploadUrlResponse};
use verifile_core::validation::{normalize_email, validate_file_name, validate_file_size};
use verifile_core::AppError;
use verifile_storage::{file_name_from_key, generate_upload_key, is_upload_key, Storage, StorageError};

use crate::tokens::{TokenPurpose, TokenSigner};

fn storage_error(err: StorageError) -> AppError {
    match err {
        StorageError::NotFound(key) => AppError::NotFound(format!("Upload not found: {}", key)),
        StorageError::InvalidKey(msg) => AppError::BadRequest(msg),
        other => AppError::Storage(other.to_string()),
    }
}

/// Hands out pre-authorized write targets for verified emails.
///
/// Backends that can presign (S3) get a presigned PUT URL. Otherwise the target
/// is `{public_base_url}/{key}?token={write token}` served by the API itself.
#[derive(Clone)]
pub struct UploadBroker {
    storage: Arc<dyn Storage>,
    tokens: TokenSigner,
    public_base_url: String,
    max_file_size_bytes: u64,
    write_ttl: Duration,
    grant_ttl: Duration,
}

impl UploadBroker {
    pub fn new(
        storage: Arc<dyn Storage>,
        tokens: TokenSigner,
        public_base_url: impl Into<String>,
        max_file_size_bytes: u64,
        write_ttl: Duration,
        grant_ttl: Duration,
    ) -> Self {
        Self {
            storage,
            tokens,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            max_file_size_bytes,
            write_ttl,
            grant_ttl,
        }
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_bytes
    }

    /// Mint an upload grant for an email that just passed verification.
    pub fn issue_grant(&self, email: &str) -> String {
        let (token, _) = self
            .tokens
            .sign(TokenPurpose::UploadGrant, &normalize_email(email), self.grant_ttl);
        token
    }

    /// Returns the email the grant was issued for.
    pub fn verify_grant(&self, grant: &str) -> Result<String, AppError> {
        Ok(self.tokens.verify(TokenPurpose::UploadGrant, grant)?)
    }

    pub async fn issue_write_target(
        &self,
        request: &UploadUrlRequest,
    ) -> Result<UploadUrlResponse, AppError> {
        let granted_email = self.verify_grant(&request.upload_token)?;
        if granted_email != normalize_email(&request.email) {
            tracing::warn!(
                granted = %granted_email,
                requested = %request.email,
                "Upload grant used for a different email"
            );
            return Err(AppError::Unauthorized(
                "Upload token was not issued for this email".to_string(),
            ));
        }

        validate_file_name(&request.file_name)?;
        if let Some(size) = request.file_size {
            validate_file_size(size, self.max_file_size_bytes)?;
        }

        let key = generate_upload_key(&request.file_name);

        let (upload_url, expires_at) = if self.storage.supports_presigned_put() {
            let url = self
                .storage
                .presigned_put_url(&key, &request.file_type, self.write_ttl)
                .await
                .map_err(storage_error)?;
            let expires_at = chrono::Utc::now()
                + chrono::Duration::from_std(self.write_ttl)
                    .unwrap_or_else(|_| chrono::Duration::seconds(0));
            (url, expires_at)
        } else {
            let (token, expires_at) = self.tokens.sign(TokenPurpose::Write, &key, self.write_ttl);
            (self.direct_write_url(&key, &token), expires_at)
        };

        tracing::info!(
            email = %granted_email,
            key = %key,
            file_type = %request.file_type,
            size_bytes = request.file_size,
            backend = %self.storage.backend_type(),
            "Issued upload target"
        );

        Ok(UploadUrlResponse {
            upload_url,
            storage_key: key,
            method: "PUT".to_string(),
            expires_at,
        })
    }

    fn direct_write_url(&self, key: &str, token: &str) -> String {
        let path = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "{}/{}?token={}",
            self.public_base_url,
            path,
            urlencoding::encode(token)
        )
    }

    /// Store the body of a direct write. The token must have been issued for exactly `key`.
    pub async fn accept_direct_write(
        &self,
        key: &str,
        token: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<u64, AppError> {
        let authorized_key = self.tokens.verify(TokenPurpose::Write, token)?;
        if authorized_key != key {
            return Err(AppError::Unauthorized(
                "Write token was not issued for this key".to_string(),
            ));
        }
        if !is_upload_key(key) {
            return Err(AppError::BadRequest("Invalid upload key".to_string()));
        }
        validate_file_size(body.len() as u64, self.max_file_size_bytes)?;

        let written = self
            .storage
            .put(key, content_type, body)
            .await
            .map_err(storage_error)?;

        tracing::info!(key = %key, size_bytes = written, "Direct write stored");
        Ok(written)
    }

    /// Confirm that an upload reached storage.
    pub async fn confirm(
        &self,
        storage_key: &str,
        grant: &str,
    ) -> Result<ConfirmUploadResponse, AppError> {
        let email = self.verify_grant(grant)?;
        if !is_upload_key(storage_key) {
            return Err(AppError::BadRequest("Invalid upload key".to_string()));
        }

        let size = self
            .storage
            .content_length(storage_key)
            .await
            .map_err(storage_error)?;

        tracing::info!(email = %email, key = %storage_key, size_bytes = size, "Upload confirmed");

        Ok(ConfirmUploadResponse {
            file_name: file_name_from_key(storage_key).to_string(),
            file_size_bytes: size,
            storage_key: storage_key.to_string(),
        })
    }
}
