//! Signed, expiring tokens for upload authorisation.
//!
//! Payload: purpose (1 byte) || expiry_ts (u64 BE) || subject (UTF-8).
//! Token = base64url(payload || HMAC-SHA256(secret, payload)).
//!
//! Two purposes exist. An upload grant carries a verified email and is returned
//! by passcode verification. A write token carries one storage key and protects
//! a direct write when the storage backend cannot presign.

use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const HEADER_LEN: usize = 1 + 8; // purpose + expiry
const MAC_LEN: usize = 32; // SHA256

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TokenPurpose {
    UploadGrant = 1,
    Write = 2,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,

    #[error("Invalid token signature")]
    BadSignature,

    #[error("Token issued for a different purpose")]
    WrongPurpose,

    #[error("Token has expired")]
    Expired,
}

impl From<TokenError> for verifile_core::AppError {
    fn from(err: TokenError) -> Self {
        verifile_core::AppError::Unauthorized(err.to_string())
    }
}

#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl TokenSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self) -> Hmac<Sha256> {
        Hmac::<Sha256>::new_from_slice(&self.secret).expect("HMAC accepts any key size")
    }

    /// Sign `subject` for `purpose`, valid for `expires_in`. Returns the token and its expiry.
    pub fn sign(
        &self,
        purpose: TokenPurpose,
        subject: &str,
        expires_in: Duration,
    ) -> (String, DateTime<Utc>) {
        self.sign_at(purpose, subject, expires_in, now_secs())
    }

    fn sign_at(
        &self,
        purpose: TokenPurpose,
        subject: &str,
        expires_in: Duration,
        now: u64,
    ) -> (String, DateTime<Utc>) {
        let expiry_ts = now.saturating_add(expires_in.as_secs());

        let mut payload = Vec::with_capacity(HEADER_LEN + subject.len() + MAC_LEN);
        payload.push(purpose as u8);
        payload.extend_from_slice(&expiry_ts.to_be_bytes());
        payload.extend_from_slice(subject.as_bytes());

        let mut mac = self.mac();
        mac.update(&payload);
        let tag = mac.finalize().into_bytes();
        payload.extend_from_slice(&tag);

        let expires_at = Utc
            .timestamp_opt(expiry_ts as i64, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        (base64_url_encode(&payload), expires_at)
    }

    /// Check signature, purpose, and expiry. Returns the subject.
    pub fn verify(&self, purpose: TokenPurpose, token: &str) -> Result<String, TokenError> {
        self.verify_at(purpose, token, now_secs())
    }

    fn verify_at(&self, purpose: TokenPurpose, token: &str, now: u64) -> Result<String, TokenError> {
        let decoded = base64_url_decode(token).map_err(|_| TokenError::Malformed)?;
        if decoded.len() < HEADER_LEN + MAC_LEN {
            return Err(TokenError::Malformed);
        }

        let (payload, tag) = decoded.split_at(decoded.len() - MAC_LEN);
        let mut mac = self.mac();
        mac.update(payload);
        mac.verify_slice(tag).map_err(|_| TokenError::BadSignature)?;

        if payload[0] != purpose as u8 {
            return Err(TokenError::WrongPurpose);
        }

        let mut expiry = [0u8; 8];
        expiry.copy_from_slice(&payload[1..HEADER_LEN]);
        if now > u64::from_be_bytes(expiry) {
            return Err(TokenError::Expired);
        }

        String::from_utf8(payload[HEADER_LEN..].to_vec()).map_err(|_| TokenError::Malformed)
    }
}

fn base64_url_encode(data: &[u8]) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(data)
}

fn base64_url_decode(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(s)
}
