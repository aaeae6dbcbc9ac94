use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use utoipa::ToSchema;
use validator::Validate;

/// Stored passcode for one email address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpRecord {
    pub email: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub attempts: u32,
}

impl OtpRecord {
    pub fn new(email: String, code: String, ttl: chrono::Duration) -> Self {
        let created_at = Utc::now();
        Self {
            email,
            code,
            expires_at: created_at + ttl,
            created_at,
            attempts: 0,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Outcome of submitting `code` at `now`. A mismatch count includes this attempt.
    pub fn check(&self, code: &str, now: DateTime<Utc>, max_attempts: u32) -> OtpCheck {
        if self.is_expired_at(now) {
            return OtpCheck::Expired;
        }
        if self.attempts >= max_attempts {
            return OtpCheck::AttemptsExceeded;
        }
        let matches: bool = self.code.as_bytes().ct_eq(code.as_bytes()).into();
        if matches {
            OtpCheck::Verified
        } else {
            OtpCheck::Mismatch {
                attempts: self.attempts.saturating_add(1),
            }
        }
    }
}

/// Result of checking a submitted code against the stored record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    NotFound,
    Expired,
    AttemptsExceeded,
    Mismatch { attempts: u32 },
    Verified,
}

impl OtpCheck {
    /// Outcomes after which the stored record must be gone.
    pub fn consumes_record(self) -> bool {
        matches!(
            self,
            OtpCheck::Expired | OtpCheck::AttemptsExceeded | OtpCheck::Verified
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOtpRequest {
    #[validate(length(min = 3, max = 254))]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOtpResponse {
    pub message: String,
    pub email: String,
    pub expiry_minutes: i64,
    /// Only present when code echo is enabled on a development server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    #[validate(length(min = 3, max = 254))]
    pub email: String,
    #[validate(length(equal = 6))]
    pub otp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpResponse {
    pub verified: bool,
    pub message: String,
    /// Upload grant, present only when `verified` is true
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_token: Option<String>,
}

impl VerifyOtpResponse {
    pub fn verified(upload_token: String) -> Self {
        Self {
            verified: true,
            message: "OTP verified successfully".to_string(),
            upload_token: Some(upload_token),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            verified: false,
            message: message.into(),
            upload_token: None,
        }
    }
}
