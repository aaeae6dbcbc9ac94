use chrono::{DateTime, Utc};
use std::sync::Arc;
use verifile_core::models::{OtpCheck, OtpRecord};
use verifile_core::validation::{normalize_email, validate_email, validate_otp_code};
use verifile_core::{AppError, OtpStore};

use super::delivery::OtpDelivery;
use super::generator::generate_code;

/// A code that was stored and handed to the delivery channel
#[derive(Debug, Clone)]
pub struct IssuedOtp {
    pub email: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and checks one-time passcodes.
///
/// At most one live code exists per normalized email. Issuing again replaces it.
#[derive(Clone)]
pub struct OtpService {
    store: Arc<dyn OtpStore>,
    delivery: Arc<dyn OtpDelivery>,
    expiry_minutes: i64,
    max_attempts: u32,
}

impl OtpService {
    pub fn new(
        store: Arc<dyn OtpStore>,
        delivery: Arc<dyn OtpDelivery>,
        expiry_minutes: i64,
        max_attempts: u32,
    ) -> Self {
        Self {
            store,
            delivery,
            expiry_minutes,
            max_attempts,
        }
    }

    pub fn expiry_minutes(&self) -> i64 {
        self.expiry_minutes
    }

    pub async fn issue(&self, email: &str) -> Result<IssuedOtp, AppError> {
        let email = normalize_email(email);
        validate_email(&email)?;

        let code = generate_code();
        let record = OtpRecord::new(
            email.clone(),
            code.clone(),
            chrono::Duration::minutes(self.expiry_minutes),
        );
        let expires_at = record.expires_at;

        self.store.put(record).await.map_err(|e| {
            tracing::error!(error = %e, email = %email, "Failed to store OTP");
            AppError::OtpStore(e.to_string())
        })?;

        if let Err(e) = self
            .delivery
            .deliver(&email, &code, self.expiry_minutes)
            .await
        {
            tracing::error!(
                error = %e,
                email = %email,
                channel = self.delivery.channel(),
                "OTP delivery failed"
            );
            if let Err(cleanup) = self.store.delete(&email).await {
                tracing::warn!(error = %cleanup, email = %email, "Failed to remove undelivered OTP");
            }
            return Err(match e {
                AppError::Delivery(_) => e,
                other => AppError::Delivery(other.to_string()),
            });
        }

        tracing::info!(
            email = %email,
            channel = self.delivery.channel(),
            expires_at = %expires_at,
            "OTP issued"
        );

        Ok(IssuedOtp {
            email,
            code,
            expires_at,
        })
    }

    /// Check `code` for `email`. Returns the normalized email on success.
    ///
    /// A successful check consumes the code.
    pub async fn verify(&self, email: &str, code: &str) -> Result<String, AppError> {
        self.verify_at(email, code, Utc::now()).await
    }

    pub(crate) async fn verify_at(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let email = normalize_email(email);
        validate_otp_code(code)?;

        let outcome = self
            .store
            .check_and_consume(&email, code, now, self.max_attempts)
            .await?;

        match outcome {
            OtpCheck::Verified => {
                tracing::info!(email = %email, "OTP verified");
            }
            OtpCheck::NotFound => {
                tracing::debug!(email = %email, "OTP verification without a stored code");
                return Err(AppError::OtpNotFound);
            }
            OtpCheck::Expired => {
                tracing::debug!(email = %email, "OTP expired");
                return Err(AppError::OtpExpired);
            }
            OtpCheck::AttemptsExceeded => {
                tracing::warn!(email = %email, "OTP burned after too many failed attempts");
                return Err(AppError::OtpAttemptsExceeded);
            }
            OtpCheck::Mismatch { attempts } => {
                tracing::debug!(email = %email, attempts, "OTP mismatch");
                return Err(AppError::OtpMismatch { attempts });
            }
        }

        Ok(email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::otp::delivery::RecordingOtpDelivery;
    use crate::otp::store::InMemoryOtpStore;

    struct Fixture {
        service: OtpService,
        store: Arc<InMemoryOtpStore>,
        delivery: Arc<RecordingOtpDelivery>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryOtpStore::new());
        let delivery = Arc::new(RecordingOtpDelivery::new());
        let service = OtpService::new(store.clone(), delivery.clone(), 10, 5);
        Fixture {
            service,
            store,
            delivery,
        }
    }

    fn wrong_code(code: &str) -> String {
        if code == "000000" {
            "111111".to_string()
        } else {
            "000000".to_string()
        }
    }

    #[tokio::test]
    async fn issue_stores_and_delivers_code() {
        let f = fixture();
        let issued = f.service.issue("  User@Example.com ").await.unwrap();

        assert_eq!(issued.email, "user@example.com");
        assert_eq!(issued.code.len(), 6);
        assert_eq!(
            f.delivery.last_code_for("user@example.com").await,
            Some(issued.code.clone())
        );
        let record = f.store.get("user@example.com").await.unwrap().unwrap();
        assert_eq!(record.code, issued.code);
        assert_eq!(record.expires_at - record.created_at, chrono::Duration::minutes(10));
    }

    #[tokio::test]
    async fn issue_rejects_invalid_email() {
        let f = fixture();
        let err = f.service.issue("not-an-email").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert_eq!(f.delivery.sent_count().await, 0);
    }

    #[tokio::test]
    async fn failed_delivery_removes_record() {
        let f = fixture();
        f.delivery.set_failing(true);
        let err = f.service.issue("a@b.com").await.unwrap_err();
        assert!(matches!(err, AppError::Delivery(_)));
        assert!(f.store.is_empty().await);
    }

    #[tokio::test]
    async fn correct_code_verifies_once() {
        let f = fixture();
        let issued = f.service.issue("a@b.com").await.unwrap();

        let email = f.service.verify("A@B.com", &issued.code).await.unwrap();
        assert_eq!(email, "a@b.com");

        let err = f.service.verify("a@b.com", &issued.code).await.unwrap_err();
        assert!(matches!(err, AppError::OtpNotFound));
    }

    #[tokio::test]
    async fn wrong_code_increments_attempts() {
        let f = fixture();
        let issued = f.service.issue("a@b.com").await.unwrap();

        let err = f
            .service
            .verify("a@b.com", &wrong_code(&issued.code))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::OtpMismatch { attempts: 1 }));
        assert_eq!(f.store.get("a@b.com").await.unwrap().unwrap().attempts, 1);

        // Still usable after a typo
        assert!(f.service.verify("a@b.com", &issued.code).await.is_ok());
    }

    #[tokio::test]
    async fn code_is_burned_after_max_attempts() {
        let f = fixture();
        let issued = f.service.issue("a@b.com").await.unwrap();
        let wrong = wrong_code(&issued.code);

        for attempt in 1..=5 {
            let err = f.service.verify("a@b.com", &wrong).await.unwrap_err();
            assert!(matches!(err, AppError::OtpMismatch { attempts } if attempts == attempt));
        }

        let err = f.service.verify("a@b.com", &issued.code).await.unwrap_err();
        assert!(matches!(err, AppError::OtpAttemptsExceeded));
        assert!(f.store.get("a@b.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_code_is_rejected_and_removed() {
        let f = fixture();
        let issued = f.service.issue("a@b.com").await.unwrap();

        let later = issued.expires_at + chrono::Duration::seconds(1);
        let err = f
            .service
            .verify_at("a@b.com", &issued.code, later)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::OtpExpired));
        assert!(f.store.get("a@b.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn resend_replaces_previous_code() {
        let f = fixture();
        let first = f.service.issue("a@b.com").await.unwrap();
        let second = f.service.issue("a@b.com").await.unwrap();

        if first.code != second.code {
            let err = f.service.verify("a@b.com", &first.code).await.unwrap_err();
            assert!(matches!(err, AppError::OtpMismatch { .. }));
        }
        assert!(f.service.verify("a@b.com", &second.code).await.is_ok());
    }

    /// Store that yields before every call, as a networked store would on I/O.
    struct YieldingStore(Arc<InMemoryOtpStore>);

    #[async_trait::async_trait]
    impl OtpStore for YieldingStore {
        async fn put(&self, record: OtpRecord) -> Result<(), AppError> {
            tokio::task::yield_now().await;
            self.0.put(record).await
        }

        async fn get(&self, email: &str) -> Result<Option<OtpRecord>, AppError> {
            tokio::task::yield_now().await;
            self.0.get(email).await
        }

        async fn delete(&self, email: &str) -> Result<(), AppError> {
            tokio::task::yield_now().await;
            self.0.delete(email).await
        }

        async fn check_and_consume(
            &self,
            email: &str,
            code: &str,
            now: DateTime<Utc>,
            max_attempts: u32,
        ) -> Result<OtpCheck, AppError> {
            tokio::task::yield_now().await;
            self.0.check_and_consume(email, code, now, max_attempts).await
        }

        async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
            tokio::task::yield_now().await;
            self.0.purge_expired(now).await
        }
    }

    fn yielding_service(max_attempts: u32) -> OtpService {
        OtpService::new(
            Arc::new(YieldingStore(Arc::new(InMemoryOtpStore::new()))),
            Arc::new(RecordingOtpDelivery::new()),
            10,
            max_attempts,
        )
    }

    #[tokio::test]
    async fn concurrent_verifications_succeed_once() {
        let service = yielding_service(5);
        let issued = service.issue("a@b.com").await.unwrap();

        let (first, second) = tokio::join!(
            service.verify("a@b.com", &issued.code),
            service.verify("a@b.com", &issued.code)
        );

        assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);
        let rejected = if first.is_err() { first } else { second };
        assert!(matches!(rejected, Err(AppError::OtpNotFound)));
    }

    #[tokio::test]
    async fn concurrent_wrong_guesses_cannot_exceed_budget() {
        let service = yielding_service(3);
        let issued = service.issue("a@b.com").await.unwrap();
        let wrong = wrong_code(&issued.code);

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let service = service.clone();
                let wrong = wrong.clone();
                tokio::spawn(async move { service.verify("a@b.com", &wrong).await })
            })
            .collect();

        let mut mismatches = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), Err(AppError::OtpMismatch { .. })) {
                mismatches += 1;
            }
        }
        assert_eq!(mismatches, 3);
        assert!(service.verify("a@b.com", &issued.code).await.is_err());
    }

    #[tokio::test]
    async fn malformed_code_is_input_error() {
        let f = fixture();
        f.service.issue("a@b.com").await.unwrap();

        for code in ["12345", "1234567", "12a456", ""] {
            let err = f.service.verify("a@b.com", code).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidInput(_)), "{:?}", code);
        }
        assert_eq!(f.store.get("a@b.com").await.unwrap().unwrap().attempts, 0);
    }
}
