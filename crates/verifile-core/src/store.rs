//! Passcode persistence seam.
//!
//! The API server picks an implementation at startup: an in-process map for
//! development and tests, or PostgreSQL when codes must survive restarts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::{OtpCheck, OtpRecord};

#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Insert or replace the record for `record.email`.
    async fn put(&self, record: OtpRecord) -> Result<(), AppError>;

    async fn get(&self, email: &str) -> Result<Option<OtpRecord>, AppError>;

    /// Remove the record. Removing a missing record is not an error.
    async fn delete(&self, email: &str) -> Result<(), AppError>;

    /// Check `code` against the stored record and apply the outcome in one atomic step.
    ///
    /// Outcomes that consume the record delete it; a mismatch stores the new attempt
    /// count. Concurrent calls for one email are serialized, so a code verifies at
    /// most once and the attempt budget cannot be overrun.
    async fn check_and_consume(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
        max_attempts: u32,
    ) -> Result<OtpCheck, AppError>;

    /// Delete every record expired at `now`. Returns how many were removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError>;
}
