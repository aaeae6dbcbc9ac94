use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use verifile_core::models::{OtpCheck, OtpRecord};
use verifile_core::{AppError, OtpStore};

#[derive(Debug, FromRow)]
struct OtpRow {
    email: String,
    code: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    attempts: i32,
}

impl From<OtpRow> for OtpRecord {
    fn from(row: OtpRow) -> Self {
        OtpRecord {
            email: row.email,
            code: row.code,
            expires_at: row.expires_at,
            created_at: row.created_at,
            attempts: row.attempts.max(0) as u32,
        }
    }
}

/// Passcode store backed by the `otp_codes` table, one row per email
#[derive(Clone)]
pub struct PgOtpStore {
    pool: PgPool,
}

impl PgOtpStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OtpStore for PgOtpStore {
    async fn put(&self, record: OtpRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO otp_codes (email, code, expires_at, created_at, attempts)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO UPDATE
            SET code = EXCLUDED.code,
                expires_at = EXCLUDED.expires_at,
                created_at = EXCLUDED.created_at,
                attempts = EXCLUDED.attempts
            "#,
        )
        .bind(&record.email)
        .bind(&record.code)
        .bind(record.expires_at)
        .bind(record.created_at)
        .bind(record.attempts as i32)
        .execute(&self.pool)
        .await?;

        tracing::debug!(email = %record.email, "Stored OTP record");

        Ok(())
    }

    async fn get(&self, email: &str) -> Result<Option<OtpRecord>, AppError> {
        let row = sqlx::query_as::<_, OtpRow>(
            r#"
            SELECT email, code, expires_at, created_at, attempts
            FROM otp_codes
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(OtpRecord::from))
    }

    async fn delete(&self, email: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM otp_codes WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn check_and_consume(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
        max_attempts: u32,
    ) -> Result<OtpCheck, AppError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent checks for the same email.
        let row = sqlx::query_as::<_, OtpRow>(
            r#"
            SELECT email, code, expires_at, created_at, attempts
            FROM otp_codes
            WHERE email = $1
            FOR UPDATE
            "#,
        )
        .bind(email)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(OtpCheck::NotFound);
        };

        let outcome = OtpRecord::from(row).check(code, now, max_attempts);
        match outcome {
            OtpCheck::Mismatch { attempts } => {
                sqlx::query("UPDATE otp_codes SET attempts = $2 WHERE email = $1")
                    .bind(email)
                    .bind(i32::try_from(attempts).unwrap_or(i32::MAX))
                    .execute(&mut *tx)
                    .await?;
            }
            _ if outcome.consumes_record() => {
                sqlx::query("DELETE FROM otp_codes WHERE email = $1")
                    .bind(email)
                    .execute(&mut *tx)
                    .await?;
            }
            _ => {}
        }

        tx.commit().await?;
        Ok(outcome)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM otp_codes WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
