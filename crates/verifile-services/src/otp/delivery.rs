//! Out-of-band passcode delivery.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use verifile_core::{AppError, Config};

pub const OTP_EMAIL_SUBJECT: &str = "Your File Verification OTP";

/// Subject and plain-text body of the passcode email.
pub fn render_otp_email(code: &str, expiry_minutes: i64) -> (&'static str, String) {
    (
        OTP_EMAIL_SUBJECT,
        format!(
            "Your OTP for file verification is: {}\n\nThis OTP will expire in {} minutes.",
            code, expiry_minutes
        ),
    )
}

#[async_trait]
pub trait OtpDelivery: Send + Sync {
    async fn deliver(&self, email: &str, code: &str, expiry_minutes: i64) -> Result<(), AppError>;

    /// Short name for logs
    fn channel(&self) -> &'static str;
}

/// Sends passcodes over SMTP.
#[derive(Clone)]
pub struct SmtpOtpDelivery {
    mailer: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl SmtpOtpDelivery {
    /// Returns `Ok(None)` when email delivery is disabled.
    pub fn from_config(config: &Config) -> Result<Option<Self>, anyhow::Error> {
        if !config.email_delivery_enabled() {
            tracing::debug!("Email delivery disabled (EMAIL_DELIVERY_ENABLED=false)");
            return Ok(None);
        }
        let host = config
            .smtp_host()
            .ok_or_else(|| anyhow::anyhow!("SMTP_HOST must be set"))?;
        let from: Mailbox = config
            .smtp_from()
            .ok_or_else(|| anyhow::anyhow!("SMTP_FROM must be set"))?
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid SMTP_FROM: {}", e))?;
        let port = config.smtp_port();

        let builder = if config.smtp_tls() {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?.port(port)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host).port(port)
        };
        let builder = match (config.smtp_user(), config.smtp_password()) {
            (Some(user), Some(password)) => {
                builder.credentials(Credentials::new(user.to_string(), password.to_string()))
            }
            _ => builder,
        };

        tracing::info!(
            host = %host,
            port = port,
            starttls = config.smtp_tls(),
            "OTP email delivery initialized (SMTP)"
        );

        Ok(Some(Self {
            mailer: Arc::new(builder.build()),
            from,
        }))
    }
}

#[async_trait]
impl OtpDelivery for SmtpOtpDelivery {
    async fn deliver(&self, email: &str, code: &str, expiry_minutes: i64) -> Result<(), AppError> {
        let to: Mailbox = email
            .parse()
            .map_err(|e| AppError::Delivery(format!("Invalid recipient address: {}", e)))?;
        let (subject, body) = render_otp_email(code, expiry_minutes);

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| AppError::Delivery(e.to_string()))?;

        self.mailer
            .send(message)
            .await
            .map_err(|e| AppError::Delivery(e.to_string()))?;

        tracing::info!(email = %email, "OTP email sent");
        Ok(())
    }

    fn channel(&self) -> &'static str {
        "smtp"
    }
}

/// Development channel: the code only appears in debug logs.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogOtpDelivery;

#[async_trait]
impl OtpDelivery for LogOtpDelivery {
    async fn deliver(&self, email: &str, code: &str, expiry_minutes: i64) -> Result<(), AppError> {
        tracing::info!(email = %email, expiry_minutes, "OTP issued (log delivery)");
        tracing::debug!(email = %email, otp = %code, "OTP code");
        Ok(())
    }

    fn channel(&self) -> &'static str {
        "log"
    }
}

/// Keeps every delivered code in memory. Used by tests and simulations.
#[derive(Default)]
pub struct RecordingOtpDelivery {
    sent: Mutex<Vec<(String, String)>>,
    failing: AtomicBool,
}

impl RecordingOtpDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent deliveries fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Most recent code delivered to `email`
    pub async fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, code)| code.clone())
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

#[async_trait]
impl OtpDelivery for RecordingOtpDelivery {
    async fn deliver(&self, email: &str, code: &str, _expiry_minutes: i64) -> Result<(), AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Delivery("delivery disabled for test".to_string()));
        }
        self.sent
            .lock()
            .await
            .push((email.to_string(), code.to_string()));
        Ok(())
    }

    fn channel(&self) -> &'static str {
        "recording"
    }
}
