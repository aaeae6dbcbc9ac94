//! Configuration module
//!
//! Server settings are read from the environment once at startup and validated
//! before anything else is initialised.

use std::env;

use crate::constants::{OTP_EXPIRY_MINUTES, OTP_MAX_ATTEMPTS};
use crate::storage_types::StorageBackend;

const DEFAULT_PORT: u16 = 4000;
const MAX_CONNECTIONS: u32 = 5;
const MAX_FILE_SIZE_MB: u64 = 10;
/// S3 single-request PUT ceiling
const MAX_FILE_SIZE_MB_LIMIT: u64 = 5 * 1024;
const MAX_OTP_EXPIRY_MINUTES: i64 = 24 * 60;
const BYTES_PER_MB: u64 = 1024 * 1024;
const UPLOAD_URL_EXPIRY_SECS: u64 = 900;
const UPLOAD_GRANT_EXPIRY_SECS: u64 = 1800;
const SMTP_PORT: u16 = 587;
const MIN_SECRET_LEN: usize = 32;

/// Settings shared by every service binary
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
}

/// Which passcode store backs the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpStoreKind {
    Memory,
    Postgres,
}

impl std::str::FromStr for OtpStoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(OtpStoreKind::Memory),
            "postgres" | "postgresql" => Ok(OtpStoreKind::Postgres),
            _ => Err(anyhow::anyhow!("Invalid OTP_STORE: {}", s)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct VerifileConfig {
    pub base: BaseConfig,
    pub public_base_url: String,
    pub max_file_size_bytes: u64,
    // Passcodes
    pub otp_expiry_minutes: i64,
    pub otp_max_attempts: u32,
    pub otp_echo_enabled: bool,
    pub otp_store: OtpStoreKind,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    // Upload authorisation
    pub upload_token_secret: String,
    pub upload_url_expiry_secs: u64,
    pub upload_grant_expiry_secs: u64,
    // Storage
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub aws_region: Option<String>,
    pub local_storage_path: String,
    // Email delivery
    pub email_delivery_enabled: bool,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,
    pub smtp_tls: bool,
}

fn parse_bool(value: Option<String>, default: bool) -> bool {
    value
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

impl VerifileConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(var: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = var("ENVIRONMENT")
            .or_else(|| var("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let cors_origins: Vec<String> = var("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let server_port = match var("PORT") {
            Some(p) => p
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            None => DEFAULT_PORT,
        };

        let base = BaseConfig {
            server_port,
            cors_origins,
            environment,
        };

        let storage_backend = match var("STORAGE_BACKEND") {
            Some(s) => s.parse()?,
            None => StorageBackend::Local,
        };

        let otp_store = match var("OTP_STORE") {
            Some(s) => s.parse()?,
            None => OtpStoreKind::Memory,
        };

        let max_file_size_mb: u64 = parse_or(var("MAX_FILE_SIZE_MB"), MAX_FILE_SIZE_MB);
        let max_file_size_bytes = max_file_size_mb
            .checked_mul(BYTES_PER_MB)
            .ok_or_else(|| anyhow::anyhow!("MAX_FILE_SIZE_MB is too large"))?;

        Ok(VerifileConfig {
            public_base_url: var("PUBLIC_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| format!("http://localhost:{}", base.server_port)),
            base,
            max_file_size_bytes,
            otp_expiry_minutes: parse_or(var("OTP_EXPIRY_MINUTES"), OTP_EXPIRY_MINUTES),
            otp_max_attempts: parse_or(var("OTP_MAX_ATTEMPTS"), OTP_MAX_ATTEMPTS),
            otp_echo_enabled: parse_bool(var("OTP_ECHO_ENABLED"), false),
            otp_store,
            database_url: var("DATABASE_URL"),
            db_max_connections: parse_or(var("DB_MAX_CONNECTIONS"), MAX_CONNECTIONS),
            upload_token_secret: var("UPLOAD_TOKEN_SECRET").ok_or_else(|| {
                anyhow::anyhow!("UPLOAD_TOKEN_SECRET must be set to sign upload grants")
            })?,
            upload_url_expiry_secs: parse_or(var("UPLOAD_URL_EXPIRY_SECS"), UPLOAD_URL_EXPIRY_SECS),
            upload_grant_expiry_secs: parse_or(
                var("UPLOAD_GRANT_EXPIRY_SECS"),
                UPLOAD_GRANT_EXPIRY_SECS,
            ),
            storage_backend,
            s3_bucket: var("S3_BUCKET"),
            s3_region: var("S3_REGION"),
            s3_endpoint: var("S3_ENDPOINT"),
            aws_region: var("AWS_REGION"),
            local_storage_path: var("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|| "./data/uploads".to_string()),
            email_delivery_enabled: parse_bool(var("EMAIL_DELIVERY_ENABLED"), false),
            smtp_host: var("SMTP_HOST"),
            smtp_port: parse_or(var("SMTP_PORT"), SMTP_PORT),
            smtp_user: var("SMTP_USER"),
            smtp_password: var("SMTP_PASSWORD"),
            smtp_from: var("SMTP_FROM"),
            smtp_tls: parse_bool(var("SMTP_TLS"), true),
        })
    }

    fn is_production(&self) -> bool {
        let env = self.base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.upload_token_secret.len() < MIN_SECRET_LEN {
            return Err(anyhow::anyhow!(
                "UPLOAD_TOKEN_SECRET must be at least {} characters long",
                MIN_SECRET_LEN
            ));
        }

        if self.is_production() {
            if self.base.cors_origins.iter().any(|o| o == "*") {
                return Err(anyhow::anyhow!(
                    "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
                ));
            }
            if self.otp_echo_enabled {
                return Err(anyhow::anyhow!(
                    "OTP_ECHO_ENABLED must not be enabled in production"
                ));
            }
        }

        if self.otp_expiry_minutes <= 0 || self.otp_expiry_minutes > MAX_OTP_EXPIRY_MINUTES {
            return Err(anyhow::anyhow!(
                "OTP_EXPIRY_MINUTES must be between 1 and {}",
                MAX_OTP_EXPIRY_MINUTES
            ));
        }
        if self.otp_max_attempts == 0 {
            return Err(anyhow::anyhow!("OTP_MAX_ATTEMPTS must be at least 1"));
        }
        if self.max_file_size_bytes == 0
            || self.max_file_size_bytes > MAX_FILE_SIZE_MB_LIMIT * BYTES_PER_MB
        {
            return Err(anyhow::anyhow!(
                "MAX_FILE_SIZE_MB must be between 1 and {}",
                MAX_FILE_SIZE_MB_LIMIT
            ));
        }

        if self.otp_store == OtpStoreKind::Postgres {
            match self.database_url.as_deref() {
                Some(url) if url.starts_with("postgres://") || url.starts_with("postgresql://") => {
                }
                Some(_) => {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be a valid PostgreSQL connection string"
                    ))
                }
                None => {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be set when OTP_STORE=postgres"
                    ))
                }
            }
        }

        if self.email_delivery_enabled && (self.smtp_host.is_none() || self.smtp_from.is_none()) {
            return Err(anyhow::anyhow!(
                "EMAIL_DELIVERY_ENABLED=true requires SMTP_HOST and SMTP_FROM to be set"
            ));
        }

        if self.storage_backend == StorageBackend::S3 {
            if self.s3_bucket.is_none() {
                return Err(anyhow::anyhow!(
                    "S3_BUCKET must be set when using S3 storage backend"
                ));
            }
            if self.s3_region.is_none() && self.aws_region.is_none() {
                return Err(anyhow::anyhow!(
                    "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                ));
            }
        }

        Ok(())
    }
}

/// Validated server configuration
#[derive(Clone, Debug)]
pub struct Config(pub Box<VerifileConfig>);

impl Config {
    fn inner(&self) -> &VerifileConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        self.inner().is_production()
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = VerifileConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn public_base_url(&self) -> &str {
        &self.inner().public_base_url
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.inner().max_file_size_bytes
    }

    pub fn otp_expiry_minutes(&self) -> i64 {
        self.inner().otp_expiry_minutes
    }

    pub fn otp_max_attempts(&self) -> u32 {
        self.inner().otp_max_attempts
    }

    pub fn otp_echo_enabled(&self) -> bool {
        self.inner().otp_echo_enabled
    }

    pub fn otp_store(&self) -> OtpStoreKind {
        self.inner().otp_store
    }

    pub fn database_url(&self) -> Option<&str> {
        self.inner().database_url.as_deref()
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().db_max_connections
    }

    pub fn upload_token_secret(&self) -> &str {
        &self.inner().upload_token_secret
    }

    pub fn upload_url_expiry_secs(&self) -> u64 {
        self.inner().upload_url_expiry_secs
    }

    pub fn upload_grant_expiry_secs(&self) -> u64 {
        self.inner().upload_grant_expiry_secs
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.inner().storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.inner().s3_bucket.as_deref()
    }

    /// `S3_REGION`, falling back to `AWS_REGION`
    pub fn s3_region(&self) -> Option<&str> {
        self.inner()
            .s3_region
            .as_deref()
            .or(self.inner().aws_region.as_deref())
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.inner().s3_endpoint.as_deref()
    }

    pub fn local_storage_path(&self) -> &str {
        &self.inner().local_storage_path
    }

    pub fn email_delivery_enabled(&self) -> bool {
        self.inner().email_delivery_enabled
    }

    pub fn smtp_host(&self) -> Option<&str> {
        self.inner().smtp_host.as_deref()
    }

    pub fn smtp_port(&self) -> u16 {
        self.inner().smtp_port
    }

    pub fn smtp_user(&self) -> Option<&str> {
        self.inner().smtp_user.as_deref()
    }

    pub fn smtp_password(&self) -> Option<&str> {
        self.inner().smtp_password.as_deref()
    }

    pub fn smtp_from(&self) -> Option<&str> {
        self.inner().smtp_from.as_deref()
    }

    pub fn smtp_tls(&self) -> bool {
        self.inner().smtp_tls
    }
}
