//! Configuration validation
//!
//! Runs the config's own checks, then warns about settings that are legal but unusual.

use anyhow::Result;
use verifile_core::{Config, OtpStoreKind, StorageBackend};

pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    if config.is_production() && !config.email_delivery_enabled() {
        tracing::warn!(
            "Email delivery disabled in production - passcodes will only appear in debug logs"
        );
    }

    if config.otp_echo_enabled() {
        tracing::warn!("OTP_ECHO_ENABLED=true - generate-otp responses include the passcode");
    }

    if config.is_production() && config.otp_store() == OtpStoreKind::Memory {
        tracing::warn!("In-memory OTP store in production - codes are lost on restart");
    }

    if config.storage_backend() == StorageBackend::Local
        && config.public_base_url().starts_with("http://localhost")
        && config.is_production()
    {
        tracing::warn!(
            public_base_url = %config.public_base_url(),
            "PUBLIC_BASE_URL points at localhost - direct upload URLs will not be reachable"
        );
    }

    Ok(())
}
