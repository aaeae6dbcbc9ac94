//! Application state shared by all handlers.

use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use verifile_core::{Config, OtpStore};
use verifile_services::{OtpDelivery, OtpService, TokenSigner, UploadBroker};
use verifile_storage::Storage;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub otp: OtpService,
    pub uploads: UploadBroker,
    pub storage: Arc<dyn Storage>,
    /// Present only when passcodes live in PostgreSQL
    pub pool: Option<PgPool>,
}

impl AppState {
    /// Wire services from already-constructed backends.
    pub fn new(
        config: Config,
        storage: Arc<dyn Storage>,
        otp_store: Arc<dyn OtpStore>,
        delivery: Arc<dyn OtpDelivery>,
        pool: Option<PgPool>,
    ) -> Self {
        let otp = OtpService::new(
            otp_store,
            delivery,
            config.otp_expiry_minutes(),
            config.otp_max_attempts(),
        );
        let uploads = UploadBroker::new(
            storage.clone(),
            TokenSigner::new(config.upload_token_secret()),
            config.public_base_url(),
            config.max_file_size_bytes(),
            Duration::from_secs(config.upload_url_expiry_secs()),
            Duration::from_secs(config.upload_grant_expiry_secs()),
        );

        Self {
            config,
            otp,
            uploads,
            storage,
            pool,
        }
    }
}
