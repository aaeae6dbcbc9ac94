//! Service wiring: passcode store, delivery channel, and application state.

use anyhow::Result;
use std::sync::Arc;
use verifile_core::{Config, OtpStore, OtpStoreKind};
use verifile_db::PgOtpStore;
use verifile_services::{
    InMemoryOtpStore, LogOtpDelivery, OtpCleanupService, OtpDelivery, SmtpOtpDelivery,
    DEFAULT_PURGE_INTERVAL,
};
use verifile_storage::Storage;

use crate::state::AppState;

pub async fn initialize_services(
    config: &Config,
    storage: Arc<dyn Storage>,
) -> Result<Arc<AppState>> {
    let (otp_store, pool) = match config.otp_store() {
        OtpStoreKind::Memory => {
            tracing::info!("Using in-memory OTP store");
            let store: Arc<dyn OtpStore> = Arc::new(InMemoryOtpStore::new());
            (store, None)
        }
        OtpStoreKind::Postgres => {
            let pool = super::database::setup_database(config).await?;
            tracing::info!("Using PostgreSQL OTP store");
            let store: Arc<dyn OtpStore> = Arc::new(PgOtpStore::new(pool.clone()));
            (store, Some(pool))
        }
    };

    Arc::new(OtpCleanupService::new(otp_store.clone(), DEFAULT_PURGE_INTERVAL)).start();
    tracing::info!(
        interval_secs = DEFAULT_PURGE_INTERVAL.as_secs(),
        "Started OTP cleanup background task"
    );

    let delivery: Arc<dyn OtpDelivery> = match SmtpOtpDelivery::from_config(config)? {
        Some(smtp) => Arc::new(smtp),
        None => {
            tracing::info!("Using log-only OTP delivery");
            Arc::new(LogOtpDelivery)
        }
    };

    Ok(Arc::new(AppState::new(
        config.clone(),
        storage,
        otp_store,
        delivery,
        pool,
    )))
}
