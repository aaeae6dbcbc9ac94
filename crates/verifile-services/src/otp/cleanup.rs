use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use verifile_core::{AppError, OtpStore};

/// Default sweep period for expired passcodes
pub const DEFAULT_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Background sweeper that evicts passcodes nobody came back to verify.
#[derive(Clone)]
pub struct OtpCleanupService {
    store: Arc<dyn OtpStore>,
    period: Duration,
}

impl OtpCleanupService {
    pub fn new(store: Arc<dyn OtpStore>, period: Duration) -> Self {
        Self { store, period }
    }

    /// Start the sweep loop. Returns a JoinHandle for shutdown.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut purge_interval = interval(self.period);

            loop {
                purge_interval.tick().await;

                if let Err(e) = self.purge_once().await {
                    tracing::error!(error = %e, "OTP cleanup failed");
                }
            }
        })
    }

    /// Remove every record already past its expiry.
    #[tracing::instrument(skip(self))]
    pub async fn purge_once(&self) -> Result<u64, AppError> {
        let removed = self.store.purge_expired(Utc::now()).await?;
        if removed > 0 {
            tracing::info!(removed, "Purged expired OTP records");
        }
        Ok(removed)
    }
}
