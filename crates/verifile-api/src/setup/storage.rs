//! Storage setup and initialization

use anyhow::Result;
use std::sync::Arc;
use verifile_core::Config;
use verifile_storage::{create_storage, Storage};

pub async fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    tracing::info!("Initializing storage...");
    let storage = create_storage(config).await?;
    tracing::info!(
        backend = %storage.backend_type(),
        presigned_put = storage.supports_presigned_put(),
        "Storage initialized successfully"
    );
    Ok(storage)
}
