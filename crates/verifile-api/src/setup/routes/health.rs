//! Health check handlers.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

/// "healthy", "timeout", or "unhealthy: {error}".
async fn run_check<F, E>(f: F) -> String
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match tokio::time::timeout(TIMEOUT, f).await {
        Ok(Ok(())) => "healthy".to_string(),
        Ok(Err(e)) => format!("unhealthy: {}", e),
        Err(_) => "timeout".to_string(),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct HealthCheckResponse {
    pub status: String,
    pub storage: String,
    pub otp_store: String,
}

/// Liveness check: the process is running.
pub async fn liveness_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "alive" })),
    )
}

/// Storage and passcode store reachability.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let storage = state.storage.clone();
    let storage_status = run_check(async move {
        storage
            .exists("uploads/health-check-non-existent-key")
            .await
            .map(drop)
    })
    .await;

    let otp_store_status = match state.pool.clone() {
        Some(pool) => {
            run_check(async move { sqlx::query("SELECT 1").execute(&pool).await.map(drop) }).await
        }
        None => "healthy".to_string(),
    };

    let healthy = storage_status == "healthy" && otp_store_status == "healthy";
    if !healthy {
        tracing::error!(
            storage = %storage_status,
            otp_store = %otp_store_status,
            "Health check failed"
        );
    }

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthCheckResponse {
            status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
            storage: storage_status,
            otp_store: otp_store_status,
        }),
    )
}
