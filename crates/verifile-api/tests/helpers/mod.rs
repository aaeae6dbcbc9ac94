//! Shared harness for API integration tests.
//!
//! Every test gets its own router, in-memory passcode store, recording mailer, and
//! local storage rooted in a temporary directory.

#![allow(dead_code)]

use axum_test::TestServer;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;
use verifile_api::setup::routes::setup_routes;
use verifile_api::AppState;
use verifile_core::{Config, VerifileConfig};
use verifile_services::{InMemoryOtpStore, RecordingOtpDelivery};
use verifile_storage::LocalStorage;

pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";
pub const TEST_BASE_URL: &str = "http://verifile.test";

pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub delivery: Arc<RecordingOtpDelivery>,
    pub otp_store: Arc<InMemoryOtpStore>,
    /// Kept alive so the storage root outlives the server
    pub storage_dir: TempDir,
}

impl TestApp {
    /// Request a passcode and return the code the mailer saw.
    pub async fn request_code(&self, email: &str) -> String {
        let response = self
            .server
            .post("/generate-otp")
            .json(&json!({ "email": email }))
            .await;
        response.assert_status_ok();
        self.delivery
            .last_code_for(&email.trim().to_lowercase())
            .await
            .expect("code should have been delivered")
    }

    /// Run the passcode step and return the upload grant.
    pub async fn verified_grant(&self, email: &str) -> String {
        let code = self.request_code(email).await;
        let response = self
            .server
            .post("/verify-otp")
            .json(&json!({ "email": email, "otp": code }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        body["uploadToken"]
            .as_str()
            .expect("verified response carries a grant")
            .to_string()
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(&[]).await
}

/// Build an app with extra environment-style overrides applied on top of the defaults.
pub async fn setup_test_app_with(overrides: &[(&str, &str)]) -> TestApp {
    let storage_dir = TempDir::new().expect("Failed to create temp dir");

    let mut vars: HashMap<String, String> = HashMap::new();
    vars.insert("UPLOAD_TOKEN_SECRET".into(), TEST_SECRET.into());
    vars.insert("PUBLIC_BASE_URL".into(), TEST_BASE_URL.into());
    vars.insert("STORAGE_BACKEND".into(), "local".into());
    vars.insert(
        "LOCAL_STORAGE_PATH".into(),
        storage_dir.path().to_string_lossy().into_owned(),
    );
    vars.insert("OTP_ECHO_ENABLED".into(), "true".into());
    for (key, value) in overrides {
        vars.insert((*key).to_string(), (*value).to_string());
    }

    let config = Config(Box::new(
        VerifileConfig::from_lookup(|k| vars.get(k).cloned()).expect("Failed to load config"),
    ));
    config.validate().expect("Test config should be valid");

    let storage = Arc::new(
        LocalStorage::new(storage_dir.path())
            .await
            .expect("Failed to create local storage"),
    );
    let otp_store = Arc::new(InMemoryOtpStore::new());
    let delivery = Arc::new(RecordingOtpDelivery::new());

    let state = Arc::new(AppState::new(
        config.clone(),
        storage,
        otp_store.clone(),
        delivery.clone(),
        None,
    ));
    let app = setup_routes(&config, state.clone()).expect("Failed to build routes");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        state,
        delivery,
        otp_store,
        storage_dir,
    }
}

/// Split an issued local upload URL into its request path and write token.
pub fn split_upload_url(upload_url: &str) -> (String, String) {
    let path_and_query = upload_url
        .strip_prefix(TEST_BASE_URL)
        .expect("upload URL should point at the public base URL");
    let (path, token) = path_and_query
        .split_once("?token=")
        .expect("upload URL should carry a write token");
    let token = urlencoding::decode(token)
        .expect("token should be valid UTF-8")
        .into_owned();
    (path.to_string(), token)
}
