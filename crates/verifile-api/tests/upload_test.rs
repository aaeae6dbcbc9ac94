mod helpers;

use axum::http::StatusCode;
use bytes::Bytes;
use helpers::{setup_test_app, split_upload_url, TestApp};
use serde_json::{json, Value};

async fn request_upload_url(app: &TestApp, grant: &str, file_size: u64) -> Value {
    let response = app
        .server
        .post("/get-upload-url")
        .json(&json!({
            "email": "a@b.com",
            "fileName": "report.pdf",
            "fileType": "application/pdf",
            "fileSize": file_size,
            "uploadToken": grant,
        }))
        .await;
    response.assert_status_ok();
    response.json()
}

#[tokio::test]
async fn test_get_upload_url_issues_local_target() {
    let app = setup_test_app().await;
    let grant = app.verified_grant("a@b.com").await;

    let body = request_upload_url(&app, &grant, 1024).await;

    let key = body["storageKey"].as_str().unwrap();
    assert!(key.starts_with("uploads/"));
    assert!(key.ends_with("/report.pdf"));
    assert_eq!(body["method"], "PUT");

    let url = body["uploadUrl"].as_str().unwrap();
    let (path, token) = split_upload_url(url);
    assert_eq!(path, format!("/{}", key));
    assert!(!token.is_empty());
}

#[tokio::test]
async fn test_get_upload_url_rejects_forged_grant() {
    let app = setup_test_app().await;

    let response = app
        .server
        .post("/get-upload-url")
        .json(&json!({
            "email": "a@b.com",
            "fileName": "report.pdf",
            "fileType": "application/pdf",
            "uploadToken": "not-a-real-token",
        }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_get_upload_url_rejects_grant_for_other_email() {
    let app = setup_test_app().await;
    let grant = app.verified_grant("someone@else.com").await;

    let response = app
        .server
        .post("/get-upload-url")
        .json(&json!({
            "email": "a@b.com",
            "fileName": "report.pdf",
            "fileType": "application/pdf",
            "uploadToken": grant,
        }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_get_upload_url_rejects_oversized_file() {
    let app = setup_test_app().await;
    let grant = app.verified_grant("a@b.com").await;

    let response = app
        .server
        .post("/get-upload-url")
        .json(&json!({
            "email": "a@b.com",
            "fileName": "huge.bin",
            "fileType": "application/octet-stream",
            "fileSize": 10 * 1024 * 1024 + 1,
            "uploadToken": grant,
        }))
        .await;

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = response.json();
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn test_file_exactly_at_limit_is_accepted() {
    let app = setup_test_app().await;
    let grant = app.verified_grant("a@b.com").await;

    let body = request_upload_url(&app, &grant, 10 * 1024 * 1024).await;
    assert!(body["storageKey"].is_string());
}

#[tokio::test]
async fn test_direct_write_and_confirm() {
    let app = setup_test_app().await;
    let grant = app.verified_grant("a@b.com").await;
    let body = request_upload_url(&app, &grant, 11).await;
    let key = body["storageKey"].as_str().unwrap().to_string();
    let (path, token) = split_upload_url(body["uploadUrl"].as_str().unwrap());

    let response = app
        .server
        .put(&path)
        .add_query_param("token", &token)
        .content_type("application/pdf")
        .bytes(Bytes::from_static(b"hello world"))
        .await;
    response.assert_status_ok();
    let written: Value = response.json();
    assert_eq!(written["storageKey"], key.as_str());
    assert_eq!(written["sizeBytes"], 11);

    let stored = app.storage_dir.path().join(&key);
    assert_eq!(std::fs::read(stored).unwrap(), b"hello world");

    let response = app
        .server
        .post("/confirm-upload")
        .json(&json!({ "storageKey": key, "uploadToken": grant }))
        .await;
    response.assert_status_ok();
    let confirmed: Value = response.json();
    assert_eq!(confirmed["fileName"], "report.pdf");
    assert_eq!(confirmed["fileSizeBytes"], 11);
}

#[tokio::test]
async fn test_direct_write_accepts_double_dot_in_file_name() {
    let app = setup_test_app().await;
    let grant = app.verified_grant("a@b.com").await;

    let response = app
        .server
        .post("/get-upload-url")
        .json(&json!({
            "email": "a@b.com",
            "fileName": "report..final.pdf",
            "fileType": "application/pdf",
            "fileSize": 4,
            "uploadToken": grant,
        }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let key = body["storageKey"].as_str().unwrap().to_string();
    assert!(key.ends_with("/report..final.pdf"));
    let (path, token) = split_upload_url(body["uploadUrl"].as_str().unwrap());

    let response = app
        .server
        .put(&path)
        .add_query_param("token", &token)
        .content_type("application/pdf")
        .bytes(Bytes::from_static(b"%PDF"))
        .await;
    response.assert_status_ok();

    let response = app
        .server
        .post("/confirm-upload")
        .json(&json!({ "storageKey": key, "uploadToken": grant }))
        .await;
    response.assert_status_ok();
    let confirmed: Value = response.json();
    assert_eq!(confirmed["fileName"], "report..final.pdf");
}

#[tokio::test]
async fn test_direct_write_rejects_bad_token() {
    let app = setup_test_app().await;
    let grant = app.verified_grant("a@b.com").await;
    let body = request_upload_url(&app, &grant, 4).await;
    let (path, _) = split_upload_url(body["uploadUrl"].as_str().unwrap());

    let response = app
        .server
        .put(&path)
        .add_query_param("token", "forged")
        .bytes(Bytes::from_static(b"data"))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_direct_write_token_bound_to_key() {
    let app = setup_test_app().await;
    let grant = app.verified_grant("a@b.com").await;
    let body = request_upload_url(&app, &grant, 4).await;
    let (_, token) = split_upload_url(body["uploadUrl"].as_str().unwrap());

    let response = app
        .server
        .put("/uploads/00000000-0000-4000-8000-000000000000/other.pdf")
        .add_query_param("token", &token)
        .bytes(Bytes::from_static(b"data"))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_grant_cannot_be_used_as_write_token() {
    let app = setup_test_app().await;
    let grant = app.verified_grant("a@b.com").await;
    let body = request_upload_url(&app, &grant, 4).await;
    let (path, _) = split_upload_url(body["uploadUrl"].as_str().unwrap());

    let response = app
        .server
        .put(&path)
        .add_query_param("token", &grant)
        .bytes(Bytes::from_static(b"data"))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_confirm_missing_upload() {
    let app = setup_test_app().await;
    let grant = app.verified_grant("a@b.com").await;
    let body = request_upload_url(&app, &grant, 4).await;

    let response = app
        .server
        .post("/confirm-upload")
        .json(&json!({ "storageKey": body["storageKey"], "uploadToken": grant }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_confirm_requires_grant() {
    let app = setup_test_app().await;

    let response = app
        .server
        .post("/confirm-upload")
        .json(&json!({
            "storageKey": "uploads/00000000-0000-4000-8000-000000000000/report.pdf",
            "uploadToken": "bogus",
        }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}
