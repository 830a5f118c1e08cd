//! File upload, listing, download and processing.
//!
//! Run with: `cargo test -p sheetchart-api --test files_test`

mod helpers;

use axum::http::StatusCode;
use helpers::auth::{test_user, TestUser};
use helpers::fixtures::{corrupt_workbook, sales_workbook, sales_workbook_xls, XLS, XLSX};
use helpers::{setup_test_app, TestApp, TEST_MAX_FILE_SIZE};
use serde_json::Value;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// The counter is updated by a spawned task after the body is sent.
async fn wait_for_download_count(app: &TestApp, user: &TestUser, id: &str, expected: i64) -> Value {
    let mut file = Value::Null;
    for _ in 0..50 {
        file = app.get(user, &format!("/files/{}", id)).await.json();
        if file["downloadCount"].as_i64() == Some(expected) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    file
}

#[tokio::test]
async fn test_upload_spreadsheet() {
    let app = setup_test_app().await;
    let user = test_user();

    let response = app
        .upload(&user, "Quarterly Sales.xlsx", XLSX, sales_workbook())
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);

    let body: Value = response.json();
    assert_eq!(body["status"], "uploading");
    assert_eq!(body["originalName"], "Quarterly Sales.xlsx");
    assert_eq!(body["mimetype"], XLSX);
    assert_eq!(body["uploadedBy"], user.user_id.to_string());
    assert_eq!(body["downloadCount"], 0);
    assert_eq!(body["size"], sales_workbook().len() as u64);

    let filename = body["filename"].as_str().unwrap();
    assert!(filename.starts_with("excel-"));
    assert!(filename.ends_with(".xlsx"));
    assert!(!filename.contains("Quarterly"));
    assert_eq!(body["path"], body["filename"]);
    assert_eq!(app.stored_object_count(), 1);
}

#[tokio::test]
async fn test_upload_accepts_xls_extension() {
    let app = setup_test_app().await;
    let user = test_user();

    let response = app.upload(&user, "legacy.XLS", XLS, sales_workbook_xls()).await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let body: Value = response.json();
    assert!(body["filename"].as_str().unwrap().ends_with(".xls"));
}

#[tokio::test]
async fn test_upload_rejects_disallowed_content_type() {
    let app = setup_test_app().await;
    let user = test_user();

    let response = app
        .upload(&user, "sales.xlsx", "text/csv", sales_workbook())
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_INPUT");
    assert_eq!(app.stored_object_count(), 0);
}

#[tokio::test]
async fn test_upload_rejects_disallowed_extension() {
    let app = setup_test_app().await;
    let user = test_user();

    let response = app.upload(&user, "sales.csv", XLSX, sales_workbook()).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(app.stored_object_count(), 0);
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let app = setup_test_app().await;
    let user = test_user();

    let form = axum_test::multipart::MultipartForm::new().add_text("note", "no file here");
    let response = app
        .client()
        .post("/files/upload")
        .add_header("Authorization", user.bearer())
        .multipart(form)
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "No file uploaded");
}

#[tokio::test]
async fn test_upload_rejects_empty_file() {
    let app = setup_test_app().await;
    let user = test_user();

    let response = app.upload(&user, "empty.xlsx", XLSX, Vec::new()).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(app.stored_object_count(), 0);
}

#[tokio::test]
async fn test_upload_over_limit_leaves_nothing_stored() {
    let app = setup_test_app().await;
    let user = test_user();

    let response = app
        .upload(&user, "huge.xlsx", XLSX, vec![b'x'; TEST_MAX_FILE_SIZE + 1])
        .await;
    assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(app.stored_object_count(), 0);

    let listed: Vec<Value> = app.get(&user, "/files/list").await.json();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn test_list_files_newest_first_and_scoped() {
    let app = setup_test_app().await;
    let user = test_user();
    let other = test_user();

    for name in ["first.xlsx", "second.xlsx", "third.xlsx"] {
        let response = app.upload(&user, name, XLSX, sales_workbook()).await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
    }
    app.upload(&other, "theirs.xlsx", XLSX, sales_workbook()).await;

    let response = app.get(&user, "/files/list").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let files: Vec<Value> = response.json();
    let names: Vec<&str> = files
        .iter()
        .map(|f| f["originalName"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["third.xlsx", "second.xlsx", "first.xlsx"]);
}

#[tokio::test]
async fn test_get_file_is_owner_scoped() {
    let app = setup_test_app().await;
    let owner = test_user();
    let stranger = test_user();

    let uploaded: Value = app
        .upload(&owner, "sales.xlsx", XLSX, sales_workbook())
        .await
        .json();
    let path = format!("/files/{}", uploaded["_id"].as_str().unwrap());

    assert_eq!(app.get(&owner, &path).await.status_code(), StatusCode::OK);

    let response = app.get(&stranger, &path).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "File not found or access denied");
}

#[tokio::test]
async fn test_malformed_id_is_bad_request() {
    let app = setup_test_app().await;
    let user = test_user();

    let response = app.get(&user, "/files/not-a-uuid").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let response = app.get(&user, "/files/not-a-uuid/download").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_download_streams_bytes_and_counts() {
    let app = setup_test_app().await;
    let user = test_user();
    let workbook = sales_workbook();

    let uploaded: Value = app
        .upload(&user, "Q1 \"final\".xlsx", XLSX, workbook.clone())
        .await
        .json();
    let id = uploaded["_id"].as_str().unwrap().to_string();

    let response = app.get(&user, &format!("/files/{}/download", id)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.as_bytes().as_ref(), workbook.as_slice());
    assert_eq!(response.header("content-type"), XLSX);
    assert_eq!(
        response.header("content-length"),
        workbook.len().to_string().as_str()
    );
    let disposition = response.header("content-disposition");
    let disposition = disposition.to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"Q1 \\\"final\\\".xlsx\""));

    let file = wait_for_download_count(&app, &user, &id, 1).await;
    assert_eq!(file["downloadCount"], 1);
    assert!(file["lastAccessed"].is_string());
}

#[tokio::test]
async fn test_download_over_tcp_connection_counts() {
    let app = setup_test_app().await;
    let user = test_user();
    let workbook = sales_workbook();

    let uploaded: Value = app
        .upload(&user, "sales.xlsx", XLSX, workbook.clone())
        .await
        .json();
    let id = uploaded["_id"].as_str().unwrap().to_string();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app.router.clone();
    tokio::spawn(async move { axum::serve(listener, router).await });

    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET /files/{}/download HTTP/1.1\r\nHost: {}\r\nAuthorization: {}\r\nConnection: close\r\n\r\n",
        id,
        addr,
        user.bearer()
    );
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();

    assert!(response.starts_with(b"HTTP/1.1 200 OK"));
    assert!(response.ends_with(&workbook));

    let file = wait_for_download_count(&app, &user, &id, 1).await;
    assert_eq!(file["downloadCount"], 1);
    assert!(file["lastAccessed"].is_string());
}

#[tokio::test]
async fn test_download_foreign_file_matches_missing_file() {
    let app = setup_test_app().await;
    let owner = test_user();
    let stranger = test_user();

    let uploaded: Value = app
        .upload(&owner, "sales.xlsx", XLSX, sales_workbook())
        .await
        .json();

    let foreign = app
        .get(
            &stranger,
            &format!("/files/{}/download", uploaded["_id"].as_str().unwrap()),
        )
        .await;
    let missing = app
        .get(
            &stranger,
            &format!("/files/{}/download", uuid::Uuid::new_v4()),
        )
        .await;

    assert_eq!(foreign.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
    let foreign: Value = foreign.json();
    let missing: Value = missing.json();
    assert_eq!(foreign["error"], missing["error"]);
}

#[tokio::test]
async fn test_process_workbook() {
    let app = setup_test_app().await;
    let user = test_user();

    let uploaded: Value = app
        .upload(&user, "sales.xlsx", XLSX, sales_workbook())
        .await
        .json();
    let id = uploaded["_id"].as_str().unwrap();

    let response = app.post(&user, &format!("/files/{}/process", id)).await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["status"], "completed");
    let data = &body["processedData"];
    assert_eq!(data["headers"], serde_json::json!(["Month", "Revenue", "Region"]));
    assert_eq!(data["rowCount"], 2);
    assert_eq!(data["sheets"][0]["name"], "Sheet1");
    assert_eq!(data["dataPreview"][0], serde_json::json!([1, 100, "X"]));
    assert_eq!(data["metadata"]["hasHeaders"], true);

    // Completed files cannot be processed again.
    let again = app.post(&user, &format!("/files/{}/process", id)).await;
    assert_eq!(again.status_code(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_process_legacy_xls_workbook() {
    let app = setup_test_app().await;
    let user = test_user();

    let uploaded: Value = app
        .upload(&user, "sales.xls", XLS, sales_workbook_xls())
        .await
        .json();
    let id = uploaded["_id"].as_str().unwrap();

    let response = app.post(&user, &format!("/files/{}/process", id)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "completed");
    assert_eq!(
        body["processedData"]["headers"],
        serde_json::json!(["Month", "Revenue", "Region"])
    );
    assert_eq!(body["processedData"]["rowCount"], 2);
}

#[tokio::test]
async fn test_process_unreadable_workbook_marks_error() {
    let app = setup_test_app().await;
    let user = test_user();

    let uploaded: Value = app
        .upload(&user, "broken.xlsx", XLSX, corrupt_workbook())
        .await
        .json();
    let id = uploaded["_id"].as_str().unwrap();

    let response = app.post(&user, &format!("/files/{}/process", id)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "error");
    assert!(body["processingError"].is_string());
    assert!(body.get("processedData").is_none());
}

#[tokio::test]
async fn test_process_foreign_file_is_not_found() {
    let app = setup_test_app().await;
    let owner = test_user();
    let stranger = test_user();

    let uploaded: Value = app
        .upload(&owner, "sales.xlsx", XLSX, sales_workbook())
        .await
        .json();
    let id = uploaded["_id"].as_str().unwrap();

    let response = app.post(&stranger, &format!("/files/{}/process", id)).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let file: Value = app.get(&owner, &format!("/files/{}", id)).await.json();
    assert_eq!(file["status"], "uploading");
}
