//! Integration tests for rowcheck-web API endpoints
//!
//! Each test builds the full router with a temporary storage root, a real
//! worker pool, and a clock pinned to 2024-05-20.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use rowcheck_common::config::WorkerSettings;
use rowcheck_common::FixedClock;
use rowcheck_web::models::{RecordStatus, TaskStatus};
use rowcheck_web::services::spreadsheet::read_processed;
use rowcheck_web::services::ReportPipeline;
use rowcheck_web::storage::Storage;
use rowcheck_web::store::TaskStore;
use rowcheck_web::worker::WorkerPool;
use rowcheck_web::AppState;
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

const BOUNDARY: &str = "rowcheck-test-boundary";

struct TestApp {
    _temp_dir: tempfile::TempDir,
    app: Router,
    storage: Storage,
    _pool: WorkerPool,
}

/// Test helper: router backed by a temporary storage root
fn create_test_app() -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let storage = Storage::open(temp_dir.path().join("uploads")).expect("Failed to open storage");
    let clock = FixedClock::new(NaiveDate::from_ymd_opt(2024, 5, 20).unwrap());

    let store = Arc::new(TaskStore::new());
    let pipeline = Arc::new(ReportPipeline::new(storage.clone(), Arc::new(clock)));
    let pool = WorkerPool::start(
        WorkerSettings {
            worker_count: 2,
            queue_capacity: 8,
        },
        Arc::clone(&store),
        pipeline,
    );

    let state = AppState::new(store, storage.clone(), pool.dispatcher(), 1024 * 1024);
    TestApp {
        _temp_dir: temp_dir,
        app: rowcheck_web::build_router(state),
        storage,
        _pool: pool,
    }
}

/// Test helper: xlsx bytes with a header row and the given (name, date) rows
fn workbook_bytes(rows: &[(&str, &str)]) -> Vec<u8> {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "Full Name").unwrap();
    sheet.write_string(0, 1, "Birth Date").unwrap();
    for (i, (name, date)) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        if !name.is_empty() {
            sheet.write_string(row, 0, *name).unwrap();
        }
        if !date.is_empty() {
            sheet.write_string(row, 1, *date).unwrap();
        }
    }
    workbook.save_to_buffer().unwrap()
}

fn multipart_body(filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(filename: &str, content: &[u8], json: bool) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if json {
        builder = builder.header(header::ACCEPT, "application/json");
    }
    builder
        .body(Body::from(multipart_body(filename, content)))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Upload via the JSON API and return the task id
async fn submit(app: &Router, filename: &str, content: &[u8]) -> String {
    let response = app
        .clone()
        .oneshot(upload_request(filename, content, true))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let json = body_json(response).await;
    assert_eq!(json["status"], "PENDING");
    json["task_id"].as_str().unwrap().to_string()
}

/// Poll /status/check until the task reaches a terminal state
async fn wait_for_terminal(app: &Router, task_id: &str) -> serde_json::Value {
    for _ in 0..250 {
        let response = app
            .clone()
            .oneshot(get(&format!("/status/check?taskId={}", task_id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        if json["status"] == "COMPLETED" || json["status"] == "FAILED" {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("task {} never reached a terminal state", task_id);
}

#[tokio::test]
async fn test_health_endpoint() {
    let test = create_test_app();

    let response = test.app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "rowcheck");
    assert!(json["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn test_upload_form_page() {
    let test = create_test_app();

    let response = test.app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("action=\"/upload\""));
}

#[tokio::test]
async fn test_upload_processes_rows() {
    let test = create_test_app();
    let content = workbook_bytes(&[
        ("Ivanov Ivan", "1990-05-15"),
        ("", "1990-05-15"),
        ("Time Traveller", "2030-01-01"),
        ("Bad Date", "15.05.1990"),
    ]);

    let task_id = submit(&test.app, "people.xlsx", &content).await;
    let status = wait_for_terminal(&test.app, &task_id).await;
    assert_eq!(status["status"], "COMPLETED");
    assert_eq!(status["completed"], true);

    let records = read_processed(&test.storage.processed_path(&task_id)).unwrap();
    assert_eq!(records.len(), 4);

    assert_eq!(records[0].full_name, "Ivanov Ivan");
    assert_eq!((records[0].age_years, records[0].age_months), (34, 0));
    assert_eq!(records[0].status, RecordStatus::Ok);

    assert_eq!(records[1].error_details, "missing name");
    assert!(records[2].error_details.contains("future"));
    assert_eq!(records[2].birth_date, NaiveDate::from_ymd_opt(2030, 1, 1));
    assert_eq!(records[3].error_details, "invalid date format: 15.05.1990");

    // Upload persisted under its task id
    assert!(test
        .storage
        .root()
        .join(format!("{}_people.xlsx", task_id))
        .exists());
}

#[tokio::test]
async fn test_terminal_state_is_stable() {
    let test = create_test_app();
    let task_id = submit(&test.app, "one.xlsx", &workbook_bytes(&[("A", "2000-01-01")])).await;

    let first = wait_for_terminal(&test.app, &task_id).await;
    for _ in 0..5 {
        let response = test
            .app
            .clone()
            .oneshot(get(&format!("/status/check?taskId={}", task_id)))
            .await
            .unwrap();
        assert_eq!(body_json(response).await, first);
    }
}

#[tokio::test]
async fn test_html_upload_redirects_to_status_page() {
    let test = create_test_app();
    let content = workbook_bytes(&[("A", "2000-01-01")]);

    let response = test
        .app
        .clone()
        .oneshot(upload_request("a.xlsx", &content, false))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
    assert!(location.starts_with("/status?taskId="));

    let task_id = location.trim_start_matches("/status?taskId=").to_string();
    wait_for_terminal(&test.app, &task_id).await;

    let response = test.app.clone().oneshot(get(&location)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("COMPLETED"));
    assert!(html.contains("status-ok"));
}

#[tokio::test]
async fn test_upload_rejects_empty_file() {
    let test = create_test_app();

    let response = test
        .app
        .clone()
        .oneshot(upload_request("empty.xlsx", b"", true))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "BAD_REQUEST");

    // Nothing stored
    assert_eq!(std::fs::read_dir(test.storage.root()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_upload_rejects_wrong_extension() {
    let test = create_test_app();

    let response = test
        .app
        .clone()
        .oneshot(upload_request("people.csv", b"name,date\n", false))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("Only .xlsx files are accepted"));
}

#[tokio::test]
async fn test_upload_rejects_overlong_filename() {
    let test = create_test_app();
    let filename = format!("{}.xlsx", "a".repeat(300));

    let response = test
        .app
        .clone()
        .oneshot(upload_request(&filename, b"PK", true))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
    assert_eq!(std::fs::read_dir(test.storage.root()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_corrupt_upload_fails_task() {
    let test = create_test_app();
    let task_id = submit(&test.app, "broken.xlsx", b"not really a workbook").await;

    let status = wait_for_terminal(&test.app, &task_id).await;
    assert_eq!(status["status"], "FAILED");
    assert_eq!(status["completed"], false);

    let response = test
        .app
        .clone()
        .oneshot(get(&format!("/status?taskId={}", task_id)))
        .await
        .unwrap();
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("failed to read spreadsheet"));

    // No results for a failed task
    let response = test
        .app
        .clone()
        .oneshot(get(&format!("/download/pdf?taskId={}", task_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_unknown_task() {
    let test = create_test_app();
    let unknown = uuid::Uuid::new_v4();

    for uri in [
        format!("/status/check?taskId={}", unknown),
        format!("/status?taskId={}", unknown),
        "/status/check?taskId=not-a-uuid".to_string(),
    ] {
        let response = test.app.clone().oneshot(get(&uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[tokio::test]
async fn test_pdf_for_unknown_task_is_not_found() {
    let test = create_test_app();

    let response = test
        .app
        .clone()
        .oneshot(get(&format!("/download/pdf?taskId={}", uuid::Uuid::new_v4())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_path_traversal_is_forbidden() {
    let test = create_test_app();

    for uri in [
        "/download/pdf?taskId=x/../../../etc/passwd",
        "/view/pdf?taskId=x%2F..%2F..%2F..%2Fetc%2Fpasswd",
        "/download/xlsx?taskId=a/../../secret",
    ] {
        let response = test.app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{}", uri);

        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "FORBIDDEN");
    }
}

#[tokio::test]
async fn test_downloads_after_completion() {
    let test = create_test_app();
    let content = workbook_bytes(&[("Ivanov Ivan", "1990-05-15"), ("", "")]);
    let task_id = submit(&test.app, "people.xlsx", &content).await;
    assert_eq!(wait_for_terminal(&test.app, &task_id).await["status"], "COMPLETED");

    let response = test
        .app
        .clone()
        .oneshot(get(&format!("/download/pdf?taskId={}", task_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment"));
    assert!(disposition.contains(&format!("report_{}.pdf", task_id)));
    assert!(body_bytes(response).await.starts_with(b"%PDF"));

    let response = test
        .app
        .clone()
        .oneshot(get(&format!("/view/pdf?taskId={}", task_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .starts_with("inline"));

    let response = test
        .app
        .clone()
        .oneshot(get(&format!("/download/xlsx?taskId={}", task_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    // xlsx is a zip archive
    assert!(body_bytes(response).await.starts_with(b"PK"));

    let response = test
        .app
        .clone()
        .oneshot(get(&format!("/report/html?taskId={}", task_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("Ivanov Ivan"));
    assert!(html.contains("status-ok"));
}

#[tokio::test]
async fn test_empty_report_file_is_reported() {
    let test = create_test_app();
    let task_id = submit(&test.app, "a.xlsx", &workbook_bytes(&[("A", "2000-01-01")])).await;
    assert_eq!(wait_for_terminal(&test.app, &task_id).await["status"], "COMPLETED");

    std::fs::write(test.storage.report_path(&task_id), b"").unwrap();

    let response = test
        .app
        .clone()
        .oneshot(get(&format!("/download/pdf?taskId={}", task_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"]["code"], "EMPTY_FILE");
}

#[tokio::test]
async fn test_missing_report_file_is_not_found() {
    let test = create_test_app();
    let task_id = submit(&test.app, "a.xlsx", &workbook_bytes(&[("A", "2000-01-01")])).await;
    assert_eq!(wait_for_terminal(&test.app, &task_id).await["status"], "COMPLETED");

    std::fs::remove_file(test.storage.report_path(&task_id)).unwrap();

    let response = test
        .app
        .clone()
        .oneshot(get(&format!("/download/pdf?taskId={}", task_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_concurrent_uploads_all_finish() {
    let test = create_test_app();
    let content = workbook_bytes(&[("A", "2000-01-01"), ("B", "1999-12-31")]);

    let mut ids = Vec::new();
    for i in 0..10 {
        ids.push(submit(&test.app, &format!("file{}.xlsx", i), &content).await);
    }

    for id in &ids {
        let status = wait_for_terminal(&test.app, id).await;
        assert_eq!(status["status"], TaskStatus::Completed.as_str());
    }
}
