//! Router tests against an in-memory tracker
use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use tempfile::TempDir;
use ticket_report_core::{
    Author, Comment, CommentFetcher, ImageFetcher, OperatorIdentity, Result, WorkItem, WorkItemFetcher,
};
use ticket_report_server::{AppState, DOCX_MIME, router};
use tower::ServiceExt;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

struct FakeTracker;

impl WorkItemFetcher for FakeTracker {
    fn fetch_work_item(&self, id: u64) -> Result<Option<WorkItem>> {
        Ok(matches!(id, 7 | 8).then(|| WorkItem { id, title: "Scanner offline".into() }))
    }
}

impl CommentFetcher for FakeTracker {
    fn fetch_comments(&self, work_item_id: u64) -> Result<Option<Vec<Comment>>> {
        let author = match work_item_id {
            7 => "Dana Reyes",
            _ => "Someone Else",
        };
        Ok(Some(vec![Comment {
            author: Author { display_name: author.into(), unique_name: String::new() },
            created_date: "2024-06-11T13:05:00.000Z".into(),
            text: "<div>Root Cause:</div><div>Loose cable</div><div>Status:</div><div>Closed</div>".into(),
        }]))
    }
}

impl ImageFetcher for FakeTracker {
    fn fetch_image(&self, _url: &str) -> Option<Vec<u8>> {
        None
    }
}

fn write_template(dir: &TempDir) -> PathBuf {
    let document = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#,
        r#"<w:p><w:r><w:t>Ticket {{TICKETNUM}} for {{CLIENT}}</w:t></w:r></w:p>"#,
        r#"<w:p><w:r><w:t>{{RCA}}</w:t></w:r></w:p>"#,
        r#"<w:p><w:r><w:t>{{REPORT_CONTENT}}</w:t></w:r></w:p>"#,
        r#"</w:body></w:document>"#
    );

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opt = SimpleFileOptions::default();
    zip.start_file("[Content_Types].xml", opt).unwrap();
    zip.write_all(br#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"></Types>"#)
        .unwrap();
    zip.start_file("word/document.xml", opt).unwrap();
    zip.write_all(document.as_bytes()).unwrap();
    let bytes = zip.finish().unwrap().into_inner();

    let path = dir.path().join("template.docx");
    std::fs::write(&path, bytes).unwrap();
    path
}

fn app(template: PathBuf) -> axum::Router {
    let state = AppState::new(
        Arc::new(FakeTracker),
        OperatorIdentity::new("Dana Reyes", "dana@example.com"),
        template,
    );
    router(state)
}

fn post(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_form_page() {
    let dir = TempDir::new().unwrap();
    let response = app(write_template(&dir))
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains(r#"name="work_item_id""#));
    assert!(html.contains(r#"value="offsite""#));
}

#[tokio::test]
async fn test_health() {
    let dir = TempDir::new().unwrap();
    let response = app(write_template(&dir))
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_report_download() {
    let dir = TempDir::new().unwrap();
    let response = app(write_template(&dir))
        .oneshot(post("work_item_id=7&client_name=Corner+Market&location=onsite"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], DOCX_MIME);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        r#"attachment; filename="Ticket No. 7 - Status Report for Corner Market.docx""#
    );

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(bytes.starts_with(b"PK"));
}

#[tokio::test]
async fn test_unknown_work_item_message() {
    let dir = TempDir::new().unwrap();
    let response = app(write_template(&dir))
        .oneshot(post("work_item_id=99&client_name=Acme&location=offsite"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("❌ Work item ID '99' does not exist."));
    assert!(html.contains(r#"value="99""#));
    assert!(html.contains(r#"value="offsite" checked"#));
}

#[tokio::test]
async fn test_no_comments_for_account_message() {
    let dir = TempDir::new().unwrap();
    let response = app(write_template(&dir))
        .oneshot(post("work_item_id=8&client_name=Acme&location=onsite"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("❌ No comments found for your account."));
}

#[tokio::test]
async fn test_invalid_input() {
    let dir = TempDir::new().unwrap();

    let response = app(write_template(&dir))
        .oneshot(post("work_item_id=seven&client_name=Acme&location=onsite"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("❌ Work item ID 'seven' is not a number."));

    let response = app(write_template(&dir))
        .oneshot(post("work_item_id=7&client_name=Acme&location=moon"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("❌ Invalid location: moon"));
}

#[tokio::test]
async fn test_missing_template_message() {
    let dir = TempDir::new().unwrap();
    let response = app(dir.path().join("missing.docx"))
        .oneshot(post("work_item_id=7&client_name=Acme&location=onsite"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("❌ Failed to generate report: File not found"));
}
