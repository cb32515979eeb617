//! Blocking HTTP client for the work item tracker.
//!
//! This module talks to the Azure DevOps / TFS work item REST API: the work
//! item itself, its comments, and the images embedded in comment bodies.
//! Requests to the tracker authenticate with a personal access token over
//! basic auth; images hosted anywhere else are fetched anonymously. Every
//! request is bounded by [`ClientConfig::timeout`].

use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::model::{Author, Comment, WorkItem};
use crate::source::{CommentFetcher, ImageFetcher, WorkItemFetcher};
use crate::{ReportError, Result};

const WORK_ITEM_API_VERSION: &str = "5.1";
const COMMENTS_API_VERSION: &str = "5.1-preview.3";
const TITLE_FIELD: &str = "System.Title";

/// Tracker connection settings.
#[derive(Clone)]
pub struct ClientConfig {
    /// Collection/project base URL, e.g. `https://tfs.example.com/tfs/Collection/Project`.
    pub org_url: String,
    /// Personal access token.
    pub pat: String,
    /// Request timeout in seconds.
    pub timeout: u64,
    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            org_url: String::new(),
            pat: String::new(),
            timeout: 30,
            user_agent: format!("ticket-report/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("org_url", &self.org_url)
            .field("pat", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct WorkItemResponse {
    id: u64,
    fields: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct CommentsResponse {
    comments: Option<Vec<CommentResponse>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentResponse {
    #[serde(default)]
    created_by: Option<IdentityResponse>,
    #[serde(default)]
    created_date: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityResponse {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    unique_name: Option<String>,
}

impl WorkItemResponse {
    /// A response without `fields` does not describe a work item.
    fn into_work_item(self) -> Option<WorkItem> {
        let fields = self.fields?;
        let title = fields
            .get(TITLE_FIELD)
            .and_then(|value| value.as_str())
            .unwrap_or_default()
            .to_string();
        Some(WorkItem { id: self.id, title })
    }
}

impl From<CommentResponse> for Comment {
    fn from(response: CommentResponse) -> Self {
        let created_by = response.created_by.unwrap_or_default();
        Comment {
            author: Author {
                display_name: created_by.display_name.unwrap_or_default(),
                unique_name: created_by.unique_name.unwrap_or_default(),
            },
            created_date: response.created_date.unwrap_or_default(),
            text: response.text.unwrap_or_default(),
        }
    }
}

/// Client for the tracker REST API.
///
/// The client is blocking; async callers must run it on a blocking thread.
///
/// # Example
///
/// ```rust,no_run
/// use ticket_report_core::{ClientConfig, TrackerClient, WorkItemFetcher};
///
/// let client = TrackerClient::new(ClientConfig {
///     org_url: "https://tfs.example.com/tfs/Collection/Project".to_string(),
///     pat: "token".to_string(),
///     ..Default::default()
/// })?;
/// let item = client.fetch_work_item(1234)?;
/// # Ok::<(), ticket_report_core::ReportError>(())
/// ```
pub struct TrackerClient {
    client: Client,
    base_url: Url,
    config: ClientConfig,
}

impl TrackerClient {
    /// Creates a client, validating the base URL.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let trimmed = config.org_url.trim().trim_end_matches('/');
        let base_url = Url::parse(&format!("{}/", trimmed)).map_err(|e| ReportError::InvalidUrl(e.to_string()))?;

        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ReportError::InvalidUrl(format!(
                "{}: URL must use http:// or https://",
                config.org_url
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(ReportError::HttpError)?;

        Ok(Self { client, base_url, config })
    }

    /// Gets the validated base URL (always ends with `/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn api_url(&self, path: &str, api_version: &str) -> Result<Url> {
        let mut url = self.base_url.join(path).map_err(|e| ReportError::InvalidUrl(e.to_string()))?;
        url.query_pairs_mut().append_pair("api-version", api_version);
        Ok(url)
    }

    fn get(&self, url: Url) -> RequestBuilder {
        self.client.get(url).basic_auth("", Some(&self.config.pat))
    }

    fn classify(&self, error: reqwest::Error) -> ReportError {
        if error.is_timeout() {
            ReportError::Timeout { timeout: self.config.timeout }
        } else {
            ReportError::HttpError(error)
        }
    }

    /// GETs JSON, mapping non-success statuses and undecodable bodies to `None`.
    fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>> {
        debug!(%url, "GET");

        let response = self
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            debug!(%url, %status, "Tracker returned an error status");
            return Ok(None);
        }

        match response.json::<T>() {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.is_timeout() => Err(self.classify(e)),
            Err(e) => {
                debug!(%url, error = %e, "Tracker response is not the expected JSON");
                Ok(None)
            }
        }
    }

    fn download(&self, src: &str) -> Result<Vec<u8>> {
        let url = Url::parse(src)
            .or_else(|_| self.base_url.join(src))
            .map_err(|e| ReportError::InvalidUrl(format!("{}: {}", src, e)))?;

        let request = if url.origin() == self.base_url.origin() {
            self.get(url)
        } else {
            debug!(%url, "Image is not on the tracker, fetching without credentials");
            self.client.get(url)
        };

        let response = request.send().map_err(|e| self.classify(e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::ImageFetchFailed { url: src.to_string(), reason: status.to_string() });
        }

        let bytes = response.bytes().map_err(|e| self.classify(e))?;
        Ok(bytes.to_vec())
    }
}

impl WorkItemFetcher for TrackerClient {
    fn fetch_work_item(&self, id: u64) -> Result<Option<WorkItem>> {
        let url = self.api_url(&format!("_apis/wit/workitems/{}", id), WORK_ITEM_API_VERSION)?;
        let response: Option<WorkItemResponse> = self.get_json(url)?;
        Ok(response.and_then(WorkItemResponse::into_work_item))
    }
}

impl CommentFetcher for TrackerClient {
    fn fetch_comments(&self, work_item_id: u64) -> Result<Option<Vec<Comment>>> {
        let url = self.api_url(&format!("_apis/wit/workItems/{}/comments", work_item_id), COMMENTS_API_VERSION)?;
        let response: Option<CommentsResponse> = self.get_json(url)?;
        Ok(response
            .and_then(|body| body.comments)
            .map(|comments| comments.into_iter().map(Comment::from).collect()))
    }
}

impl ImageFetcher for TrackerClient {
    fn fetch_image(&self, url: &str) -> Option<Vec<u8>> {
        match self.download(url) {
            Ok(bytes) => {
                debug!(url, size = bytes.len(), "Fetched image");
                Some(bytes)
            }
            Err(error) => {
                let error = match error {
                    failed @ ReportError::ImageFetchFailed { .. } => failed,
                    other => ReportError::ImageFetchFailed { url: url.to_string(), reason: other.to_string() },
                };
                warn!("{}", error);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    fn config(org_url: &str) -> ClientConfig {
        ClientConfig { org_url: org_url.to_string(), pat: "secret".to_string(), ..Default::default() }
    }

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
    }

    /// Answers a single request with `response` and hands back the request head, lower-cased.
    fn serve_once(response: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut head = String::new();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                    break;
                }
                head.push_str(&line);
            }
            stream.write_all(response.as_bytes()).unwrap();
            head.to_lowercase()
        });

        (base, handle)
    }

    /// Accepts a connection and never answers.
    fn serve_silence() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        thread::spawn(move || {
            let (_stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_secs(3));
        });
        base
    }

    fn tracker_at(base: &str) -> TrackerClient {
        TrackerClient::new(config(&format!("{}/tfs/Collection/Project", base))).unwrap()
    }

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout, 30);
        assert!(config.user_agent.starts_with("ticket-report/"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let rendered = format!("{:?}", config("https://tfs.example.com"));
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("tfs.example.com"));
    }

    #[test]
    fn test_invalid_org_url() {
        assert!(matches!(TrackerClient::new(config("not a url")), Err(ReportError::InvalidUrl(_))));
        assert!(matches!(
            TrackerClient::new(config("ftp://tfs.example.com/tfs")),
            Err(ReportError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_api_urls_keep_project_path() {
        let client = TrackerClient::new(config("https://tfs.example.com/tfs/Collection/Project/")).unwrap();
        assert_eq!(client.base_url().as_str(), "https://tfs.example.com/tfs/Collection/Project/");

        let url = client.api_url("_apis/wit/workitems/42", WORK_ITEM_API_VERSION).unwrap();
        assert_eq!(
            url.as_str(),
            "https://tfs.example.com/tfs/Collection/Project/_apis/wit/workitems/42?api-version=5.1"
        );

        let url = client.api_url("_apis/wit/workItems/42/comments", COMMENTS_API_VERSION).unwrap();
        assert!(url.as_str().ends_with("/Project/_apis/wit/workItems/42/comments?api-version=5.1-preview.3"));
    }

    #[test]
    fn test_work_item_response_mapping() {
        let body = r#"{"id": 42, "fields": {"System.Title": "Printer offline", "System.State": "Active"}}"#;
        let response: WorkItemResponse = serde_json::from_str(body).unwrap();
        let item = response.into_work_item();
        assert_eq!(item, Some(WorkItem { id: 42, title: "Printer offline".to_string() }));
    }

    #[test]
    fn test_work_item_without_fields_is_absent() {
        let response: WorkItemResponse = serde_json::from_str(r#"{"id": 42}"#).unwrap();
        assert!(response.into_work_item().is_none());
    }

    #[test]
    fn test_comment_response_mapping() {
        let body = r#"{
            "totalCount": 2,
            "comments": [
                {
                    "createdBy": {"displayName": "Dana Reyes", "uniqueName": "dana@example.com"},
                    "createdDate": "2024-05-01T09:00:00.123Z",
                    "text": "<div>Status:</div><div>Closed</div>"
                },
                {"createdDate": "2024-05-02T09:00:00.000Z", "text": null}
            ]
        }"#;
        let response: CommentsResponse = serde_json::from_str(body).unwrap();
        let comments: Vec<Comment> = response.comments.unwrap().into_iter().map(Comment::from).collect();

        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].author.display_name, "Dana Reyes");
        assert_eq!(comments[0].author.unique_name, "dana@example.com");
        assert_eq!(comments[0].created_date, "2024-05-01T09:00:00.123Z");
        assert!(comments[1].text.is_empty());
        assert!(comments[1].author.display_name.is_empty());
    }

    #[test]
    fn test_missing_comment_list() {
        let response: CommentsResponse = serde_json::from_str(r#"{"count": 0}"#).unwrap();
        assert!(response.comments.is_none());
    }

    #[test]
    fn test_fetch_work_item_over_http() {
        let (base, server) =
            serve_once(http_response("200 OK", r#"{"id": 42, "fields": {"System.Title": "Printer offline"}}"#));

        let item = tracker_at(&base).fetch_work_item(42).unwrap();
        assert_eq!(item, Some(WorkItem { id: 42, title: "Printer offline".to_string() }));

        let head = server.join().unwrap();
        assert!(head.starts_with("get /tfs/collection/project/_apis/wit/workitems/42?api-version=5.1 "));
        assert!(head.contains("authorization: basic "));
    }

    #[test]
    fn test_error_status_means_absent() {
        let (base, server) = serve_once(http_response("404 Not Found", r#"{"message": "TF401232"}"#));
        assert_eq!(tracker_at(&base).fetch_work_item(42).unwrap(), None);
        server.join().unwrap();

        let (base, server) = serve_once(http_response("401 Unauthorized", ""));
        assert!(tracker_at(&base).fetch_comments(42).unwrap().is_none());
        server.join().unwrap();
    }

    #[test]
    fn test_body_without_payload_means_absent() {
        let (base, server) = serve_once(http_response("200 OK", r#"{"id": 42}"#));
        assert_eq!(tracker_at(&base).fetch_work_item(42).unwrap(), None);
        server.join().unwrap();

        let (base, server) = serve_once(http_response("200 OK", r#"{"totalCount": 0}"#));
        assert!(tracker_at(&base).fetch_comments(42).unwrap().is_none());
        assert!(server.join().unwrap().contains("/_apis/wit/workitems/42/comments?api-version=5.1-preview.3 "));
    }

    #[test]
    fn test_fetch_comments_over_http() {
        let body = r#"{"comments": [{"createdBy": {"displayName": "Dana Reyes"}, "createdDate": "2024-05-01T09:00:00Z", "text": "<p>ok</p>"}]}"#;
        let (base, server) = serve_once(http_response("200 OK", body));

        let comments = tracker_at(&base).fetch_comments(42).unwrap().unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].author.display_name, "Dana Reyes");
        assert_eq!(comments[0].text, "<p>ok</p>");
        server.join().unwrap();
    }

    #[test]
    fn test_slow_tracker_times_out() {
        let base = serve_silence();
        let client = TrackerClient::new(ClientConfig { timeout: 1, ..config(&format!("{}/tfs/Collection", base)) })
            .unwrap();

        let err = client.fetch_work_item(42).unwrap_err();
        assert!(matches!(err, ReportError::Timeout { timeout: 1 }));
    }

    #[test]
    fn test_tracker_image_carries_credentials() {
        let (base, server) = serve_once(http_response("200 OK", "PNGDATA"));

        let bytes = tracker_at(&base).fetch_image("/tfs/Collection/_apis/wit/attachments/7d1c?fileName=log.png");
        assert_eq!(bytes, Some(b"PNGDATA".to_vec()));

        let head = server.join().unwrap();
        assert!(head.starts_with("get /tfs/collection/_apis/wit/attachments/7d1c?filename=log.png "));
        assert!(head.contains("authorization: basic "));
    }

    #[test]
    fn test_foreign_image_host_gets_no_credentials() {
        let (base, server) = serve_once(http_response("200 OK", "PNGDATA"));
        let client = TrackerClient::new(config("https://tfs.example.com/tfs/Collection/Project")).unwrap();

        let bytes = client.fetch_image(&format!("{}/x.png", base));
        assert_eq!(bytes, Some(b"PNGDATA".to_vec()));

        let head = server.join().unwrap();
        assert!(!head.contains("authorization"));
    }

    #[test]
    fn test_failed_image_download_is_none() {
        let (base, server) = serve_once(http_response("500 Internal Server Error", ""));
        assert_eq!(tracker_at(&base).fetch_image(&format!("{}/broken.png", base)), None);
        server.join().unwrap();

        let client = TrackerClient::new(config("http://127.0.0.1:1/tfs/Collection")).unwrap();
        assert_eq!(client.fetch_image("/tfs/Collection/_apis/wit/attachments/1"), None);
    }
}
