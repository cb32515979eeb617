//! Web form front end.
//!
//! `GET /` serves the form, `POST /` builds the report and returns it as a
//! `.docx` attachment, or the form again with a message saying why no
//! report could be built. Report generation is synchronous and runs on the
//! blocking thread pool.

pub mod config;
pub mod page;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Form, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use ticket_report_core::{LocationType, OperatorIdentity, ReportBuilder, ReportDocument, ReportError, ReportSource};
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use page::FormValues;

pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    source: Arc<dyn ReportSource + Send + Sync>,
    identity: Arc<OperatorIdentity>,
    template: Arc<PathBuf>,
}

impl AppState {
    pub fn new(source: Arc<dyn ReportSource + Send + Sync>, identity: OperatorIdentity, template: PathBuf) -> Self {
        Self { source, identity: Arc::new(identity), template: Arc::new(template) }
    }

    /// Reads the template and builds the document. Blocks.
    fn generate(&self, request: &ReportRequest) -> Result<ReportDocument, ReportError> {
        let template = std::fs::read(self.template.as_path()).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ReportError::FileNotFound(self.template.to_path_buf()),
            _ => ReportError::Io(e),
        })?;

        ReportBuilder::new(self.source.as_ref(), &self.identity).build_document(
            &template,
            request.work_item_id,
            &request.client_name,
            request.location,
        )
    }
}

/// Raw form submission.
#[derive(Debug, Default, Deserialize)]
pub struct ReportForm {
    #[serde(default)]
    pub work_item_id: String,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub location: String,
}

#[derive(Debug)]
struct ReportRequest {
    work_item_id: u64,
    client_name: String,
    location: LocationType,
}

impl ReportForm {
    fn values(&self) -> FormValues<'_> {
        FormValues {
            work_item_id: &self.work_item_id,
            client_name: &self.client_name,
            location: self.location.parse().ok(),
        }
    }

    fn validate(&self) -> Result<ReportRequest, String> {
        let work_item_id = self
            .work_item_id
            .trim()
            .parse()
            .map_err(|_| format!("Work item ID '{}' is not a number.", self.work_item_id.trim()))?;

        let client_name = self.client_name.trim();
        if client_name.is_empty() {
            return Err("Client name is required.".to_string());
        }

        let location = match self.location.trim() {
            "" => return Err("Select a location.".to_string()),
            raw => raw.parse::<LocationType>().map_err(|e| match e {
                ReportError::InvalidInput(message) => message,
                other => other.to_string(),
            })?,
        };

        Ok(ReportRequest { work_item_id, client_name: client_name.to_string(), location })
    }
}

/// The message shown on the form for a failed report.
pub fn failure_message(error: &ReportError) -> String {
    match error {
        ReportError::WorkItemNotFound { .. } => error.to_string(),
        ReportError::NoComments { .. } => "No comments found.".to_string(),
        ReportError::NoCommentsForAccount { .. } => "No comments found for your account.".to_string(),
        other => format!("Failed to generate report: {}", other),
    }
}

/// Header-safe version of a file name.
fn attachment_name(file_name: &str) -> String {
    file_name
        .chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\' { c } else { '_' })
        .collect()
}

fn form_page(status: StatusCode, message: Option<&str>, values: &FormValues<'_>) -> Response {
    let message = message.map(|message| format!("❌ {}", message));
    (status, Html(page::render(message.as_deref(), values))).into_response()
}

async fn form() -> Html<String> {
    Html(page::render(None, &FormValues::default()))
}

async fn health() -> &'static str {
    "ok"
}

async fn submit(State(state): State<AppState>, Form(form): Form<ReportForm>) -> Response {
    let request = match form.validate() {
        Ok(request) => request,
        Err(message) => return form_page(StatusCode::BAD_REQUEST, Some(&message), &form.values()),
    };

    info!(work_item = request.work_item_id, client = %request.client_name, "Generating report");
    let result = tokio::task::spawn_blocking(move || state.generate(&request)).await;

    match result {
        Ok(Ok(document)) => {
            let file_name = attachment_name(&document.report.file_name());
            info!(file = %file_name, size = document.bytes.len(), "Report ready");
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, DOCX_MIME.to_string()),
                    (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", file_name)),
                ],
                document.bytes,
            )
                .into_response()
        }
        Ok(Err(e)) => {
            warn!(error = %e, "Report failed");
            form_page(StatusCode::OK, Some(&failure_message(&e)), &form.values())
        }
        Err(e) => {
            error!(error = %e, "Report task failed");
            form_page(StatusCode::INTERNAL_SERVER_ERROR, Some("Report generation failed."), &form.values())
        }
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let timeout = TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, REQUEST_TIMEOUT);

    Router::new()
        .route("/", get(form).post(submit))
        .route("/health", get(health))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(timeout))
        .with_state(state)
}
