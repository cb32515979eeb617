//! Report assembly.
//!
//! [`ReportBuilder::build_report`] fetches the work item and its comments,
//! picks the operator's latest comment, extracts the labeled sections and
//! converts the comment body, then lays everything out as a
//! [`PlaceholderMap`] for the template writer.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info};

use crate::convert::{ContentInstruction, ConvertConfig, convert_with_config};
use crate::docx::render_template;
use crate::fields::ExtractedFields;
use crate::model::{LocationType, OperatorIdentity, WorkItem, format_comment_date, select_latest_comment};
use crate::source::ReportSource;
use crate::text::html_to_plain_text;
use crate::{ReportError, Result};

/// A template token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Placeholder {
    TicketNumber,
    Date,
    TicketContent,
    RootCause,
    PreventiveAction,
    NextStep,
    CurrentStatus,
    ReportContent,
    Onsite,
    Offsite,
    Client,
}

impl Placeholder {
    /// Every token, in template order.
    pub const ALL: [Placeholder; 11] = [
        Self::TicketNumber,
        Self::Date,
        Self::TicketContent,
        Self::RootCause,
        Self::PreventiveAction,
        Self::NextStep,
        Self::CurrentStatus,
        Self::ReportContent,
        Self::Onsite,
        Self::Offsite,
        Self::Client,
    ];

    /// The literal token text, braces included.
    pub fn token(self) -> &'static str {
        match self {
            Self::TicketNumber => "{{TICKETNUM}}",
            Self::Date => "{{DATE}}",
            Self::TicketContent => "{{TICKETCONTENT}}",
            Self::RootCause => "{{RCA}}",
            Self::PreventiveAction => "{{PREVAC}}",
            Self::NextStep => "{{NEXT}}",
            Self::CurrentStatus => "{{CURSTAT}}",
            Self::ReportContent => "{{REPORT_CONTENT}}",
            Self::Onsite => "{{OS}}",
            Self::Offsite => "{{FS}}",
            Self::Client => "{{CLIENT}}",
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// What a placeholder is replaced with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceholderValue {
    /// Plain text substituted into the paragraph.
    Text(String),
    /// Paragraph content replacing the whole paragraph's runs.
    Rich(Vec<ContentInstruction>),
}

/// Substitutions for one report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderMap {
    values: BTreeMap<Placeholder, PlaceholderValue>,
}

impl PlaceholderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a plain text value.
    pub fn insert_text(&mut self, placeholder: Placeholder, value: impl Into<String>) {
        self.values.insert(placeholder, PlaceholderValue::Text(value.into()));
    }

    /// Sets a rich content value.
    pub fn insert_rich(&mut self, placeholder: Placeholder, content: Vec<ContentInstruction>) {
        self.values.insert(placeholder, PlaceholderValue::Rich(content));
    }

    pub fn get(&self, placeholder: Placeholder) -> Option<&PlaceholderValue> {
        self.values.get(&placeholder)
    }

    /// Gets a plain text value; `None` for rich or missing values.
    pub fn text(&self, placeholder: Placeholder) -> Option<&str> {
        match self.values.get(&placeholder)? {
            PlaceholderValue::Text(text) => Some(text),
            PlaceholderValue::Rich(_) => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Placeholder, &PlaceholderValue)> {
        self.values.iter().map(|(placeholder, value)| (*placeholder, value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Everything extracted for one report.
#[derive(Debug, Clone)]
pub struct Report {
    pub work_item: WorkItem,
    pub client_name: String,
    pub location: LocationType,
    /// Creation date of the selected comment, `MM/DD/YYYY`.
    pub comment_date: String,
    pub fields: ExtractedFields,
    pub placeholders: PlaceholderMap,
}

impl Report {
    /// Suggested file name for the rendered document.
    ///
    /// Path separators in the client name are replaced so the name stays a
    /// single path component.
    pub fn file_name(&self) -> String {
        let client: String = self
            .client_name
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') { '_' } else { c })
            .collect();
        format!("Ticket No. {} - Status Report for {}.docx", self.work_item.id, client.trim())
    }
}

/// A report together with its rendered document.
#[derive(Debug, Clone)]
pub struct ReportDocument {
    pub report: Report,
    /// The `.docx` package bytes.
    pub bytes: Vec<u8>,
}

/// Builds reports from a tracker source for one operator.
///
/// # Example
///
/// ```rust,no_run
/// use ticket_report_core::{ClientConfig, LocationType, OperatorIdentity, ReportBuilder, TrackerClient};
///
/// let client = TrackerClient::new(ClientConfig {
///     org_url: "https://tfs.example.com/tfs/Collection/Project".to_string(),
///     pat: "token".to_string(),
///     ..Default::default()
/// })?;
/// let operator = OperatorIdentity::new("Dana Reyes", "dana.reyes@example.com");
/// let report = ReportBuilder::new(&client, &operator).build_report(1234, "Acme", LocationType::Onsite)?;
/// println!("{}", report.file_name());
/// # Ok::<(), ticket_report_core::ReportError>(())
/// ```
pub struct ReportBuilder<'a> {
    source: &'a dyn ReportSource,
    identity: &'a OperatorIdentity,
    convert: ConvertConfig,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(source: &'a dyn ReportSource, identity: &'a OperatorIdentity) -> Self {
        Self { source, identity, convert: ConvertConfig::default() }
    }

    /// Uses a custom HTML conversion configuration.
    pub fn with_convert_config(mut self, config: ConvertConfig) -> Self {
        self.convert = config;
        self
    }

    /// Gathers and lays out everything the template needs.
    ///
    /// Fails with [`ReportError::WorkItemNotFound`], [`ReportError::NoComments`]
    /// or [`ReportError::NoCommentsForAccount`] when there is nothing to
    /// report, and [`ReportError::MalformedCommentDate`] when the selected
    /// comment's timestamp cannot be read. Images that cannot be fetched are
    /// left out.
    pub fn build_report(&self, work_item_id: u64, client_name: &str, location: LocationType) -> Result<Report> {
        let work_item = self
            .source
            .fetch_work_item(work_item_id)?
            .ok_or(ReportError::WorkItemNotFound { id: work_item_id })?;
        debug!(id = work_item.id, title = %work_item.title, "Fetched work item");

        let comments = self
            .source
            .fetch_comments(work_item_id)?
            .filter(|comments| !comments.is_empty())
            .ok_or(ReportError::NoComments { id: work_item_id })?;
        debug!(count = comments.len(), "Fetched comments");

        let comment = select_latest_comment(&comments, self.identity).ok_or_else(|| {
            ReportError::NoCommentsForAccount { display_name: self.identity.display_name.clone() }
        })?;
        debug!(created = %comment.created_date, "Selected latest comment");

        let comment_date = format_comment_date(&comment.created_date)?;
        let fields = ExtractedFields::from_text(&html_to_plain_text(&comment.text));
        let content = convert_with_config(&comment.text, &self.convert, |src| self.source.fetch_image(src));

        let (onsite, offsite) = location.marks();
        let mut placeholders = PlaceholderMap::new();
        placeholders.insert_text(Placeholder::TicketNumber, work_item.id.to_string());
        placeholders.insert_text(Placeholder::Date, comment_date.as_str());
        placeholders.insert_text(Placeholder::TicketContent, work_item.title.as_str());
        placeholders.insert_text(Placeholder::RootCause, fields.root_cause.as_str());
        placeholders.insert_text(Placeholder::PreventiveAction, fields.preventive_action.as_str());
        placeholders.insert_text(Placeholder::NextStep, fields.next_step.as_str());
        placeholders.insert_text(Placeholder::CurrentStatus, fields.status.as_str());
        placeholders.insert_rich(Placeholder::ReportContent, content);
        placeholders.insert_text(Placeholder::Onsite, onsite);
        placeholders.insert_text(Placeholder::Offsite, offsite);
        placeholders.insert_text(Placeholder::Client, client_name);

        info!(id = work_item.id, client = client_name, "Report assembled");

        Ok(Report {
            work_item,
            client_name: client_name.to_string(),
            location,
            comment_date,
            fields,
            placeholders,
        })
    }

    /// Builds a report and renders it into a copy of the template.
    pub fn build_document(
        &self, template: &[u8], work_item_id: u64, client_name: &str, location: LocationType,
    ) -> Result<ReportDocument> {
        let report = self.build_report(work_item_id, client_name, location)?;
        let bytes = render_template(template, &report.placeholders)?;
        Ok(ReportDocument { report, bytes })
    }
}
