//! Error types for report generation.
//!
//! This module defines [`ReportError`], which names every reason a report
//! can fail to build or render. Each variant carries a distinct message so
//! front ends can show the operator what went wrong instead of a generic
//! failure.
//!
//! # Example
//!
//! ```rust
//! use ticket_report_core::{ReportError, Result};
//!
//! fn parse_id(raw: &str) -> Result<u64> {
//!     raw.trim()
//!         .parse()
//!         .map_err(|_| ReportError::InvalidInput(format!("'{}' is not a work item ID", raw)))
//! }
//! # assert!(parse_id("42").is_ok());
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for report generation.
///
/// Fetch failures for the work item and its comments are terminal for the
/// current report. [`ReportError::ImageFetchFailed`] is the only variant that
/// is never returned from a report build: it is logged and the image skipped.
///
/// # Example
///
/// ```rust
/// use ticket_report_core::ReportError;
///
/// let err = ReportError::WorkItemNotFound { id: 1234 };
/// assert_eq!(err.to_string(), "Work item ID '1234' does not exist.");
/// ```
#[derive(Error, Debug)]
pub enum ReportError {
    /// The tracker has no work item with this ID, or its response had no fields.
    #[error("Work item ID '{id}' does not exist.")]
    WorkItemNotFound { id: u64 },

    /// The work item has no comment list, or the list is empty.
    #[error("No comments found for work item ID '{id}'.")]
    NoComments { id: u64 },

    /// None of the comments were written by the configured operator.
    #[error("No comments found for your account ({display_name}).")]
    NoCommentsForAccount { display_name: String },

    /// The selected comment's creation date could not be parsed.
    #[error("Comment creation date '{value}' is malformed")]
    MalformedCommentDate { value: String },

    /// An embedded image could not be downloaded.
    ///
    /// Only used for logging; the converter skips the image.
    #[error("Failed to fetch image {url}: {reason}")]
    ImageFetchFailed { url: String, reason: String },

    /// The template could not be read or rewritten.
    ///
    /// Returned when the template is not a zip package, lacks
    /// `word/document.xml`, or contains malformed XML.
    #[error("Failed to write report from template: {0}")]
    TemplateWriteFailed(String),

    /// The template does not contain a single known placeholder.
    #[error("No placeholders found in the template")]
    NoPlaceholders,

    /// HTTP request errors from reqwest.
    ///
    /// This variant wraps connection failures, DNS errors and invalid responses.
    #[cfg(feature = "fetch")]
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timeout.
    ///
    /// Returned when a tracker request exceeds the configured timeout.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Invalid value supplied by a front end (work item ID, location type).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// File I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReportError {
    /// Returns true for the reasons that mean "nothing to report" rather than
    /// an infrastructure problem.
    ///
    /// Front ends use this to decide between showing the message inline and
    /// treating the failure as an error.
    pub fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            Self::WorkItemNotFound { .. } | Self::NoComments { .. } | Self::NoCommentsForAccount { .. }
        )
    }
}

/// Result type alias for ReportError.
///
/// This is a convenience alias for `std::result::Result<T, ReportError>`.
pub type Result<T> = std::result::Result<T, ReportError>;
