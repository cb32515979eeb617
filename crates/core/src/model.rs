//! Work items, comments and the values a report is keyed on.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime};

use crate::{ReportError, Result};

/// Date format used in the report header.
const REPORT_DATE_FORMAT: &str = "%m/%d/%Y";

/// A tracker work item, reduced to what the report shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub id: u64,
    pub title: String,
}

/// Who wrote a comment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Author {
    pub display_name: String,
    pub unique_name: String,
}

/// A work item comment as delivered by the tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comment {
    pub author: Author,
    /// Creation timestamp exactly as delivered (ISO 8601, UTC).
    pub created_date: String,
    /// Comment body as HTML.
    pub text: String,
}

/// The operator whose comments feed the report.
///
/// A comment counts as the operator's when either the display name or the
/// unique name matches exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperatorIdentity {
    pub display_name: String,
    pub unique_name: String,
}

impl OperatorIdentity {
    pub fn new(display_name: impl Into<String>, unique_name: impl Into<String>) -> Self {
        Self { display_name: display_name.into(), unique_name: unique_name.into() }
    }

    /// Returns true when the comment was written by this operator.
    ///
    /// An empty configured name never matches.
    pub fn authored(&self, comment: &Comment) -> bool {
        let same = |configured: &str, actual: &str| !configured.is_empty() && configured == actual;
        same(&self.display_name, &comment.author.display_name) || same(&self.unique_name, &comment.author.unique_name)
    }
}

/// Where the work was performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationType {
    Onsite,
    Offsite,
}

impl LocationType {
    /// Every spelling [`LocationType::from_str`] accepts, lower case.
    pub const ACCEPTED: [(&'static str, LocationType); 7] = [
        ("onsite", Self::Onsite),
        ("on-site", Self::Onsite),
        ("1", Self::Onsite),
        ("offsite", Self::Offsite),
        ("off-site", Self::Offsite),
        ("remote", Self::Offsite),
        ("2", Self::Offsite),
    ];

    /// Check-box values for the `{{OS}}` and `{{FS}}` placeholders.
    pub fn marks(self) -> (&'static str, &'static str) {
        match self {
            Self::Onsite => ("X", ""),
            Self::Offsite => ("", "X"),
        }
    }
}

impl FromStr for LocationType {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ACCEPTED
            .iter()
            .find(|(name, _)| *name == wanted)
            .map(|(_, location)| *location)
            .ok_or_else(|| {
                ReportError::InvalidInput(format!("Invalid location: {}. Valid options: onsite, offsite", s))
            })
    }
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Onsite => f.write_str("onsite"),
            Self::Offsite => f.write_str("offsite"),
        }
    }
}

/// Picks the operator's most recent comment.
///
/// Timestamps are compared as delivered; the tracker's fixed-width ISO
/// format orders the same lexicographically and chronologically. On equal
/// timestamps the comment listed last wins.
pub fn select_latest_comment<'c>(comments: &'c [Comment], identity: &OperatorIdentity) -> Option<&'c Comment> {
    comments
        .iter()
        .filter(|comment| identity.authored(comment))
        .max_by(|a, b| a.created_date.cmp(&b.created_date))
}

/// Formats a comment timestamp as `MM/DD/YYYY`.
///
/// Accepts RFC 3339 (`2024-03-05T14:22:10.123Z`) and offset-less ISO
/// timestamps. An empty value gives an empty date; anything else that does
/// not parse is [`ReportError::MalformedCommentDate`].
pub fn format_comment_date(raw: &str) -> Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(String::new());
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.format(REPORT_DATE_FORMAT).to_string());
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|parsed| parsed.format(REPORT_DATE_FORMAT).to_string())
        .map_err(|_| ReportError::MalformedCommentDate { value: raw.to_string() })
}
