//! Labeled section extraction from comment text.
//!
//! Status comments are free-form, but the sections the report needs are
//! introduced by a line holding only a label and a colon:
//!
//! ```text
//! Root Cause:
//! Cache entry expired before the nightly sync.
//! Preventive Action:
//! Added a refresh job.
//! ```
//!
//! [`extract_field`] captures the lines that follow one label until another
//! known label starts a new section.

/// One of the four labeled sections of a status comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldLabel {
    RootCause,
    PreventiveAction,
    NextStep,
    Status,
}

impl FieldLabel {
    /// All labels in report order.
    pub const ALL: [FieldLabel; 4] = [Self::RootCause, Self::PreventiveAction, Self::NextStep, Self::Status];

    /// The label text as it appears in comments, without the colon.
    pub fn label(self) -> &'static str {
        match self {
            Self::RootCause => "Root Cause",
            Self::PreventiveAction => "Preventive Action",
            Self::NextStep => "Next Step",
            Self::Status => "Status",
        }
    }

    /// The labels that end this label's section.
    pub fn stop_labels(self) -> Vec<&'static str> {
        Self::ALL.iter().filter(|other| **other != self).map(|other| other.label()).collect()
    }
}

/// The four sections pulled out of one comment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub root_cause: String,
    pub preventive_action: String,
    pub next_step: String,
    pub status: String,
}

impl ExtractedFields {
    /// Extracts every section from plain comment text.
    ///
    /// Each field re-scans the whole text with the other three labels as
    /// its stop set, so the order of sections in the comment does not matter.
    ///
    /// # Example
    ///
    /// ```rust
    /// use ticket_report_core::ExtractedFields;
    ///
    /// let text = "Status:\nMonitoring\nRoot Cause:\nDisk full";
    /// let fields = ExtractedFields::from_text(text);
    /// assert_eq!(fields.root_cause, "Disk full");
    /// assert_eq!(fields.status, "Monitoring");
    /// assert!(fields.next_step.is_empty());
    /// ```
    pub fn from_text(text: &str) -> Self {
        let field = |label: FieldLabel| extract_field(text, label.label(), &label.stop_labels());

        Self {
            root_cause: field(FieldLabel::RootCause),
            preventive_action: field(FieldLabel::PreventiveAction),
            next_step: field(FieldLabel::NextStep),
            status: field(FieldLabel::Status),
        }
    }

    /// Gets the value for a label.
    pub fn get(&self, label: FieldLabel) -> &str {
        match label {
            FieldLabel::RootCause => &self.root_cause,
            FieldLabel::PreventiveAction => &self.preventive_action,
            FieldLabel::NextStep => &self.next_step,
            FieldLabel::Status => &self.status,
        }
    }
}

/// Captures the section introduced by `field_name`.
///
/// The section starts after the first line that, trimmed and compared
/// case-insensitively, equals `field_name:`. It ends at the first following
/// line that starts with `label:` for any label in `other_labels`, or at the
/// end of the text. Neither marker line is included. Lines in between are
/// kept verbatim, joined with `\n`, and the result is trimmed.
///
/// Returns an empty string when the label never appears.
///
/// # Example
///
/// ```rust
/// use ticket_report_core::extract_field;
///
/// let text = "Root Cause:\nA\nB\nPreventive Action:\nC";
/// let stops = ["Preventive Action", "Next Step", "Status"];
/// assert_eq!(extract_field(text, "Root Cause", &stops), "A\nB");
/// ```
pub fn extract_field(text: &str, field_name: &str, other_labels: &[&str]) -> String {
    let marker = format!("{}:", field_name.to_lowercase());
    let stops: Vec<String> = other_labels
        .iter()
        .map(|label| format!("{}:", label.to_lowercase()))
        .collect();

    let mut capturing = false;
    let mut captured: Vec<&str> = Vec::new();

    for line in text.lines() {
        let normalized = line.trim().to_lowercase();

        if capturing {
            if stops.iter().any(|stop| normalized.starts_with(stop.as_str())) {
                break;
            }
            captured.push(line);
        } else if normalized == marker {
            capturing = true;
        }
    }

    captured.join("\n").trim().to_string()
}
