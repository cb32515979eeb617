//! Word template rendering.
//!
//! A template is an ordinary `.docx` whose body contains placeholder tokens
//! such as `{{TICKETNUM}}`. Rendering copies the package and rewrites every
//! paragraph in `word/document.xml` that carries a token: text tokens are
//! substituted in place, and a paragraph holding `{{REPORT_CONTENT}}` is
//! rebuilt from the converted comment, with images embedded under
//! `word/media/`.
//!
//! Tokens may be split across runs by Word's editing history; the paragraph
//! text is matched as a whole and the rewritten paragraph keeps its
//! paragraph properties and the formatting of its first run.

mod media;
mod package;
mod paragraph;

use std::fmt::Display;
use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::report::PlaceholderMap;
use crate::{ReportError, Result};
use package::{DOCUMENT_PART, Package};

pub(crate) fn write_failed(error: impl Display) -> ReportError {
    ReportError::TemplateWriteFailed(error.to_string())
}

/// Renders a template with the given values and returns the new package.
///
/// Fails with [`ReportError::NoPlaceholders`] when the template contains no
/// token with a value, and [`ReportError::TemplateWriteFailed`] when it is
/// not a readable Word package.
pub fn render_template(template: &[u8], placeholders: &PlaceholderMap) -> Result<Vec<u8>> {
    let mut package = Package::read(template)?;
    let document = package.get_text(DOCUMENT_PART)?;

    let mut media = media::MediaStore::new(&package)?;
    let rewrite = paragraph::rewrite_document(&document, placeholders, &mut media)?;
    if rewrite.replaced == 0 {
        return Err(ReportError::NoPlaceholders);
    }
    debug!(replaced = rewrite.replaced, "Replaced template placeholders");

    media.store(&mut package)?;
    package.set(DOCUMENT_PART, rewrite.xml.into_bytes());
    package.to_bytes()
}

/// Renders a template file into `output`.
pub fn render_template_file(template: &Path, placeholders: &PlaceholderMap, output: &Path) -> Result<()> {
    if !template.is_file() {
        return Err(ReportError::FileNotFound(template.to_path_buf()));
    }

    let bytes = fs::read(template)?;
    let rendered = render_template(&bytes, placeholders)?;
    fs::write(output, rendered)?;

    info!(path = %output.display(), "Wrote report");
    Ok(())
}
