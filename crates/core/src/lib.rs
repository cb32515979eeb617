pub mod convert;
pub mod docx;
pub mod error;
#[cfg(feature = "fetch")]
pub mod fetch;
pub mod fields;
pub mod model;
pub mod report;
pub mod source;
pub mod text;

pub use convert::{ContentInstruction, ConvertConfig, ConvertConfigBuilder, convert, convert_with_config};
pub use docx::{render_template, render_template_file};
pub use error::{ReportError, Result};
#[cfg(feature = "fetch")]
pub use fetch::{ClientConfig, TrackerClient};
pub use fields::{ExtractedFields, FieldLabel, extract_field};
pub use model::{
    Author, Comment, LocationType, OperatorIdentity, WorkItem, format_comment_date, select_latest_comment,
};
pub use report::{Placeholder, PlaceholderMap, PlaceholderValue, Report, ReportBuilder, ReportDocument};
pub use source::{CommentFetcher, ImageFetcher, ReportSource, WorkItemFetcher};
pub use text::html_to_plain_text;
