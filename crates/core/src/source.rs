//! Collaborator seams between the report builder and the tracker.
//!
//! The HTTP client in [`crate::fetch`] implements all three traits; tests
//! substitute in-memory fakes.

use crate::Result;
use crate::model::{Comment, WorkItem};

/// Looks up work items.
pub trait WorkItemFetcher {
    /// Fetches a work item.
    ///
    /// `Ok(None)` means the tracker does not know the item. Transport
    /// failures are errors.
    fn fetch_work_item(&self, id: u64) -> Result<Option<WorkItem>>;
}

/// Lists a work item's comments.
pub trait CommentFetcher {
    /// Fetches every comment on a work item.
    ///
    /// `Ok(None)` means the tracker returned no comment list.
    fn fetch_comments(&self, work_item_id: u64) -> Result<Option<Vec<Comment>>>;
}

/// Downloads images referenced by comment HTML.
pub trait ImageFetcher {
    /// Returns the image bytes, or `None` when the download failed.
    fn fetch_image(&self, url: &str) -> Option<Vec<u8>>;
}

/// Everything the report builder needs from the tracker.
pub trait ReportSource: WorkItemFetcher + CommentFetcher + ImageFetcher {}

impl<T> ReportSource for T where T: WorkItemFetcher + CommentFetcher + ImageFetcher {}
