//! Render request and response types

use std::path::PathBuf;
use std::sync::Arc;

use super::types::{Bitmap, PixelSize};

/// Generation counter for render requests.
///
/// Bumped on every selection change; responses carrying an older token are
/// stale and must be discarded before they touch display state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestToken(pub u64);

impl RequestToken {
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }
}

/// What a rendered bitmap is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderKind {
    /// Full-resolution preview of one page
    Preview,
    /// One entry of the per-page thumbnail strip
    Thumbnail,
}

/// One page to rasterize.
#[derive(Clone, Debug)]
pub struct RenderJob {
    pub token: RequestToken,
    pub path: PathBuf,
    pub page_index: usize,
    pub target: PixelSize,
    pub kind: RenderKind,
}

/// Request sent to render workers
#[derive(Debug)]
pub enum RenderRequest {
    Render(RenderJob),
    /// Shutdown the worker
    Shutdown,
}

/// Errors from a single render call
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("document not found: {}", .path.display())]
    DocumentNotFound { path: PathBuf },

    #[error("cannot parse document: {detail}")]
    CorruptDocument { detail: String },

    #[error("page {index} out of range (document has {count} pages)")]
    PageIndexOutOfRange { index: usize, count: usize },
}

impl RenderError {
    pub(crate) fn corrupt(detail: impl std::fmt::Display) -> Self {
        Self::CorruptDocument {
            detail: detail.to_string(),
        }
    }
}

/// Response from render workers
#[derive(Debug)]
pub enum RenderResponse {
    /// Rendered page bitmap
    Completed {
        token: RequestToken,
        kind: RenderKind,
        page_index: usize,
        path: PathBuf,
        target: PixelSize,
        bitmap: Arc<Bitmap>,
    },

    /// Request was stale before the worker started it
    Cancelled { token: RequestToken },

    /// Error during rendering
    Failed {
        token: RequestToken,
        page_index: usize,
        path: PathBuf,
        error: RenderError,
    },
}
