//! PDF rendering infrastructure

pub mod engine;

mod cache;
mod request;
mod service;
mod types;
mod worker;

pub use cache::{BitmapCache, CacheKey};
pub use request::{
    RenderError, RenderJob, RenderKind, RenderRequest, RenderResponse, RequestToken,
};
pub use service::RenderService;
pub use types::{Bitmap, PixelSize};

/// Full-resolution previews fit this box.
pub const PREVIEW_BOX: PixelSize = PixelSize::new(1200, 1200);

/// Per-page thumbnails fit this box.
pub const THUMBNAIL_BOX: PixelSize = PixelSize::new(200, 200);

pub(crate) const DEFAULT_WORKERS: usize = 2;
pub(crate) const DEFAULT_CACHE_SIZE: usize = 64;
