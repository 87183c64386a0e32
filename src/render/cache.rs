//! LRU cache for rendered bitmaps

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;

use lru::LruCache;

use super::types::{Bitmap, PixelSize};
use crate::document;

/// Cache key for rendered pages
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Lowercased full path, matching catalog identity
    path_key: String,
    page_index: usize,
    target: PixelSize,
}

impl CacheKey {
    #[must_use]
    pub fn new(path: &Path, page_index: usize, target: PixelSize) -> Self {
        Self {
            path_key: document::path_key(path),
            page_index,
            target,
        }
    }
}

/// LRU cache of rendered page bitmaps
pub struct BitmapCache {
    cache: LruCache<CacheKey, Arc<Bitmap>>,
}

impl BitmapCache {
    /// Create a new cache with the given capacity
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).expect("1 is non-zero")),
            ),
        }
    }

    /// Get a cached bitmap, promoting it in the LRU order
    #[must_use]
    pub fn get(&mut self, key: &CacheKey) -> Option<Arc<Bitmap>> {
        self.cache.get(key).cloned()
    }

    /// Check if a key is in the cache without promoting it
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.cache.contains(key)
    }

    /// Insert a bitmap, returning the shared handle
    pub fn insert(&mut self, key: CacheKey, bitmap: Arc<Bitmap>) -> Arc<Bitmap> {
        self.cache.put(key, bitmap.clone());
        bitmap
    }

    /// Clear all cached bitmaps
    pub fn invalidate_all(&mut self) {
        self.cache.clear();
    }

    /// Number of cached bitmaps
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if cache is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Cache capacity
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }
}
