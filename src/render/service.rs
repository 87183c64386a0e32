//! Render service - worker pool, generation tokens and bitmap cache
//!
//! Lives on the main context. Submitting a job either answers from the
//! cache or fans it out to the worker pool; polling applies only results
//! whose token is still current.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use flume::{Receiver, Sender};
use log::debug;

use super::cache::{BitmapCache, CacheKey};
use super::request::{RenderJob, RenderKind, RenderRequest, RenderResponse, RequestToken};
use super::types::{Bitmap, PixelSize};
use super::worker::render_worker;
use super::{DEFAULT_CACHE_SIZE, DEFAULT_WORKERS};

/// Manages page rendering with worker threads and caching
pub struct RenderService {
    request_tx: Sender<RenderRequest>,
    response_rx: Receiver<RenderResponse>,
    current_token: Arc<AtomicU64>,
    next_token: u64,
    pending: usize,
    cache: BitmapCache,
    num_workers: usize,
}

impl Default for RenderService {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderService {
    /// Create a new render service with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DEFAULT_WORKERS, DEFAULT_CACHE_SIZE)
    }

    /// Create a new render service with custom configuration
    #[must_use]
    pub fn with_config(num_workers: usize, cache_size: usize) -> Self {
        // We use flume for MPMC (multi-producer, multi-consumer) channels.
        // std::sync::mpsc is MPSC only - its Receiver cannot be cloned. We
        // need multiple workers to pull from a shared request queue
        // (fan-out), which requires MPMC.
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();

        let current_token = Arc::new(AtomicU64::new(0));

        // Spawn worker threads - each clones request_rx to pull from shared queue
        for _ in 0..num_workers.max(1) {
            let rx = request_rx.clone();
            let tx = response_tx.clone();
            let token = Arc::clone(&current_token);

            std::thread::spawn(move || {
                render_worker(rx, tx, token);
            });
        }

        Self {
            request_tx,
            response_rx,
            current_token,
            next_token: 0,
            pending: 0,
            cache: BitmapCache::new(cache_size),
            num_workers: num_workers.max(1),
        }
    }

    /// Start a new request generation.
    ///
    /// All outstanding jobs of earlier generations become stale: workers
    /// answer not-yet-started ones with `Cancelled`, and `poll` drops any
    /// late results.
    pub fn begin_generation(&mut self) -> RequestToken {
        self.next_token += 1;
        self.current_token.store(self.next_token, Ordering::Release);
        self.pending = 0;
        RequestToken::new(self.next_token)
    }

    /// Token of the current generation.
    #[must_use]
    pub fn current_token(&self) -> RequestToken {
        RequestToken::new(self.current_token.load(Ordering::Acquire))
    }

    /// Submit one page for rendering.
    ///
    /// A cache hit is returned immediately and produces no response;
    /// otherwise the job is queued and its result arrives via [`poll`].
    ///
    /// [`poll`]: Self::poll
    pub fn request(
        &mut self,
        token: RequestToken,
        path: &Path,
        page_index: usize,
        target: PixelSize,
        kind: RenderKind,
    ) -> Option<Arc<Bitmap>> {
        let key = CacheKey::new(path, page_index, target);
        if let Some(hit) = self.cache.get(&key) {
            return Some(hit);
        }

        let _ = self.request_tx.send(RenderRequest::Render(RenderJob {
            token,
            path: path.to_path_buf(),
            page_index,
            target,
            kind,
        }));
        self.pending += 1;
        None
    }

    /// Poll for completed render responses.
    ///
    /// Results whose token is no longer current are dropped here; only
    /// current-generation outcomes are returned for application.
    pub fn poll(&mut self) -> Vec<RenderResponse> {
        let current = self.current_token();
        let mut responses = Vec::new();

        while let Ok(response) = self.response_rx.try_recv() {
            match &response {
                RenderResponse::Completed {
                    token,
                    page_index,
                    path,
                    target,
                    bitmap,
                    ..
                } => {
                    if *token != current {
                        debug!("dropping stale render result for page {page_index}");
                        continue;
                    }
                    self.pending = self.pending.saturating_sub(1);
                    self.cache
                        .insert(CacheKey::new(path, *page_index, *target), Arc::clone(bitmap));
                }
                RenderResponse::Cancelled { .. } => continue,
                RenderResponse::Failed { token, .. } => {
                    if *token != current {
                        continue;
                    }
                    self.pending = self.pending.saturating_sub(1);
                }
            }

            responses.push(response);
        }

        responses
    }

    /// True when no current-generation job is outstanding.
    #[must_use]
    pub fn idle(&self) -> bool {
        self.pending == 0
    }

    /// Drop every cached bitmap and invalidate all in-flight work.
    ///
    /// The pre-rename release step: after this returns, no rendering
    /// resource associated with any document is retained here.
    pub fn release_resources(&mut self) {
        self.cache.invalidate_all();
        self.begin_generation();
    }

    /// Drop cached bitmaps after the folder contents changed.
    pub fn invalidate_cache(&mut self) {
        self.cache.invalidate_all();
    }

    /// Shutdown all workers
    pub fn shutdown(&self) {
        for _ in 0..self.num_workers {
            let _ = self.request_tx.send(RenderRequest::Shutdown);
        }
    }
}

impl Drop for RenderService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
