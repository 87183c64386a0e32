//! Render worker - runs in separate thread(s)

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use flume::{Receiver, Sender};

use super::engine;
use super::request::{RenderRequest, RenderResponse};

/// Main worker function - runs in a dedicated thread
///
/// Pulls jobs from the shared queue until shutdown. A job whose token is no
/// longer current is answered with `Cancelled` before the document is even
/// opened; an in-progress render is never interrupted, its late result is
/// discarded by the service on the main context.
pub fn render_worker(
    requests: Receiver<RenderRequest>,
    responses: Sender<RenderResponse>,
    current_token: Arc<AtomicU64>,
) {
    for request in requests {
        match request {
            RenderRequest::Render(job) => {
                if job.token.0 != current_token.load(Ordering::Acquire) {
                    let _ = responses.send(RenderResponse::Cancelled { token: job.token });
                    continue;
                }

                match engine::render_page(&job.path, job.page_index, job.target) {
                    Ok(bitmap) => {
                        let _ = responses.send(RenderResponse::Completed {
                            token: job.token,
                            kind: job.kind,
                            page_index: job.page_index,
                            path: job.path,
                            target: job.target,
                            bitmap: Arc::new(bitmap),
                        });
                    }
                    Err(error) => {
                        let _ = responses.send(RenderResponse::Failed {
                            token: job.token,
                            page_index: job.page_index,
                            path: job.path,
                            error,
                        });
                    }
                }
            }

            RenderRequest::Shutdown => break,
        }
    }
}
