//! Scoped-handle page rasterization
//!
//! Every call opens the document, works, and drops the handle before
//! returning — on success and on every error path. Nothing here survives
//! between calls, which is what lets a rename of the file proceed the
//! moment a call returns.

use std::path::Path;

use mupdf::{Colorspace, Document, Matrix, Pixmap};

use super::request::RenderError;
use super::types::{Bitmap, PixelSize};

/// Number of pages in the document at `path`.
pub fn page_count(path: &Path) -> Result<usize, RenderError> {
    let doc = open_document(path)?;
    let count = doc.page_count().map_err(RenderError::corrupt)?;
    Ok(count.max(0) as usize)
}

/// Rasterize one page into an RGB bitmap fitting `target`.
pub fn render_page(
    path: &Path,
    page_index: usize,
    target: PixelSize,
) -> Result<Bitmap, RenderError> {
    let doc = open_document(path)?;
    let count = doc.page_count().map_err(RenderError::corrupt)?.max(0) as usize;
    if page_index >= count {
        return Err(RenderError::PageIndexOutOfRange {
            index: page_index,
            count,
        });
    }

    let page = doc
        .load_page(page_index as i32)
        .map_err(RenderError::corrupt)?;
    let bounds = page.bounds().map_err(RenderError::corrupt)?;
    let page_width = (bounds.x1 - bounds.x0).abs().max(1.0);
    let page_height = (bounds.y1 - bounds.y0).abs().max(1.0);

    let mag = fit_magnification((page_width, page_height), target);
    let transform = Matrix::new_scale(mag, mag);

    let rgb = Colorspace::device_rgb();
    let pixmap = page
        .to_pixmap(&transform, &rgb, false, false)
        .map_err(RenderError::corrupt)?;

    let pixels = pixmap_to_rgb(&pixmap)?;
    Ok(Bitmap {
        pixels,
        width: pixmap.width(),
        height: pixmap.height(),
    })
}

fn open_document(path: &Path) -> Result<Document, RenderError> {
    if !path.exists() {
        return Err(RenderError::DocumentNotFound {
            path: path.to_path_buf(),
        });
    }
    Document::open(path.to_string_lossy().as_ref()).map_err(RenderError::corrupt)
}

/// Uniform scale fitting a page into the target box without distortion.
fn fit_magnification(page: (f32, f32), target: PixelSize) -> f32 {
    let (page_width, page_height) = page;
    let scale_x = target.width as f32 / page_width;
    let scale_y = target.height as f32 / page_height;
    scale_x.min(scale_y).max(f32::MIN_POSITIVE)
}

fn pixmap_to_rgb(pixmap: &Pixmap) -> Result<Vec<u8>, RenderError> {
    let n = pixmap.n() as usize;
    if n < 3 {
        return Err(RenderError::corrupt(format!(
            "unsupported pixmap format: {n} channels"
        )));
    }

    let width = pixmap.width() as usize;
    let height = pixmap.height() as usize;
    let stride = pixmap.stride() as usize;
    let samples = pixmap.samples();
    let row_bytes = width * n;
    let expected_min = stride.saturating_mul(height);
    if samples.len() < expected_min || row_bytes > stride {
        return Err(RenderError::corrupt("pixmap buffer size mismatch"));
    }

    let mut out = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        let row_start = y * stride;
        let row = &samples[row_start..row_start + row_bytes];
        if n == 3 {
            out.extend_from_slice(row);
        } else {
            for px in row.chunks_exact(n) {
                out.extend_from_slice(&px[..3]);
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::write_pdf;
    use tempfile::TempDir;

    #[test]
    fn page_count_reads_generated_document() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("three.pdf");
        write_pdf(&path, 3).unwrap();

        assert_eq!(page_count(&path).unwrap(), 3);
    }

    #[test]
    fn render_fits_target_box() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("one.pdf");
        write_pdf(&path, 1).unwrap();

        let bitmap = render_page(&path, 0, PixelSize::new(200, 200)).unwrap();
        assert!(bitmap.width > 0 && bitmap.width <= 200);
        assert!(bitmap.height > 0 && bitmap.height <= 200);
        assert_eq!(
            bitmap.pixels.len(),
            bitmap.width as usize * bitmap.height as usize * 3
        );
    }

    #[test]
    fn out_of_range_page_fails_without_poisoning_later_calls() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("one.pdf");
        write_pdf(&path, 1).unwrap();

        let err = render_page(&path, 1, PixelSize::new(100, 100)).unwrap_err();
        assert!(matches!(
            err,
            RenderError::PageIndexOutOfRange { index: 1, count: 1 }
        ));

        // The next valid call on the same path succeeds.
        assert!(render_page(&path, 0, PixelSize::new(100, 100)).is_ok());
    }

    #[test]
    fn missing_document_is_reported_as_not_found() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("gone.pdf");

        let err = render_page(&path, 0, PixelSize::new(100, 100)).unwrap_err();
        assert!(matches!(err, RenderError::DocumentNotFound { .. }));
    }

    #[test]
    fn garbage_bytes_are_reported_as_corrupt() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.pdf");
        std::fs::write(&path, b"this is not a pdf").unwrap();

        let err = page_count(&path).unwrap_err();
        assert!(matches!(err, RenderError::CorruptDocument { .. }));
    }

    #[test]
    fn handle_is_released_before_return() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("movable.pdf");
        write_pdf(&path, 1).unwrap();

        render_page(&path, 0, PixelSize::new(100, 100)).unwrap();

        // A rename immediately after a render must not be blocked by a
        // lingering handle.
        let moved = tmp.path().join("moved.pdf");
        std::fs::rename(&path, &moved).unwrap();
        assert!(render_page(&moved, 0, PixelSize::new(100, 100)).is_ok());
    }
}
