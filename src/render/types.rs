//! Bitmap and geometry types shared across the render pipeline

/// Requested output dimensions in pixels. Pages are scaled to fit this box
/// preserving aspect ratio, so the produced bitmap is at most this large.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Raw rendered page image.
///
/// RGB pixel data, 3 bytes per pixel, row-major, no padding. This is the
/// terminal format of the pipeline; collaborators scale it for display.
#[derive(Clone)]
pub struct Bitmap {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pixels_len", &self.pixels.len())
            .finish_non_exhaustive()
    }
}
