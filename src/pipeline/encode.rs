//! Image encoding: `DynamicImage` → PNG bytes → base64 [`PageImage`].
//!
//! PNG is lossless; JPEG artefacts on rendered text hurt vision-model
//! reading far more than the larger payload costs.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Media type of every page image.
pub const PAGE_MEDIA_TYPE: &str = "image/png";

/// One rendered page, transport-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    /// 0-based position of the page in the source document.
    pub page_index: usize,
    pub media_type: &'static str,
    /// Base64 (standard alphabet, padded) of the PNG bytes.
    pub data: String,
}

/// Encode a rasterised page as PNG.
pub fn png_bytes(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// Base64-wrap a page's PNG bytes.
pub fn encode_page(page_index: usize, png: &[u8]) -> PageImage {
    let data = STANDARD.encode(png);
    debug!("Page {}: {} PNG bytes → {} bytes base64", page_index + 1, png.len(), data.len());
    PageImage {
        page_index,
        media_type: PAGE_MEDIA_TYPE,
        data,
    }
}
