//! PDF rasterisation: render every page to PNG via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! [`rasterize`] moves the work onto Tokio's blocking pool so the runtime's
//! worker threads never stall on a 300 DPI render.
//!
//! ## All or nothing
//!
//! A page that fails to render fails the whole document. Analysing a PDF with
//! silently missing pages would produce a confident but wrong summary.

use crate::error::JobError;
use crate::pipeline::encode::{self, PageImage};
use pdfium_render::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Environment variable pointing at a pdfium shared library (file or directory).
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Points per inch in PDF user space.
const PDF_POINTS_PER_INCH: f32 = 72.0;

/// Renders a PDF into PNG page images, in page order.
///
/// Implementations are blocking; [`rasterize`] calls them off the async runtime.
pub trait PageRasterizer: Send + Sync {
    /// Return one PNG per page, first page first. An empty vector means the
    /// document has no pages.
    fn render(&self, pdf: &[u8], dpi: u32) -> Result<Vec<Vec<u8>>, JobError>;
}

/// Rasterise `pdf` and base64-encode every page.
pub async fn rasterize(
    rasterizer: Arc<dyn PageRasterizer>,
    pdf: Vec<u8>,
    dpi: u32,
) -> Result<Vec<PageImage>, JobError> {
    let pages = tokio::task::spawn_blocking(move || {
        let pngs = rasterizer.render(&pdf, dpi)?;
        Ok::<_, JobError>(
            pngs.iter()
                .enumerate()
                .map(|(idx, png)| encode::encode_page(idx, png))
                .collect::<Vec<_>>(),
        )
    })
    .await
    .map_err(|e| JobError::Processing(format!("Render task panicked: {}", e)))??;

    info!("Rasterised {} pages at {} DPI", pages.len(), dpi);
    Ok(pages)
}

/// How far into the file a PDF header may start; readers tolerate a BOM or
/// stray bytes before it.
const PDF_HEADER_WINDOW: usize = 1024;

/// Reject input that is obviously not a PDF before pdfium sees it.
pub fn check_pdf_magic(pdf: &[u8]) -> Result<(), JobError> {
    let window = &pdf[..pdf.len().min(PDF_HEADER_WINDOW)];
    if !window.windows(5).any(|w| w == b"%PDF-") {
        let magic: Vec<u8> = pdf.iter().take(4).copied().collect();
        return Err(JobError::rasterization(format!(
            "input is not a PDF (no %PDF- header in the first {} bytes; first bytes: {:?})",
            PDF_HEADER_WINDOW, magic
        )));
    }
    Ok(())
}

/// Production rasteriser backed by the pdfium library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    library_path: Option<PathBuf>,
}

impl PdfiumRasterizer {
    /// Bind to the pdfium library at `path` (a file, or a directory holding
    /// the platform library name).
    pub fn with_library(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: Some(path.into()),
        }
    }

    /// Honour `PDFIUM_LIB_PATH`; otherwise use the system library.
    pub fn from_env() -> Self {
        match std::env::var_os(PDFIUM_LIB_PATH_ENV) {
            Some(p) if !p.is_empty() => Self::with_library(p),
            _ => Self::default(),
        }
    }

    fn bind(&self) -> Result<Pdfium, JobError> {
        let bindings = match &self.library_path {
            Some(p) if p.is_dir() => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(p))
            }
            Some(p) => Pdfium::bind_to_library(p),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| {
            JobError::rasterization(format!(
                "failed to bind to pdfium library: {:?}. Set {} to an existing libpdfium.",
                e, PDFIUM_LIB_PATH_ENV
            ))
        })?;
        Ok(Pdfium::new(bindings))
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn render(&self, pdf: &[u8], dpi: u32) -> Result<Vec<Vec<u8>>, JobError> {
        check_pdf_magic(pdf)?;
        let pdfium = self.bind()?;

        let document = pdfium.load_pdf_from_byte_slice(pdf, None).map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                JobError::rasterization("PDF is encrypted and requires a password")
            } else {
                JobError::rasterization(format!("PDF is corrupt: {}", err_str))
            }
        })?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        info!("PDF loaded: {} pages", total_pages);

        let render_config =
            PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / PDF_POINTS_PER_INCH);

        let mut results = Vec::with_capacity(total_pages);
        for (idx, page) in pages.iter().enumerate() {
            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                JobError::rasterization(format!("page {}: {:?}", idx + 1, e))
            })?;

            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );

            let png = encode::png_bytes(&image).map_err(|e| {
                JobError::rasterization(format!("page {}: PNG encoding failed: {}", idx + 1, e))
            })?;
            results.push(png);
        }

        Ok(results)
    }
}
