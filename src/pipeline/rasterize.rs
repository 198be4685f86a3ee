//! Format rasterizers: turn a loaded surface into PDF or PNG bytes.
//!
//! The two strategies diverge on purpose:
//!
//! * **Paginated**: fixed A4 pages; the browser's print engine decides
//!   page breaks from the document's break-avoidance CSS. Nothing to measure.
//!
//! * **Full capture**: one image as tall as the content. Capture needs a
//!   concrete viewport, but content height is only known after the first
//!   layout, so sizing is two-pass: lay out at a nominal height, measure the
//!   body box, then resize to fit and capture.

use crate::config::{CaptureGeometry, PageGeometry};
use crate::error::MdPressError;
use crate::pipeline::surface::RenderSurface;
use crate::request::OutputFormat;
use std::io::Cursor;
use tracing::debug;

/// Per-format parameters a rasterizer needs.
#[derive(Debug, Clone, Copy)]
pub enum Rasterizer {
    Paginated(PageGeometry),
    FullCapture(CaptureGeometry),
}

impl Rasterizer {
    pub fn for_format(format: OutputFormat, config: &crate::config::RenderConfig) -> Self {
        match format {
            OutputFormat::Pdf => Rasterizer::Paginated(config.page),
            OutputFormat::Png => Rasterizer::FullCapture(config.capture),
        }
    }

    pub fn format(&self) -> OutputFormat {
        match self {
            Rasterizer::Paginated(_) => OutputFormat::Pdf,
            Rasterizer::FullCapture(_) => OutputFormat::Png,
        }
    }

    /// Produce the output bytes from an already-loaded surface.
    pub fn rasterize(&self, surface: &mut dyn RenderSurface) -> Result<Vec<u8>, MdPressError> {
        match self {
            Rasterizer::Paginated(page) => paginate(surface, page),
            Rasterizer::FullCapture(capture) => full_capture(surface, capture),
        }
    }
}

/// Print to fixed-size pages with backgrounds.
pub fn paginate(
    surface: &mut dyn RenderSurface,
    page: &PageGeometry,
) -> Result<Vec<u8>, MdPressError> {
    let pdf = surface.print_pdf(page)?;
    debug!("Printed PDF → {} bytes", pdf.len());
    Ok(pdf)
}

/// Measure-then-resize capture of the whole document as one PNG.
pub fn full_capture(
    surface: &mut dyn RenderSurface,
    capture: &CaptureGeometry,
) -> Result<Vec<u8>, MdPressError> {
    surface.set_viewport(capture.width, capture.initial_height)?;

    let measured = surface.content_height()?;
    let height = capture.fitted_height(measured);
    debug!(
        "Content measured at {:.1}px → viewport {}x{}",
        measured, capture.width, height
    );

    surface.set_viewport(capture.width, height)?;
    let png = surface.capture_png()?;

    match png_dimensions(&png) {
        Some((w, h)) => debug!("Captured PNG {}x{} px, {} bytes", w, h, png.len()),
        None => debug!("Captured PNG, {} bytes (header unreadable)", png.len()),
    }
    Ok(png)
}

/// Pixel dimensions from a PNG header, if the bytes decode as one.
pub fn png_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::with_format(Cursor::new(bytes), image::ImageFormat::Png)
        .into_dimensions()
        .ok()
}
