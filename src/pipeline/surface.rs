//! Browser-automation seam.
//!
//! The rest of the pipeline talks to a browser only through these three
//! traits, which lets the HTTP layer and the rasterizers be tested with an
//! in-process fake. [`super::chrome`] holds the `headless_chrome`
//! implementation.
//!
//! All methods are blocking: callers run them inside
//! `tokio::task::spawn_blocking`.

use crate::config::{PageGeometry, RenderConfig};
use crate::error::MdPressError;
use crate::pipeline::template::StyledDocument;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::{debug, warn};

/// Starts browser processes.
pub trait BrowserLauncher: Send + Sync {
    /// Launch a new browser process.
    fn launch(&self, config: &RenderConfig) -> Result<Arc<dyn Browser>, MdPressError>;
}

/// A live browser process.
pub trait Browser: Send + Sync {
    /// Cheap liveness probe; `false` once the process or its connection died.
    fn is_connected(&self) -> bool;

    /// Open a fresh, unshared surface (a tab).
    fn new_surface(&self) -> Result<Box<dyn RenderSurface>, MdPressError>;
}

/// One isolated browsing context that renders exactly one document.
pub trait RenderSurface: Send {
    /// Load the document and wait until it and its sub-resources settle,
    /// giving up after `timeout`.
    fn load(
        &mut self,
        document: &StyledDocument,
        timeout: std::time::Duration,
    ) -> Result<(), MdPressError>;

    /// Resize the viewport in CSS pixels.
    fn set_viewport(&mut self, width: u32, height: u32) -> Result<(), MdPressError>;

    /// Height of the document body's layout box in CSS pixels.
    fn content_height(&mut self) -> Result<f64, MdPressError>;

    /// Print the loaded document to a fixed-page PDF.
    fn print_pdf(&mut self, page: &PageGeometry) -> Result<Vec<u8>, MdPressError>;

    /// Capture the viewport as an opaque PNG.
    fn capture_png(&mut self) -> Result<Vec<u8>, MdPressError>;

    /// Release the surface. Called exactly once, by [`SurfaceGuard`].
    fn close(&mut self) -> Result<(), MdPressError>;
}

/// Owns a surface and closes it when dropped, on every exit path.
pub struct SurfaceGuard {
    surface: Box<dyn RenderSurface>,
}

impl SurfaceGuard {
    pub fn new(surface: Box<dyn RenderSurface>) -> Self {
        Self { surface }
    }
}

impl Deref for SurfaceGuard {
    type Target = dyn RenderSurface;

    fn deref(&self) -> &Self::Target {
        self.surface.as_ref()
    }
}

impl DerefMut for SurfaceGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.surface.as_mut()
    }
}

impl Drop for SurfaceGuard {
    fn drop(&mut self) {
        match self.surface.close() {
            Ok(()) => debug!("Render surface closed"),
            Err(e) => warn!("Failed to close render surface: {}", e),
        }
    }
}
