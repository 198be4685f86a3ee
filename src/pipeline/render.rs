//! Page renderer: one styled document → one surface → one rasterizer.
//!
//! ## Why spawn_blocking?
//!
//! `headless_chrome` speaks the DevTools protocol synchronously: every call
//! parks the calling thread until Chrome answers. Running the whole
//! open/load/rasterize/close sequence on the blocking pool keeps Tokio
//! workers free, so many conversions can be in flight at once.
//!
//! ## Lifetime of the surface
//!
//! The surface lives in a [`SurfaceGuard`] created immediately after it is
//! opened. Whichever way the closure exits (success, `?`, panic), the
//! guard's `Drop` closes the tab before control returns to the caller.

use crate::config::RenderConfig;
use crate::error::MdPressError;
use crate::pipeline::rasterize::Rasterizer;
use crate::pipeline::surface::{Browser, SurfaceGuard};
use crate::pipeline::template::StyledDocument;
use std::sync::Arc;
use tracing::debug;

/// Render `document` on a fresh surface of `browser`.
///
/// Steps are strictly sequential: open, load (bounded by
/// `config.load_timeout`), rasterize, close. The whole call is bounded by
/// `config.render_timeout`.
pub async fn render_document(
    browser: Arc<dyn Browser>,
    document: StyledDocument,
    rasterizer: Rasterizer,
    config: &RenderConfig,
) -> Result<Vec<u8>, MdPressError> {
    let load_timeout = config.load_timeout();
    let render_timeout = config.render_timeout();

    let task = tokio::task::spawn_blocking(move || {
        render_blocking(browser.as_ref(), &document, rasterizer, load_timeout)
    });

    match tokio::time::timeout(render_timeout, task).await {
        Ok(joined) => {
            joined.map_err(|e| MdPressError::Internal(format!("Render task panicked: {}", e)))?
        }
        // The blocking task keeps running; its guard still closes the tab.
        Err(_) => Err(MdPressError::RenderTimeout {
            secs: render_timeout.as_secs(),
        }),
    }
}

/// Blocking implementation of the render sequence.
fn render_blocking(
    browser: &dyn Browser,
    document: &StyledDocument,
    rasterizer: Rasterizer,
    load_timeout: std::time::Duration,
) -> Result<Vec<u8>, MdPressError> {
    let mut surface = SurfaceGuard::new(browser.new_surface()?);
    debug!(
        "Surface opened for {} ({} bytes of markup)",
        rasterizer.format(),
        document.len()
    );

    surface.load(document, load_timeout)?;
    rasterizer.rasterize(&mut *surface)
}
