//! Conversion entry points.
//!
//! A [`Converter`] owns the browser session manager and the code
//! highlighter, and is shared (behind an `Arc`) by every caller: the HTTP
//! handlers, the CLI and library users. Each call runs the whole pipeline
//! for one [`ConversionRequest`]:
//!
//! ```text
//! markdown ──▶ HTML fragment ──▶ StyledDocument ──▶ acquire browser ──▶ render
//! ```
//!
//! [`Converter::convert_both`] renders PDF and PNG concurrently on two
//! surfaces of the same browser; either failure fails the pair.

use crate::config::RenderConfig;
use crate::error::MdPressError;
use crate::output::{Rendered, RenderedBundle};
use crate::pipeline::chrome::ChromeLauncher;
use crate::pipeline::markdown::{render_markdown, CodeHighlighter, SyntectHighlighter};
use crate::pipeline::rasterize::Rasterizer;
use crate::pipeline::render::render_document;
use crate::pipeline::session::BrowserSessionManager;
use crate::pipeline::surface::BrowserLauncher;
use crate::pipeline::template::{build_document, StyledDocument};
use crate::request::{ConversionRequest, OutputFormat};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Shared conversion engine.
pub struct Converter {
    sessions: BrowserSessionManager,
    highlighter: Arc<dyn CodeHighlighter>,
}

impl Converter {
    /// Build a converter around any browser launcher.
    pub fn new(launcher: Arc<dyn BrowserLauncher>, config: RenderConfig) -> Self {
        Self {
            sessions: BrowserSessionManager::new(launcher, config),
            highlighter: SyntectHighlighter::shared(),
        }
    }

    /// Converter backed by a real headless Chrome, launched on first use.
    pub fn with_chrome(config: RenderConfig) -> Self {
        Self::new(Arc::new(ChromeLauncher), config)
    }

    /// Replace the code highlighter.
    pub fn with_highlighter(mut self, highlighter: Arc<dyn CodeHighlighter>) -> Self {
        self.highlighter = highlighter;
        self
    }

    pub fn config(&self) -> &RenderConfig {
        self.sessions.config()
    }

    /// `true` once the shared browser has been launched.
    pub async fn browser_ready(&self) -> bool {
        self.sessions.is_initialised().await
    }

    /// Render one request to its requested format.
    ///
    /// # Errors
    /// Any pipeline error: launch, surface, load, measure, capture or
    /// timeout. The surface is already closed when the error is returned.
    pub async fn convert(&self, request: &ConversionRequest) -> Result<Rendered, MdPressError> {
        let start = Instant::now();
        let format = request.format();
        info!(
            "Converting {} chars of markdown to {}",
            request.markdown().len(),
            format
        );

        let document = self.style(request).await?;
        let browser = self.sessions.acquire().await?;
        let rasterizer = Rasterizer::for_format(format, self.config());
        let bytes = render_document(browser, document, rasterizer, self.config()).await?;

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Converted to {} in {}ms ({} bytes)",
            format,
            duration_ms,
            bytes.len()
        );

        Ok(Rendered {
            format,
            bytes,
            duration_ms,
        })
    }

    /// Render the same content and options to both PDF and PNG, in parallel.
    ///
    /// The request's own format is ignored.
    pub async fn convert_both(
        &self,
        request: &ConversionRequest,
    ) -> Result<RenderedBundle, MdPressError> {
        let pdf_request = request.with_format(OutputFormat::Pdf);
        let png_request = request.with_format(OutputFormat::Png);

        let (pdf, png) =
            futures::future::try_join(self.convert(&pdf_request), self.convert(&png_request))
                .await?;
        Ok(RenderedBundle { pdf, png })
    }

    /// Convert and write the result to `output_path`.
    ///
    /// Uses atomic write (temp file + rename) to prevent partial files.
    pub async fn convert_to_file(
        &self,
        request: &ConversionRequest,
        output_path: impl AsRef<Path>,
    ) -> Result<Rendered, MdPressError> {
        let rendered = self.convert(request).await?;
        write_atomic(output_path.as_ref(), &rendered.bytes).await?;
        Ok(rendered)
    }

    /// Markdown → fragment → styled document. Highlighting is CPU-bound, so
    /// it runs on the blocking pool like the browser calls.
    async fn style(&self, request: &ConversionRequest) -> Result<StyledDocument, MdPressError> {
        let markdown = request.markdown().to_owned();
        let options = request.options();
        let highlighter = Arc::clone(&self.highlighter);

        let document = tokio::task::spawn_blocking(move || {
            let fragment = render_markdown(&markdown, highlighter.as_ref());
            build_document(&fragment, &options)
        })
        .await
        .map_err(|e| MdPressError::Internal(format!("Styling task panicked: {}", e)))?;

        debug!(
            "Styled document: {} bytes (pagination guard: {})",
            document.len(),
            options.prevent_image_overflow
        );
        Ok(document)
    }
}

/// Write `bytes` to `path` via a sibling temp file and rename.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), MdPressError> {
    let write_err = |source: std::io::Error| MdPressError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = tmp_sibling(path);
    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
