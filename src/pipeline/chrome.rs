//! `headless_chrome` implementation of the browser-automation seam.
//!
//! ## Why a temp file instead of a data URI?
//!
//! Chrome caps data URIs at a few megabytes and percent-encoding roughly
//! doubles the payload. Writing the styled document to a [`tempfile`] and
//! navigating to its `file://` URL has no size ceiling, and
//! `wait_until_navigated` then covers the load event, which already includes
//! the font stylesheet. The file is removed when the surface closes.
//!
//! ## Why is the sandbox disabled?
//!
//! The service commonly runs as root inside a container, where Chrome's
//! setuid/namespace sandbox cannot start.

use crate::config::{PageGeometry, RenderConfig};
use crate::error::MdPressError;
use crate::pipeline::surface::{Browser, BrowserLauncher, RenderSurface};
use crate::pipeline::template::StyledDocument;
use headless_chrome::protocol::cdp::Emulation;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{LaunchOptions, Tab};
use std::ffi::OsStr;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Resolves `document.fonts.ready` so web fonts are applied before capture.
const FONTS_READY_JS: &str = "document.fonts.ready.then(() => true)";

/// Launches real Chrome/Chromium processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromeLauncher;

impl BrowserLauncher for ChromeLauncher {
    fn launch(&self, config: &RenderConfig) -> Result<Arc<dyn Browser>, MdPressError> {
        let path = match &config.chrome_path {
            Some(p) => p.clone(),
            None => chrome_locate::locate_chrome()
                .map_err(|e| MdPressError::BrowserLaunchFailed(e.to_string()))?,
        };
        debug!("Launching browser at {}", path.display());

        let options = LaunchOptions::default_builder()
            .path(Some(path))
            .headless(true)
            .sandbox(false)
            .window_size(Some((config.capture.width, config.capture.initial_height)))
            .idle_browser_timeout(config.browser_idle_timeout())
            .args(vec![
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--hide-scrollbars"),
            ])
            .build()
            .map_err(|e| MdPressError::BrowserLaunchFailed(e.to_string()))?;

        let process = headless_chrome::Browser::new(options)
            .map_err(|e| MdPressError::BrowserLaunchFailed(format!("{e:#}")))?;

        info!(pid = ?process.get_process_id(), "Headless browser launched");
        Ok(Arc::new(ChromeBrowser { process }))
    }
}

/// A running Chrome process. Dropping it kills the process.
pub struct ChromeBrowser {
    process: headless_chrome::Browser,
}

impl Browser for ChromeBrowser {
    fn is_connected(&self) -> bool {
        self.process.get_version().is_ok()
    }

    fn new_surface(&self) -> Result<Box<dyn RenderSurface>, MdPressError> {
        let tab = self
            .process
            .new_tab()
            .map_err(|e| MdPressError::SurfaceFailed(format!("{e:#}")))?;
        Ok(Box::new(ChromeSurface {
            tab,
            page_file: None,
        }))
    }
}

/// One Chrome tab plus the temp file its document was loaded from.
pub struct ChromeSurface {
    tab: Arc<Tab>,
    page_file: Option<NamedTempFile>,
}

impl ChromeSurface {
    fn write_page(document: &StyledDocument) -> Result<NamedTempFile, MdPressError> {
        let mut file = tempfile::Builder::new()
            .prefix("mdpress-")
            .suffix(".html")
            .tempfile()
            .map_err(|e| MdPressError::Internal(format!("tempfile: {e}")))?;
        file.write_all(document.as_str().as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| MdPressError::Internal(format!("tempfile write: {e}")))?;
        Ok(file)
    }
}

impl RenderSurface for ChromeSurface {
    fn load(&mut self, document: &StyledDocument, timeout: Duration) -> Result<(), MdPressError> {
        let file = Self::write_page(document)?;
        let url = reqwest::Url::from_file_path(file.path()).map_err(|()| {
            MdPressError::Internal(format!("not an absolute path: {}", file.path().display()))
        })?;
        self.page_file = Some(file);

        let start = Instant::now();
        self.tab.set_default_timeout(timeout);
        let loaded = self
            .tab
            .navigate_to(url.as_str())
            .and_then(|tab| tab.wait_until_navigated())
            .and_then(|tab| tab.evaluate(FONTS_READY_JS, true));

        match loaded {
            Ok(_) => {
                debug!("Document loaded in {}ms", start.elapsed().as_millis());
                Ok(())
            }
            Err(_) if start.elapsed() >= timeout => Err(MdPressError::LoadTimeout {
                secs: timeout.as_secs(),
            }),
            Err(e) => Err(MdPressError::LoadFailed(format!("{e:#}"))),
        }
    }

    /// Overrides the page's device metrics rather than resizing the window:
    /// window bounds are clamped to the virtual screen, device metrics are
    /// not, so a tall capture is never cut short.
    fn set_viewport(&mut self, width: u32, height: u32) -> Result<(), MdPressError> {
        self.tab
            .call_method(Emulation::SetDeviceMetricsOverride {
                width,
                height,
                device_scale_factor: 1.0,
                mobile: false,
                scale: None,
                screen_width: Some(width),
                screen_height: Some(height),
                position_x: None,
                position_y: None,
                dont_set_visible_size: None,
                screen_orientation: None,
                viewport: None,
                display_feature: None,
                device_posture: None,
            })
            .map(|_| ())
            .map_err(|e| MdPressError::CaptureFailed {
                format: "png",
                detail: format!("resize viewport: {e:#}"),
            })
    }

    fn content_height(&mut self) -> Result<f64, MdPressError> {
        let body = self
            .tab
            .find_element("body")
            .map_err(|e| MdPressError::MeasureFailed(format!("{e:#}")))?;
        let model = body
            .get_box_model()
            .map_err(|e| MdPressError::MeasureFailed(format!("{e:#}")))?;
        Ok(model.height)
    }

    fn print_pdf(&mut self, page: &PageGeometry) -> Result<Vec<u8>, MdPressError> {
        let options = PrintToPdfOptions {
            print_background: Some(true),
            paper_width: Some(page.paper_width_in),
            paper_height: Some(page.paper_height_in),
            margin_top: Some(page.margin_top_in()),
            margin_bottom: Some(page.margin_bottom_in()),
            margin_left: Some(page.margin_left_in()),
            margin_right: Some(page.margin_right_in()),
            prefer_css_page_size: Some(false),
            ..Default::default()
        };
        self.tab
            .print_to_pdf(Some(options))
            .map_err(|e| MdPressError::CaptureFailed {
                format: "pdf",
                detail: format!("{e:#}"),
            })
    }

    fn capture_png(&mut self) -> Result<Vec<u8>, MdPressError> {
        self.tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| MdPressError::CaptureFailed {
                format: "png",
                detail: format!("{e:#}"),
            })
    }

    fn close(&mut self) -> Result<(), MdPressError> {
        // Temp file goes whether or not the tab closes cleanly.
        self.page_file.take();
        self.tab
            .close(false)
            .map(|_| ())
            .map_err(|e| MdPressError::Internal(format!("close tab: {e:#}")))
    }
}
