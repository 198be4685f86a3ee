//! Configuration types for markdown rendering and the HTTP service.
//!
//! Everything that shapes the rendered output or bounds the browser's
//! behaviour lives in [`RenderConfig`], built via [`RenderConfigBuilder`].
//! Transport-level knobs (bind address, upload limits) live separately in
//! [`ServerConfig`] because the library can render without ever serving HTTP.
//!
//! Style-affecting request options are *not* here: those travel per request
//! as [`crate::request::RenderOptions`].

use crate::error::MdPressError;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Millimetres per inch, for converting margins to print units.
const MM_PER_INCH: f64 = 25.4;

/// Configuration for the rendering pipeline.
///
/// # Example
/// ```rust
/// use mdpress::RenderConfig;
///
/// let config = RenderConfig::builder()
///     .capture_width(1024)
///     .load_timeout_secs(10)
///     .build()
///     .unwrap();
/// assert_eq!(config.capture.width, 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Paper size and margins for PDF output. Default: A4, 20/15 mm margins.
    pub page: PageGeometry,

    /// Viewport sizing for PNG output. Default: 900 px wide, 40 px padding.
    pub capture: CaptureGeometry,

    /// Upper bound on waiting for the document (and its font stylesheet) to
    /// load in the browser. Default: 30.
    ///
    /// The theme references an external stylesheet; on a host without
    /// network access the load event still fires once the request fails,
    /// but a black-holed connection would otherwise stall forever.
    pub load_timeout_secs: u64,

    /// Upper bound on one full render (surface open → bytes). Default: 60.
    pub render_timeout_secs: u64,

    /// How long the browser connection may sit idle before `headless_chrome`
    /// drops it. Default: 3600.
    ///
    /// A dropped connection is not fatal: the session manager notices the
    /// dead handle and relaunches on the next request.
    pub browser_idle_timeout_secs: u64,

    /// Explicit browser executable. If None, resolved via `chrome-locate`.
    pub chrome_path: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            page: PageGeometry::default(),
            capture: CaptureGeometry::default(),
            load_timeout_secs: 30,
            render_timeout_secs: 60,
            browser_idle_timeout_secs: 3600,
            chrome_path: None,
        }
    }
}

impl RenderConfig {
    /// Create a new builder for `RenderConfig`.
    pub fn builder() -> RenderConfigBuilder {
        RenderConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    pub fn browser_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.browser_idle_timeout_secs)
    }
}

/// Builder for [`RenderConfig`].
#[derive(Debug)]
pub struct RenderConfigBuilder {
    config: RenderConfig,
}

impl RenderConfigBuilder {
    pub fn page(mut self, page: PageGeometry) -> Self {
        self.config.page = page;
        self
    }

    pub fn capture_width(mut self, px: u32) -> Self {
        self.config.capture.width = px.clamp(200, 4000);
        self
    }

    pub fn capture_padding(mut self, px: u32) -> Self {
        self.config.capture.bottom_padding = px.min(1000);
        self
    }

    pub fn load_timeout_secs(mut self, secs: u64) -> Self {
        self.config.load_timeout_secs = secs.max(1);
        self
    }

    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render_timeout_secs = secs.max(1);
        self
    }

    pub fn browser_idle_timeout_secs(mut self, secs: u64) -> Self {
        self.config.browser_idle_timeout_secs = secs.max(1);
        self
    }

    pub fn chrome_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RenderConfig, MdPressError> {
        let c = &self.config;
        if c.render_timeout_secs < c.load_timeout_secs {
            return Err(MdPressError::InvalidConfig(format!(
                "render timeout ({}s) must be ≥ load timeout ({}s)",
                c.render_timeout_secs, c.load_timeout_secs
            )));
        }
        let p = &c.page;
        if p.margin_top_mm + p.margin_bottom_mm >= p.paper_height_in * MM_PER_INCH
            || p.margin_left_mm + p.margin_right_mm >= p.paper_width_in * MM_PER_INCH
        {
            return Err(MdPressError::InvalidConfig(
                "page margins leave no printable area".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Geometry ─────────────────────────────────────────────────────────────

/// Fixed page geometry for paginated output.
///
/// Paper size is in inches because that is what the browser's print
/// command takes; margins are in millimetres because that is how print
/// layouts are usually specified.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub paper_width_in: f64,
    pub paper_height_in: f64,
    pub margin_top_mm: f64,
    pub margin_bottom_mm: f64,
    pub margin_left_mm: f64,
    pub margin_right_mm: f64,
}

impl PageGeometry {
    /// ISO A4 with 20 mm top/bottom and 15 mm left/right margins.
    pub const A4: PageGeometry = PageGeometry {
        paper_width_in: 8.27,
        paper_height_in: 11.69,
        margin_top_mm: 20.0,
        margin_bottom_mm: 20.0,
        margin_left_mm: 15.0,
        margin_right_mm: 15.0,
    };

    pub fn margin_top_in(&self) -> f64 {
        self.margin_top_mm / MM_PER_INCH
    }

    pub fn margin_bottom_in(&self) -> f64 {
        self.margin_bottom_mm / MM_PER_INCH
    }

    pub fn margin_left_in(&self) -> f64 {
        self.margin_left_mm / MM_PER_INCH
    }

    pub fn margin_right_in(&self) -> f64 {
        self.margin_right_mm / MM_PER_INCH
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::A4
    }
}

/// Viewport sizing for the full-capture raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureGeometry {
    /// Fixed raster width in CSS pixels. Default: 900.
    pub width: u32,
    /// Height of the first-pass viewport, before content is measured. Default: 800.
    pub initial_height: u32,
    /// Blank space kept below the measured content. Default: 40.
    pub bottom_padding: u32,
}

impl Default for CaptureGeometry {
    fn default() -> Self {
        Self {
            width: 900,
            initial_height: 800,
            bottom_padding: 40,
        }
    }
}

impl CaptureGeometry {
    /// Final viewport height for a measured content height.
    ///
    /// Negative or NaN measurements collapse to zero, so the result is never
    /// smaller than the padding.
    pub fn fitted_height(&self, content_height: f64) -> u32 {
        let content = if content_height.is_finite() && content_height > 0.0 {
            content_height.ceil() as u32
        } else {
            0
        };
        content.saturating_add(self.bottom_padding)
    }
}

// ── Server ───────────────────────────────────────────────────────────────

/// Configuration for the HTTP endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Listen address. Default: 0.0.0.0:3000.
    pub bind: SocketAddr,

    /// Largest accepted uploaded markdown file. Default: 5 MiB.
    pub max_upload_bytes: usize,

    /// Largest accepted request body, all fields included. Default: 32 MiB.
    ///
    /// Must exceed `max_upload_bytes` by a comfortable margin so an
    /// oversized file reaches the handler and gets the specific
    /// "file too large" answer rather than a bare 413.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
            max_upload_bytes: 5 * 1024 * 1024,
            max_body_bytes: 32 * 1024 * 1024,
        }
    }
}
