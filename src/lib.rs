//! # mdpress
//!
//! Convert markdown documents to styled PDF (paginated) or PNG (one tall
//! image) by rendering them in a headless Chrome.
//!
//! ## Why a browser?
//!
//! Markdown turns into HTML easily; laying HTML out faithfully (web fonts,
//! tables, syntax-highlighted code, page breaks) is what browsers are for.
//! Rather than reimplementing layout, this crate styles the HTML with a
//! print-aware theme and lets Chrome print it to A4 pages or capture it as
//! a single screenshot sized to the content.
//!
//! ## Pipeline Overview
//!
//! ```text
//! markdown
//!  │
//!  ├─ 1. Parse     pulldown-cmark (GFM) + syntect classed highlighting
//!  ├─ 2. Style     fixed theme, optional pagination guard
//!  ├─ 3. Browser   one shared headless Chrome, relaunched if it dies
//!  ├─ 4. Render    fresh tab per conversion (spawn_blocking, bounded waits)
//!  └─ 5. Output    print-to-PDF (A4) | two-pass full-height PNG capture
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mdpress::{Converter, ConversionRequest, MarkdownSource, OutputFormat, RenderConfig, RenderOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = Converter::with_chrome(RenderConfig::default());
//!     let request = ConversionRequest::new(
//!         &MarkdownSource::Text("# Hello\n\nWorld".into()),
//!         OutputFormat::Pdf,
//!         RenderOptions::default(),
//!     )?;
//!     let pdf = converter.convert_to_file(&request, "hello.pdf").await?;
//!     eprintln!("{} bytes in {}ms", pdf.len(), pdf.duration_ms);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `mdpress` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! mdpress = { version = "0.1", default-features = false }
//! ```
//!
//! ## Finding Chrome
//!
//! Set `CHROME_PATH` to pin an executable. Otherwise the
//! [`chrome_locate`] crate searches the usual install locations, `PATH`,
//! and Puppeteer/Playwright download caches.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod request;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::{
    CachedBundle, ClientInput, ConversionFingerprint, ConversionSession, ConvertTransport,
    HttpTransport, SelectedFile,
};
pub use config::{CaptureGeometry, PageGeometry, RenderConfig, RenderConfigBuilder, ServerConfig};
pub use convert::Converter;
pub use error::MdPressError;
pub use output::{Rendered, RenderedBundle};
pub use request::{ConversionRequest, MarkdownSource, OutputFormat, RenderOptions};
pub use server::{router, serve, AppState};
