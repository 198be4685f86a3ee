//! Error types for the mdpress library.
//!
//! One enum, [`MdPressError`], covers every fatal outcome of a conversion.
//! Its variants fall into three groups that callers treat differently:
//!
//! * **Input**: the request itself is unusable (empty markdown, oversized
//!   upload, malformed body). These never reach the browser and are safe to
//!   show verbatim to the person who sent the request.
//!
//! * **Pipeline**: the browser failed to launch, load, measure or capture.
//!   The detail is useful in server logs but is not exposed to HTTP callers.
//!
//! * **Client**: the preview/download cache could not reach the server or
//!   the server rejected the request.
//!
//! [`MdPressError::is_input_error`] is the single classification point the
//! HTTP layer uses to pick between 400 and 500.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the mdpress library.
#[derive(Debug, Error)]
pub enum MdPressError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Resolved markdown was empty or whitespace only.
    #[error("No markdown content provided")]
    EmptyContent,

    /// Uploaded file exceeded the configured limit.
    #[error("File too large (max {}MB)", .limit / (1024 * 1024))]
    FileTooLarge { limit: usize },

    /// Request body could not be decoded.
    #[error("Invalid request: {0}")]
    MalformedRequest(String),

    /// Local input file could not be read (CLI).
    #[error("Failed to read input '{path}': {source}")]
    InputReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Browser / pipeline errors ─────────────────────────────────────────
    /// The headless browser process could not be started.
    #[error(
        "Failed to launch headless browser: {0}\n\
Install Chrome or Chromium, or set CHROME_PATH=/path/to/chrome."
    )]
    BrowserLaunchFailed(String),

    /// A new tab could not be opened on the live browser.
    #[error("Failed to open render surface: {0}")]
    SurfaceFailed(String),

    /// The styled document failed to load into the surface.
    #[error("Failed to load document: {0}")]
    LoadFailed(String),

    /// The surface did not reach quiescence in time.
    #[error("Document did not finish loading within {secs}s")]
    LoadTimeout { secs: u64 },

    /// The content layout box could not be measured.
    #[error("Failed to measure rendered content: {0}")]
    MeasureFailed(String),

    /// Print-to-PDF or screenshot capture failed.
    #[error("Failed to capture {format} output: {detail}")]
    CaptureFailed { format: &'static str, detail: String },

    /// The whole render exceeded the configured budget.
    #[error("Rendering timed out after {secs}s")]
    RenderTimeout { secs: u64 },

    // ── Client errors ─────────────────────────────────────────────────────
    /// The conversion server could not be reached.
    #[error("Conversion request failed: {0}")]
    Transport(String),

    /// The conversion server answered with a non-success status.
    #[error("Server rejected conversion ({status}): {message}")]
    ServerRejected { status: u16, message: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MdPressError {
    /// `true` for problems with the request itself rather than the pipeline.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            MdPressError::EmptyContent
                | MdPressError::FileTooLarge { .. }
                | MdPressError::MalformedRequest(_)
                | MdPressError::InputReadFailed { .. }
        )
    }
}
