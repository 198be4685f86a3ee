//! Pipeline stages for markdown-to-PDF/PNG conversion.
//!
//! Each submodule implements exactly one step. Only [`chrome`] knows about
//! `headless_chrome`; everything else talks to the browser through the
//! traits in [`surface`], which keeps the stages testable without Chrome.
//!
//! ## Data Flow
//!
//! ```text
//! markdown ──▶ template ──▶ session ──▶ render ──▶ rasterize
//! (HTML frag)  (styled doc) (browser)   (surface)  (PDF | PNG)
//! ```
//!
//! 1. [`markdown`]: CommonMark + GFM to an HTML fragment, with classed
//!    syntax highlighting for fenced code
//! 2. [`template`]: wrap the fragment in the fixed theme; the
//!    pagination guard is included only when image-overflow prevention is on
//! 3. [`session`] : hand out the single shared browser, relaunching it when
//!    the connection is lost
//! 4. [`render`]  : open a surface, load the document, rasterize, close;
//!    runs in `spawn_blocking` because the DevTools client is synchronous
//! 5. [`rasterize`]: paginated print for PDF, measure-then-resize capture
//!    for PNG

pub mod chrome;
pub mod markdown;
pub mod rasterize;
pub mod render;
pub mod session;
pub mod surface;
pub mod template;
