//! In-process browser stand-in for integration tests.
//!
//! The fake renders deterministically from the loaded document:
//! * PDF bytes are `%PDF-1.7\n` followed by the document markup, so a test
//!   can check which document a response came from;
//! * the content height is 100 px per `<p>` element, and PNG output is a
//!   real PNG of the final viewport size.

#![allow(dead_code)]

use image::{ImageFormat, Rgba, RgbaImage};
use mdpress::config::{PageGeometry, RenderConfig};
use mdpress::pipeline::surface::{Browser, BrowserLauncher, RenderSurface};
use mdpress::pipeline::template::StyledDocument;
use mdpress::MdPressError;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Markup containing this string fails to load.
pub const FAIL_LOAD_MARKER: &str = "FAIL_LOAD";

#[derive(Default)]
pub struct Counters {
    pub launches: AtomicUsize,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub documents: Mutex<Vec<String>>,
}

impl Counters {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn documents(&self) -> Vec<String> {
        self.documents.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct FakeLauncher {
    pub counters: Arc<Counters>,
}

impl FakeLauncher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl BrowserLauncher for FakeLauncher {
    fn launch(&self, _config: &RenderConfig) -> Result<Arc<dyn Browser>, MdPressError> {
        self.counters.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeBrowser {
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct FakeBrowser {
    counters: Arc<Counters>,
}

impl Browser for FakeBrowser {
    fn is_connected(&self) -> bool {
        true
    }

    fn new_surface(&self) -> Result<Box<dyn RenderSurface>, MdPressError> {
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSurface {
            counters: Arc::clone(&self.counters),
            markup: String::new(),
            viewport: (0, 0),
        }))
    }
}

struct FakeSurface {
    counters: Arc<Counters>,
    markup: String,
    viewport: (u32, u32),
}

impl RenderSurface for FakeSurface {
    fn load(&mut self, document: &StyledDocument, _timeout: Duration) -> Result<(), MdPressError> {
        if document.as_str().contains(FAIL_LOAD_MARKER) {
            return Err(MdPressError::LoadFailed("net::ERR_FAILED".into()));
        }
        self.markup = document.as_str().to_owned();
        self.counters
            .documents
            .lock()
            .unwrap()
            .push(self.markup.clone());
        Ok(())
    }

    fn set_viewport(&mut self, width: u32, height: u32) -> Result<(), MdPressError> {
        self.viewport = (width, height);
        Ok(())
    }

    fn content_height(&mut self) -> Result<f64, MdPressError> {
        Ok(self.markup.matches("<p>").count() as f64 * 100.0)
    }

    fn print_pdf(&mut self, _page: &PageGeometry) -> Result<Vec<u8>, MdPressError> {
        let mut out = b"%PDF-1.7\n".to_vec();
        out.extend_from_slice(self.markup.as_bytes());
        Ok(out)
    }

    fn capture_png(&mut self) -> Result<Vec<u8>, MdPressError> {
        let (w, h) = self.viewport;
        let img = RgbaImage::from_pixel(w.max(1), h.max(1), Rgba([255, 255, 255, 255]));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| MdPressError::CaptureFailed {
                format: "png",
                detail: e.to_string(),
            })?;
        Ok(buf)
    }

    fn close(&mut self) -> Result<(), MdPressError> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
