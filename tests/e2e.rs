//! End-to-end tests against a real headless Chrome.
//!
//! These tests launch Chrome/Chromium and render real documents. They are
//! gated behind the `E2E_ENABLED` environment variable so they do not run in
//! CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture
//!
//! Point at a specific browser with `CHROME_PATH=/path/to/chrome`, and add
//! `RUST_LOG=mdpress=debug` to see the pipeline's own logs.

use mdpress::pipeline::rasterize::png_dimensions;
use mdpress::{
    ConversionRequest, Converter, MarkdownSource, OutputFormat, RenderConfig, RenderOptions,
};
use std::path::PathBuf;
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn output_dir() -> PathBuf {
    let d = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases/output");
    std::fs::create_dir_all(&d).ok();
    d
}

/// Route `tracing` output through the test harness. Safe to call from every
/// test; only the first call installs the subscriber.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Skip this test unless E2E_ENABLED is set and a browser can be found.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        if let Err(e) = chrome_locate::locate_chrome() {
            println!("SKIP: {e}");
            return;
        }
        init_tracing();
    }};
}

fn request(markdown: &str, format: OutputFormat, prevent_image_overflow: bool) -> ConversionRequest {
    ConversionRequest::new(
        &MarkdownSource::Text(markdown.into()),
        format,
        RenderOptions {
            prevent_image_overflow,
        },
    )
    .expect("non-empty markdown")
}

const SAMPLE: &str = r#"# Quarterly Report

Some **bold** text, some `inline code`, and a [link](https://example.com).

| Region | Revenue |
|--------|--------:|
| North  |   1,204 |
| South  |     987 |

```rust
fn main() {
    println!("hello");
}
```

> A blockquote that should stay on one page.

- [x] done
- [ ] pending
"#;

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_pdf_from_heading() {
    e2e_skip_unless_ready!();
    let converter = Converter::with_chrome(RenderConfig::default());

    let out = converter
        .convert_to_file(
            &request("# Hi", OutputFormat::Pdf, true),
            output_dir().join("hi.pdf"),
        )
        .await
        .expect("conversion should succeed");

    assert!(out.has_valid_magic(), "PDF should start with %PDF-");
    assert!(out.len() > 500, "PDF suspiciously small: {} bytes", out.len());
    println!("hi.pdf ✓  {} bytes in {}ms", out.len(), out.duration_ms);
}

#[tokio::test]
async fn test_png_from_heading_is_capture_width() {
    e2e_skip_unless_ready!();
    let converter = Converter::with_chrome(RenderConfig::default());

    let out = converter
        .convert(&request("# Hi", OutputFormat::Png, true))
        .await
        .expect("conversion should succeed");

    assert!(out.has_valid_magic());
    let (w, h) = png_dimensions(&out.bytes).expect("decodable PNG");
    assert_eq!(w, 900);
    assert!(h >= 40, "height {h} should include bottom padding");
}

#[tokio::test]
async fn test_png_grows_with_content() {
    e2e_skip_unless_ready!();
    let converter = Converter::with_chrome(RenderConfig::default());

    let short = converter
        .convert(&request("# Hi", OutputFormat::Png, true))
        .await
        .expect("short");
    let long_md = (1..=60)
        .map(|i| format!("Paragraph number {i}."))
        .collect::<Vec<_>>()
        .join("\n\n");
    let long = converter
        .convert(&request(&long_md, OutputFormat::Png, true))
        .await
        .expect("long");

    let (_, short_h) = png_dimensions(&short.bytes).expect("short PNG");
    let (_, long_h) = png_dimensions(&long.bytes).expect("long PNG");
    assert!(
        long_h > short_h + 1000,
        "long document ({long_h}px) should be much taller than short ({short_h}px)"
    );
}

#[tokio::test]
async fn test_tall_png_is_not_clipped_to_screen() {
    e2e_skip_unless_ready!();
    let converter = Converter::with_chrome(RenderConfig::default());

    let md = (1..=250)
        .map(|i| format!("Paragraph number {i}."))
        .collect::<Vec<_>>()
        .join("\n\n");
    let out = converter
        .convert(&request(&md, OutputFormat::Png, true))
        .await
        .expect("tall PNG");

    // Far taller than any virtual screen the window could be clamped to.
    let (w, h) = png_dimensions(&out.bytes).expect("decodable PNG");
    assert_eq!(w, 900);
    assert!(h > 6000, "tall document captured at only {h}px");
    std::fs::write(output_dir().join("tall.png"), &out.bytes).ok();
}

#[tokio::test]
async fn test_both_formats_share_one_browser() {
    e2e_skip_unless_ready!();
    let converter = Converter::with_chrome(RenderConfig::default());

    let bundle = converter
        .convert_both(&request(SAMPLE, OutputFormat::Pdf, true))
        .await
        .expect("both formats should render");

    assert!(bundle.pdf.has_valid_magic());
    assert!(bundle.png.has_valid_magic());
    assert!(converter.browser_ready().await);

    std::fs::write(output_dir().join("sample.pdf"), &bundle.pdf.bytes).ok();
    std::fs::write(output_dir().join("sample.png"), &bundle.png.bytes).ok();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_conversions() {
    e2e_skip_unless_ready!();
    let converter = Arc::new(Converter::with_chrome(RenderConfig::default()));

    let tasks: Vec<_> = (0..4)
        .map(|i| {
            let converter = Arc::clone(&converter);
            tokio::spawn(async move {
                let format = if i % 2 == 0 {
                    OutputFormat::Pdf
                } else {
                    OutputFormat::Png
                };
                converter
                    .convert(&request(&format!("# Document {i}"), format, i < 2))
                    .await
            })
        })
        .collect();

    for task in tasks {
        let out = task.await.unwrap().expect("concurrent conversion");
        assert!(out.has_valid_magic());
    }
}

#[tokio::test]
async fn test_unreachable_image_does_not_hang() {
    e2e_skip_unless_ready!();
    let config = RenderConfig::builder()
        .load_timeout_secs(10)
        .render_timeout_secs(20)
        .build()
        .expect("valid config");
    let converter = Converter::with_chrome(config);

    // A broken image must not stall the load past the configured bound.
    let result = converter
        .convert(&request(
            "![missing](http://127.0.0.1:9/none.png)",
            OutputFormat::Pdf,
            true,
        ))
        .await;
    match result {
        Ok(out) => assert!(out.has_valid_magic()),
        Err(e) => println!("load failed within bound: {e}"),
    }
}
