//! CLI binary for mdpress.
//!
//! A thin shim over the library crate: `serve` runs the HTTP endpoint,
//! `convert` renders one markdown file locally (or through a running
//! server with `--server`).

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use mdpress::convert::write_atomic;
use mdpress::{
    ConversionRequest, ConversionSession, Converter, HttpTransport, MarkdownSource, OutputFormat,
    RenderConfig, RenderOptions, SelectedFile, ServerConfig,
};
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the conversion server on the default port (3000)
  mdpress serve

  # Convert to PDF next to the input (README.pdf)
  mdpress convert README.md

  # Convert to a tall PNG
  mdpress convert README.md --format png -o readme.png

  # Both formats, rendered concurrently (notes.pdf + notes.png)
  mdpress convert notes.md --format both

  # Let large images and tables split across pages
  mdpress convert report.md --allow-image-split

  # Convert through a running server instead of a local browser
  mdpress convert README.md --server http://127.0.0.1:3000

ENVIRONMENT VARIABLES:
  CHROME_PATH               Path to a Chrome/Chromium executable
  CHROME_LOCATE_CACHE_DIR   Override the Puppeteer/Playwright cache root
  MDPRESS_BIND              Listen address for `serve`
  MDPRESS_SERVER            Server URL for `convert --server`
  RUST_LOG                  Log filter (overrides --verbose / --quiet)

SETUP:
  mdpress drives an installed Chrome or Chromium. If none is found on the
  usual paths, install one (or `npx @puppeteer/browsers install chrome`)
  or point CHROME_PATH at an executable.
"#;

/// Convert markdown to styled PDF or PNG with a headless browser.
#[derive(Parser, Debug)]
#[command(
    name = "mdpress",
    version,
    about = "Convert markdown to styled PDF or PNG with a headless browser",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    render: RenderArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "MDPRESS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "MDPRESS_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP conversion endpoint.
    Serve {
        /// Listen address.
        #[arg(long, env = "MDPRESS_BIND", default_value = "0.0.0.0:3000")]
        bind: SocketAddr,

        /// Largest accepted markdown upload, in bytes.
        #[arg(long, env = "MDPRESS_MAX_UPLOAD", default_value_t = 5 * 1024 * 1024)]
        max_upload: usize,
    },

    /// Convert one markdown file.
    Convert {
        /// Markdown file to convert.
        input: PathBuf,

        /// Output path. Default: the input path with the format's extension.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format.
        #[arg(long, value_enum, default_value = "pdf")]
        format: FormatArg,

        /// Let images, tables and code blocks break across pages.
        #[arg(long, env = "MDPRESS_ALLOW_IMAGE_SPLIT")]
        allow_image_split: bool,

        /// Convert through this server instead of a local browser.
        #[arg(long, env = "MDPRESS_SERVER")]
        server: Option<String>,

        /// Disable the spinner.
        #[arg(long, env = "MDPRESS_NO_PROGRESS")]
        no_progress: bool,
    },
}

/// Browser and timing options shared by both subcommands.
#[derive(Args, Debug)]
struct RenderArgs {
    /// Chrome/Chromium executable. Default: auto-detected.
    #[arg(long, global = true, env = "CHROME_PATH")]
    chrome_path: Option<PathBuf>,

    /// Seconds to wait for a document and its fonts to load.
    #[arg(long, global = true, env = "MDPRESS_LOAD_TIMEOUT", default_value_t = 30)]
    load_timeout: u64,

    /// Seconds allowed for one whole render.
    #[arg(long, global = true, env = "MDPRESS_RENDER_TIMEOUT", default_value_t = 60)]
    render_timeout: u64,

    /// PNG capture width in CSS pixels (200–4000).
    #[arg(long, global = true, env = "MDPRESS_CAPTURE_WIDTH", default_value_t = 900)]
    capture_width: u32,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum FormatArg {
    Pdf,
    Png,
    Both,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli.render)?;

    match cli.command {
        Command::Serve { bind, max_upload } => {
            let server_config = ServerConfig {
                bind,
                max_upload_bytes: max_upload,
                ..ServerConfig::default()
            };
            let converter = Arc::new(Converter::with_chrome(config));
            mdpress::serve(server_config, converter)
                .await
                .context("Server failed")?;
        }
        Command::Convert {
            input,
            output,
            format,
            allow_image_split,
            server,
            no_progress,
        } => {
            let job = ConvertJob {
                input,
                output,
                format,
                options: RenderOptions {
                    prevent_image_overflow: !allow_image_split,
                },
            };
            let spinner = (!cli.quiet && !no_progress).then(|| spinner(&job.input));
            let start = Instant::now();

            let written = match server {
                Some(url) => job.run_remote(&url).await,
                None => job.run_local(config).await,
            };
            if let Some(bar) = spinner {
                bar.finish_and_clear();
            }
            let written = written?;

            if !cli.quiet {
                for (path, len) in written {
                    eprintln!(
                        "{}  {}  {}  →  {}",
                        green("✔"),
                        dim(&format!("{len} bytes")),
                        dim(&format!("{}ms", start.elapsed().as_millis())),
                        bold(&path.display().to_string()),
                    );
                }
            }
        }
    }

    Ok(())
}

/// Map CLI args to `RenderConfig`.
fn build_config(args: &RenderArgs) -> Result<RenderConfig> {
    let mut builder = RenderConfig::builder()
        .load_timeout_secs(args.load_timeout)
        .render_timeout_secs(args.render_timeout)
        .capture_width(args.capture_width);
    if let Some(ref path) = args.chrome_path {
        builder = builder.chrome_path(path);
    }
    builder.build().context("Invalid configuration")
}

fn spinner(input: &Path) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_prefix("Rendering");
    bar.set_message(input.display().to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// One `convert` invocation.
struct ConvertJob {
    input: PathBuf,
    output: Option<PathBuf>,
    format: FormatArg,
    options: RenderOptions,
}

impl ConvertJob {
    /// Destination for `format`: `-o` as given for a single format, or with
    /// its extension swapped when writing both.
    fn output_path(&self, format: OutputFormat) -> PathBuf {
        match (&self.output, self.format) {
            (Some(out), FormatArg::Both) => out.with_extension(format.extension()),
            (Some(out), _) => out.clone(),
            (None, _) => self.input.with_extension(format.extension()),
        }
    }

    async fn run_local(&self, config: RenderConfig) -> Result<Vec<(PathBuf, usize)>> {
        let bytes = tokio::fs::read(&self.input)
            .await
            .with_context(|| format!("Failed to read {}", self.input.display()))?;
        let source = MarkdownSource::File {
            name: self
                .input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned()),
            bytes,
        };
        let converter = Converter::with_chrome(config);

        let rendered = match self.format {
            FormatArg::Both => {
                let request = ConversionRequest::new(&source, OutputFormat::Pdf, self.options)?;
                let bundle = converter
                    .convert_both(&request)
                    .await
                    .context("Conversion failed")?;
                vec![bundle.pdf, bundle.png]
            }
            FormatArg::Pdf | FormatArg::Png => {
                let request = ConversionRequest::new(&source, self.single_format(), self.options)?;
                vec![converter
                    .convert(&request)
                    .await
                    .context("Conversion failed")?]
            }
        };

        let mut written = Vec::with_capacity(rendered.len());
        for r in rendered {
            let path = self.output_path(r.format);
            write_atomic(&path, &r.bytes).await?;
            written.push((path, r.len()));
        }
        Ok(written)
    }

    async fn run_remote(&self, url: &str) -> Result<Vec<(PathBuf, usize)>> {
        let file = SelectedFile::from_path(&self.input).await?;
        let session = ConversionSession::new(HttpTransport::new(url)?);
        session.set_file(file);
        session.set_prevent_image_overflow(self.options.prevent_image_overflow);

        let outputs = match self.format {
            FormatArg::Both => {
                let bundle = session
                    .download_both()
                    .await
                    .context("Conversion failed")?;
                vec![
                    (OutputFormat::Pdf, bundle.pdf.clone()),
                    (OutputFormat::Png, bundle.png.clone()),
                ]
            }
            FormatArg::Pdf | FormatArg::Png => {
                let format = self.single_format();
                let bytes = session
                    .preview(format)
                    .await
                    .context("Conversion failed")?;
                vec![(format, bytes)]
            }
        };

        let mut written = Vec::with_capacity(outputs.len());
        for (format, bytes) in outputs {
            let path = self.output_path(format);
            write_atomic(&path, &bytes).await?;
            written.push((path, bytes.len()));
        }
        Ok(written)
    }

    fn single_format(&self) -> OutputFormat {
        match self.format {
            FormatArg::Png => OutputFormat::Png,
            FormatArg::Pdf | FormatArg::Both => OutputFormat::Pdf,
        }
    }
}
