//! Client-side conversion cache.
//!
//! A [`ConversionSession`] sits in front of the conversion endpoint and keeps
//! at most one [`CachedBundle`]: the PDF and PNG produced by the last
//! "download both" for a given input and setting. Previews that match the
//! bundle's fingerprint are answered from memory; anything else goes over
//! the [`ConvertTransport`].
//!
//! ```text
//! set_text / set_file / clear_input / set_prevent_image_overflow
//!        │ (drop bundle)
//!        ▼
//! preview(fmt) ──fingerprint == bundle?──▶ cached bytes
//!        │ no
//!        ▼
//!   transport.convert(fmt)   (not cached)
//!
//! download_both() ──▶ drop bundle ──▶ try_join(pdf, png) ──▶ store new Arc<CachedBundle>
//! ```
//!
//! The bundle is only ever replaced whole, as an `Arc`, under a short
//! `std::sync::Mutex` section that never spans an `.await`.

use crate::error::MdPressError;
use crate::request::{OutputFormat, RenderOptions};
use serde::Deserialize;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::UNIX_EPOCH;
use tracing::{debug, info};

// ── Input ────────────────────────────────────────────────────────────────

/// A file picked by the user, with the metadata that identifies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub size: u64,
    /// Last-modified time, milliseconds since the Unix epoch.
    pub modified_ms: u64,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    /// Read a file and its metadata from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, MdPressError> {
        let path = path.as_ref();
        let read_err = |source: std::io::Error| MdPressError::InputReadFailed {
            path: path.to_path_buf(),
            source,
        };

        let meta = tokio::fs::metadata(path).await.map_err(read_err)?;
        let bytes = tokio::fs::read(path).await.map_err(read_err)?;
        let modified_ms = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            name,
            size: bytes.len() as u64,
            modified_ms,
            bytes,
        })
    }
}

/// The current markdown input of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ClientInput {
    #[default]
    Empty,
    Text(String),
    File(SelectedFile),
}

impl ClientInput {
    /// `true` when there is nothing worth sending to the server.
    pub fn is_empty(&self) -> bool {
        match self {
            ClientInput::Empty => true,
            ClientInput::Text(text) => text.trim().is_empty(),
            ClientInput::File(file) => file.bytes.is_empty(),
        }
    }
}

/// Identity of an input + settings combination.
///
/// Text is identified by its literal content, files by name, size and
/// last-modified time (not by content).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversionFingerprint(String);

impl ConversionFingerprint {
    pub fn compute(input: &ClientInput, options: RenderOptions) -> Self {
        let source = match input {
            ClientInput::Empty => "empty".to_string(),
            ClientInput::Text(text) => format!("text:{}:{}", text.len(), text),
            ClientInput::File(file) => format!(
                "file:{}:{}:{}:{}",
                file.name.len(),
                file.name,
                file.size,
                file.modified_ms
            ),
        };
        Self(format!(
            "{}|guard={}",
            source, options.prevent_image_overflow
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Both outputs of one dual conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedBundle {
    pub fingerprint: ConversionFingerprint,
    pub pdf: Vec<u8>,
    pub png: Vec<u8>,
}

impl CachedBundle {
    pub fn get(&self, format: OutputFormat) -> &[u8] {
        match format {
            OutputFormat::Pdf => &self.pdf,
            OutputFormat::Png => &self.png,
        }
    }
}

// ── Transport ────────────────────────────────────────────────────────────

/// Performs one single-format conversion on the server.
pub trait ConvertTransport: Send + Sync {
    fn convert(
        &self,
        input: &ClientInput,
        format: OutputFormat,
        options: RenderOptions,
    ) -> impl Future<Output = Result<Vec<u8>, MdPressError>> + Send;
}

/// [`ConvertTransport`] over HTTP: JSON for text, multipart for files.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl HttpTransport {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:3000`.
    pub fn new(base_url: &str) -> Result<Self, MdPressError> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, MdPressError> {
        let endpoint = reqwest::Url::parse(base_url)
            .and_then(|base| base.join("/api/convert"))
            .map_err(|e| MdPressError::InvalidConfig(format!("server url '{}': {}", base_url, e)))?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &reqwest::Url {
        &self.endpoint
    }
}

impl ConvertTransport for HttpTransport {
    async fn convert(
        &self,
        input: &ClientInput,
        format: OutputFormat,
        options: RenderOptions,
    ) -> Result<Vec<u8>, MdPressError> {
        let request = self.client.post(self.endpoint.clone());
        let request = match input {
            ClientInput::File(file) => {
                let part = reqwest::multipart::Part::bytes(file.bytes.clone())
                    .file_name(file.name.clone());
                let form = reqwest::multipart::Form::new()
                    .part("file", part)
                    .text("format", format.extension())
                    .text(
                        "preventImageSplit",
                        options.prevent_image_overflow.to_string(),
                    );
                request.multipart(form)
            }
            ClientInput::Text(text) => request.json(&serde_json::json!({
                "markdown": text,
                "format": format.extension(),
                "preventImageSplit": options.prevent_image_overflow,
            })),
            ClientInput::Empty => return Err(MdPressError::EmptyContent),
        };

        let response = request
            .send()
            .await
            .map_err(|e| MdPressError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or(body);
            return Err(MdPressError::ServerRejected {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| MdPressError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

// ── Session ──────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct SessionState {
    input: Arc<ClientInput>,
    options: RenderOptions,
    bundle: Option<Arc<CachedBundle>>,
}

impl SessionState {
    fn fingerprint(&self) -> ConversionFingerprint {
        ConversionFingerprint::compute(&self.input, self.options)
    }
}

/// Current input, setting and single-slot bundle cache.
pub struct ConversionSession<T> {
    transport: T,
    state: Mutex<SessionState>,
}

impl<T: ConvertTransport> ConversionSession<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        // The state is always replaced whole, so a poisoned lock still holds
        // a consistent value.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_text(&self, text: impl Into<String>) {
        self.replace_input(ClientInput::Text(text.into()));
    }

    pub fn set_file(&self, file: SelectedFile) {
        self.replace_input(ClientInput::File(file));
    }

    pub fn clear_input(&self) {
        self.replace_input(ClientInput::Empty);
    }

    pub fn set_prevent_image_overflow(&self, enabled: bool) {
        let mut state = self.lock();
        state.options = RenderOptions {
            prevent_image_overflow: enabled,
        };
        state.bundle = None;
    }

    fn replace_input(&self, input: ClientInput) {
        let mut state = self.lock();
        state.input = Arc::new(input);
        state.bundle = None;
    }

    pub fn input(&self) -> Arc<ClientInput> {
        Arc::clone(&self.lock().input)
    }

    pub fn options(&self) -> RenderOptions {
        self.lock().options
    }

    pub fn fingerprint(&self) -> ConversionFingerprint {
        self.lock().fingerprint()
    }

    /// The cached bundle, if one is held.
    pub fn bundle(&self) -> Option<Arc<CachedBundle>> {
        self.lock().bundle.clone()
    }

    /// Bytes for `format`, from the bundle when its fingerprint matches the
    /// current input and setting, otherwise from a fresh single-format
    /// conversion. Single-format results are not cached.
    pub async fn preview(&self, format: OutputFormat) -> Result<Vec<u8>, MdPressError> {
        let (input, options, hit) = {
            let state = self.lock();
            let fingerprint = state.fingerprint();
            let hit = state
                .bundle
                .as_ref()
                .filter(|b| b.fingerprint == fingerprint)
                .cloned();
            (Arc::clone(&state.input), state.options, hit)
        };

        if let Some(bundle) = hit {
            debug!("Preview {} served from cache", format);
            return Ok(bundle.get(format).to_vec());
        }
        if input.is_empty() {
            return Err(MdPressError::EmptyContent);
        }

        debug!("Preview {} requires a conversion", format);
        self.transport.convert(&input, format, options).await
    }

    /// Convert to both formats in parallel and cache the pair.
    ///
    /// The current bundle is dropped as soon as the call starts. Either
    /// failure fails the whole call and leaves the cache empty.
    pub async fn download_both(&self) -> Result<Arc<CachedBundle>, MdPressError> {
        let (input, options, fingerprint) = {
            let mut state = self.lock();
            state.bundle = None;
            (Arc::clone(&state.input), state.options, state.fingerprint())
        };
        if input.is_empty() {
            return Err(MdPressError::EmptyContent);
        }

        let (pdf, png) = futures::try_join!(
            self.transport.convert(&input, OutputFormat::Pdf, options),
            self.transport.convert(&input, OutputFormat::Png, options),
        )?;

        let bundle = Arc::new(CachedBundle {
            fingerprint: fingerprint.clone(),
            pdf,
            png,
        });

        let mut state = self.lock();
        // Input or setting changed mid-flight: hand back the result but do
        // not cache it under the new state.
        if state.fingerprint() == fingerprint {
            state.bundle = Some(Arc::clone(&bundle));
            info!(
                "Cached bundle: pdf {} bytes, png {} bytes",
                bundle.pdf.len(),
                bundle.png.len()
            );
        }
        Ok(bundle)
    }
}
