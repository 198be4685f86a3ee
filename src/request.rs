//! Request-side data model: what to render and how.
//!
//! A [`ConversionRequest`] is built once from whatever the caller supplied
//! (HTTP form, JSON body, CLI flags) and then only read. Construction is the
//! validation point: an empty document never becomes a request.

use crate::error::MdPressError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output format of one rasterization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Paginated A4 document (PDF). (default)
    #[default]
    Pdf,
    /// Single raster image fitted to the content height (PNG).
    Png,
}

impl OutputFormat {
    /// Parse used at the HTTP boundary: exactly `"png"` selects PNG,
    /// anything else (including absence, other casing or padding) selects
    /// PDF.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("png") => OutputFormat::Png,
            _ => OutputFormat::Pdf,
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::Pdf => "application/pdf",
            OutputFormat::Png => "image/png",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Png => "png",
        }
    }

    /// Download filename offered to HTTP clients.
    pub fn file_name(self) -> String {
        format!("document.{}", self.extension())
    }

    /// Leading bytes every valid output of this format starts with.
    pub fn magic(self) -> &'static [u8] {
        match self {
            OutputFormat::Pdf => b"%PDF-",
            OutputFormat::Png => b"\x89PNG\r\n\x1a\n",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Fully resolved, style-affecting options.
///
/// Every field has a concrete value; partial styling state never reaches
/// the template builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Cap image height and keep images, tables, code blocks and quotes on
    /// one page where possible. Default: true.
    pub prevent_image_overflow: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            prevent_image_overflow: true,
        }
    }
}

impl RenderOptions {
    /// Resolve the multipart string form: only exactly `"false"` disables.
    pub fn from_form_flag(value: Option<&str>) -> Self {
        Self {
            prevent_image_overflow: value != Some("false"),
        }
    }

    /// Resolve the JSON form: only the boolean `false` disables.
    pub fn from_json_flag(value: Option<&serde_json::Value>) -> Self {
        Self {
            prevent_image_overflow: !matches!(value, Some(serde_json::Value::Bool(false))),
        }
    }
}

/// Where the markdown came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkdownSource {
    /// Text pasted or typed by the user.
    Text(String),
    /// Contents of an uploaded file.
    File { name: Option<String>, bytes: Vec<u8> },
}

impl MarkdownSource {
    /// Markdown text, decoding file bytes as UTF-8 (invalid sequences are
    /// replaced rather than rejected).
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        match self {
            MarkdownSource::Text(s) => std::borrow::Cow::Borrowed(s.as_str()),
            MarkdownSource::File { bytes, .. } => String::from_utf8_lossy(bytes),
        }
    }
}

/// One immutable request for one rasterization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    markdown: String,
    format: OutputFormat,
    options: RenderOptions,
}

impl ConversionRequest {
    /// Validate and freeze a request.
    ///
    /// # Errors
    /// [`MdPressError::EmptyContent`] when the markdown is empty or
    /// whitespace only, whatever the format.
    pub fn new(
        source: &MarkdownSource,
        format: OutputFormat,
        options: RenderOptions,
    ) -> Result<Self, MdPressError> {
        let markdown = source.text();
        if markdown.trim().is_empty() {
            return Err(MdPressError::EmptyContent);
        }
        Ok(Self {
            markdown: markdown.into_owned(),
            format,
            options,
        })
    }

    pub fn markdown(&self) -> &str {
        &self.markdown
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn options(&self) -> RenderOptions {
        self.options
    }

    /// Same content and options, different format.
    pub fn with_format(&self, format: OutputFormat) -> Self {
        Self {
            format,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn format_param_defaults_to_pdf() {
        assert_eq!(OutputFormat::from_param(Some("png")), OutputFormat::Png);
        assert_eq!(OutputFormat::from_param(Some("PNG")), OutputFormat::Pdf);
        assert_eq!(OutputFormat::from_param(Some(" png ")), OutputFormat::Pdf);
        assert_eq!(OutputFormat::from_param(Some("pdf")), OutputFormat::Pdf);
        assert_eq!(OutputFormat::from_param(Some("jpeg")), OutputFormat::Pdf);
        assert_eq!(OutputFormat::from_param(None), OutputFormat::Pdf);
    }

    #[test]
    fn format_metadata() {
        assert_eq!(OutputFormat::Pdf.content_type(), "application/pdf");
        assert_eq!(OutputFormat::Png.content_type(), "image/png");
        assert_eq!(OutputFormat::Png.file_name(), "document.png");
        assert_eq!(OutputFormat::Pdf.magic(), b"%PDF-");
    }

    #[test]
    fn form_flag_only_false_disables() {
        assert!(!RenderOptions::from_form_flag(Some("false")).prevent_image_overflow);
        assert!(RenderOptions::from_form_flag(Some("true")).prevent_image_overflow);
        assert!(RenderOptions::from_form_flag(Some("FALSE")).prevent_image_overflow);
        assert!(RenderOptions::from_form_flag(Some("0")).prevent_image_overflow);
        assert!(RenderOptions::from_form_flag(None).prevent_image_overflow);
    }

    #[test]
    fn json_flag_only_bool_false_disables() {
        assert!(!RenderOptions::from_json_flag(Some(&json!(false))).prevent_image_overflow);
        assert!(RenderOptions::from_json_flag(Some(&json!(true))).prevent_image_overflow);
        assert!(RenderOptions::from_json_flag(Some(&json!("false"))).prevent_image_overflow);
        assert!(RenderOptions::from_json_flag(Some(&json!(0))).prevent_image_overflow);
        assert!(RenderOptions::from_json_flag(None).prevent_image_overflow);
    }

    #[test]
    fn whitespace_markdown_is_rejected_for_every_format() {
        for format in [OutputFormat::Pdf, OutputFormat::Png] {
            let err = ConversionRequest::new(
                &MarkdownSource::Text(" \n\t ".into()),
                format,
                RenderOptions::default(),
            )
            .unwrap_err();
            assert!(matches!(err, MdPressError::EmptyContent));
        }
    }

    #[test]
    fn file_bytes_decode_lossily() {
        let source = MarkdownSource::File {
            name: Some("a.md".into()),
            bytes: b"# Hi \xff".to_vec(),
        };
        let req =
            ConversionRequest::new(&source, OutputFormat::Pdf, RenderOptions::default()).unwrap();
        assert!(req.markdown().starts_with("# Hi "));
    }

    #[test]
    fn with_format_keeps_content() {
        let req = ConversionRequest::new(
            &MarkdownSource::Text("# Hi".into()),
            OutputFormat::Pdf,
            RenderOptions {
                prevent_image_overflow: false,
            },
        )
        .unwrap();
        let png = req.with_format(OutputFormat::Png);
        assert_eq!(png.format(), OutputFormat::Png);
        assert_eq!(png.markdown(), "# Hi");
        assert!(!png.options().prevent_image_overflow);
    }
}
