//! Conversion results.

use crate::request::OutputFormat;
use serde::Serialize;

/// Bytes produced by one rasterization, tagged with their format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rendered {
    pub format: OutputFormat,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// Wall-clock time from browser acquisition to captured bytes.
    pub duration_ms: u64,
}

impl Rendered {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// `true` when the bytes start with the format's signature.
    pub fn has_valid_magic(&self) -> bool {
        self.bytes.starts_with(self.format.magic())
    }
}

/// Both formats rendered from the same request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedBundle {
    pub pdf: Rendered,
    pub png: Rendered,
}

impl RenderedBundle {
    pub fn get(&self, format: OutputFormat) -> &Rendered {
        match format {
            OutputFormat::Pdf => &self.pdf,
            OutputFormat::Png => &self.png,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_check() {
        let ok = Rendered {
            format: OutputFormat::Pdf,
            bytes: b"%PDF-1.7\n".to_vec(),
            duration_ms: 1,
        };
        assert!(ok.has_valid_magic());

        let bad = Rendered {
            format: OutputFormat::Png,
            bytes: b"%PDF-1.7\n".to_vec(),
            duration_ms: 1,
        };
        assert!(!bad.has_valid_magic());
    }
}
