//! Style template: wrap an HTML fragment into a self-contained, print-aware
//! document.
//!
//! The output has three parts:
//!
//! 1. a fixed theme (typography, colour tokens, code highlighting, tables,
//!    blockquotes, headings),
//! 2. a pagination-safety block, present only when
//!    [`RenderOptions::prevent_image_overflow`] is set,
//! 3. the fragment, verbatim, inside `<article class="markdown-body">`.
//!
//! Building is pure string assembly: the same fragment and options always
//! produce byte-identical output.

use crate::request::RenderOptions;
use std::fmt;

/// External stylesheet providing the body and monospace fonts.
pub const FONT_STYLESHEET: &str = "https://fonts.googleapis.com/css2?family=Inter:wght@400;500;600;700&family=JetBrains+Mono:wght@400;600&display=swap";

/// Marker comment opening the pagination-safety rules.
pub const PAGINATION_GUARD_MARKER: &str = "/* pagination-guard */";

const THEME_CSS: &str = r#"
:root {
  --fg: #1f2328;
  --fg-muted: #59636e;
  --bg: #ffffff;
  --bg-subtle: #f6f8fa;
  --border: #d1d9e0;
  --accent: #0969da;
  --code-bg: #f6f8fa;
}
* { box-sizing: border-box; }
html, body {
  margin: 0;
  padding: 0;
  background: var(--bg);
  color: var(--fg);
  -webkit-print-color-adjust: exact;
  print-color-adjust: exact;
}
body {
  font-family: "Inter", -apple-system, "Segoe UI", Helvetica, Arial, sans-serif;
  font-size: 15px;
  line-height: 1.65;
}
.markdown-body {
  padding: 32px 40px;
  word-wrap: break-word;
}
.markdown-body > *:first-child { margin-top: 0; }
.markdown-body > *:last-child { margin-bottom: 0; }
h1, h2, h3, h4, h5, h6 {
  margin: 1.6em 0 0.6em;
  font-weight: 600;
  line-height: 1.25;
  break-after: avoid;
  page-break-after: avoid;
}
h1 { font-size: 2em; padding-bottom: 0.3em; border-bottom: 1px solid var(--border); }
h2 { font-size: 1.5em; padding-bottom: 0.3em; border-bottom: 1px solid var(--border); }
h3 { font-size: 1.25em; }
h4 { font-size: 1em; }
h5 { font-size: 0.875em; }
h6 { font-size: 0.85em; color: var(--fg-muted); }
p, ul, ol, dl, table, pre, blockquote { margin: 0 0 1em; }
a { color: var(--accent); text-decoration: none; }
hr { height: 2px; border: 0; background: var(--border); margin: 1.5em 0; }
img { max-width: 100%; height: auto; }
ul, ol { padding-left: 2em; }
li + li { margin-top: 0.25em; }
li > input[type="checkbox"] { margin: 0 0.4em 0 -1.3em; vertical-align: middle; }
code, pre {
  font-family: "JetBrains Mono", ui-monospace, SFMono-Regular, Menlo, Consolas, monospace;
  font-size: 0.875em;
}
:not(pre) > code {
  padding: 0.15em 0.4em;
  border-radius: 6px;
  background: var(--code-bg);
}
pre {
  padding: 14px 16px;
  overflow: auto;
  line-height: 1.5;
  border-radius: 8px;
  border: 1px solid var(--border);
  background: var(--code-bg);
  white-space: pre-wrap;
}
pre code { background: none; padding: 0; font-size: 1em; }
blockquote {
  padding: 0 1em;
  color: var(--fg-muted);
  border-left: 4px solid var(--border);
}
table {
  border-collapse: collapse;
  border-spacing: 0;
  display: block;
  width: max-content;
  max-width: 100%;
  overflow: auto;
}
th, td { padding: 6px 13px; border: 1px solid var(--border); }
th { font-weight: 600; background: var(--bg-subtle); }
tr:nth-child(2n) td { background: var(--bg-subtle); }
.footnote-definition { font-size: 0.875em; color: var(--fg-muted); }
.hl-comment { color: #6e7781; font-style: italic; }
.hl-keyword, .hl-storage { color: #cf222e; }
.hl-string { color: #0a3069; }
.hl-constant, .hl-support { color: #0550ae; }
.hl-entity.hl-name { color: #8250df; }
.hl-variable.hl-parameter { color: #953800; }
.hl-punctuation { color: #1f2328; }
.hl-invalid { color: #82071e; text-decoration: underline wavy; }
"#;

// The A4 content box is ~257 mm tall with 20 mm margins; capping images at
// ~90% of it leaves room for a caption line.
const PAGINATION_GUARD_CSS: &str = r#"
img, svg, video, figure {
  max-height: 230mm;
  object-fit: contain;
}
figure img { max-height: 220mm; }
img, figure, table, pre, blockquote {
  break-inside: avoid;
  page-break-inside: avoid;
}
"#;

/// A complete styled HTML document, ready to load into a render surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledDocument(String);

impl StyledDocument {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for StyledDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Wrap `fragment` in the themed document shell.
pub fn build_document(fragment: &str, options: &RenderOptions) -> StyledDocument {
    let guard_len = if options.prevent_image_overflow {
        PAGINATION_GUARD_CSS.len() + PAGINATION_GUARD_MARKER.len()
    } else {
        0
    };
    let mut out =
        String::with_capacity(fragment.len() + THEME_CSS.len() + guard_len + 512);

    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    out.push_str("<meta charset=\"utf-8\">\n");
    out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    out.push_str("<title>document</title>\n");
    out.push_str("<link rel=\"stylesheet\" href=\"");
    out.push_str(FONT_STYLESHEET);
    out.push_str("\">\n<style>");
    out.push_str(THEME_CSS);
    if options.prevent_image_overflow {
        out.push_str(PAGINATION_GUARD_MARKER);
        out.push_str(PAGINATION_GUARD_CSS);
    }
    out.push_str("</style>\n</head>\n<body>\n<article class=\"markdown-body\">\n");
    out.push_str(fragment);
    out.push_str("\n</article>\n</body>\n</html>\n");

    StyledDocument(out)
}
