//! Markdown → HTML fragment, with a pluggable code-block highlighter.
//!
//! Parsing is delegated to `pulldown-cmark`; this module only intercepts
//! fenced and indented code blocks and hands their text to a
//! [`CodeHighlighter`]. The highlighter returns pre-classified markup, and
//! the theme in [`super::template`] colours the classes.
//!
//! The GFM extensions people expect from a README (tables, strikethrough,
//! task lists, footnotes) are enabled.

use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use std::sync::{Arc, OnceLock};
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;
use tracing::debug;

/// CSS class prefix on every highlighter span.
pub const HIGHLIGHT_CLASS_PREFIX: &str = "hl-";

/// Turns a code block into classified markup.
///
/// The returned string is inserted verbatim between `<code>` tags, so it
/// must already be HTML-escaped.
pub trait CodeHighlighter: Send + Sync {
    fn highlight(&self, code: &str, language: Option<&str>) -> String;
}

/// Escapes code without classifying it.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainHighlighter;

impl CodeHighlighter for PlainHighlighter {
    fn highlight(&self, code: &str, _language: Option<&str>) -> String {
        html_escape::encode_text(code).into_owned()
    }
}

/// `syntect`-backed highlighter emitting `hl-`-prefixed scope classes.
///
/// Loading the default syntax set takes tens of milliseconds, so it is done
/// once per process; see [`SyntectHighlighter::shared`].
pub struct SyntectHighlighter {
    syntaxes: SyntaxSet,
}

impl SyntectHighlighter {
    pub fn new() -> Self {
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
        }
    }

    /// Process-wide instance.
    pub fn shared() -> Arc<SyntectHighlighter> {
        static SHARED: OnceLock<Arc<SyntectHighlighter>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(SyntectHighlighter::new())))
    }
}

impl Default for SyntectHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeHighlighter for SyntectHighlighter {
    fn highlight(&self, code: &str, language: Option<&str>) -> String {
        let Some(syntax) = language.and_then(|l| self.syntaxes.find_syntax_by_token(l)) else {
            return PlainHighlighter.highlight(code, None);
        };

        let mut generator = ClassedHTMLGenerator::new_with_class_style(
            syntax,
            &self.syntaxes,
            ClassStyle::SpacedPrefixed {
                prefix: HIGHLIGHT_CLASS_PREFIX,
            },
        );
        for line in LinesWithEndings::from(code) {
            if generator
                .parse_html_for_line_which_includes_newline(line)
                .is_err()
            {
                debug!("syntect failed on {:?} block; falling back to plain", language);
                return PlainHighlighter.highlight(code, None);
            }
        }
        generator.finalize()
    }
}

/// Language token from a fence info string: ```` ```rust,ignore ```` → `rust`.
fn fence_language(info: &str) -> Option<&str> {
    info.split(|c: char| c.is_whitespace() || c == ',' || c == '{')
        .next()
        .filter(|s| !s.is_empty())
}

/// Render markdown to an HTML fragment.
pub fn render_markdown(markdown: &str, highlighter: &dyn CodeHighlighter) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_FOOTNOTES);

    let parser = Parser::new_ext(markdown, options);

    let mut events: Vec<Event<'_>> = Vec::new();
    // Some(lang) while inside a code block.
    let mut code_block: Option<Option<String>> = None;
    let mut code = String::new();

    for event in parser {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => fence_language(&info).map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                code_block = Some(lang);
                code.clear();
            }
            Event::Text(text) if code_block.is_some() => code.push_str(&text),
            Event::End(TagEnd::CodeBlock) => {
                let lang = code_block.take().flatten();
                let body = highlighter.highlight(&code, lang.as_deref());
                let class = match lang.as_deref() {
                    Some(l) => format!(
                        " class=\"language-{}\"",
                        html_escape::encode_double_quoted_attribute(l)
                    ),
                    None => String::new(),
                };
                events.push(Event::Html(CowStr::from(format!(
                    "<pre><code{class}>{body}</code></pre>\n"
                ))));
            }
            other => events.push(other),
        }
    }

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, events.into_iter());
    out
}
