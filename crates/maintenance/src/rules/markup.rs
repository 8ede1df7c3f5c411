//! Rule description markup.
//!
//! Rule descriptions not stored as HTML use a small line-oriented markup:
//!
//! | source | HTML |
//! |---|---|
//! | `*text*`, `**text**` | `<strong>text</strong>` |
//! | `` `code` `` | `<code>code</code>` |
//! | `* item` | `<ul><li>item</li></ul>` |
//! | `1. item` | `<ol><li>item</li></ol>` |
//! | `= title` .. `====== title` | `<h1>title</h1>` .. `<h6>title</h6>` |
//! | lines fenced by ```` ``` ```` | `<pre>...</pre>` |
//! | ```` ```code``` ```` on one line | `<code>code</code>` |
//! | `http://...`, `https://...` | link, without trailing punctuation |
//!
//! Consecutive text lines are joined with `<br/>`. All text is HTML-escaped.

use regex::Regex;

use crate::error::RenderError;

/// Converts raw description markup to HTML.
///
/// Implementations must be pure: the same input always yields the same output.
pub trait MarkupRenderer: Send + Sync {
    /// Renders `source` to HTML.
    fn render(&self, source: &str) -> Result<String, RenderError>;
}

impl<F> MarkupRenderer for F
where
    F: Fn(&str) -> Result<String, RenderError> + Send + Sync,
{
    fn render(&self, source: &str) -> Result<String, RenderError> {
        self(source)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    fn tag(self) -> &'static str {
        match self {
            ListKind::Unordered => "ul",
            ListKind::Ordered => "ol",
        }
    }
}

/// Characters dropped from the end of a detected link.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', '\''];

/// The built-in markup renderer.
#[derive(Debug, Clone)]
pub struct RuleMarkdown {
    code_span: Regex,
    strong: Regex,
    url: Regex,
    unordered_item: Regex,
    ordered_item: Regex,
    heading: Regex,
    inline_fence: Regex,
}

impl RuleMarkdown {
    /// Compiles the renderer.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            code_span: Regex::new(r"`([^`]+)`")?,
            strong: Regex::new(r"\*{1,2}([^*\s](?:[^*]*[^*\s])?)\*{1,2}")?,
            url: Regex::new(r#"https?://[^\s<>"]+"#)?,
            unordered_item: Regex::new(r"^\s*\*\s+(.*)$")?,
            ordered_item: Regex::new(r"^\s*\d+\.\s+(.*)$")?,
            heading: Regex::new(r"^(={1,6})\s+(.*?)\s*$")?,
            inline_fence: Regex::new(r"^\s*```([^`]+)```(.*)$")?,
        })
    }

    /// Renders one line of raw text. Code spans are cut out first, then links,
    /// so neither is touched by emphasis.
    fn inline(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in self.code_span.captures_iter(text) {
            let (Some(whole), Some(code)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push_str(&self.links(&text[last..whole.start()]));
            push_code(&mut out, code.as_str());
            last = whole.end();
        }
        out.push_str(&self.links(&text[last..]));
        out
    }

    fn links(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for found in self.url.find_iter(text) {
            let url = found.as_str().trim_end_matches(TRAILING_PUNCTUATION);
            out.push_str(&self.emphasis(&text[last..found.start()]));
            let href = escape_html(url);
            out.push_str(&format!(
                r#"<a href="{0}" target="_blank">{0}</a>"#,
                href
            ));
            last = found.start() + url.len();
        }
        out.push_str(&self.emphasis(&text[last..]));
        out
    }

    fn emphasis(&self, text: &str) -> String {
        self.strong
            .replace_all(&escape_html(text), "<strong>${1}</strong>")
            .into_owned()
    }
}

impl MarkupRenderer for RuleMarkdown {
    fn render(&self, source: &str) -> Result<String, RenderError> {
        let lines: Vec<&str> = source.lines().collect();
        let mut out = String::new();
        let mut list: Option<(ListKind, Vec<String>)> = None;
        let mut text = TextRun::default();

        let mut i = 0;
        while i < lines.len() {
            let line = lines[i].trim_end();

            // a fence closed on its own line is inline code
            if let Some(caps) = self.inline_fence.captures(line) {
                close_list(&mut out, &mut list);
                let mut html = String::new();
                push_code(&mut html, caps.get(1).map_or("", |m| m.as_str()));
                html.push_str(&self.inline(caps.get(2).map_or("", |m| m.as_str())));
                text.push(&mut out, &html);
                i += 1;
                continue;
            }

            if line.trim_start().starts_with("```") {
                close_list(&mut out, &mut list);
                let close = lines[i + 1..]
                    .iter()
                    .position(|l| l.trim() == "```")
                    .map(|offset| i + 1 + offset)
                    .ok_or_else(|| RenderError {
                        line: i + 1,
                        message: "unterminated code block".to_string(),
                    })?;
                out.push_str("<pre>");
                out.push_str(&escape_html(&lines[i + 1..close].join("\n")));
                out.push_str("</pre>");
                text.interrupt();
                i = close + 1;
                continue;
            }

            let item = self
                .unordered_item
                .captures(line)
                .map(|c| (ListKind::Unordered, c))
                .or_else(|| {
                    self.ordered_item
                        .captures(line)
                        .map(|c| (ListKind::Ordered, c))
                });

            if let Some((kind, caps)) = item {
                let item_text = caps.get(1).map_or("", |m| m.as_str());
                if list.as_ref().is_some_and(|(open, _)| *open != kind) {
                    close_list(&mut out, &mut list);
                }
                list.get_or_insert_with(|| (kind, Vec::new()))
                    .1
                    .push(self.inline(item_text));
                text.interrupt();
            } else if let Some(caps) = self.heading.captures(line) {
                close_list(&mut out, &mut list);
                let level = caps.get(1).map_or(1, |m| m.as_str().len());
                let title = caps.get(2).map_or("", |m| m.as_str());
                out.push_str(&format!("<h{0}>{1}</h{0}>", level, self.inline(title)));
                text.interrupt();
            } else if line.trim().is_empty() {
                close_list(&mut out, &mut list);
                text.blank();
            } else {
                close_list(&mut out, &mut list);
                text.push(&mut out, &self.inline(line));
            }
            i += 1;
        }

        close_list(&mut out, &mut list);
        Ok(out)
    }
}

/// Tracks consecutive text lines, which are joined with line breaks.
#[derive(Debug, Default)]
struct TextRun {
    open: bool,
    blank_lines: usize,
}

impl TextRun {
    fn push(&mut self, out: &mut String, html: &str) {
        if self.open {
            out.push_str("<br/>");
            if self.blank_lines > 0 {
                out.push_str("<br/>");
            }
        }
        out.push_str(html);
        self.open = true;
        self.blank_lines = 0;
    }

    fn blank(&mut self) {
        if self.open {
            self.blank_lines += 1;
        }
    }

    /// A block element ends the run.
    fn interrupt(&mut self) {
        self.open = false;
        self.blank_lines = 0;
    }
}

fn push_code(out: &mut String, code: &str) {
    out.push_str("<code>");
    out.push_str(&escape_html(code));
    out.push_str("</code>");
}

fn close_list(out: &mut String, list: &mut Option<(ListKind, Vec<String>)>) {
    if let Some((kind, items)) = list.take() {
        out.push('<');
        out.push_str(kind.tag());
        out.push('>');
        for item in items {
            out.push_str("<li>");
            out.push_str(&item);
            out.push_str("</li>");
        }
        out.push_str("</");
        out.push_str(kind.tag());
        out.push('>');
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
