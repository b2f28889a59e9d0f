//! Markup helpers shared by the page extractors
//!
//! - [`required`] / [`required_in`]: look up an element that must exist,
//!   failing with [`Error::Structure`] otherwise
//! - [`text_excluding`]: visible text of an element minus some sub-elements
//! - [`linearize`]: plain-text rendering of a message or announcement body,
//!   with protected emails and emoji sprites resolved on the way

use crate::deobfuscate::{email, emoji};
use crate::error::{Error, Result};
use scraper::{ElementRef, Html, Node, Selector};

/// Elements that start and end a line of their own.
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "li", "ul", "ol", "tr", "table", "blockquote", "pre", "h1", "h2", "h3", "h4",
    "h5", "h6", "hr",
];

/// Elements whose content is never shown.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "head", "template"];

/// Compile a selector known at build time.
pub fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {:?}: {:?}", css, e))
}

/// First element under `scope` matching `selector`, or a structure error
/// naming the page kind and selector.
pub fn required_in<'a>(
    scope: ElementRef<'a>,
    selector: &Selector,
    page: &str,
    what: &str,
) -> Result<ElementRef<'a>> {
    scope
        .select(selector)
        .next()
        .ok_or_else(|| Error::structure(page, format!("cannot find {}", what)))
}

/// [`required_in`] over a whole document.
pub fn required<'a>(
    document: &'a Html,
    selector: &Selector,
    page: &str,
    what: &str,
) -> Result<ElementRef<'a>> {
    required_in(document.root_element(), selector, page, what)
}

/// Concatenated text nodes of an element.
pub fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// Text of an element, skipping every sub-element matched by `excluded`.
///
/// For `<div>Jane <span class="small">1.2.2021</span></div>` with
/// `excluded = span.small` this is `"Jane "`.
pub fn text_excluding(element: ElementRef<'_>, excluded: &Selector) -> String {
    let mut out = String::new();
    collect_text_excluding(element, excluded, &mut out);
    out
}

fn collect_text_excluding(element: ElementRef<'_>, excluded: &Selector, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    if !excluded.matches(&child_element) {
                        collect_text_excluding(child_element, excluded, out);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Render an element's children as plain text, one child per line.
///
/// Children that render to nothing but whitespace are dropped. Inline
/// markup disappears; `<br>` and block elements become line breaks.
/// Protected email placeholders become the address, protected links become
/// `mailto:` targets shown after the link text, and emoji sprites become
/// the glyph.
pub fn linearize(element: ElementRef<'_>) -> String {
    let mut parts = Vec::new();
    for child in element.children() {
        let mut buf = TextBuffer::default();
        match child.value() {
            Node::Text(text) => buf.push_text(text),
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    render_element(child_element, &mut buf);
                }
            }
            _ => {}
        }
        let rendered = buf.finish();
        if !rendered.is_empty() {
            parts.push(rendered);
        }
    }
    parts.join("\n")
}

fn render_children(element: ElementRef<'_>, buf: &mut TextBuffer) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => buf.push_text(text),
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    render_element(child_element, buf);
                }
            }
            _ => {}
        }
    }
}

fn render_element(element: ElementRef<'_>, buf: &mut TextBuffer) {
    let value = element.value();

    if let Some(address) = email::inline_address(value) {
        buf.push_text(&address);
        return;
    }

    match value.name() {
        "br" => buf.line_break(),
        "img" => {
            if let Some(glyph) = emoji::glyph_for_img(value) {
                buf.push_text(glyph);
            } else if let Some(alt) = value.attr("alt") {
                buf.push_text(alt);
            }
        }
        "a" => {
            let start = buf.len();
            render_children(element, buf);
            if let Some(target) = value.attr("href").and_then(link_target) {
                if !buf.since(start).contains(&target) {
                    buf.push_text(&format!(" <{}>", target));
                }
            }
        }
        name if HIDDEN_ELEMENTS.contains(&name) => {}
        name if BLOCK_ELEMENTS.contains(&name) => {
            buf.block_break();
            render_children(element, buf);
            buf.block_break();
        }
        _ => render_children(element, buf),
    }
}

/// What a link points at, when worth showing next to its text.
///
/// Protected links resolve to their address; other `mailto:` links show the
/// address; absolute web links show the URL; relative portal links are
/// dropped.
fn link_target(href: &str) -> Option<String> {
    let href = email::rewrite_href(href).unwrap_or_else(|| href.to_string());
    if let Some(address) = href.strip_prefix("mailto:") {
        Some(address.to_string())
    } else if href.starts_with("http://") || href.starts_with("https://") {
        Some(href)
    } else {
        None
    }
}

/// Accumulates rendered text, collapsing HTML whitespace.
#[derive(Default)]
struct TextBuffer {
    text: String,
    pending_space: bool,
}

impl TextBuffer {
    fn push_text(&mut self, s: &str) {
        for c in s.chars() {
            if c.is_whitespace() {
                self.pending_space = true;
                continue;
            }
            if self.pending_space && !self.at_line_start() {
                self.text.push(' ');
            }
            self.pending_space = false;
            self.text.push(c);
        }
    }

    fn line_break(&mut self) {
        self.pending_space = false;
        self.text.push('\n');
    }

    fn block_break(&mut self) {
        self.pending_space = false;
        if !self.at_line_start() {
            self.text.push('\n');
        }
    }

    fn at_line_start(&self) -> bool {
        self.text.is_empty() || self.text.ends_with('\n')
    }

    fn len(&self) -> usize {
        self.text.len()
    }

    fn since(&self, start: usize) -> &str {
        &self.text[start..]
    }

    /// Trimmed lines, at most one blank line in a row.
    fn finish(self) -> String {
        let mut lines: Vec<&str> = Vec::new();
        for line in self.text.lines().map(str::trim) {
            if line.is_empty() && lines.last().map_or(true, |last| last.is_empty()) {
                continue;
            }
            lines.push(line);
        }
        while lines.last().is_some_and(|last| last.is_empty()) {
            lines.pop();
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first<'a>(html: &'a Html, css: &str) -> ElementRef<'a> {
        html.select(&selector(css)).next().unwrap()
    }

    #[test]
    fn test_linearize_keeps_one_line_per_child() {
        let html = Html::parse_fragment(
            "<div id=\"body\">\n  <p>Hello <b>there</b>,</p>\n  <p>second   paragraph</p>\n</div>",
        );
        assert_eq!(
            linearize(first(&html, "#body")),
            "Hello there,\nsecond paragraph"
        );
    }

    #[test]
    fn test_linearize_line_breaks() {
        let html = Html::parse_fragment("<div id=\"b\"><p>one<br>two<br/>three</p></div>");
        assert_eq!(linearize(first(&html, "#b")), "one\ntwo\nthree");
    }

    #[test]
    fn test_linearize_resolves_protected_emails() {
        let payload = "88dcedfbfca6cde5e9e1e4c8edf0e9e5f8e4eda6ebe7e5";
        let html = Html::parse_fragment(&format!(
            concat!(
                "<div id=\"b\">",
                "<p>Mail <a href=\"/cdn-cgi/l/email-protection#{p}\">me</a></p>",
                "<p><a href=\"/cdn-cgi/l/email-protection\" class=\"__cf_email__\" data-cfemail=\"{p}\">[email protected]</a></p>",
                "<p><a href=\"/some-uri\">normal link</a></p>",
                "</div>"
            ),
            p = payload
        ));
        assert_eq!(
            linearize(first(&html, "#b")),
            "Mail me <Test.Email@example.com>\nTest.Email@example.com\nnormal link"
        );
    }

    #[test]
    fn test_linearize_replaces_emoji() {
        let html = Html::parse_fragment(
            "<div id=\"b\"><p>Thanks <img src=\"/ck/smiley/images/thumbs_up.png\" alt=\"yes\"> <img src=\"/x.png\" alt=\"chart\"></p></div>",
        );
        assert_eq!(linearize(first(&html, "#b")), "Thanks 👍 chart");
    }

    #[test]
    fn test_linearize_drops_blank_children() {
        let html = Html::parse_fragment("<div id=\"b\">  <br>  <p> </p>text<script>x()</script></div>");
        assert_eq!(linearize(first(&html, "#b")), "text");
    }

    #[test]
    fn test_text_excluding() {
        let html = Html::parse_fragment(
            "<div id=\"m\">Jane Doe <span class=\"small\">1.2.2021</span>(Teacher)</div>",
        );
        let text = text_excluding(first(&html, "#m"), &selector("span.small"));
        assert_eq!(text, "Jane Doe (Teacher)");
    }

    #[test]
    fn test_required_reports_structure_error() {
        let html = Html::parse_document("<html><body><p>x</p></body></html>");
        let err = required(&html, &selector("#missing"), "message", "message body").unwrap_err();
        assert!(matches!(err, Error::Structure { .. }));
        assert!(required(&html, &selector("p"), "message", "paragraph").is_ok());
    }
}
