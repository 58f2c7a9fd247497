//! HTML utilities: plain-text rendering and element lookup.

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

/// Elements whose boundaries start a new line in the text rendering.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "blockquote", "center", "dd", "div", "dl", "dt", "h1", "h2",
    "h3", "h4", "h5", "h6", "hr", "li", "ol", "p", "pre", "section", "table", "tbody", "tr",
    "ul",
];

/// Elements whose content is never rendered.
const SKIPPED_TAGS: &[&str] = &["head", "noscript", "script", "style", "template", "title"];

/// Render an HTML document as plain text.
///
/// Block elements are separated by a blank line and `<br>` starts a new
/// line. Source newlines inside text are kept. Spaces collapse within a
/// line, lines are trimmed, and runs of blank lines collapse to one.
///
/// # Examples
/// ```
/// use lawph_harvester::html::html_to_text;
///
/// let text = html_to_text("<p>ARTICLE III<br>BILL&nbsp;OF RIGHTS</p><p>Section 1.</p>");
/// assert_eq!(text, "ARTICLE III\nBILL OF RIGHTS\n\nSection 1.");
/// ```
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut raw = String::new();
    render(document.root_element(), &mut raw);
    normalize_lines(&raw)
}

fn render(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_TAGS.contains(&name) {
                    continue;
                }
                if name == "br" {
                    out.push('\n');
                    continue;
                }
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                let is_block = BLOCK_TAGS.contains(&name);
                if is_block {
                    out.push('\n');
                }
                if name == "td" || name == "th" {
                    out.push(' ');
                }
                render(child_el, out);
                if is_block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Collapse spaces within lines and blank-line runs between them.
fn normalize_lines(raw: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut previous_blank = true;

    for line in raw.replace("\r\n", "\n").replace('\r', "\n").split('\n') {
        let collapsed = line
            .split(|c: char| c.is_whitespace())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if collapsed.is_empty() {
            if !previous_blank {
                lines.push(String::new());
            }
            previous_blank = true;
        } else {
            lines.push(collapsed);
            previous_blank = false;
        }
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    lines.join("\n")
}

/// Visible text of an element with whitespace collapsed.
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(|t| t.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the document `<title>`, if present and non-empty.
pub fn document_title(document: &Html) -> Option<String> {
    let selector = parse_selector("title")?;
    document
        .select(&selector)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
}

/// Parse a CSS selector, logging instead of failing on invalid input.
pub fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(s) => Some(s),
        Err(e) => {
            tracing::warn!(selector, error = %e, "Invalid CSS selector");
            None
        }
    }
}

/// Closest ancestor element with the given tag name.
pub fn find_ancestor<'a>(element: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_text_blocks_and_breaks() {
        let html = "<html><head><title>T</title><style>p{}</style></head>\
                    <body><p>Section 1. First</p><p>Section 2.<br>Second</p></body></html>";
        assert_eq!(html_to_text(html), "Section 1. First\n\nSection 2.\nSecond");
    }

    #[test]
    fn test_html_to_text_preserves_source_newlines() {
        let html = "<body><pre>ARTICLE III\nBILL OF RIGHTS\nSection 1. No person</pre></body>";
        assert_eq!(
            html_to_text(html),
            "ARTICLE III\nBILL OF RIGHTS\nSection 1. No person"
        );
    }

    #[test]
    fn test_html_to_text_collapses_blank_runs() {
        let html = "<body><p>a</p><p></p><p></p><div><p>b</p></div></body>";
        assert_eq!(html_to_text(html), "a\n\nb");
    }

    #[test]
    fn test_html_to_text_skips_scripts() {
        let html = "<body><script>var x = 1;</script><p>kept</p></body>";
        assert_eq!(html_to_text(html), "kept");
    }

    #[test]
    fn test_table_cells_are_separated() {
        let html = "<table><tr><td>RA 1</td><td>Title</td></tr></table>";
        assert_eq!(html_to_text(html), "RA 1 Title");
    }

    #[test]
    fn test_document_title() {
        let doc = Html::parse_document("<html><head><title> The 1987 Constitution </title></head></html>");
        assert_eq!(document_title(&doc).as_deref(), Some("The 1987 Constitution"));
    }

    #[test]
    fn test_find_ancestor() {
        let doc = Html::parse_document("<table><tr><td><a href='x'>link</a></td></tr></table>");
        let selector = parse_selector("a").unwrap();
        let anchor = doc.select(&selector).next().unwrap();
        let row = find_ancestor(anchor, "tr").unwrap();
        assert_eq!(element_text(row), "link");
    }
}
