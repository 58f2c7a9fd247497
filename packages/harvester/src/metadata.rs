//! Lightweight structural metadata for fetched pages.
//!
//! Extraction is best-effort: an unusable selector leaves its field empty
//! and logs a warning, it never fails the fetch.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::html::{document_title, element_text, html_to_text, parse_selector};

/// Heading element with its level (1 for `<h1>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
}

/// Hyperlink with its visible text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub text: String,
    pub href: String,
}

/// Plain-text statistics of the rendered page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStats {
    pub characters: usize,
    pub words: usize,
    pub lines: usize,
}

/// Structure summary of a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStructure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub headings: Vec<Heading>,
    pub paragraphs: Vec<String>,
    pub lists: Vec<Vec<String>>,
    pub tables: Vec<Vec<Vec<String>>>,
    pub links: Vec<Link>,
    pub emphasis: Vec<String>,
    pub stats: TextStats,
}

/// Extract the structure summary of an HTML page.
pub fn extract_structure(html: &str) -> DocumentStructure {
    let document = Html::parse_document(html);
    let text = html_to_text(html);

    DocumentStructure {
        title: document_title(&document),
        headings: extract_headings(&document),
        paragraphs: select_texts(&document, "p"),
        lists: extract_lists(&document),
        tables: extract_tables(&document),
        links: extract_links(&document),
        emphasis: select_texts(&document, "b, strong, i, em, u"),
        stats: TextStats {
            characters: text.chars().count(),
            words: text.split_whitespace().count(),
            lines: text.lines().filter(|l| !l.trim().is_empty()).count(),
        },
    }
}

fn selector_or_warn(selector: &str, field: &str) -> Option<Selector> {
    let parsed = parse_selector(selector);
    if parsed.is_none() {
        tracing::warn!(field, "Structure extraction skipped");
    }
    parsed
}

fn select_texts(document: &Html, selector: &str) -> Vec<String> {
    let Some(selector) = selector_or_warn(selector, selector) else {
        return Vec::new();
    };
    document
        .select(&selector)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect()
}

fn extract_headings(document: &Html) -> Vec<Heading> {
    let Some(selector) = selector_or_warn("h1, h2, h3, h4, h5, h6", "headings") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|el| {
            let level = el.value().name().strip_prefix('h')?.parse().ok()?;
            let text = element_text(el);
            (!text.is_empty()).then_some(Heading { level, text })
        })
        .collect()
}

fn extract_lists(document: &Html) -> Vec<Vec<String>> {
    let (Some(lists), Some(items)) = (
        selector_or_warn("ul, ol", "lists"),
        selector_or_warn("li", "lists"),
    ) else {
        return Vec::new();
    };
    document
        .select(&lists)
        .map(|list| {
            list.select(&items)
                .map(element_text)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
        })
        .filter(|items| !items.is_empty())
        .collect()
}

fn extract_tables(document: &Html) -> Vec<Vec<Vec<String>>> {
    let (Some(tables), Some(rows), Some(cells)) = (
        selector_or_warn("table", "tables"),
        selector_or_warn("tr", "tables"),
        selector_or_warn("td, th", "tables"),
    ) else {
        return Vec::new();
    };
    document
        .select(&tables)
        .map(|table| {
            table
                .select(&rows)
                .map(|row| row.select(&cells).map(element_text).collect::<Vec<_>>())
                .filter(|row| row.iter().any(|c| !c.is_empty()))
                .collect::<Vec<_>>()
        })
        .filter(|rows| !rows.is_empty())
        .collect()
}

fn extract_links(document: &Html) -> Vec<Link> {
    let Some(selector) = selector_or_warn("a[href]", "links") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|el: ElementRef<'_>| {
            let href = el.value().attr("href")?.trim().to_string();
            Some(Link {
                text: element_text(el),
                href,
            })
        })
        .collect()
}
