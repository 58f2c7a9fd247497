//! Text cleaning for statute pages.
//!
//! The rendered text of a source page mixes statute text with navigation
//! labels, footers, and hard-wrapped lines. [`clean_act_text`] turns it into
//! text where every remaining line break is either a paragraph break or
//! precedes a heading, so heading detection can anchor to line starts.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Footer phrases; a line containing one is dropped.
const FOOTER_PHRASES: &[&str] = &[
    "the lawphil project",
    "arellano law foundation",
    "lawphil.net",
];

/// Navigation labels; a line made up only of these is dropped.
const NAVIGATION_LABELS: &[&str] = &[
    "home",
    "back to top",
    "philippine laws",
    "statutes",
    "constitution",
    "jurisprudence",
    "executive issuances",
    "judicial issuances",
    "other issuances",
    "international legal resources",
    "ausl exclusive",
    "republic acts",
    "batas pambansa",
    "presidential decrees",
    "commonwealth acts",
    "acts",
];

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static COPYRIGHT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:copyright\b|©|\(c\)\s*\d{4})").expect("valid regex"));

#[allow(clippy::expect_used)]
static TIMESTAMP_BANNER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)today is \w+,\s*\w+\.?\s+\d{1,2},\s*\d{4}\.?").expect("valid regex")
});

#[allow(clippy::expect_used)]
static HYPHEN_WRAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z])-[ \t]*\n[ \t]*([a-z])").expect("valid regex"));

/// Lines that keep the line break in front of them.
#[allow(clippy::expect_used)]
static HEADING_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^["'“‘]?\s*(?:(?:BOOK|TITLE|CHAPTER|ARTICLE|Article|SECTION|Section|AN ACT|Approved)\b|(?:SEC|Sec)\.|\(Sgd\.\))"#,
    )
    .expect("valid regex")
});

/// Missing space after comma before a word character.
/// Matches "word,word" but not "word, word" or "1,000".
#[allow(clippy::expect_used)]
static MISSING_SPACE_AFTER_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-zA-Z]),([a-zA-Z])").expect("valid regex"));

/// Whether a line is source-site boilerplate.
///
/// # Examples
/// ```
/// use lawph_harvester::parsers::clean::is_boilerplate_line;
///
/// assert!(is_boilerplate_line("The Lawphil Project - Arellano Law Foundation"));
/// assert!(is_boilerplate_line("Home | Philippine Laws | Statutes"));
/// assert!(!is_boilerplate_line("Section 1. This Act shall be known as the Constitution Act."));
/// ```
pub fn is_boilerplate_line(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return false;
    }

    let lowered = trimmed.to_lowercase();
    if FOOTER_PHRASES.iter().any(|p| lowered.contains(p)) || COPYRIGHT_LINE.is_match(trimmed) {
        return true;
    }

    if TIMESTAMP_BANNER.replace_all(trimmed, "").trim().is_empty() {
        return true;
    }

    lowered
        .split(['|', '>', '»', '·'])
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .all(|part| NAVIGATION_LABELS.contains(&part))
}

/// Normalize common typographical issues in source text.
///
/// Fixes missing space after comma before a word ("person,property" becomes
/// "person, property").
pub fn normalize_text(text: &str) -> String {
    // Loop until stable (handles overlapping cases like "a,b,c")
    let mut result = text.to_string();
    loop {
        let replaced = MISSING_SPACE_AFTER_COMMA
            .replace_all(&result, "$1, $2")
            .to_string();
        if replaced == result {
            break;
        }
        result = replaced;
    }
    result
}

/// Normalize encoding-level noise: line endings, Unicode form, odd spaces.
pub fn normalize_encoding(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .nfc()
        .filter(|c| *c != '\u{200b}' && *c != '\u{feff}')
        .map(|c| if c == '\u{a0}' || c == '\t' { ' ' } else { c })
        .collect()
}

/// Drop boilerplate lines and timestamp banners.
pub fn strip_boilerplate(text: &str) -> String {
    text.lines()
        .filter(|line| !is_boilerplate_line(line))
        .map(|line| TIMESTAMP_BANNER.replace_all(line, "").into_owned())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapse single line breaks that wrap a sentence.
///
/// Blank lines are paragraph breaks and stay. A line break before a heading
/// keyword (optionally preceded by a quotation mark) stays. Every other line
/// break becomes a space.
pub fn collapse_soft_wraps(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_paragraph_start = true;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !at_paragraph_start {
                out.push_str("\n\n");
            }
            at_paragraph_start = true;
            continue;
        }

        if !at_paragraph_start {
            if HEADING_START.is_match(line) {
                out.push('\n');
            } else {
                out.push(' ');
            }
        }
        out.push_str(line);
        at_paragraph_start = false;
    }

    out.trim_end().to_string()
}

/// Collapse runs of spaces inside each line.
fn collapse_spaces(text: &str) -> String {
    text.lines()
        .map(|line| line.split(' ').filter(|w| !w.is_empty()).collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Full cleaning pass applied before heading detection.
///
/// # Examples
/// ```
/// use lawph_harvester::parsers::clean::clean_act_text;
///
/// let raw = "Home | Statutes\nSection 1. This Act shall be\nknown as the Sub-\nscriber Act.";
/// assert_eq!(clean_act_text(raw), "Section 1. This Act shall be known as the Subscriber Act.");
/// ```
pub fn clean_act_text(text: &str) -> String {
    let text = normalize_encoding(text);
    let text = strip_boilerplate(&text);
    let text = HYPHEN_WRAP.replace_all(&text, "$1$2");
    let text = collapse_soft_wraps(&text);
    let text = normalize_text(&text);
    collapse_spaces(&text).trim().to_string()
}

/// Collapse all whitespace in a block to single spaces.
pub fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
