//! Acts parser: year-index pages and individual statutes.
//!
//! The page shape is decided by the URL:
//!
//! - year index `.../ra2022/ra2022.html`: one
//!   [`UnitKind::ActIndexEntry`] per listed act.
//! - individual act `.../ra_11934_2022.html`: hierarchy detection over the
//!   cleaned text.
//!
//! Hierarchy detection is a tokenizer followed by one reduction pass. The
//! tokenizer finds line-anchored `BOOK`, `TITLE`, `CHAPTER`, `Article <n>`
//! and `Section <n>.` headings and orders them by offset. The reduction keeps
//! a book/title/chapter stack and the current article, and cuts every
//! heading's content at the next heading of any kind.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use scraper::Html;
use url::Url;

use super::clean::{clean_act_text, normalize_encoding, squash_whitespace};
use super::{ParseInput, StructuralParser};
use crate::html::{element_text, find_ancestor, html_to_text, parse_selector};
use crate::roman::parse_article_number;
use crate::types::{ActInfo, ActType, LegalUnit, SequenceCounter, UnitKind, UnitMetadata};

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static YEAR_INDEX_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/([a-z]+)(\d{4})/([a-z]+)(\d{4})\.html?$").expect("valid regex")
});

#[allow(clippy::expect_used)]
static ACT_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/([a-z]+)_(\d+[a-z]?)_(\d{4})\.html?$").expect("valid regex"));

#[allow(clippy::expect_used)]
static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"(?m)^[ \t]*(?P<quote>["“'‘])?[ \t]*"#,
        r"(?P<kw>BOOK|TITLE|CHAPTER|ARTICLE|Article|SECTION|Section|SEC\.|Sec\.)[ \t]+",
        r"(?P<id>[IVXLCDM]+\b|\d+(?:-?[A-Z]\b)?)(?P<dot>\.)?(?P<rest>[^\n]*)",
    ))
    .expect("valid regex")
});

#[allow(clippy::expect_used)]
static CAPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?s)^\s*(?P<cap>[A-Z][^.:\n]{0,150}?)\s*[.:]",
        r"\s*(?P<dash>[-–—]+)?\s*(?P<body>.*)$",
    ))
    .expect("valid regex")
});

#[allow(clippy::expect_used)]
static AMENDING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)hereby\s+amended\s+to\s+read\s+as\s+follows").expect("valid regex")
});

#[allow(clippy::expect_used)]
static END_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(?:Approved:?\s|\(Sgd\.\)|This Act which is a consolidation of)")
        .expect("valid regex")
});

#[allow(clippy::expect_used)]
static ACT_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*(AN ACT\b[^\n]*(?:\n[^\n]+)*)").expect("valid regex"));

#[allow(clippy::expect_used)]
static ENACTING_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bBe it enacted\b").expect("valid regex"));

#[allow(clippy::expect_used)]
static APPROVED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Approved:?\s*([a-z]+\.?\s+\d{1,2},\s*\d{4})").expect("valid regex")
});

#[allow(clippy::expect_used)]
static INDEX_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(Republic Act|Commonwealth Act|Batas Pambansa|Presidential Decree",
        r"|Executive Order|Act)",
        r"\s+(?:No\.|Blg\.)\s*(\d+[a-z]?)\b\s*[-–—:,]?\s*(.*?)",
        r"\s*Approved:?\s*([a-z]+\.?\s+\d{1,2},\s*\d{4})",
    ))
    .expect("valid regex")
});

/// Words that cannot start a sentence of statute text.
const CONTINUATION_WORDS: &[&str] = &[
    "and", "or", "of", "the", "to", "which", "who", "that", "shall", "in", "by", "for", "as",
];

/// Abbreviations whose period does not end a caption.
const ABBREVIATIONS: &[&str] = &[
    "no", "nos", "blg", "sec", "secs", "art", "arts", "par", "inc", "co", "jr", "sr",
];

/// Words allowed in lowercase inside a section caption.
const CAPTION_SMALL_WORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "by", "for", "from", "in", "into", "of", "on", "or", "the", "to",
    "with", "under", "upon",
];

/// Page shape of an acts URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActsPage {
    YearIndex { act_type: ActType, year: i32 },
    Act { act_type: ActType, number: String, year: i32 },
    Unknown,
}

/// Classify a URL as a year index, an individual act, or neither.
///
/// # Examples
/// ```
/// use lawph_harvester::parsers::acts::{classify_url, ActsPage};
/// use lawph_harvester::types::ActType;
///
/// assert_eq!(
///     classify_url("https://lawphil.net/statutes/repacts/ra2022/ra2022.html"),
///     ActsPage::YearIndex { act_type: ActType::RepublicAct, year: 2022 }
/// );
/// assert_eq!(
///     classify_url("https://lawphil.net/statutes/repacts/ra2022/ra_11934_2022.html"),
///     ActsPage::Act { act_type: ActType::RepublicAct, number: "11934".to_string(), year: 2022 }
/// );
/// ```
pub fn classify_url(url: &str) -> ActsPage {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_lowercase(),
        Err(_) => url.to_lowercase(),
    };

    if let Some(caps) = ACT_URL.captures(&path) {
        if let (Some(act_type), Ok(year)) = (ActType::from_url_prefix(&caps[1]), caps[3].parse()) {
            return ActsPage::Act {
                act_type,
                number: caps[2].to_string(),
                year,
            };
        }
    }

    if let Some(caps) = YEAR_INDEX_URL.captures(&path) {
        if caps[1] == caps[3] && caps[2] == caps[4] {
            let act_type = ActType::from_url_prefix(&caps[1]);
            if let (Some(act_type), Ok(year)) = (act_type, caps[2].parse()) {
                return ActsPage::YearIndex { act_type, year };
            }
        }
    }

    ActsPage::Unknown
}

/// One act listed on a year-index page.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ActIndexEntry {
    pub act_type: ActType,
    pub act_number: String,
    pub title: String,
    pub approval_date: Option<NaiveDate>,
    /// Absolute URL of the act page.
    pub url: String,
}

/// Parse a written approval date such as "October 10, 2022" or "Sept. 3, 1990".
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use lawph_harvester::parsers::acts::parse_approval_date;
///
/// assert_eq!(parse_approval_date("October 10, 2022"), NaiveDate::from_ymd_opt(2022, 10, 10));
/// assert_eq!(parse_approval_date("Sept. 3, 1990"), NaiveDate::from_ymd_opt(1990, 9, 3));
/// assert_eq!(parse_approval_date("someday"), None);
/// ```
pub fn parse_approval_date(raw: &str) -> Option<NaiveDate> {
    let mut cleaned = squash_whitespace(raw).replace('.', "");
    if cleaned.to_lowercase().starts_with("sept ") {
        cleaned = format!("Sep {}", &cleaned[5..]);
    }

    ["%B %d, %Y", "%b %d, %Y", "%B %d,%Y", "%b %d,%Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&cleaned, format).ok())
}

/// Parse the acts listed on a year-index page.
///
/// Anchors linking to act pages are preferred; when none match, a single
/// regex over the flattened text recovers the same tuples.
pub fn parse_year_index(index_url: &str, html: &str) -> Vec<ActIndexEntry> {
    let Ok(base) = Url::parse(index_url) else {
        tracing::warn!(url = index_url, "Year index URL is not absolute");
        return Vec::new();
    };

    let entries = anchor_entries(&base, html);
    if !entries.is_empty() {
        return entries;
    }

    let entries = regex_entries(&base, html);
    tracing::debug!(url = index_url, entries = entries.len(), "Used text strategy for year index");
    entries
}

fn anchor_entries(base: &Url, html: &str) -> Vec<ActIndexEntry> {
    let document = Html::parse_document(html);
    let Some(selector) = parse_selector("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for anchor in document.select(&selector) {
        let Some(url) = anchor.value().attr("href").and_then(|href| base.join(href.trim()).ok())
        else {
            continue;
        };
        let ActsPage::Act {
            act_type, number, ..
        } = classify_url(url.as_str())
        else {
            continue;
        };

        let mut url = url;
        url.set_fragment(None);
        if !seen.insert(url.to_string()) {
            continue;
        }

        let row_text = find_ancestor(anchor, "tr")
            .or_else(|| anchor.parent().and_then(scraper::ElementRef::wrap))
            .map(element_text)
            .unwrap_or_default();
        let anchor_text = element_text(anchor);

        entries.push(ActIndexEntry {
            title: row_title(&row_text, &anchor_text),
            approval_date: APPROVED
                .captures(&row_text)
                .and_then(|c| parse_approval_date(&c[1])),
            act_type,
            act_number: number.to_uppercase(),
            url: url.to_string(),
        });
    }

    entries
}

/// Title of an index row: its text without the link label and approval date.
fn row_title(row_text: &str, anchor_text: &str) -> String {
    let mut title = row_text.to_string();
    if !anchor_text.is_empty() {
        title = title.replacen(anchor_text, "", 1);
    }
    if let Some(m) = APPROVED.find(&title) {
        title.truncate(m.start());
    }
    if let Some(pos) = title.find("AN ACT") {
        title = title[pos..].to_string();
    }
    squash_whitespace(title.trim_matches(|c: char| c.is_whitespace() || "-–—:,.".contains(c)))
}

fn regex_entries(base: &Url, html: &str) -> Vec<ActIndexEntry> {
    let page_year = match classify_url(base.as_str()) {
        ActsPage::YearIndex { year, .. } => Some(year),
        _ => None,
    };
    let text = squash_whitespace(&html_to_text(html));
    let mut seen = HashSet::new();

    INDEX_ENTRY
        .captures_iter(&text)
        .filter_map(|caps| {
            let act_type = ActType::from_label(&caps[1])?;
            let act_number = caps[2].to_uppercase();
            let approval_date = parse_approval_date(&caps[4]);
            let year = page_year.or_else(|| approval_date.map(|d| d.year()))?;
            let href = format!(
                "{}_{}_{year}.html",
                act_type.url_prefix(),
                act_number.to_lowercase()
            );
            let url = base.join(&href).ok()?.to_string();
            if !seen.insert(url.clone()) {
                return None;
            }

            Some(ActIndexEntry {
                act_type,
                title: squash_whitespace(caps[3].trim_matches(|c: char| "-–—:,. ".contains(c))),
                act_number,
                approval_date,
                url,
            })
        })
        .collect()
}

/// Kind of a structural heading in statute text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingKind {
    Book,
    Title,
    Chapter,
    Article,
    Section,
}

impl HeadingKind {
    fn label(&self) -> &'static str {
        match self {
            Self::Book => "BOOK",
            Self::Title => "TITLE",
            Self::Chapter => "CHAPTER",
            Self::Article => "ARTICLE",
            Self::Section => "SECTION",
        }
    }
}

/// A heading token found by [`tokenize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub kind: HeadingKind,
    pub identifier: String,
    /// Byte offset of the heading line.
    pub offset: usize,
    /// Byte offset just past the heading marker (keyword, identifier, period).
    pub end: usize,
    /// Rest of the heading line.
    pub caption: String,
    /// Heading opens with a quotation mark.
    pub quoted: bool,
    /// Uppercase structural form without a trailing period (`ARTICLE I`).
    pub structural: bool,
}

/// Find every line-anchored heading, ordered by offset.
pub fn tokenize(text: &str) -> Vec<Heading> {
    HEADING
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let keyword = caps.name("kw")?.as_str();
            let has_dot = caps.name("dot").is_some();

            let (kind, structural) = match keyword {
                "BOOK" => (HeadingKind::Book, true),
                "TITLE" => (HeadingKind::Title, true),
                "CHAPTER" => (HeadingKind::Chapter, true),
                "ARTICLE" => (HeadingKind::Article, !has_dot),
                _ => (
                    if keyword == "Article" {
                        HeadingKind::Article
                    } else {
                        HeadingKind::Section
                    },
                    false,
                ),
            };

            // Numbered headings need the period; without it the line opens
            // with an in-sentence reference.
            if !structural && !has_dot {
                return None;
            }

            let rest = caps.name("rest")?;
            Some(Heading {
                kind,
                identifier: caps.name("id")?.as_str().to_string(),
                offset: whole.start(),
                end: rest.start(),
                caption: rest.as_str().trim().to_string(),
                quoted: caps.name("quote").is_some(),
                structural,
            })
        })
        .collect()
}

/// Leading run of uppercase words used as a division title.
fn uppercase_prefix(caption: &str) -> Option<String> {
    let words: Vec<&str> = caption
        .split_whitespace()
        .take_while(|w| !w.chars().any(char::is_lowercase) && w.chars().any(char::is_alphabetic))
        .collect();
    let prefix = words.join(" ");
    let prefix = prefix.trim_matches(|c: char| "-–—:,.".contains(c)).trim();
    (!prefix.is_empty()).then(|| prefix.to_string())
}

fn looks_like_caption(candidate: &str) -> bool {
    let words: Vec<&str> = candidate.split_whitespace().collect();
    let ends_in_abbreviation = words
        .last()
        .is_some_and(|w| ABBREVIATIONS.contains(&w.to_lowercase().as_str()));
    !words.is_empty()
        && !ends_in_abbreviation
        && words.len() <= 15
        && words.iter().all(|word| {
            let bare = word.trim_matches(|c: char| !c.is_alphanumeric());
            bare.is_empty()
                || CAPTION_SMALL_WORDS.contains(&bare.to_lowercase().as_str())
                || bare.chars().next().is_some_and(|c| c.is_uppercase() || c.is_ascii_digit())
        })
}

/// Whether a block opens like the tail of a sentence.
///
/// A leading digit counts: it is the number of a reference the caption
/// split cut through ("Act No. | 1234 is hereby amended").
fn is_weak_start(body: &str) -> bool {
    let Some(first) = body.split_whitespace().next() else {
        return true;
    };
    let bare = first.trim_matches(|c: char| !c.is_alphanumeric());
    bare.chars().next().is_some_and(|c| c.is_lowercase() || c.is_ascii_digit())
        || CONTINUATION_WORDS.contains(&bare.to_lowercase().as_str())
}

/// Split a section's remainder into caption and body.
///
/// When the split leaves a weak start (empty, lowercase, or a continuation
/// word), the caption belonged to the first sentence and is reattached.
fn split_caption(remainder: &str) -> (Option<String>, String) {
    let remainder = remainder.trim();
    let Some(caps) = CAPTION.captures(remainder) else {
        return (None, remainder.to_string());
    };

    let caption = caps["cap"].trim();
    let body = caps["body"].trim();
    if caps.name("dash").is_none() && !looks_like_caption(caption) {
        return (None, remainder.to_string());
    }

    if is_weak_start(body) {
        return (None, remainder.to_string());
    }

    (Some(caption.to_string()), body.to_string())
}

/// Normalize a content block: trim lines, keep paragraph breaks.
fn tidy_block(block: &str) -> String {
    block
        .split("\n\n")
        .map(squash_whitespace)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Running book/title/chapter/article context.
#[derive(Debug, Default)]
struct ContextStack {
    book: Option<String>,
    title: Option<String>,
    chapter: Option<String>,
    article: Option<String>,
}

impl ContextStack {
    fn path(&self) -> Vec<String> {
        [&self.book, &self.title, &self.chapter]
            .into_iter()
            .flatten()
            .cloned()
            .collect()
    }

    fn enter(&mut self, heading: &Heading) {
        let mut name = format!("{} {}", heading.kind.label(), heading.identifier);
        if let Some(title) = uppercase_prefix(&heading.caption) {
            name = format!("{name} - {title}");
        }

        match heading.kind {
            HeadingKind::Book => {
                self.book = Some(name);
                self.title = None;
                self.chapter = None;
                self.article = None;
            }
            HeadingKind::Title => {
                self.title = Some(name);
                self.chapter = None;
                self.article = None;
            }
            HeadingKind::Chapter => {
                self.chapter = Some(name);
                self.article = None;
            }
            HeadingKind::Article | HeadingKind::Section => {}
        }
    }
}

/// Act-level information read from the rendered page.
fn act_info(rendered: &str, act_type: ActType, number: &str, year: i32) -> ActInfo {
    let title = ACT_TITLE.captures(rendered).map(|caps| {
        let title = squash_whitespace(&caps[1]);
        match ENACTING_CLAUSE.find(&title) {
            Some(m) => title[..m.start()].trim().to_string(),
            None => title,
        }
    });

    ActInfo {
        act_type,
        act_number: number.to_uppercase(),
        year: Some(year),
        title,
        approval_date: APPROVED
            .captures(rendered)
            .and_then(|c| parse_approval_date(&c[1])),
    }
}

/// Reduce heading tokens into units.
fn reduce(
    text: &str,
    headings: &[Heading],
    info: &ActInfo,
    counter: &mut SequenceCounter,
) -> Vec<LegalUnit> {
    let document_title = info.act_type.designation(&info.act_number);
    let mut context = ContextStack::default();
    let mut units: Vec<LegalUnit> = Vec::new();
    let mut amending: Option<usize> = None;

    for (i, heading) in headings.iter().enumerate() {
        let next = headings.get(i + 1).map_or(text.len(), |h| h.offset);

        if heading.quoted {
            if let Some(target) = amending.and_then(|idx| units.get_mut(idx)) {
                let quoted = tidy_block(&text[heading.offset..next]);
                target.extracted_text.push_str("\n\n");
                target.extracted_text.push_str(&quoted);
                continue;
            }
        }
        amending = None;

        match heading.kind {
            HeadingKind::Book | HeadingKind::Title | HeadingKind::Chapter => context.enter(heading),
            HeadingKind::Article | HeadingKind::Section => {
                let remainder = &text[heading.end..next];
                let (title, body) = if heading.structural {
                    match uppercase_prefix(&heading.caption) {
                        Some(caption) => {
                            let body = remainder
                                .trim()
                                .strip_prefix(caption.as_str())
                                .unwrap_or(remainder)
                                .trim_start_matches(|c: char| {
                                    c.is_whitespace() || "-–—:.".contains(c)
                                });
                            (Some(caption), tidy_block(body))
                        }
                        None => (None, tidy_block(remainder)),
                    }
                } else {
                    let (title, body) = split_caption(remainder);
                    (title, tidy_block(&body))
                };

                if heading.kind == HeadingKind::Article {
                    context.article = Some(heading.identifier.clone());
                    if body.is_empty() {
                        continue;
                    }
                }
                if body.is_empty() {
                    tracing::debug!(section = %heading.identifier, "Skipping empty section");
                    continue;
                }

                let kind = match heading.kind {
                    HeadingKind::Article => UnitKind::ActArticle,
                    _ => UnitKind::ActSection,
                };
                let mut metadata = UnitMetadata::new(kind, document_title.as_str());
                metadata.title = title;
                metadata.article_label = context.article.clone();
                metadata.article_number = context.article.as_deref().and_then(parse_article_number);
                if heading.kind == HeadingKind::Section {
                    metadata.section_number = Some(heading.identifier.clone());
                }
                metadata.context_path = context.path();
                metadata.act = Some(info.clone());

                if AMENDING.is_match(&body) {
                    amending = Some(units.len());
                }
                units.push(LegalUnit::new(body, metadata, counter));
            }
        }
    }

    units
}

/// Parse an individual act page.
pub fn parse_act(html: &str, act_type: ActType, number: &str, year: i32) -> Vec<LegalUnit> {
    let rendered = normalize_encoding(&html_to_text(html));
    let info = act_info(&rendered, act_type, number, year);

    let cleaned = clean_act_text(&rendered);
    let mut headings = tokenize(&cleaned);
    let Some(first) = headings.first() else {
        return Vec::new();
    };

    let body_end = END_MARKER
        .find_at(&cleaned, first.end)
        .map_or(cleaned.len(), |m| m.start());
    headings.retain(|h| h.offset < body_end);
    let body = &cleaned[..body_end];

    let mut counter = SequenceCounter::new();
    reduce(body, &headings, &info, &mut counter)
}

/// Convert year-index entries into units.
pub fn index_units(entries: &[ActIndexEntry], year: Option<i32>) -> Vec<LegalUnit> {
    let mut counter = SequenceCounter::new();
    entries
        .iter()
        .map(|entry| {
            let designation = entry.act_type.designation(&entry.act_number);
            let mut metadata = UnitMetadata::new(UnitKind::ActIndexEntry, designation.as_str());
            metadata.title = (!entry.title.is_empty()).then(|| entry.title.clone());
            metadata.act = Some(ActInfo {
                act_type: entry.act_type,
                act_number: entry.act_number.clone(),
                year: year.or_else(|| entry.approval_date.map(|d| d.year())),
                title: metadata.title.clone(),
                approval_date: entry.approval_date,
            });
            let text = if entry.title.is_empty() {
                designation
            } else {
                entry.title.clone()
            };
            LegalUnit::new(text, metadata, &mut counter)
        })
        .collect()
}

/// Parser for statute pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActsParser;

impl StructuralParser for ActsParser {
    fn parse(&self, input: ParseInput<'_>) -> Vec<LegalUnit> {
        match classify_url(input.canonical_url) {
            ActsPage::YearIndex { year, .. } => {
                let entries = parse_year_index(input.canonical_url, input.html);
                index_units(&entries, Some(year))
            }
            ActsPage::Act {
                act_type,
                number,
                year,
            } => {
                let units = parse_act(input.html, act_type, &number, year);
                tracing::debug!(url = input.canonical_url, units = units.len(), "Parsed act");
                units
            }
            ActsPage::Unknown => {
                tracing::debug!(url = input.canonical_url, "URL is not an acts page");
                Vec::new()
            }
        }
    }
}
