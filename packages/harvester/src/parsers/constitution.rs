//! Constitution parser.
//!
//! A line-oriented state machine over the plain-text rendering:
//!
//! - `SeekingPreamble`: nothing collected until the first article heading.
//! - `InsideArticle`: lines accumulate into the open article; the next
//!   article heading flushes it.
//! - `SeekingOrdinance`: entered when the ordinance delimiter appears inside
//!   Article XVIII; everything after it belongs to the ordinance.
//!
//! Flushed articles are split at `Section <n>.` markers. The preamble and the
//! ordinance are found by independent scans of the full text.

use std::sync::LazyLock;

use regex::Regex;

use super::clean::{is_boilerplate_line, normalize_encoding};
use super::topics::infer_topics;
use super::{ParseInput, StructuralParser};
use crate::html::html_to_text;
use crate::roman::parse_article_number;
use crate::types::{LegalUnit, SequenceCounter, UnitKind, UnitMetadata};

/// Start of the apportionment ordinance appended to the 1987 Constitution.
pub const ORDINANCE_TOKEN: &str = "ORDINANCE APPORTIONING THE SEATS";

/// Article whose text may run into the ordinance.
const ORDINANCE_ARTICLE: u32 = 18;

pub const ORDINANCE_TITLE: &str = "Ordinance Apportioning the Seats of the House of Representatives";

pub const PREAMBLE_TITLE: &str = "Preamble";

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static ARTICLE_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ARTICLE\s+([IVXLCDM]+|\d+)\b\.?\s*(.*)$").expect("valid regex")
});

#[allow(clippy::expect_used)]
static SUBPART_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z])\.\s+([A-Z][A-Z ,'&-]+)$").expect("valid regex"));

#[allow(clippy::expect_used)]
static SECTION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:Section|SECTION|SEC\.|Sec\.)\s+(\d+)\.").expect("valid regex"));

#[allow(clippy::expect_used)]
static PREAMBLE_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*PREAMBLE[ \t]*$").expect("valid regex"));

#[allow(clippy::expect_used)]
static FIRST_ARTICLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*ARTICLE\s+(?:[IVXLCDM]+|\d+)\b").expect("valid regex")
});

#[allow(clippy::expect_used)]
static ARTICLE_EIGHTEEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*ARTICLE\s+XVIII\b").expect("valid regex"));

#[allow(clippy::expect_used)]
static ORDINANCE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*ORDINANCE APPORTIONING THE SEATS").expect("valid regex")
});

#[allow(clippy::expect_used)]
static URL_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"cons(\d{4})").expect("valid regex"));

#[allow(clippy::expect_used)]
static TEXT_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(1[89]\d{2}|20\d{2})\s+CONSTITUTION\b").expect("valid regex"));

/// Parser for constitutional text.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstitutionParser;

impl StructuralParser for ConstitutionParser {
    fn parse(&self, input: ParseInput<'_>) -> Vec<LegalUnit> {
        let text = normalize_encoding(&html_to_text(input.html));
        let document_title = constitution_title(input.canonical_url, &text);
        let mut counter = SequenceCounter::new();
        let mut units = Vec::new();

        if let Some(preamble) = extract_preamble(&text) {
            let mut metadata = UnitMetadata::new(UnitKind::Preamble, document_title.as_str());
            metadata.title = Some(PREAMBLE_TITLE.to_string());
            metadata.topics = infer_topics(None, None);
            units.push(LegalUnit::new(preamble, metadata, &mut counter));
        }

        for article in scan_articles(&text) {
            units.extend(article.into_units(&document_title, &mut counter));
        }

        if let Some(ordinance) = extract_ordinance(&text) {
            let mut metadata = UnitMetadata::new(UnitKind::Ordinance, document_title.as_str());
            metadata.title = Some(ORDINANCE_TITLE.to_string());
            metadata.topics = vec!["ordinance".to_string(), "legislative_apportionment".to_string()];
            units.push(LegalUnit::new(ordinance, metadata, &mut counter));
        }

        tracing::debug!(
            url = input.canonical_url,
            units = units.len(),
            "Parsed constitution"
        );
        units
    }
}

/// Document designation: "{year} Constitution" from the URL or the text.
pub(crate) fn constitution_title(canonical_url: &str, text: &str) -> String {
    let year = URL_YEAR
        .captures(&canonical_url.to_lowercase())
        .map(|c| c[1].to_string())
        .or_else(|| TEXT_YEAR.captures(text).map(|c| c[1].to_string()));

    match year {
        Some(year) => format!("{year} Constitution"),
        None => "Constitution".to_string(),
    }
}

/// Join non-empty, non-boilerplate lines.
fn join_content_lines(text: &str) -> Option<String> {
    let joined = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !is_boilerplate_line(l))
        .collect::<Vec<_>>()
        .join("\n");
    (!joined.is_empty()).then_some(joined)
}

/// Text between the `PREAMBLE` heading and the first article heading.
fn extract_preamble(text: &str) -> Option<String> {
    let heading = PREAMBLE_HEADING.find(text)?;
    let rest = &text[heading.end()..];
    let end = FIRST_ARTICLE.find(rest).map_or(rest.len(), |m| m.start());
    join_content_lines(&rest[..end])
}

/// Text from the ordinance delimiter to the end of the document.
///
/// After an Article XVIII heading the delimiter may appear anywhere in a
/// line; without one it must start a line.
fn extract_ordinance(text: &str) -> Option<String> {
    let start = match ARTICLE_EIGHTEEN.find(text) {
        Some(heading) => heading.end() + text[heading.end()..].find(ORDINANCE_TOKEN)?,
        None => ORDINANCE_LINE.find(text)?.start(),
    };
    join_content_lines(&text[start..])
}

/// An article accumulated by the line scan.
#[derive(Debug)]
struct ArticleDraft {
    label: String,
    number: Option<u32>,
    title: Option<String>,
    awaiting_title: bool,
    lines: Vec<String>,
}

/// Scan state of the line-oriented pass.
#[derive(Debug)]
enum ScanState {
    SeekingPreamble,
    InsideArticle(ArticleDraft),
    SeekingOrdinance,
}

fn is_title_line(line: &str) -> bool {
    line.chars().any(char::is_alphabetic)
        && !line.chars().any(char::is_lowercase)
        && !SECTION_MARKER.is_match(line)
        && !SUBPART_LINE.is_match(line)
}

impl ArticleDraft {
    /// Open a draft if `line` is an article heading.
    fn open(line: &str) -> Option<Self> {
        let caps = ARTICLE_HEADING.captures(line)?;
        let label = caps[1].to_string();
        let title = caps[2]
            .trim()
            .trim_start_matches(['-', '–', '—', ':', '.'])
            .trim();

        Some(Self {
            number: parse_article_number(&label),
            label,
            title: (!title.is_empty()).then(|| title.to_string()),
            awaiting_title: title.is_empty(),
            lines: Vec::new(),
        })
    }

    fn push_line(&mut self, line: &str) {
        if self.awaiting_title {
            self.awaiting_title = false;
            if is_title_line(line) {
                self.title = Some(line.to_string());
                return;
            }
        }
        self.lines.push(line.to_string());
    }

    fn metadata(&self, kind: UnitKind, document_title: &str) -> UnitMetadata {
        let mut metadata = UnitMetadata::new(kind, document_title);
        metadata.title = self.title.clone();
        metadata.article_number = self.number;
        metadata.article_label = Some(self.label.clone());
        metadata.context_path = vec![format!("ARTICLE {}", self.label)];
        metadata
    }

    /// Split into one unit per section, or a single article unit.
    fn into_units(self, document_title: &str, counter: &mut SequenceCounter) -> Vec<LegalUnit> {
        let mut sections: Vec<SectionDraft> = Vec::new();
        let mut current: Option<SectionDraft> = None;
        let mut subpart: Option<(String, String)> = None;
        let mut preface: Vec<&str> = Vec::new();

        for line in &self.lines {
            if let Some(caps) = SUBPART_LINE.captures(line) {
                sections.extend(current.take());
                subpart = Some((caps[1].to_string(), line.clone()));
                continue;
            }
            if let Some(caps) = SECTION_MARKER.captures(line) {
                sections.extend(current.take());
                current = Some(SectionDraft {
                    number: caps[1].to_string(),
                    subpart: subpart.clone(),
                    lines: vec![line.as_str()],
                });
                continue;
            }
            match current.as_mut() {
                Some(section) => section.lines.push(line),
                None => preface.push(line),
            }
        }
        sections.extend(current);

        if sections.is_empty() {
            if self.lines.is_empty() {
                return Vec::new();
            }
            let mut metadata = self.metadata(UnitKind::Article, document_title);
            metadata.topics = infer_topics(self.number, None);
            return vec![LegalUnit::new(self.lines.join("\n"), metadata, counter)];
        }

        if !preface.is_empty() {
            tracing::debug!(
                article = %self.label,
                lines = preface.len(),
                "Dropping article text before the first section"
            );
        }

        sections
            .into_iter()
            .map(|section| {
                let mut metadata = self.metadata(UnitKind::Section, document_title);
                if let Some((letter, heading)) = &section.subpart {
                    metadata.subpart = Some(letter.clone());
                    metadata.context_path.push(heading.clone());
                }
                metadata.topics = infer_topics(self.number, Some(&section.number));
                metadata.section_number = Some(section.number);
                LegalUnit::new(section.lines.join("\n"), metadata, counter)
            })
            .collect()
    }
}

#[derive(Debug)]
struct SectionDraft<'a> {
    number: String,
    subpart: Option<(String, String)>,
    lines: Vec<&'a str>,
}

/// Line scan producing one draft per article, in source order.
fn scan_articles(text: &str) -> Vec<ArticleDraft> {
    let mut articles = Vec::new();
    let mut state = ScanState::SeekingPreamble;

    for line in text.lines().map(str::trim) {
        if line.is_empty() || is_boilerplate_line(line) {
            continue;
        }

        state = match state {
            ScanState::SeekingOrdinance => ScanState::SeekingOrdinance,
            ScanState::SeekingPreamble => match ArticleDraft::open(line) {
                Some(draft) => ScanState::InsideArticle(draft),
                None => ScanState::SeekingPreamble,
            },
            ScanState::InsideArticle(mut draft) => {
                if let Some(next) = ArticleDraft::open(line) {
                    articles.push(draft);
                    ScanState::InsideArticle(next)
                } else if let Some(pos) = line
                    .find(ORDINANCE_TOKEN)
                    .filter(|_| draft.number == Some(ORDINANCE_ARTICLE))
                {
                    let before = line[..pos].trim();
                    if !before.is_empty() {
                        draft.push_line(before);
                    }
                    articles.push(draft);
                    ScanState::SeekingOrdinance
                } else {
                    draft.push_line(line);
                    ScanState::InsideArticle(draft)
                }
            }
        };
    }

    if let ScanState::InsideArticle(draft) = state {
        articles.push(draft);
    }
    articles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citation::canonical_citation;
    use pretty_assertions::assert_eq;

    const URL: &str = "https://lawphil.net/consti/cons1987.html";

    fn parse(html: &str) -> Vec<LegalUnit> {
        ConstitutionParser.parse(ParseInput::new(URL, html))
    }

    #[test]
    fn test_bill_of_rights_scenario() {
        let html = "<html><body><p>ARTICLE III\nBILL OF RIGHTS\n\
                    Section 1. No person shall be deprived of life, liberty, or property without due process of law...\n\
                    Section 2. The right of the people...</p></body></html>";
        let units = parse(html);

        assert_eq!(units.len(), 2);
        for (unit, section) in units.iter().zip(["1", "2"]) {
            assert_eq!(unit.metadata.article_number, Some(3));
            assert_eq!(unit.metadata.section_number.as_deref(), Some(section));
            assert!(unit.metadata.topics.contains(&"bill_of_rights".to_string()));
            assert_eq!(unit.metadata.title.as_deref(), Some("BILL OF RIGHTS"));
        }
        assert!(units[0].extracted_text.contains("due process"));
        assert!(!units[0].extracted_text.contains("right of the people"));
        assert!(units[1].extracted_text.starts_with("Section 2."));
    }

    #[test]
    fn test_n_sections_yield_n_units() {
        let body: String = (1..=7)
            .map(|n| format!("<p>Section {n}. Provision number {n} text.</p>"))
            .collect();
        let html = format!("<p>ARTICLE XIV</p><p>EDUCATION</p>{body}");
        let units = parse(&html);

        assert_eq!(units.len(), 7);
        for (i, unit) in units.iter().enumerate() {
            let n = i + 1;
            assert_eq!(unit.metadata.section_number, Some(n.to_string()));
            assert_eq!(unit.extracted_text, format!("Section {n}. Provision number {n} text."));
            assert_eq!(unit.sequence_index, i as u32);
        }
    }

    #[test]
    fn test_subparts_are_tracked() {
        let html = "<p>ARTICLE IX</p><p>CONSTITUTIONAL COMMISSIONS</p>\
                    <p>A. COMMON PROVISIONS</p><p>Section 1. The Constitutional Commissions...</p>\
                    <p>B. THE CIVIL SERVICE COMMISSION</p><p>Section 1. The civil service...</p>\
                    <p>Section 2. Appointments...</p>";
        let units = parse(html);

        let subparts: Vec<_> = units.iter().map(|u| u.metadata.subpart.clone()).collect();
        assert_eq!(
            subparts,
            vec![Some("A".to_string()), Some("B".to_string()), Some("B".to_string())]
        );
        assert_eq!(
            canonical_citation(&units[2].metadata),
            "1987 Constitution, Article IX-B, Section 2"
        );
        assert_eq!(units[1].metadata.context_path, vec!["ARTICLE IX", "B. THE CIVIL SERVICE COMMISSION"]);
    }

    #[test]
    fn test_preamble_articles_and_ordinance_order() {
        let html = "<p>THE 1987 CONSTITUTION OF THE REPUBLIC OF THE PHILIPPINES</p>\
                    <p>PREAMBLE</p><p>We, the sovereign Filipino people...</p>\
                    <p>ARTICLE I</p><p>NATIONAL TERRITORY</p><p>The national territory comprises...</p>\
                    <p>ARTICLE XVIII</p><p>TRANSITORY PROVISIONS</p>\
                    <p>Section 27. This Constitution shall take effect immediately.</p>\
                    <p>ORDINANCE APPORTIONING THE SEATS OF THE HOUSE OF REPRESENTATIVES</p>\
                    <p>Section 1. For purposes of the election of Members...</p>";
        let units = parse(html);

        let kinds: Vec<_> = units.iter().map(|u| u.metadata.kind).collect();
        assert_eq!(
            kinds,
            vec![UnitKind::Preamble, UnitKind::Article, UnitKind::Section, UnitKind::Ordinance]
        );
        assert_eq!(units[0].extracted_text, "We, the sovereign Filipino people...");
        assert!(units[0].metadata.is_preamble);

        let last_section = &units[2];
        assert_eq!(last_section.metadata.section_number.as_deref(), Some("27"));
        assert!(!last_section.extracted_text.contains("ORDINANCE"));

        let ordinance = &units[3];
        assert_eq!(ordinance.metadata.title.as_deref(), Some(ORDINANCE_TITLE));
        assert!(ordinance.extracted_text.contains("For purposes of the election"));
        assert_eq!(canonical_citation(&ordinance.metadata), "1987 Constitution, Ordinance");
    }

    #[test]
    fn test_ordinance_token_mid_line_splits_text() {
        let html = "<p>ARTICLE XVIII</p><p>TRANSITORY PROVISIONS</p>\
                    <p>Section 27. Effect. ORDINANCE APPORTIONING THE SEATS OF THE HOUSE</p>";
        let units = parse(html);

        assert_eq!(units.len(), 2);
        assert_eq!(units[0].extracted_text, "Section 27. Effect.");
        assert_eq!(units[1].metadata.kind, UnitKind::Ordinance);
    }

    #[test]
    fn test_ordinance_token_outside_article_eighteen_is_text() {
        let html = "<p>ARTICLE VI</p><p>Section 5. See the ORDINANCE APPORTIONING THE SEATS annexed.</p>";
        let units = parse(html);
        assert_eq!(units.len(), 1);
        assert!(units[0].extracted_text.contains("annexed"));
    }

    #[test]
    fn test_article_without_sections_is_one_unit() {
        let html = "<p>ARTICLE I - NATIONAL TERRITORY</p><p>The national territory comprises the Philippine archipelago.</p>";
        let units = parse(html);

        assert_eq!(units.len(), 1);
        assert_eq!(units[0].metadata.kind, UnitKind::Article);
        assert_eq!(units[0].metadata.title.as_deref(), Some("NATIONAL TERRITORY"));
        assert_eq!(units[0].metadata.topics, vec!["national_territory"]);
        assert_eq!(canonical_citation(&units[0].metadata), "1987 Constitution, Article I");
    }

    #[test]
    fn test_in_sentence_article_reference_is_not_a_heading() {
        let html = "<p>ARTICLE VIII</p><p>Section 1. As provided in ARTICLE VII, the judicial power...</p>";
        let units = parse(html);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].metadata.article_number, Some(8));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let html = "<p>ARTICLE II</p><p>Section 1. The Philippines is a democratic state.</p>\
                    <p>Section 2. The Philippines renounces war.</p>";
        let first: Vec<_> = parse(html)
            .iter()
            .map(|u| (canonical_citation(&u.metadata), u.sequence_index))
            .collect();
        let second: Vec<_> = parse(html)
            .iter()
            .map(|u| (canonical_citation(&u.metadata), u.sequence_index))
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_constitution_title() {
        assert_eq!(constitution_title(URL, ""), "1987 Constitution");
        assert_eq!(
            constitution_title("https://lawphil.net/consti/index.html", "THE 1973 CONSTITUTION"),
            "1973 Constitution"
        );
        assert_eq!(constitution_title("https://lawphil.net/x.html", ""), "Constitution");
    }
}
