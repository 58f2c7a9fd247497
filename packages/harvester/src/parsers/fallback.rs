//! Flat-text fallback parser.
//!
//! Scans the whole plain text, without line anchoring, for `ARTICLE <roman>`,
//! subpart headings such as `B. THE CIVIL SERVICE COMMISSION` and
//! `Section <n>.` occurrences. It is deliberately crude: it runs only
//! when a primary parse looks incomplete, and its output only fills keys the
//! primary parse missed.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::acts::{classify_url, ActsPage};
use super::clean::{normalize_encoding, squash_whitespace};
use super::constitution::constitution_title;
use super::topics::infer_topics;
use super::{ParseInput, StructuralParser};
use crate::html::html_to_text;
use crate::roman::parse_roman;
use crate::types::{ActInfo, LegalUnit, SequenceCounter, UnitKind, UnitMetadata};

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\bARTICLE\s+([IVXLCDM]+)\b",
        r"|(?:\bSection|\bSECTION|\bSEC\.|\bSec\.)\s+(\d+)\.",
        r"|(?:^|\s)([A-Z])\.\s+(?:THE\s+)?[A-Z]{3,}\b",
    ))
    .expect("valid regex")
});

/// Parser used to fill gaps in an implausibly small primary result.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackParser;

impl StructuralParser for FallbackParser {
    fn parse(&self, input: ParseInput<'_>) -> Vec<LegalUnit> {
        let text = squash_whitespace(&normalize_encoding(&html_to_text(input.html)));

        let (kind, document_title, act) = match classify_url(input.canonical_url) {
            ActsPage::Act {
                act_type,
                number,
                year,
            } => (
                UnitKind::ActSection,
                act_type.designation(&number),
                Some(ActInfo {
                    act_type,
                    act_number: number.to_uppercase(),
                    year: Some(year),
                    title: None,
                    approval_date: None,
                }),
            ),
            _ => (
                UnitKind::Section,
                constitution_title(input.canonical_url, &text),
                None,
            ),
        };

        let markers: Vec<_> = MARKER.captures_iter(&text).collect();
        let mut counter = SequenceCounter::new();
        let mut seen = HashSet::new();
        let mut units = Vec::new();
        let mut article: Option<(String, Option<u32>)> = None;
        let mut subpart: Option<String> = None;

        for (i, caps) in markers.iter().enumerate() {
            if let Some(label) = caps.get(1) {
                article = Some((label.as_str().to_string(), parse_roman(label.as_str())));
                subpart = None;
                continue;
            }
            if let Some(letter) = caps.get(3) {
                if article.is_some() {
                    subpart = Some(letter.as_str().to_string());
                }
                continue;
            }
            let (Some(whole), Some(section)) = (caps.get(0), caps.get(2)) else {
                continue;
            };

            let end = markers
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(text.len(), |m| m.start());
            let body = text[whole.start()..end].trim();
            let article_number = article.as_ref().and_then(|(_, n)| *n);
            let section = section.as_str().to_string();

            let key = (article_number, subpart.clone(), section.clone());
            if body.is_empty() || !seen.insert(key) {
                continue;
            }

            let mut metadata = UnitMetadata::new(kind, document_title.as_str());
            metadata.article_number = article_number;
            metadata.article_label = article.as_ref().map(|(label, _)| label.clone());
            metadata.subpart = subpart.clone();
            if let Some((label, _)) = &article {
                metadata.context_path = vec![format!("ARTICLE {label}")];
            }
            if kind == UnitKind::Section {
                metadata.topics = infer_topics(article_number, Some(&section));
            }
            metadata.section_number = Some(section);
            metadata.act = act.clone();
            units.push(LegalUnit::new(body, metadata, &mut counter));
        }

        tracing::debug!(url = input.canonical_url, units = units.len(), "Fallback parse");
        units
    }
}

/// Result of merging fallback units into a primary parse.
#[derive(Debug)]
pub struct FallbackMerge {
    pub units: Vec<LegalUnit>,
    /// Number of fallback units that filled a gap.
    pub added: usize,
}

/// Append fallback units whose structural key the primary parse lacks.
///
/// Primary units are never replaced. Added units are renumbered after the
/// last primary sequence index, keeping their relative order.
pub fn merge_fallback(mut primary: Vec<LegalUnit>, fallback: Vec<LegalUnit>) -> FallbackMerge {
    let mut keys: HashSet<_> = primary.iter().map(|u| u.metadata.structural_key()).collect();
    let start = primary
        .iter()
        .map(|u| u.sequence_index + 1)
        .max()
        .unwrap_or(0);
    let mut counter = SequenceCounter::starting_at(start);
    let mut added = 0;

    for mut unit in fallback {
        let key = unit.metadata.structural_key();
        if key == (None, None, None) || !keys.insert(key) {
            continue;
        }
        unit.sequence_index = counter.next_index();
        primary.push(unit);
        added += 1;
    }

    FallbackMerge {
        units: primary,
        added,
    }
}
