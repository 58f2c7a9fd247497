//! Canonical citations, unit fragments, and entry slugs.
//!
//! Everything here is a pure function of [`UnitMetadata`], so re-parsing
//! unchanged content reproduces the same citations and URLs.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::unit_url;
use crate::roman::{parse_roman, to_roman};
use crate::types::{LegalUnit, UnitKind, UnitMetadata};

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("valid regex"));

#[allow(clippy::expect_used)]
static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s_-]+").expect("valid regex"));

/// Display form of an article number: Roman for the constitution, as
/// written for statutes.
fn article_display(metadata: &UnitMetadata) -> Option<String> {
    let base = if metadata.kind.is_constitutional() {
        metadata
            .article_number
            .map(to_roman)
            .or_else(|| metadata.article_label.clone())
    } else {
        metadata
            .article_label
            .clone()
            .or_else(|| metadata.article_number.map(|n| n.to_string()))
    }?;

    Some(match &metadata.subpart {
        Some(subpart) => format!("{base}-{subpart}"),
        None => base,
    })
}

/// Compute the canonical citation of a unit.
///
/// # Examples
/// ```
/// use lawph_harvester::citation::canonical_citation;
/// use lawph_harvester::types::{UnitKind, UnitMetadata};
///
/// let mut metadata = UnitMetadata::new(UnitKind::Section, "1987 Constitution");
/// metadata.article_number = Some(3);
/// metadata.section_number = Some("1".to_string());
/// assert_eq!(canonical_citation(&metadata), "1987 Constitution, Article III, Section 1");
/// ```
pub fn canonical_citation(metadata: &UnitMetadata) -> String {
    let doc = &metadata.document_title;

    match metadata.kind {
        UnitKind::Preamble => format!("{doc}, Preamble"),
        UnitKind::Ordinance => format!("{doc}, Ordinance"),
        UnitKind::ActIndexEntry => doc.clone(),
        UnitKind::Article | UnitKind::Section | UnitKind::ActArticle | UnitKind::ActSection => {
            let mut citation = doc.clone();
            if let Some(article) = article_display(metadata) {
                citation.push_str(&format!(", Article {article}"));
            }
            if let Some(section) = &metadata.section_number {
                citation.push_str(&format!(", Section {section}"));
            }
            citation
        }
    }
}

/// Lowercase fragment component for an identifier, Roman numerals decoded.
fn identifier_component(identifier: &str) -> String {
    let trimmed = identifier.trim().trim_end_matches('.');
    let normalized = match parse_roman(trimmed) {
        Some(n) if trimmed.chars().all(|c| c.is_ascii_uppercase()) => n.to_string(),
        _ => trimmed.to_lowercase(),
    };
    SEPARATORS.replace_all(&normalized, "-").trim_matches('-').to_string()
}

/// Fragment component for a context heading such as "BOOK I" or
/// "CHAPTER 3 - DEFINITIONS". Only the kind and identifier are used.
fn context_component(heading: &str) -> String {
    let mut words = heading.split_whitespace();
    match (words.next(), words.next()) {
        (Some(kind), Some(identifier)) => {
            format!("{}-{}", kind.to_lowercase(), identifier_component(identifier))
        }
        (Some(kind), None) => kind.to_lowercase(),
        _ => String::new(),
    }
}

/// Base fragment of a unit, before duplicate disambiguation.
///
/// # Examples
/// ```
/// use lawph_harvester::citation::unit_fragment;
/// use lawph_harvester::types::{UnitKind, UnitMetadata};
///
/// let mut metadata = UnitMetadata::new(UnitKind::Section, "1987 Constitution");
/// metadata.article_number = Some(9);
/// metadata.subpart = Some("B".to_string());
/// metadata.section_number = Some("2".to_string());
/// assert_eq!(unit_fragment(&metadata), "article-9-b-section-2");
/// ```
pub fn unit_fragment(metadata: &UnitMetadata) -> String {
    let mut parts: Vec<String> = Vec::new();

    match metadata.kind {
        UnitKind::Preamble => return "preamble".to_string(),
        UnitKind::Ordinance => return "ordinance".to_string(),
        UnitKind::ActIndexEntry => {
            return metadata
                .act
                .as_ref()
                .map(|act| format!("{}-{}", act.act_type.as_str().replace('_', "-"), identifier_component(&act.act_number)))
                .unwrap_or_else(|| "entry".to_string());
        }
        UnitKind::ActArticle | UnitKind::ActSection => {
            parts.extend(metadata.context_path.iter().map(|h| context_component(h)));
        }
        UnitKind::Article | UnitKind::Section => {}
    }

    if let Some(number) = metadata.article_number {
        parts.push(format!("article-{number}"));
    } else if let Some(label) = &metadata.article_label {
        parts.push(format!("article-{}", identifier_component(label)));
    }
    if let Some(subpart) = &metadata.subpart {
        parts.push(subpart.to_lowercase());
    }
    if let Some(section) = &metadata.section_number {
        parts.push(format!("section-{}", identifier_component(section)));
    }

    if parts.is_empty() {
        metadata.kind.as_str().replace('_', "-")
    } else {
        parts.join("-")
    }
}

/// Fragments for every unit of one parse, in order.
///
/// Duplicate fragments get `-2`, `-3`, ... suffixes in sequence order.
pub fn assign_fragments(units: &[LegalUnit]) -> Vec<String> {
    let mut seen: HashMap<String, u32> = HashMap::new();
    units
        .iter()
        .map(|unit| {
            let base = unit_fragment(&unit.metadata);
            let count = seen.entry(base.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                base
            } else {
                format!("{base}-{count}")
            }
        })
        .collect()
}

/// A unit with its derived identifiers.
#[derive(Debug, Clone)]
pub struct CitedUnit<'a> {
    pub unit: &'a LegalUnit,
    pub citation: String,
    pub fragment: String,
    pub url: String,
}

/// Attach citations and fragment-qualified URLs to the units of one document.
pub fn cite_units<'a>(canonical_url: &str, units: &'a [LegalUnit]) -> Vec<CitedUnit<'a>> {
    units
        .iter()
        .zip(assign_fragments(units))
        .map(|(unit, fragment)| CitedUnit {
            unit,
            citation: canonical_citation(&unit.metadata),
            url: unit_url(canonical_url, &fragment),
            fragment,
        })
        .collect()
}

/// Convert a citation into an identifier slug.
///
/// # Examples
/// ```
/// use lawph_harvester::citation::citation_slug;
///
/// assert_eq!(
///     citation_slug("1987 Constitution, Article III, Section 1"),
///     "1987_constitution_article_iii_section_1"
/// );
/// ```
pub fn citation_slug(citation: &str) -> String {
    let lowered = citation.to_lowercase();
    let stripped = NON_WORD.replace_all(&lowered, "");
    SEPARATORS
        .replace_all(stripped.trim(), "_")
        .trim_matches('_')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActInfo, ActType, SequenceCounter};
    use pretty_assertions::assert_eq;

    fn constitution(kind: UnitKind, article: Option<u32>, section: Option<&str>) -> UnitMetadata {
        let mut metadata = UnitMetadata::new(kind, "1987 Constitution");
        metadata.article_number = article;
        metadata.section_number = section.map(String::from);
        metadata
    }

    fn act_section(section: &str, context: &[&str]) -> UnitMetadata {
        let mut metadata = UnitMetadata::new(UnitKind::ActSection, "Republic Act No. 11934");
        metadata.section_number = Some(section.to_string());
        metadata.context_path = context.iter().map(|c| c.to_string()).collect();
        metadata.act = Some(ActInfo {
            act_type: ActType::RepublicAct,
            act_number: "11934".to_string(),
            year: Some(2022),
            title: None,
            approval_date: None,
        });
        metadata
    }

    #[test]
    fn test_constitution_citations() {
        assert_eq!(
            canonical_citation(&constitution(UnitKind::Preamble, None, None)),
            "1987 Constitution, Preamble"
        );
        assert_eq!(
            canonical_citation(&constitution(UnitKind::Article, Some(2), None)),
            "1987 Constitution, Article II"
        );
        assert_eq!(
            canonical_citation(&constitution(UnitKind::Section, Some(2), Some("3"))),
            "1987 Constitution, Article II, Section 3"
        );
        assert_eq!(
            canonical_citation(&constitution(UnitKind::Ordinance, Some(18), None)),
            "1987 Constitution, Ordinance"
        );
    }

    #[test]
    fn test_subpart_citation() {
        let mut metadata = constitution(UnitKind::Section, Some(9), Some("2"));
        metadata.subpart = Some("B".to_string());
        assert_eq!(
            canonical_citation(&metadata),
            "1987 Constitution, Article IX-B, Section 2"
        );
    }

    #[test]
    fn test_act_citations() {
        assert_eq!(
            canonical_citation(&act_section("3", &[])),
            "Republic Act No. 11934, Section 3"
        );

        let mut article = UnitMetadata::new(UnitKind::ActArticle, "Republic Act No. 386");
        article.article_label = Some("26".to_string());
        assert_eq!(canonical_citation(&article), "Republic Act No. 386, Article 26");
    }

    #[test]
    fn test_fragments() {
        assert_eq!(unit_fragment(&constitution(UnitKind::Preamble, None, None)), "preamble");
        assert_eq!(unit_fragment(&constitution(UnitKind::Article, Some(3), None)), "article-3");
        assert_eq!(unit_fragment(&act_section("4-A", &[])), "section-4-a");

        let mut article = UnitMetadata::new(UnitKind::ActArticle, "Republic Act No. 386");
        article.article_label = Some("5".to_string());
        article.context_path = vec!["BOOK I - PERSONS".to_string(), "TITLE II".to_string()];
        assert_eq!(unit_fragment(&article), "book-1-title-2-article-5");
    }

    #[test]
    fn test_duplicate_fragments_are_suffixed() {
        let mut counter = SequenceCounter::new();
        let units: Vec<LegalUnit> = ["1", "1", "2", "1"]
            .iter()
            .map(|s| LegalUnit::new("text", act_section(s, &[]), &mut counter))
            .collect();

        assert_eq!(
            assign_fragments(&units),
            vec!["section-1", "section-1-2", "section-2", "section-1-3"]
        );
    }

    #[test]
    fn test_cite_units_urls() {
        let mut counter = SequenceCounter::new();
        let units = vec![LegalUnit::new(
            "text",
            constitution(UnitKind::Section, Some(3), Some("1")),
            &mut counter,
        )];
        let cited = cite_units("https://lawphil.net/consti/cons1987.html", &units);
        assert_eq!(cited[0].url, "https://lawphil.net/consti/cons1987.html#article-3-section-1");
        assert_eq!(cited[0].citation, "1987 Constitution, Article III, Section 1");
    }

    #[test]
    fn test_citation_slug() {
        assert_eq!(citation_slug("Republic Act No. 11934, Section 3"), "republic_act_no_11934_section_3");
        assert_eq!(citation_slug("  A -- B  "), "a_b");
    }

    #[test]
    fn test_citation_is_deterministic() {
        let metadata = constitution(UnitKind::Section, Some(14), Some("7"));
        assert_eq!(canonical_citation(&metadata), canonical_citation(&metadata.clone()));
    }
}
