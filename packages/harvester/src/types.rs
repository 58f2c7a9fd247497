//! Core data types for parsed legal units.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Structural role of a legal unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Preamble,
    Article,
    Section,
    Ordinance,
    ActIndexEntry,
    ActArticle,
    ActSection,
}

impl UnitKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preamble => "preamble",
            Self::Article => "article",
            Self::Section => "section",
            Self::Ordinance => "ordinance",
            Self::ActIndexEntry => "act_index_entry",
            Self::ActArticle => "act_article",
            Self::ActSection => "act_section",
        }
    }

    /// Whether this unit comes from the constitution parser family.
    #[must_use]
    pub fn is_constitutional(&self) -> bool {
        matches!(
            self,
            Self::Preamble | Self::Article | Self::Section | Self::Ordinance
        )
    }
}

/// Kinds of numbered statutes on the source site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActType {
    RepublicAct,
    CommonwealthAct,
    Act,
    BatasPambansa,
    PresidentialDecree,
    ExecutiveOrder,
}

impl ActType {
    /// Map a URL prefix (`ra`, `ca`, ...) to an act type.
    #[must_use]
    pub fn from_url_prefix(prefix: &str) -> Option<Self> {
        match prefix.to_lowercase().as_str() {
            "ra" => Some(Self::RepublicAct),
            "ca" => Some(Self::CommonwealthAct),
            "act" => Some(Self::Act),
            "bp" => Some(Self::BatasPambansa),
            "pd" => Some(Self::PresidentialDecree),
            "eo" => Some(Self::ExecutiveOrder),
            _ => None,
        }
    }

    /// URL prefix used by the source site.
    #[must_use]
    pub fn url_prefix(&self) -> &'static str {
        match self {
            Self::RepublicAct => "ra",
            Self::CommonwealthAct => "ca",
            Self::Act => "act",
            Self::BatasPambansa => "bp",
            Self::PresidentialDecree => "pd",
            Self::ExecutiveOrder => "eo",
        }
    }

    /// Map a written designation ("Republic Act", "Batas Pambansa") to a type.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        [
            Self::RepublicAct,
            Self::CommonwealthAct,
            Self::Act,
            Self::BatasPambansa,
            Self::PresidentialDecree,
            Self::ExecutiveOrder,
        ]
        .into_iter()
        .find(|t| t.label().to_lowercase() == label)
    }

    /// Human-readable designation used in citations.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::RepublicAct => "Republic Act",
            Self::CommonwealthAct => "Commonwealth Act",
            Self::Act => "Act",
            Self::BatasPambansa => "Batas Pambansa",
            Self::PresidentialDecree => "Presidential Decree",
            Self::ExecutiveOrder => "Executive Order",
        }
    }

    /// Word that precedes the number (`No.` or `Blg.`).
    #[must_use]
    pub fn number_marker(&self) -> &'static str {
        match self {
            Self::BatasPambansa => "Blg.",
            _ => "No.",
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RepublicAct => "republic_act",
            Self::CommonwealthAct => "commonwealth_act",
            Self::Act => "act",
            Self::BatasPambansa => "batas_pambansa",
            Self::PresidentialDecree => "presidential_decree",
            Self::ExecutiveOrder => "executive_order",
        }
    }

    /// "Republic Act No. 11934".
    #[must_use]
    pub fn designation(&self, number: &str) -> String {
        format!("{} {} {number}", self.label(), self.number_marker())
    }
}

/// Act-level information attached to statute units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActInfo {
    pub act_type: ActType,
    pub act_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_date: Option<NaiveDate>,
}

/// Structural context of a legal unit, sufficient to rebuild its citation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitMetadata {
    pub kind: UnitKind,

    /// Document designation, e.g. "1987 Constitution" or "Republic Act No. 11934".
    pub document_title: String,

    /// Article title, section caption, or block title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub article_number: Option<u32>,

    /// Article identifier as written in the source ("III", "26-A").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article_label: Option<String>,

    /// Lettered subdivision of an article (constitutional commissions A-D).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subpart: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_number: Option<String>,

    #[serde(default)]
    pub is_preamble: bool,

    #[serde(default)]
    pub topics: Vec<String>,

    /// Enclosing headings, outermost first ("BOOK I", "TITLE II", "CHAPTER 3").
    #[serde(default)]
    pub context_path: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub act: Option<ActInfo>,
}

impl UnitMetadata {
    /// Metadata with only kind and document designation set.
    #[must_use]
    pub fn new(kind: UnitKind, document_title: impl Into<String>) -> Self {
        Self {
            kind,
            document_title: document_title.into(),
            title: None,
            article_number: None,
            article_label: None,
            subpart: None,
            section_number: None,
            is_preamble: kind == UnitKind::Preamble,
            topics: Vec::new(),
            context_path: Vec::new(),
            act: None,
        }
    }

    /// Key used to match primary and fallback units: (article, subpart, section).
    #[must_use]
    pub fn structural_key(&self) -> StructuralKey {
        (
            self.article_number,
            self.subpart.clone(),
            self.section_number.clone(),
        )
    }
}

/// Article number, subpart letter and section number of a unit.
pub type StructuralKey = (Option<u32>, Option<String>, Option<String>);

/// One atomic citable unit produced by a parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalUnit {
    pub extracted_text: String,
    pub metadata: UnitMetadata,
    /// Position in source-document order within one parse call.
    pub sequence_index: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LegalUnit>,
}

/// Monotonic sequence counter, created fresh for every parse call.
#[derive(Debug, Default)]
pub struct SequenceCounter(u32);

impl SequenceCounter {
    #[must_use]
    pub fn new() -> Self {
        Self(0)
    }

    #[must_use]
    pub fn starting_at(start: u32) -> Self {
        Self(start)
    }

    /// Return the current index and advance.
    pub fn next_index(&mut self) -> u32 {
        let current = self.0;
        self.0 += 1;
        current
    }
}

impl LegalUnit {
    /// Create a unit, taking the next sequence index from `counter`.
    #[must_use]
    pub fn new(text: impl Into<String>, metadata: UnitMetadata, counter: &mut SequenceCounter) -> Self {
        Self {
            extracted_text: text.into(),
            metadata,
            sequence_index: counter.next_index(),
            children: Vec::new(),
        }
    }
}
