//! Structural parsers: raw HTML to ordered legal units.
//!
//! Two strategies share the [`StructuralParser`] contract:
//!
//! - [`constitution::ConstitutionParser`]: line-scan state machine for
//!   constitutional text (preamble, articles, sections, ordinance).
//! - [`acts::ActsParser`]: year-index pages and individual statutes with
//!   dynamic book/title/chapter/article/section hierarchy detection.
//!
//! [`fallback::FallbackParser`] is a flat-text scan used to fill gaps when
//! a primary parse is implausibly small.
//!
//! Parsers are stateless. Each call creates its own
//! [`SequenceCounter`](crate::types::SequenceCounter), so one parser value
//! can be shared across threads. An unrecognizable page yields an empty
//! vector, never an error.

pub mod acts;
pub mod clean;
pub mod constitution;
pub mod fallback;
pub mod topics;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HarvesterError;
use crate::types::LegalUnit;

/// Input shared by every parser: the fetched HTML and its canonical URL.
#[derive(Debug, Clone, Copy)]
pub struct ParseInput<'a> {
    pub canonical_url: &'a str,
    pub html: &'a str,
}

impl<'a> ParseInput<'a> {
    #[must_use]
    pub fn new(canonical_url: &'a str, html: &'a str) -> Self {
        Self { canonical_url, html }
    }
}

/// Contract of a structural parser.
pub trait StructuralParser: Send + Sync {
    /// Parse a document into units in source order.
    fn parse(&self, input: ParseInput<'_>) -> Vec<LegalUnit>;
}

/// Selectable primary parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParserKind {
    Constitution,
    Acts,
}

impl ParserKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Constitution => "constitution",
            Self::Acts => "acts",
        }
    }
}

impl fmt::Display for ParserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParserKind {
    type Err = HarvesterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "constitution" => Ok(Self::Constitution),
            "acts" | "act" | "statute" => Ok(Self::Acts),
            other => Err(HarvesterError::UnknownParser(other.to_string())),
        }
    }
}

/// Parser implementation for a kind.
#[must_use]
pub fn parser_for(kind: ParserKind) -> Box<dyn StructuralParser> {
    match kind {
        ParserKind::Constitution => Box::new(constitution::ConstitutionParser),
        ParserKind::Acts => Box::new(acts::ActsParser),
    }
}
