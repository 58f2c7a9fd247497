//! LawPH Harvester - Fetch and parse Philippine legal texts into citable units.
//!
//! This crate fetches pages from the public legal-document source, renders
//! them as text, and splits them into [`LegalUnit`]s with deterministic
//! canonical citations.
//!
//! # Example
//!
//! ```
//! use lawph_harvester::citation::canonical_citation;
//! use lawph_harvester::parsers::{parser_for, ParseInput, ParserKind};
//!
//! let html = "<p>ARTICLE III</p><p>BILL OF RIGHTS</p>\
//!             <p>Section 1. No person shall be deprived of life, liberty, or property without due process of law.</p>";
//! let parser = parser_for(ParserKind::Constitution);
//! let units = parser.parse(ParseInput::new("https://lawphil.net/consti/cons1987.html", html));
//!
//! assert_eq!(units.len(), 1);
//! assert_eq!(
//!     canonical_citation(&units[0].metadata),
//!     "1987 Constitution, Article III, Section 1"
//! );
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Fetcher configuration, URL validation and canonicalization
//! - [`error`]: Error types and Result alias
//! - [`http`]: Rate-limited, retrying fetcher with content hashing
//! - [`html`]: Plain-text rendering of HTML
//! - [`metadata`]: Best-effort structural metadata of fetched pages
//! - [`types`]: Legal unit data model
//! - [`roman`]: Roman numerals
//! - [`parsers`]: Constitution, acts, and fallback parsers
//! - [`citation`]: Canonical citations, fragments, slugs
//! - [`output`]: YAML output
//! - [`cli`]: Command-line interface

pub mod citation;
pub mod cli;
pub mod config;
pub mod error;
pub mod html;
pub mod http;
pub mod metadata;
pub mod output;
pub mod parsers;
pub mod roman;
pub mod types;

pub use citation::{canonical_citation, citation_slug};
pub use config::{canonical_url, FetcherConfig};
pub use error::{HarvesterError, Result};
pub use http::{FetchResult, Fetcher, RateLimiter};
pub use parsers::{parser_for, ParseInput, ParserKind, StructuralParser};
pub use types::{ActInfo, ActType, LegalUnit, StructuralKey, UnitKind, UnitMetadata};
