//! YAML output of parsed documents.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::citation::cite_units;
use crate::error::Result;
use crate::types::{LegalUnit, UnitMetadata};

/// One unit with its derived identifiers, as written to YAML.
#[derive(Debug, Serialize)]
pub struct UnitRecord {
    pub citation: String,
    pub url: String,
    pub sequence_index: u32,
    pub metadata: UnitMetadata,
    pub text: String,
}

/// A parsed document, as written to YAML.
#[derive(Debug, Serialize)]
pub struct DocumentRecord {
    pub source_url: String,
    pub parser: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    pub harvested_at: String,
    pub units: Vec<UnitRecord>,
}

impl DocumentRecord {
    /// Build the record for the units parsed from `canonical_url`.
    pub fn new(
        canonical_url: &str,
        parser: &str,
        content_hash: Option<String>,
        units: &[LegalUnit],
    ) -> Self {
        let units = cite_units(canonical_url, units)
            .into_iter()
            .map(|cited| UnitRecord {
                citation: cited.citation,
                url: cited.url,
                sequence_index: cited.unit.sequence_index,
                metadata: cited.unit.metadata.clone(),
                text: cited.unit.extracted_text.clone(),
            })
            .collect();

        Self {
            source_url: canonical_url.to_string(),
            parser: parser.to_string(),
            content_hash,
            harvested_at: chrono::Utc::now().to_rfc3339(),
            units,
        }
    }
}

/// Serialize a document record.
pub fn to_yaml(record: &DocumentRecord) -> Result<String> {
    Ok(serde_yaml_ng::to_string(record)?)
}

/// Write a document record to `path`, creating parent directories.
pub fn save_yaml(record: &DocumentRecord, path: &Path) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, to_yaml(record)?)?;
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SequenceCounter, UnitKind};

    fn record() -> DocumentRecord {
        let mut counter = SequenceCounter::new();
        let mut metadata = UnitMetadata::new(UnitKind::Section, "1987 Constitution");
        metadata.article_number = Some(3);
        metadata.section_number = Some("1".to_string());
        let units = vec![LegalUnit::new("Section 1. No person...", metadata, &mut counter)];
        DocumentRecord::new("https://lawphil.net/consti/cons1987.html", "constitution", None, &units)
    }

    #[test]
    fn test_to_yaml_contains_citation_and_url() {
        let yaml = to_yaml(&record()).unwrap();
        assert!(yaml.contains("citation: 1987 Constitution, Article III, Section 1"));
        assert!(yaml.contains("url: https://lawphil.net/consti/cons1987.html#article-3-section-1"));
        assert!(!yaml.contains("content_hash"));
    }

    #[test]
    fn test_save_yaml_creates_directories() {
        let dir = std::env::temp_dir().join(format!("lawph-output-{}", std::process::id()));
        let path = dir.join("nested").join("cons1987.yaml");
        let written = save_yaml(&record(), &path).unwrap();
        assert!(written.exists());
        fs::remove_dir_all(&dir).unwrap();
    }
}
