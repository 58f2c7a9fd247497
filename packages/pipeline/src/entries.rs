use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{KnowledgeEntry, NewEntry};

/// Upsert a knowledge entry keyed by its citation slug.
#[tracing::instrument(skip(pool, entry), fields(entry_id = %entry.entry_id))]
pub async fn upsert_entry(pool: &PgPool, entry: &NewEntry) -> Result<KnowledgeEntry> {
    let enrichment = serde_json::to_value(&entry.enrichment)?;

    let stored = sqlx::query_as::<_, KnowledgeEntry>(
        r#"
        INSERT INTO knowledge_entries
            (entry_id, session_id, document_id, canonical_citation, title,
             entry_type, subtype, text, enrichment, embedding)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (entry_id) DO UPDATE SET
            session_id = EXCLUDED.session_id,
            document_id = EXCLUDED.document_id,
            canonical_citation = EXCLUDED.canonical_citation,
            title = EXCLUDED.title,
            entry_type = EXCLUDED.entry_type,
            subtype = EXCLUDED.subtype,
            text = EXCLUDED.text,
            enrichment = EXCLUDED.enrichment,
            embedding = EXCLUDED.embedding
        RETURNING *
        "#,
    )
    .bind(&entry.entry_id)
    .bind(entry.session_id)
    .bind(entry.document_id)
    .bind(&entry.canonical_citation)
    .bind(&entry.title)
    .bind(&entry.entry_type)
    .bind(&entry.subtype)
    .bind(&entry.text)
    .bind(enrichment)
    .bind(&entry.embedding)
    .fetch_one(pool)
    .await?;

    tracing::info!(entry_id = %stored.entry_id, "entry published");
    Ok(stored)
}

/// Entries generated from a session, ordered by citation.
pub async fn session_entries(pool: &PgPool, session_id: Uuid) -> Result<Vec<KnowledgeEntry>> {
    let entries = sqlx::query_as::<_, KnowledgeEntry>(
        r#"SELECT * FROM knowledge_entries WHERE session_id = $1 ORDER BY canonical_citation"#,
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}
