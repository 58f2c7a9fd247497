use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{DocumentCount, NewDocument, ScrapedDocument};

/// Upsert a document row.
///
/// A row with the same (canonical URL, source hash) is updated in place.
/// Otherwise the newest parsed row for the URL is updated in place, taking
/// the new hash, so changed content never adds a duplicate.
#[tracing::instrument(skip(pool, doc), fields(url = %doc.canonical_url, kind = %doc.kind, status = %doc.parse_status))]
pub async fn upsert_document(pool: &PgPool, doc: &NewDocument) -> Result<ScrapedDocument> {
    let mut tx = pool.begin().await?;

    let existing: Option<Uuid> = sqlx::query_scalar(
        r#"
        SELECT id FROM scraped_documents
        WHERE canonical_url = $1
        ORDER BY (source_hash = $2) DESC, (parse_status = 'parsed') DESC, updated_at DESC
        LIMIT 1
        FOR UPDATE
        "#,
    )
    .bind(&doc.canonical_url)
    .bind(&doc.source_hash)
    .fetch_optional(&mut *tx)
    .await?;

    let stored = match existing {
        Some(id) => {
            sqlx::query_as::<_, ScrapedDocument>(
                r#"
                UPDATE scraped_documents
                SET session_id = $2, source_hash = $3, kind = $4, extracted_text = $5,
                    metadata = $6, sequence_index = $7, parse_status = $8
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(doc.session_id)
            .bind(&doc.source_hash)
            .bind(doc.kind)
            .bind(&doc.extracted_text)
            .bind(&doc.metadata)
            .bind(doc.sequence_index)
            .bind(doc.parse_status)
            .fetch_one(&mut *tx)
            .await?
        }
        None => {
            sqlx::query_as::<_, ScrapedDocument>(
                r#"
                INSERT INTO scraped_documents
                    (session_id, canonical_url, source_hash, kind, extracted_text,
                     metadata, sequence_index, parse_status)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (canonical_url, source_hash) DO UPDATE SET
                    session_id = EXCLUDED.session_id,
                    kind = EXCLUDED.kind,
                    extracted_text = EXCLUDED.extracted_text,
                    metadata = EXCLUDED.metadata,
                    sequence_index = EXCLUDED.sequence_index,
                    parse_status = EXCLUDED.parse_status
                RETURNING *
                "#,
            )
            .bind(doc.session_id)
            .bind(&doc.canonical_url)
            .bind(&doc.source_hash)
            .bind(doc.kind)
            .bind(&doc.extracted_text)
            .bind(&doc.metadata)
            .bind(doc.sequence_index)
            .bind(doc.parse_status)
            .fetch_one(&mut *tx)
            .await?
        }
    };

    tx.commit().await?;

    tracing::debug!(document_id = %stored.id, "document stored");
    Ok(stored)
}

/// Record a failure marker without touching rows of other content.
///
/// Only the row with the marker's exact (canonical URL, source hash) is
/// updated, and only its status, metadata and session. Any other row for the
/// URL, such as a good parse from an earlier session, is left as it was.
#[tracing::instrument(skip(pool, marker), fields(url = %marker.canonical_url, status = %marker.parse_status))]
pub async fn record_failure(pool: &PgPool, marker: &NewDocument) -> Result<ScrapedDocument> {
    let stored = sqlx::query_as::<_, ScrapedDocument>(
        r#"
        INSERT INTO scraped_documents
            (session_id, canonical_url, source_hash, kind, extracted_text,
             metadata, sequence_index, parse_status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (canonical_url, source_hash) DO UPDATE SET
            session_id = EXCLUDED.session_id,
            metadata = EXCLUDED.metadata,
            parse_status = EXCLUDED.parse_status
        RETURNING *
        "#,
    )
    .bind(marker.session_id)
    .bind(&marker.canonical_url)
    .bind(&marker.source_hash)
    .bind(marker.kind)
    .bind(&marker.extracted_text)
    .bind(&marker.metadata)
    .bind(marker.sequence_index)
    .bind(marker.parse_status)
    .fetch_one(pool)
    .await?;

    tracing::debug!(document_id = %stored.id, "failure recorded");
    Ok(stored)
}

/// Documents of a session, ordered by canonical URL then sequence index.
pub async fn session_documents(pool: &PgPool, session_id: Uuid) -> Result<Vec<ScrapedDocument>> {
    let docs = sqlx::query_as::<_, ScrapedDocument>(
        r#"
        SELECT * FROM scraped_documents
        WHERE session_id = $1
        ORDER BY canonical_url, sequence_index
        "#,
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    Ok(docs)
}

/// Count a session's documents by kind and parse status.
pub async fn document_counts(pool: &PgPool, session_id: Uuid) -> Result<Vec<DocumentCount>> {
    let counts = sqlx::query_as::<_, DocumentCount>(
        r#"
        SELECT kind, parse_status, COUNT(*) AS count
        FROM scraped_documents
        WHERE session_id = $1
        GROUP BY kind, parse_status
        ORDER BY kind, parse_status
        "#,
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    Ok(counts)
}
