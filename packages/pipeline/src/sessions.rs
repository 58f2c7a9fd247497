use uuid::Uuid;

use crate::error::{PipelineError, Result};
use crate::models::{NewSession, ScrapingSession, SessionStatus};

/// Create a session in the `running` state.
#[tracing::instrument(skip(executor, req), fields(category = %req.category, root_url = %req.root_url))]
pub async fn create_session<'e, E>(executor: E, req: &NewSession) -> Result<ScrapingSession>
where
    E: sqlx::PgExecutor<'e>,
{
    let session = sqlx::query_as::<_, ScrapingSession>(
        r#"
        INSERT INTO scraping_sessions (category, root_url, operator)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(&req.category)
    .bind(&req.root_url)
    .bind(&req.operator)
    .fetch_one(executor)
    .await?;

    tracing::info!(session_id = %session.id, "session started");
    Ok(session)
}

/// Get a session by ID.
pub async fn get_session<'e, E>(executor: E, session_id: Uuid) -> Result<ScrapingSession>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, ScrapingSession>(r#"SELECT * FROM scraping_sessions WHERE id = $1"#)
        .bind(session_id)
        .fetch_optional(executor)
        .await?
        .ok_or(PipelineError::SessionNotFound(session_id))
}

/// Move a running session to a terminal status.
///
/// Returns `None` when the session does not exist or is no longer running.
#[tracing::instrument(skip(executor, error))]
pub async fn finish_session<'e, E>(
    executor: E,
    session_id: Uuid,
    status: SessionStatus,
    error: Option<&str>,
) -> Result<Option<ScrapingSession>>
where
    E: sqlx::PgExecutor<'e>,
{
    if !status.is_terminal() {
        return Err(PipelineError::InvalidInput(format!(
            "cannot move session {session_id} to {status}"
        )));
    }

    let session = sqlx::query_as::<_, ScrapingSession>(
        r#"
        UPDATE scraping_sessions
        SET status = $2, error = $3, finished_at = now()
        WHERE id = $1 AND status = 'running'
        RETURNING *
        "#,
    )
    .bind(session_id)
    .bind(status)
    .bind(error)
    .fetch_optional(executor)
    .await?;

    if let Some(ref s) = session {
        tracing::info!(session_id = %s.id, status = %s.status, "session finished");
    }
    Ok(session)
}

/// List sessions, newest first.
pub async fn list_sessions<'e, E>(executor: E, status: Option<SessionStatus>) -> Result<Vec<ScrapingSession>>
where
    E: sqlx::PgExecutor<'e>,
{
    let sessions = match status {
        Some(s) => {
            sqlx::query_as::<_, ScrapingSession>(
                r#"SELECT * FROM scraping_sessions WHERE status = $1 ORDER BY started_at DESC"#,
            )
            .bind(s)
            .fetch_all(executor)
            .await?
        }
        None => {
            sqlx::query_as::<_, ScrapingSession>(
                r#"SELECT * FROM scraping_sessions ORDER BY started_at DESC"#,
            )
            .fetch_all(executor)
            .await?
        }
    };

    Ok(sessions)
}
