use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::PipelineConfig;
use crate::error::Result;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_RETRIES: u32 = 10;
const CONNECT_RETRY_INTERVAL: Duration = Duration::from_secs(3);

pub async fn create_pool(config: &PipelineConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(&config.database_url)
        .await?;

    Ok(pool)
}

/// Connect, retrying while the database is still starting up.
pub async fn connect_with_retry(config: &PipelineConfig) -> Result<PgPool> {
    let mut attempt = 1;
    loop {
        match create_pool(config).await {
            Ok(pool) => return Ok(pool),
            Err(e) if attempt < CONNECT_RETRIES => {
                tracing::warn!(attempt, error = %e, "failed to connect, retrying...");
                tokio::time::sleep(CONNECT_RETRY_INTERVAL).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
