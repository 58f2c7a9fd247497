use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use lawph_harvester::FetcherConfig;
use lawph_pipeline::api::{self, AppState};
use lawph_pipeline::config::{ApiConfig, BatchConfig, OrchestratorConfig, PipelineConfig};
use lawph_pipeline::db::{connect_with_retry, run_migrations};
use lawph_pipeline::generator::EntryGenerator;
use lawph_pipeline::orchestrator::Orchestrator;
use lawph_pipeline::source::SourceFetcher;
use lawph_pipeline::store::{PgStore, Store};

fn exit_on_error<T, E: std::fmt::Display>(result: Result<T, E>, context: &str) -> T {
    result.unwrap_or_else(|e| {
        tracing::error!(error = %e, "{context}");
        std::process::exit(1);
    })
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = exit_on_error(PipelineConfig::from_env(), "failed to load configuration");
    let api_config = exit_on_error(ApiConfig::from_env(), "failed to load API configuration");
    let orchestrator_config =
        exit_on_error(OrchestratorConfig::from_env(), "failed to load orchestrator configuration");

    tracing::info!("connecting to database...");
    let pool = exit_on_error(connect_with_retry(&config).await, "failed to connect to database");
    tracing::info!("connected to database");

    tracing::info!("running database migrations...");
    exit_on_error(run_migrations(&pool).await, "failed to run migrations");
    tracing::info!("migrations completed");

    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));

    // One fetcher per process: every clone shares its rate limiter.
    let fetcher = SourceFetcher::new(FetcherConfig::from_env());
    let orchestrator = Orchestrator::new(store.clone(), fetcher, orchestrator_config)
        .with_batch_config(BatchConfig::from_env());

    let generator = match EntryGenerator::from_env(store) {
        Ok(generator) => Some(generator),
        Err(e) => {
            tracing::warn!(error = %e, "entry generation disabled");
            None
        }
    };

    let app = api::router(AppState {
        orchestrator,
        generator,
    });

    let addr = api_config.bind_addr;
    tracing::info!("listening on {addr}");

    let listener = exit_on_error(
        tokio::net::TcpListener::bind(addr).await,
        "failed to bind listener",
    );

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}
