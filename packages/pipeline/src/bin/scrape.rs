use clap::Parser;
use tracing_subscriber::EnvFilter;

use lawph_pipeline::cli::{self, Cli};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = cli::run(cli).await {
        tracing::error!(error = %e, "scrape failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
