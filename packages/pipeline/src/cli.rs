//! Command-line interface for running scraping sessions.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use lawph_harvester::{FetcherConfig, ParserKind};
use uuid::Uuid;

use crate::config::{BatchConfig, OrchestratorConfig, PipelineConfig};
use crate::db::{connect_with_retry, run_migrations};
use crate::error::Result;
use crate::generator::EntryGenerator;
use crate::orchestrator::{BatchItem, Orchestrator};
use crate::source::SourceFetcher;
use crate::store::{PgStore, Store};

/// LawPH scrape - Run scraping sessions against the knowledge-base database.
#[derive(Debug, Parser)]
#[command(name = "lawph-scrape")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scrape one URL in a new session.
    Scrape {
        /// Session category, e.g. constitution_1987
        #[arg(short, long)]
        category: String,

        /// Page URL on the source site
        #[arg(short, long)]
        url: String,

        /// Parser to use: constitution or acts
        #[arg(short, long, default_value = "constitution")]
        parser: ParserKind,

        /// Who started the session
        #[arg(short, long, default_value = "cli")]
        operator: String,
    },

    /// Scrape every act listed on a year-index page.
    Year {
        #[arg(short, long, default_value = "statutes")]
        category: String,

        /// Year-index URL, e.g. .../repacts/ra2022/ra2022.html
        #[arg(short, long)]
        url: String,

        #[arg(short, long, default_value = "cli")]
        operator: String,
    },

    /// Generate knowledge entries for a session.
    Generate {
        #[arg(short, long)]
        session: Uuid,
    },
}

/// Run a parsed command against the configured database.
pub async fn run(cli: Cli) -> Result<()> {
    let config = PipelineConfig::from_env()?;
    let pool = connect_with_retry(&config).await?;
    run_migrations(&pool).await?;
    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));

    match cli.command {
        Commands::Scrape {
            category,
            url,
            parser,
            operator,
        } => {
            let orchestrator = orchestrator(store)?;
            scrape_command(&orchestrator, &category, &url, parser, &operator).await
        }
        Commands::Year {
            category,
            url,
            operator,
        } => {
            let orchestrator = orchestrator(store)?;
            year_command(&orchestrator, &category, &url, &operator).await
        }
        Commands::Generate { session } => {
            let generator = EntryGenerator::from_env(store)?;
            let report = generator.generate_for_session(session).await?;
            println!(
                "Generated {} entries, {} failed",
                report.generated.len(),
                report.failed.len()
            );
            for failure in &report.failed {
                println!("  FAILED {}: {}", failure.canonical_citation, failure.error);
            }
            Ok(())
        }
    }
}

fn orchestrator(store: Arc<dyn Store>) -> Result<Orchestrator> {
    let fetcher = SourceFetcher::new(FetcherConfig::from_env());
    Ok(Orchestrator::new(store, fetcher, OrchestratorConfig::from_env()?)
        .with_batch_config(BatchConfig::from_env()))
}

/// Start a session, process one URL, then complete or fail the session.
pub async fn scrape_command(
    orchestrator: &Orchestrator,
    category: &str,
    url: &str,
    parser: ParserKind,
    operator: &str,
) -> Result<()> {
    let session = orchestrator.start_session(category, url, operator).await?;
    println!("Session {}", session.id);

    match orchestrator.process_url(session.id, url, parser).await {
        Ok(outcome) => {
            orchestrator.complete_session(session.id).await?;
            println!(
                "Stored {} units from {} (hash {}{})",
                outcome.unit_count,
                outcome.canonical_url,
                outcome.content_hash,
                if outcome.used_fallback { ", fallback used" } else { "" }
            );
            Ok(())
        }
        Err(e) => {
            orchestrator.fail_session(session.id, &e.to_string()).await?;
            Err(e)
        }
    }
}

/// Scrape a year index in bounded batches and complete the session.
pub async fn year_command(
    orchestrator: &Orchestrator,
    category: &str,
    url: &str,
    operator: &str,
) -> Result<()> {
    let session = orchestrator.start_session(category, url, operator).await?;
    println!("Session {}", session.id);

    let items = match orchestrator.process_year_index(session.id, url).await {
        Ok(items) => items,
        Err(e) => {
            orchestrator.fail_session(session.id, &e.to_string()).await?;
            return Err(e);
        }
    };

    print_batch(&items);
    orchestrator.complete_session(session.id).await?;
    Ok(())
}

fn print_batch(items: &[BatchItem]) {
    let ok = items.iter().filter(|i| i.is_success()).count();
    println!("Processed {} acts: {ok} ok, {} failed", items.len(), items.len() - ok);
    for item in items {
        match (&item.outcome, &item.error) {
            (Some(outcome), _) => println!("  OK     {} ({} units)", item.url, outcome.unit_count),
            (None, Some(error)) => println!("  FAILED {}: {error}", item.url),
            (None, None) => println!("  ?      {}", item.url),
        }
    }
}
