//! Command-line interface for the harvester.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{canonical_url, FetcherConfig};
use crate::error::{HarvesterError, Result};
use crate::http::{content_hash, Fetcher};
use crate::metadata::extract_structure;
use crate::output::{save_yaml, to_yaml, DocumentRecord};
use crate::parsers::acts::parse_year_index;
use crate::parsers::{parser_for, ParseInput, ParserKind};

/// LawPH Harvester - Fetch and parse Philippine legal texts.
#[derive(Parser)]
#[command(name = "lawph-harvester")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch a page and report status, hash, timing and structure.
    Fetch {
        /// Page URL on the source site
        url: String,
    },

    /// Parse a page into legal units and write them as YAML.
    Parse {
        /// Canonical source URL of the page
        url: String,

        /// Parser to use: constitution or acts
        #[arg(short, long, default_value = "constitution")]
        parser: ParserKind,

        /// Read HTML from a local file instead of fetching
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Output file (default: print to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the acts of a year-index page.
    Index {
        /// Year-index URL, e.g. .../repacts/ra2022/ra2022.html
        url: String,

        /// Read HTML from a local file instead of fetching
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch { url } => fetch_command(&url),
        Commands::Parse {
            url,
            parser,
            file,
            output,
        } => parse_command(&url, parser, file.as_deref(), output.as_deref()),
        Commands::Index { url, file } => index_command(&url, file.as_deref()),
    }
}

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Load page HTML from a file or the network; returns the body and its hash.
fn load_html(url: &str, file: Option<&Path>) -> Result<(String, String)> {
    if let Some(path) = file {
        if !path.is_file() {
            return Err(HarvesterError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Input file does not exist: {}", path.display()),
            )));
        }
        let html = std::fs::read_to_string(path)?;
        let hash = content_hash(&html);
        return Ok((html, hash));
    }

    let fetcher = Fetcher::new(FetcherConfig::from_env())?;
    let pb = spinner("Fetching page...");
    let result = fetcher.fetch_with_retry(url);
    pb.finish_and_clear();
    let result = result?;
    Ok((result.html, result.content_hash))
}

fn fetch_command(url: &str) -> Result<()> {
    let fetcher = Fetcher::new(FetcherConfig::from_env())?;

    println!("{} {}", style("Fetching").bold(), style(url).cyan());
    let pb = spinner("Waiting for response...");
    let result = fetcher.fetch_with_retry(url);
    pb.finish_and_clear();
    let result = result?;

    let structure = extract_structure(&result.html);

    println!("  Status: {}", style(result.status_code).green());
    println!("  Hash: {}", result.content_hash);
    println!("  Time: {} ms", result.fetch_time_ms);
    if let Some(title) = &structure.title {
        println!("  Title: {}", style(title).green());
    }
    println!("  Headings: {}", structure.headings.len());
    println!("  Paragraphs: {}", structure.paragraphs.len());
    println!("  Tables: {}", structure.tables.len());
    println!("  Links: {}", structure.links.len());
    println!(
        "  Text: {} characters, {} words",
        structure.stats.characters, structure.stats.words
    );

    Ok(())
}

fn parse_command(
    url: &str,
    parser: ParserKind,
    file: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let canonical = canonical_url(url)?;
    let (html, hash) = load_html(url, file)?;

    let units = parser_for(parser).parse(ParseInput::new(&canonical, &html));
    if units.is_empty() {
        println!("{}", style("No legal units found").yellow().bold());
        return Ok(());
    }

    let record = DocumentRecord::new(&canonical, parser.as_str(), Some(hash), &units);

    match output {
        Some(path) => {
            let written = save_yaml(&record, path)?;
            println!(
                "{} {} units",
                style("Parsed").bold(),
                style(units.len()).cyan()
            );
            println!("{} {}", style("Saved to:").green().bold(), written.display());
        }
        None => print!("{}", to_yaml(&record)?),
    }

    Ok(())
}

fn index_command(url: &str, file: Option<&Path>) -> Result<()> {
    let canonical = canonical_url(url)?;
    let (html, _) = load_html(url, file)?;
    let entries = parse_year_index(&canonical, &html);

    if entries.is_empty() {
        println!("{}", style("No acts found on this page").yellow().bold());
        return Ok(());
    }

    for entry in &entries {
        let approved = entry
            .approval_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}  {}  {}",
            style(entry.act_type.designation(&entry.act_number)).cyan(),
            style(approved).dim(),
            entry.title
        );
        println!("    {}", entry.url);
    }
    println!();
    println!("{} acts", style(entries.len()).bold());

    Ok(())
}
