//! Lexloom main entry point
//!
//! Command-line interface for the lexloom document ingestion engine.

use anyhow::{bail, Context};
use clap::Parser;
use lexloom::config::{load_config_with_hash, Config};
use lexloom::schema::{load_schema, DocumentSchema};
use lexloom::source::{ApiSource, FakeSource, OauthProvider, RetryPolicy, Source};
use lexloom::storage::{SqliteStorage, StorageWriter};
use lexloom::{CancelFlag, Coordinator};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Lexloom: a schema-driven legal-document ingestion engine
///
/// Lexloom crawls a paginated legal-document repository API, decomposes each
/// document into flat relational records according to a schema description,
/// and upserts them into SQLite.
#[derive(Parser, Debug)]
#[command(name = "lexloom")]
#[command(version = "0.1.0")]
#[command(about = "A schema-driven legal-document ingestion engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Create the entity tables declared by the schema and exit
    #[arg(long)]
    init_db: bool,

    /// Crawl the built-in fake corpus instead of the remote API.
    /// Unused in init-db mode.
    #[arg(long)]
    fake_source: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded (hash: {})", config_hash);

    let schema = load_schema(Path::new(&config.schema.path))
        .with_context(|| format!("failed to load schema from {}", config.schema.path))?;

    if cli.init_db {
        handle_init_db(&config, &schema)?;
    } else {
        handle_ingest(config, schema, &config_hash, cli.fake_source).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("lexloom=info,warn"),
            1 => EnvFilter::new("lexloom=debug,info"),
            2 => EnvFilter::new("lexloom=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles --init-db: creates entity tables from the schema and exits
fn handle_init_db(config: &Config, schema: &DocumentSchema) -> anyhow::Result<()> {
    let mut storage = SqliteStorage::open(Path::new(&config.storage.database_path))?;
    storage.init_entities(&schema.document)?;

    println!("Database ready: {}", config.storage.database_path);
    for node in schema.document.iter_nodes() {
        println!("  entity table: {}", node.entity);
    }
    Ok(())
}

/// Runs one ingestion pass against either the real API or the fake corpus
async fn handle_ingest(
    config: Config,
    schema: DocumentSchema,
    config_hash: &str,
    fake: bool,
) -> anyhow::Result<()> {
    let storage = SqliteStorage::open(Path::new(&config.storage.database_path))?;
    if !storage.entities_ready(&schema.document)? {
        bail!(
            "entity tables are missing from {}; run with --init-db first",
            config.storage.database_path
        );
    }

    if fake {
        tracing::info!("Using the built-in fake corpus");
        let source = FakeSource::sample();
        run_ingest(source, config, schema, storage, config_hash).await
    } else {
        let http = reqwest::Client::new();
        let auth = Arc::new(OauthProvider::new(
            http,
            config.source.token_url.clone(),
            config.source.client_id.clone(),
            config.source.client_secret.clone(),
        ));
        let source = ApiSource::new(&config.source, schema.filter.clone(), auth)?;
        run_ingest(source, config, schema, storage, config_hash).await
    }
}

async fn run_ingest<S: Source + 'static>(
    source: S,
    config: Config,
    schema: DocumentSchema,
    storage: SqliteStorage,
    config_hash: &str,
) -> anyhow::Result<()> {
    let cancel = CancelFlag::new();
    let handle = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, finishing the current document");
            handle.cancel();
        }
    });

    let retry = RetryPolicy::new(
        config.crawl.max_retries,
        Duration::from_millis(config.crawl.retry_base_delay_ms),
    );

    let report = Coordinator::new(source, storage, schema, config.crawl.page_size)
        .with_retry(retry)
        .with_cancel(cancel)
        .run(config_hash)
        .await?;

    print!("{}", report);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_flags_are_independent() {
        // All four combinations of the two run switches parse
        for flags in [
            vec![],
            vec!["--init-db"],
            vec!["--fake-source"],
            vec!["--init-db", "--fake-source"],
        ] {
            let mut args = vec!["lexloom", "config.toml"];
            args.extend(flags.iter());
            let cli = Cli::try_parse_from(&args).expect("flags parse");
            assert_eq!(cli.init_db, flags.contains(&"--init-db"));
            assert_eq!(cli.fake_source, flags.contains(&"--fake-source"));
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["lexloom", "config.toml", "-q", "-v"]).is_err());
    }
}
