use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;

use quarry_client::browser_fetcher::DEFAULT_MAX_BROWSERS;
use quarry_client::{BrowserFetcher, DefaultFetcher, SelectorExtractor, StaticFetcher};
use quarry_core::{SearchQuery, SearchService, SiteCatalog, StreamEvent};
use quarry_db::{Database, DatabaseConfig, PgResultCache};

#[derive(Parser)]
#[command(name = "quarry", version, about = "Search many sites at once, results as they arrive")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a search across every configured site
    Search {
        /// Free-text query
        query: String,

        /// Path to the site catalog JSON file
        #[arg(long, env = "QUARRY_SITES_PATH", default_value = "config/sites.json")]
        sites: PathBuf,

        /// Print each event's raw JSON payload instead of readable lines
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Result cache to read from and write to
        #[arg(long, value_enum, default_value_t = CacheArg::None)]
        cache: CacheArg,

        /// Maximum concurrent headless browsers
        #[arg(long, env = "QUARRY_MAX_BROWSERS", default_value_t = DEFAULT_MAX_BROWSERS)]
        max_browsers: usize,
    },

    /// Validate the site catalog and list its sites
    Sites {
        /// Path to the site catalog JSON file
        #[arg(long, env = "QUARRY_SITES_PATH", default_value = "config/sites.json")]
        sites: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CacheArg {
    /// Always search live
    None,
    /// PostgreSQL cache (requires DATABASE_URL)
    Postgres,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("quarry=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Search {
            query,
            sites,
            json,
            cache,
            max_browsers,
        } => {
            let query = SearchQuery::new(query)?;
            cmd_search(query, &sites, json, cache, max_browsers).await?;
        }
        Commands::Sites { sites } => {
            cmd_sites(&sites)?;
        }
    }

    Ok(())
}

fn load_catalog(path: &Path) -> Result<SiteCatalog> {
    SiteCatalog::load(path)
        .with_context(|| format!("Failed to load site catalog: {}", path.display()))
}

/// Connect to PostgreSQL, or log and carry on without a cache.
async fn connect_cache() -> Option<(Database, PgResultCache)> {
    let connect = async {
        let db = Database::connect(&DatabaseConfig::from_env()?).await?;
        db.migrate().await?;
        Ok::<_, quarry_core::AppError>(db)
    };

    match connect.await {
        Ok(db) => {
            let cache = db.result_cache();
            Some((db, cache))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Result cache unavailable, continuing without cache");
            None
        }
    }
}

async fn cmd_search(
    query: SearchQuery,
    sites_path: &Path,
    json: bool,
    cache: CacheArg,
    max_browsers: usize,
) -> Result<()> {
    let catalog = Arc::new(load_catalog(sites_path)?);
    let site_count = catalog.len();

    let fetcher = DefaultFetcher::new(
        StaticFetcher::new().context("Failed to create HTTP client")?,
        BrowserFetcher::new(max_browsers),
    );
    let extractor = SelectorExtractor::new();

    let db = match cache {
        CacheArg::None => None,
        CacheArg::Postgres => connect_cache().await,
    };
    let service = match &db {
        Some((_, cache)) => SearchService::with_cache(catalog, fetcher, extractor, cache.clone()),
        None => SearchService::new(catalog, fetcher, extractor),
    };

    let mut stream = service.search(query.clone());
    let mut results = 0usize;
    while let Some(event) = stream.next().await {
        if matches!(event, StreamEvent::Result(_)) {
            results += 1;
        }
        if json {
            println!("{}", event.to_json());
        } else {
            println!("{}", describe(&event, &query, site_count, results));
        }
    }

    if let Some((db, _)) = db {
        db.close().await;
    }
    Ok(())
}

/// One readable line (or two, for a result) per event.
fn describe(event: &StreamEvent, query: &SearchQuery, site_count: usize, results: usize) -> String {
    match event {
        StreamEvent::Searching => format!("Searching {site_count} sites for \"{query}\" ..."),
        StreamEvent::Cached => format!("Cached results for \"{query}\":"),
        StreamEvent::Result(payload) => match payload.decode() {
            Ok(result) => format!(
                "  [{}] {}\n      {}",
                result.site_name, result.result.title, result.result.link
            ),
            Err(_) => format!("  {payload}"),
        },
        StreamEvent::Completed => format!("Done: {results} result(s)"),
    }
}

fn cmd_sites(sites_path: &Path) -> Result<()> {
    let catalog = load_catalog(sites_path)?;

    if catalog.is_empty() {
        println!("No sites configured in {}", sites_path.display());
        return Ok(());
    }

    println!("Sites in {}:\n", sites_path.display());
    for site in catalog.iter() {
        let mode = if site.js_required { "browser" } else { "static" };
        println!("  {:<20} {:<30} [{mode}]", site.id, site.name);
    }
    println!("\nTotal: {} sites", catalog.len());

    Ok(())
}
