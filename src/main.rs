use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{Attribute, Cell, Table};
use research_federation::config::{self, Config};
use research_federation::models::{NormalizedSource, QueryType, SearchQuery, SearchResult};
use research_federation::utils::ApiMetrics;
use research_federation::{Fetcher, FetcherConfig, ProviderClient, ProviderRegistry};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Research Federation - search many academic databases at once
#[derive(Parser, Debug)]
#[command(name = "research-federation")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Federated search across academic databases", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, global = true, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

/// What the query string is matched against
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum QueryKind {
    Title,
    Author,
    Doi,
    Keyword,
    Identifier,
}

impl From<QueryKind> for QueryType {
    fn from(kind: QueryKind) -> Self {
        match kind {
            QueryKind::Title => QueryType::Title,
            QueryKind::Author => QueryType::Author,
            QueryKind::Doi => QueryType::Doi,
            QueryKind::Keyword => QueryType::Keyword,
            QueryKind::Identifier => QueryType::Identifier,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search every selected provider and print the merged results
    #[command(alias = "s")]
    Search {
        /// Search query string
        query: String,

        /// Query type
        #[arg(long = "type", short = 't', value_enum, default_value_t = QueryKind::Keyword)]
        query_type: QueryKind,

        /// Maximum number of results
        #[arg(long, short, default_value_t = 20)]
        limit: usize,

        /// Result offset (carried in the query, not forwarded to providers)
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Only use these providers (comma-separated)
        #[arg(long, value_delimiter = ',')]
        prefer: Vec<String>,

        /// Never use these providers (comma-separated)
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,

        /// Providers queried concurrently per batch
        #[arg(long)]
        parallel: Option<usize>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,

        /// Print per-provider request metrics afterwards
        #[arg(long)]
        stats: bool,
    },

    /// List registered providers
    #[command(alias = "p")]
    Providers,

    /// Print the effective configuration as TOML
    Config,
}

fn init_tracing(cli: &Cli) {
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("research_federation={}", level)),
    );

    let registry = tracing_subscriber::registry().with(filter);
    match cli.log_format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let config = config::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Search {
            query,
            query_type,
            limit,
            offset,
            prefer,
            exclude,
            parallel,
            json,
            stats,
        } => {
            let mut fetcher_config = FetcherConfig::from(&config.fetcher);
            if !prefer.is_empty() {
                fetcher_config = fetcher_config.preferred_apis(prefer);
            }
            if !exclude.is_empty() {
                fetcher_config = fetcher_config.excluded_apis(exclude);
            }
            if let Some(parallel) = parallel {
                fetcher_config = fetcher_config.max_parallel_requests(parallel);
            }

            let registry = ProviderRegistry::from_config(&config)?;
            let fetcher = Fetcher::new(registry, fetcher_config);
            let search_query = SearchQuery::new(query)
                .query_type(query_type.into())
                .limit(limit)
                .offset(offset);

            let result = fetcher.search(&search_query).await;
            let metrics = fetcher.metrics();

            if json {
                let mut output = serde_json::to_value(&result)?;
                if stats {
                    let mut by_provider = serde_json::Map::new();
                    for (name, m) in &metrics {
                        by_provider.insert(name.clone(), serde_json::to_value(m)?);
                    }
                    output["metrics"] = serde_json::Value::Object(by_provider);
                }
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                print_result(&result);
                if stats {
                    print_metrics(&metrics);
                }
            }
        }

        Commands::Providers => {
            let registry = ProviderRegistry::from_config(&config)?;
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["Name", "Provider", "Caps", "Req/s", "Timeout", "Retries"]);

            for client in registry.all() {
                let api = client.config();
                let rps = if api.rate_limit.min_interval().is_some() {
                    format!("{:.2}", api.rate_limit.requests_per_second)
                } else {
                    "unlimited".to_string()
                };
                table.add_row(vec![
                    Cell::new(client.name()).add_attribute(Attribute::Bold),
                    Cell::new(client.display_name()),
                    Cell::new(client.capabilities().short()),
                    Cell::new(rps),
                    Cell::new(format!("{}s", api.timeout.as_secs())),
                    Cell::new(api.retry.max_retries),
                ]);
            }
            println!("{table}");
        }

        Commands::Config => {
            print!("{}", config.redacted().to_toml()?);
        }
    }

    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

fn print_result(result: &SearchResult) {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Title", "Authors", "Year", "DOI", "Source", "Score"]);

    for source in &result.sources {
        table.add_row(source_row(source));
    }
    println!("{table}");
    println!(
        "{} of {} unique results from {} providers in {} ms",
        result.sources.len(),
        result.total_results,
        result.apis.len(),
        result.search_time
    );
}

fn source_row(source: &NormalizedSource) -> Vec<Cell> {
    vec![
        Cell::new(truncate(&source.title, 60)).add_attribute(Attribute::Bold),
        Cell::new(truncate(&source.author_names(), 30)),
        Cell::new(
            source
                .publication_year
                .map(|y| y.to_string())
                .unwrap_or_default(),
        ),
        Cell::new(source.doi.as_deref().unwrap_or("")),
        Cell::new(&source.source_api),
        Cell::new(format!("{:.2}", source.completeness)),
    ]
}

fn print_metrics(metrics: &[(String, ApiMetrics)]) {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Provider", "Requests", "OK", "Failed", "Avg ms", "Last error"]);

    for (name, m) in metrics.iter().filter(|(_, m)| m.total_requests > 0) {
        table.add_row(vec![
            Cell::new(name),
            Cell::new(m.total_requests),
            Cell::new(m.successful_requests),
            Cell::new(m.failed_requests),
            Cell::new(format!("{:.0}", m.average_response_time_ms)),
            Cell::new(truncate(m.last_error.as_deref().unwrap_or(""), 40)),
        ]);
    }
    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_search_args() {
        let cli = Cli::parse_from([
            "research-federation",
            "search",
            "crispr",
            "--type",
            "title",
            "--prefer",
            "crossref,openalex",
            "--parallel",
            "2",
            "-vv",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Search {
                query,
                query_type,
                prefer,
                parallel,
                limit,
                ..
            } => {
                assert_eq!(query, "crispr");
                assert_eq!(QueryType::from(query_type), QueryType::Title);
                assert_eq!(prefer, vec!["crossref", "openalex"]);
                assert_eq!(parallel, Some(2));
                assert_eq!(limit, 20);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééééééééé", 6), "ééé...");
    }

    #[test]
    fn test_default_config_renders() {
        let toml = Config::default().redacted().to_toml().unwrap();
        assert!(toml.contains("max_parallel_requests"));
    }
}
