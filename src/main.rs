use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use resgraph::config::Config;
use resgraph::{Client, Document, IdentityMap, ModelRegistry, Query, ResourceFilter, SortKey};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{self, Rotation};
use tracing_subscriber::EnvFilter;

/// Fetch a paginated resource collection and summarize the resulting graph
#[derive(Parser, Debug)]
#[command(name = "resgraph", version, about, long_about = None)]
struct Args {
    /// Collection path, relative to the base URL
    path: String,

    /// API root (overrides the config file)
    #[arg(short, long)]
    base_url: Option<String>,

    /// Bearer token (overrides the config file)
    #[arg(long, env = "RESGRAPH_TOKEN")]
    token: Option<String>,

    /// Resource types to accept; repeat for each type in the response
    #[arg(short = 't', long = "type", required = true)]
    types: Vec<String>,

    /// Page size
    #[arg(short, long)]
    limit: Option<u64>,

    /// Print each page as it arrives instead of fetching all pages at once
    #[arg(short, long)]
    incremental: bool,

    /// Relationship paths to side-load
    #[arg(long)]
    include: Vec<String>,

    /// Filters as field=value[,value...]
    #[arg(short, long)]
    filter: Vec<String>,

    /// Sort fields; prefix with '-' for descending
    #[arg(short, long)]
    sort: Vec<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,
}

/// Environment variable holding a full filter, e.g. `resgraph=debug,reqwest=info`
const LOG_FILTER_ENV: &str = "RESGRAPH_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Filter directive scoped to this crate, `None` when logging is off
    fn directive(self) -> Option<String> {
        let level = match self {
            LogLevel::Off => return None,
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        Some(format!("resgraph={}", level))
    }
}

/// Filter from `RESGRAPH_LOG`, else from `--log-level`
fn log_filter(level: LogLevel, env: Option<&str>) -> Result<Option<EnvFilter>> {
    match (env, level.directive()) {
        (Some(spec), _) => EnvFilter::try_new(spec)
            .map(Some)
            .with_context(|| format!("Invalid {} filter '{}'", LOG_FILTER_ENV, spec)),
        (None, Some(directive)) => Ok(Some(EnvFilter::new(directive))),
        (None, None) => Ok(None),
    }
}

/// Log to `resgraph.log` in the config directory. The returned guard flushes
/// the writer on drop.
fn init_file_logging(level: LogLevel) -> Result<Option<WorkerGuard>> {
    let env = std::env::var(LOG_FILTER_ENV).ok();
    let Some(filter) = log_filter(level, env.as_deref())? else {
        return Ok(None);
    };

    let dir = Config::dir().unwrap_or_else(|| PathBuf::from("."));
    let appender = rolling::Builder::new()
        .rotation(Rotation::NEVER)
        .filename_prefix("resgraph")
        .filename_suffix("log")
        .build(&dir)
        .with_context(|| format!("Failed to open log file in {}", dir.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!(dir = %dir.display(), version = env!("CARGO_PKG_VERSION"), "logging started");
    Ok(Some(guard))
}

fn build_query(args: &Args) -> Result<Query> {
    let mut query = Query::new();
    for spec in &args.filter {
        let Some(filter) = ResourceFilter::parse(spec) else {
            bail!("Invalid filter '{}', expected field=value", spec);
        };
        query = query.with_filter(filter);
    }
    for field in &args.sort {
        query = query.sort(match field.strip_prefix('-') {
            Some(field) => SortKey::Desc(field.to_string()),
            None => SortKey::Asc(field.clone()),
        });
    }
    for path in &args.include {
        query = query.include(path);
    }
    Ok(query)
}

fn describe_page(page: &Document) -> String {
    match page.pagination() {
        Some(p) => format!(
            "{} resources ({}..{} of {})",
            page.len(),
            p.offset,
            p.offset + page.len() as u64,
            p.count
        ),
        None => format!("{} resources (unpaginated)", page.len()),
    }
}

fn print_summary(document: &Document, map: &IdentityMap) {
    println!("{} resources in collection", document.len());

    let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
    for resource_type in map.types() {
        by_type.insert(resource_type, map.get_all_of_type(resource_type).len());
    }
    for (resource_type, count) in by_type {
        println!("  {:<24} {}", resource_type, count);
    }

    let dangling = document.dangling_references(map);
    if !dangling.is_empty() {
        println!("{} unresolved references:", dangling.len());
        for reference in dangling {
            println!("  {}", reference);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _guard = init_file_logging(args.log_level)?;

    let config = Config::load();
    let Some(base_url) = config.effective_base_url(args.base_url.as_deref()) else {
        bail!("No base URL given; pass --base-url or set base_url in the config file");
    };
    let token = config.effective_token(args.token.as_deref());

    let mut registry = ModelRegistry::new();
    for resource_type in &args.types {
        registry.register_record::<Value>(resource_type);
    }

    let client = Client::http(
        Arc::new(registry),
        &base_url,
        token.as_deref(),
        &config.effective_user_agent(),
    )?
    .with_page_limit(config.effective_page_limit(args.limit));
    let query = build_query(&args)?;

    let mut map = match config.cache_ttl() {
        Some(ttl) => IdentityMap::with_ttl(ttl),
        None => IdentityMap::new(),
    };

    let document = if args.incremental {
        let mut pages = 0;
        let document = client
            .get_all_incremental(&args.path, &query)?
            .run(|page| {
                pages += 1;
                println!("page {}: {}", pages, describe_page(page));
                map.deposit(page);
            })
            .await?;
        println!("done: {} pages", pages);
        document
    } else {
        client.get_all_into(&args.path, &query, &mut map).await?
    };

    print_summary(&document, &map);
    Ok(())
}
