use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use serp_scraper_core::config::{build_registry, default_config_path, local_config_path};
use serp_scraper_core::monitoring::{self, Timer};
use serp_scraper_core::output;
use serp_scraper_core::query::{build_search_url, normalize_query};
use serp_scraper_core::{ExtractionPipeline, SourceHint};

mod fetcher;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Json,
    Table,
}

#[derive(Debug, Parser)]
#[command(
    name = "serp-scraper",
    version,
    about = "Parse search engine result pages into ranked results"
)]
struct Cli {
    /// Result page: a URL to fetch or a saved HTML file
    source: Option<String>,

    /// Engine the page was requested from (name or alias)
    #[arg(long)]
    engine: Option<String>,

    /// Search this phrase on --engine instead of reading a source
    #[arg(long)]
    query: Option<String>,

    /// Result page number for --query
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=1000))]
    page: u32,

    /// Original URL of a saved result page
    #[arg(long)]
    url: Option<String>,

    /// Engine configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format: json or table
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// List registered engines and exit
    #[arg(long, default_value_t = false)]
    list_engines: bool,

    /// Debug logging on stderr
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// Serve Prometheus metrics on this port
    #[arg(long)]
    metrics_port: Option<u16>,
}

enum Input {
    Fetch(String),
    File(PathBuf),
}

fn config_path(cli: &Cli) -> PathBuf {
    if let Some(path) = &cli.config {
        return path.clone();
    }
    let user = default_config_path();
    if user.exists() { user } else { local_config_path() }
}

fn is_url(s: &str) -> bool {
    let l = s.to_ascii_lowercase();
    l.starts_with("http://") || l.starts_with("https://")
}

fn search_request(
    pipeline: &ExtractionPipeline,
    engine: &str,
    query: &str,
    page: u32,
) -> Result<(Input, SourceHint)> {
    let parser = pipeline.registry().resolve_by_name(engine)?;
    let normalized = normalize_query(query);
    if normalized.is_empty() {
        anyhow::bail!("empty search phrase");
    }
    let url = build_search_url(parser.identity(), &normalized, page);
    let hint = SourceHint::url(url.clone()).with_engine(parser.name());
    Ok((Input::Fetch(url), hint))
}

fn prompt_search(pipeline: &ExtractionPipeline) -> Result<(String, String)> {
    let names: Vec<String> = pipeline
        .registry()
        .engines()
        .map(|e| e.name.clone())
        .collect();
    let engine = inquire::Select::new("Search engine:", names)
        .prompt()
        .context("engine selection")?;
    let query = inquire::Text::new("Search phrase:")
        .with_placeholder("e.g., rust html parser")
        .prompt()
        .context("search phrase")?;
    Ok((engine, query))
}

fn plan_input(cli: &Cli, pipeline: &ExtractionPipeline) -> Result<(Input, SourceHint)> {
    if let Some(query) = &cli.query {
        let Some(engine) = &cli.engine else {
            anyhow::bail!("--query requires --engine");
        };
        return search_request(pipeline, engine, query, cli.page);
    }

    if let Some(source) = &cli.source {
        if is_url(source) {
            let mut hint = SourceHint::url(source.clone());
            hint.engine = cli.engine.clone();
            return Ok((Input::Fetch(source.clone()), hint));
        }
        if cli.engine.is_none() && cli.url.is_none() {
            anyhow::bail!("a saved result page needs --engine or --url");
        }
        let hint = SourceHint {
            url: cli.url.clone(),
            engine: cli.engine.clone(),
        };
        return Ok((Input::File(PathBuf::from(source)), hint));
    }

    if std::io::stdin().is_terminal() && std::io::stdout().is_terminal() {
        let (engine, query) = prompt_search(pipeline)?;
        return search_request(pipeline, &engine, &query, cli.page);
    }
    anyhow::bail!("no result page given: pass a URL, a file, or --engine with --query")
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    monitoring::init_tracing(cli.debug);
    if let Some(port) = cli.metrics_port {
        monitoring::init_metrics_exporter(port)?;
    }

    let registry = build_registry(&config_path(&cli))?;
    if cli.list_engines {
        for identity in registry.engines() {
            println!(
                "{:<12} {}  {}",
                identity.name, identity.search_url, identity.url_pattern
            );
        }
        return Ok(());
    }
    let pipeline = ExtractionPipeline::new(registry);

    let (input, hint) = plan_input(&cli, &pipeline)?;
    let html = match input {
        Input::Fetch(url) => {
            let client = fetcher::build_http_client()?;
            let timer = Timer::start("fetch");
            let body = fetcher::fetch_page(&client, &url).await?;
            timer.finish();
            body
        }
        Input::File(path) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("read {}", path.display()))?,
    };

    let page = pipeline.process(&html, hint)?;
    monitoring::record_extraction(&page);
    tracing::debug!(engine = %page.engine, records = page.records.len(), "page processed");

    match cli.format {
        OutputFormat::Json => output::print_pretty_json(&page),
        OutputFormat::Table => output::print_table(&page),
    }
    Ok(())
}
