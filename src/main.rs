//! Harvest main entry point
//!
//! This is the command-line interface for the `crawl` binary.

use anyhow::{bail, Context};
use clap::Parser;
use harvest::config::{
    compute_rules_hash, load_config, load_rules, load_seeds, validate_crawler_config,
    validate_seeds, Config, OutputFormat,
};
use harvest::crawler::{Engine, Extractor};
use harvest::output::{open_sink, print_summary};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Harvest: crawl pages and extract records with declarative selector rules
///
/// Starting from the seed URLs, every page is matched against the rule set;
/// each item block becomes one record and link rules feed further pages into
/// the crawl. Records are written as JSON Lines (stdout by default) or to a
/// SQLite database.
#[derive(Parser, Debug)]
#[command(name = "crawl")]
#[command(version)]
#[command(about = "A concurrent crawl-and-extract engine", long_about = None)]
struct Cli {
    /// Seed URL, or a file with one URL per line (repeatable)
    #[arg(long = "seed", value_name = "URL|FILE", num_args = 1..)]
    seeds: Vec<String>,

    /// Path to a TOML rules file (`item` plus `[[rule]]` tables)
    #[arg(long, value_name = "PATH")]
    rules: Option<PathBuf>,

    /// Path to a TOML configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Maximum number of fetches in flight
    #[arg(long, value_name = "N")]
    concurrency: Option<usize>,

    /// Output file (JSON Lines goes to stdout when omitted)
    #[arg(long, value_name = "PATH")]
    output: Option<String>,

    /// Output format
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Retries per URL for timeouts, refused connections, 429 and 5xx
    #[arg(long, value_name = "N")]
    retries: Option<u32>,

    /// Minimum delay between requests to the same host
    #[arg(long, value_name = "MS")]
    delay_ms: Option<u64>,

    /// Per-request timeout
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Do not follow links deeper than this (seeds are depth 0)
    #[arg(long, value_name = "N")]
    max_depth: Option<u32>,

    /// Validate configuration and rules, print the plan, and exit
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;

    let mut seeds = config.seeds.clone();
    seeds.extend(load_seeds(&cli.seeds).context("Failed to read seed list")?);
    validate_seeds(&seeds)?;

    let rules_hash = compute_rules_hash(&config.rules);
    tracing::info!(
        "Loaded {} rules (hash: {})",
        config.rules.rules.len(),
        rules_hash
    );

    if cli.dry_run {
        // Compile selectors so a dry run catches the same errors a real run would
        Extractor::new(&config.rules)?;
        print_plan(&config, &seeds, &rules_hash);
        return Ok(());
    }

    let engine = Engine::from_config(&config)?;

    let stop = engine.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping crawl");
            stop.stop();
        }
    });

    let sink = open_sink(&config.output, &rules_hash)
        .await
        .context("Failed to open output")?;

    let summary = match engine.run(&seeds, sink).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    if !cli.quiet {
        print_summary(&summary);
    }

    Ok(())
}

/// Loads the config file (if any), merges the rules file and applies CLI overrides
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(path) = &cli.rules {
        config.rules = load_rules(path)
            .with_context(|| format!("Failed to load rules {}", path.display()))?;
    }
    if config.rules.rules.is_empty() {
        bail!("No extraction rules: pass --rules or add [[rule]] tables to the config");
    }

    let crawler = &mut config.crawler;
    if let Some(n) = cli.concurrency {
        crawler.concurrency = n;
    }
    if let Some(n) = cli.retries {
        crawler.max_retries = n;
    }
    if let Some(ms) = cli.delay_ms {
        crawler.politeness_delay_ms = ms;
    }
    if let Some(secs) = cli.timeout_secs {
        crawler.request_timeout_secs = secs;
    }
    if let Some(depth) = cli.max_depth {
        crawler.max_depth = Some(depth);
    }
    validate_crawler_config(crawler)?;

    if let Some(path) = &cli.output {
        config.output.path = Some(path.clone());
    }
    if let Some(format) = cli.format {
        config.output.format = format;
    }

    Ok(config)
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG` takes precedence over the flags when set.
fn setup_logging(verbose: u8, quiet: bool) {
    let default = if quiet {
        "error"
    } else {
        match verbose {
            0 => "harvest=info,warn",
            1 => "harvest=debug,info",
            2 => "harvest=trace,debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Prints what a crawl would do
fn print_plan(config: &Config, seeds: &[String], rules_hash: &str) {
    let crawler = &config.crawler;

    println!("=== Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Concurrency: {}", crawler.concurrency);
    println!("  Politeness delay: {}ms", crawler.politeness_delay_ms);
    println!("  Request timeout: {}s", crawler.request_timeout_secs);
    println!("  Retries: {}", crawler.max_retries);
    match crawler.max_depth {
        Some(depth) => println!("  Max depth: {}", depth),
        None => println!("  Max depth: unlimited"),
    }
    println!("  Follow links: {}", crawler.follow_links);
    println!("  Respect robots.txt: {}", crawler.respect_robots);
    if !crawler.allowed_domains.is_empty() {
        println!("  Allowed domains: {}", crawler.allowed_domains.join(", "));
    }

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Format: {:?}", config.output.format);
    println!(
        "  Destination: {}",
        config.output.path.as_deref().unwrap_or("stdout")
    );

    println!("\nRules ({}, hash {}):", config.rules.rules.len(), rules_hash);
    if let Some(item) = &config.rules.item {
        println!("  item: {}", item);
    }
    for rule in &config.rules.rules {
        let kind = if rule.is_link { "link" } else { "field" };
        println!(
            "  - {} [{} {:?}] {}",
            rule.name, kind, rule.multiplicity, rule.selector
        );
    }

    println!("\nSeeds ({}):", seeds.len());
    for seed in seeds {
        println!("  * {}", seed);
    }

    println!("\n✓ Configuration is valid");
}
