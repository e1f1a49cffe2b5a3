//! pagetrace command line
//!
//! Crawls one site with headless Chromium and writes every captured
//! request/response pair to a JSON log.

use anyhow::Context;
use clap::{CommandFactory, Parser, ValueEnum};
use pagetrace::browser::BrowserConfig;
use pagetrace::crawl::{CrawlConfig, OutputFormat, ScopePolicy};
use std::path::PathBuf;
use std::time::Duration;

/// Log file framing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Pretty-printed JSON array written when the crawl ends
    Json,
    /// One JSON object per line, flushed as pages are drained
    Jsonl,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => OutputFormat::Json,
            Format::Jsonl => OutputFormat::JsonLines,
        }
    }
}

/// Depth-bounded crawler that records the network traffic of every page
#[derive(Parser, Debug)]
#[command(name = "pagetrace")]
#[command(version)]
#[command(about = "Crawl a site with headless Chromium and log its network traffic")]
struct Args {
    /// Target URL to crawl (e.g. http://example.com)
    #[arg(long)]
    url: Option<String>,

    /// Maximum crawl depth
    #[arg(long, default_value_t = 3)]
    depth: usize,

    /// Navigation timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Log file to create
    #[arg(short, long, default_value = "logs.json")]
    output: PathBuf,

    /// Log file framing
    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// Only follow the exact host and its dot-separated subdomains
    #[arg(long)]
    strict_scope: bool,

    /// Stop after navigating this many pages
    #[arg(long)]
    max_pages: Option<usize>,

    /// Path to Chrome/Chromium executable
    #[arg(long)]
    chrome_path: Option<String>,

    /// Show the browser window
    #[arg(long)]
    headful: bool,

    /// Launch Chromium without its sandbox
    #[arg(long)]
    no_sandbox: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn crawl_config(&self, target: String) -> CrawlConfig {
        let scope = if self.strict_scope {
            ScopePolicy::Subdomain
        } else {
            ScopePolicy::Suffix
        };

        let mut builder = CrawlConfig::builder(target)
            .max_depth(self.depth)
            .timeout(Duration::from_secs(self.timeout))
            .scope(scope)
            .output(self.output.clone())
            .format(self.format.into());
        if let Some(pages) = self.max_pages {
            builder = builder.max_pages(pages);
        }
        builder.build()
    }

    fn browser_config(&self) -> BrowserConfig {
        let mut builder = BrowserConfig::builder()
            .headless(!self.headful)
            .sandbox(!self.no_sandbox);
        if let Some(ref path) = self.chrome_path {
            builder = builder.chrome_path(path.clone());
        }
        builder.build()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let Some(target) = args.url.clone() else {
        Args::command().print_help()?;
        return Ok(());
    };

    let output = args.output.display().to_string();
    let summary = pagetrace::run(args.crawl_config(target), args.browser_config())
        .await
        .context("crawl aborted")?;

    tracing::info!(
        "Logs have been written to {} ({} records)",
        output,
        summary.records_written
    );
    Ok(())
}
