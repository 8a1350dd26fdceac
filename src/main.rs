use std::num::{NonZeroU64, NonZeroUsize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use package_feed::catalog::import::{CatalogFile, import_catalog};
use package_feed::catalog::store::Catalog;
use package_feed::config::{self, Config};
use package_feed::feed::filter::{FilterPolicy, ReleaseFilter};
use package_feed::feed::snapshot::Feeds;
use package_feed::watch::run_refresh_loop;

#[derive(Parser)]
#[command(name = "package-feed")]
#[command(version, about = "Recent packages and releases feeds for a package catalog")]
struct Cli {
    /// Catalog database (defaults to the data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Config file (defaults to config.json in the data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import a JSON catalog document
    Import { file: PathBuf },
    /// Print the recently active packages
    Packages {
        #[command(flatten)]
        limit: LimitArgs,
    },
    /// Print the recent releases
    Releases {
        #[command(flatten)]
        limit: LimitArgs,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Refresh periodically and print the packages feed after every refresh
    Watch {
        #[command(flatten)]
        limit: LimitArgs,
        /// Refresh interval in milliseconds
        #[arg(long)]
        interval_ms: Option<NonZeroU64>,
    },
}

#[derive(Args)]
struct LimitArgs {
    /// Maximum number of entries
    #[arg(long)]
    limit: Option<NonZeroUsize>,
}

impl LimitArgs {
    fn resolve(&self, config: &Config) -> usize {
        self.limit.map_or(config.feed.limit, NonZeroUsize::get)
    }
}

#[derive(Args)]
struct FilterArgs {
    #[arg(long)]
    major: bool,
    #[arg(long)]
    minor: bool,
    #[arg(long)]
    patch: bool,
    #[arg(long)]
    pre: bool,
    /// Release kind token (major, minor, patch, pre); may be repeated
    #[arg(long = "kind")]
    kinds: Vec<String>,
    /// Fail on unrecognized kind tokens instead of selecting everything
    #[arg(long)]
    reject_unknown: bool,
}

impl FilterArgs {
    fn resolve(&self, config: &Config) -> anyhow::Result<ReleaseFilter> {
        let policy = if self.reject_unknown {
            FilterPolicy::Reject
        } else {
            config.feed.filter_policy
        };

        let flags = ReleaseFilter::from_flags(self.major, self.minor, self.patch, self.pre);
        let tokens = ReleaseFilter::parse_all(self.kinds.iter().map(String::as_str), policy)?;
        Ok(flags | tokens)
    }
}

fn init_logging() -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    let data_dir = config::data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let appender = tracing_appender::rolling::never(&data_dir, config::LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}

fn print_entries<T: Serialize>(entries: &[T]) -> anyhow::Result<()> {
    if entries.is_empty() {
        info!("No entries matched");
        eprintln!("No entries matched");
    }
    println!("{}", serde_json::to_string_pretty(entries)?);
    Ok(())
}

fn load_feeds(catalog: Catalog) -> anyhow::Result<Feeds<Catalog>> {
    let feeds = Feeds::new(catalog);
    feeds.refresh().context("failed to load catalog snapshot")?;
    Ok(feeds)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging()?;

    let config_path = cli.config.unwrap_or_else(config::config_path);
    let config = Config::load(&config_path)?;
    let catalog = Catalog::new(&cli.db.unwrap_or_else(config::db_path))?;

    match cli.command {
        Command::Import { file } => {
            let contents = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let document: CatalogFile = serde_json::from_str(&contents)
                .with_context(|| format!("invalid catalog document {}", file.display()))?;
            let summary = import_catalog(&catalog, &document)?;
            eprintln!(
                "Imported {} packages with {} versions ({} skipped)",
                summary.packages, summary.versions, summary.skipped_versions
            );
            Ok(())
        }
        Command::Packages { limit } => {
            let feeds = load_feeds(catalog)?;
            print_entries(&feeds.recent_packages(limit.resolve(&config)))
        }
        Command::Releases { limit, filter } => {
            let filter = filter.resolve(&config)?;
            let feeds = load_feeds(catalog)?;
            print_entries(&feeds.recent_releases(limit.resolve(&config), &filter))
        }
        Command::Watch { limit, interval_ms } => {
            let limit = limit.resolve(&config);
            let interval_ms = interval_ms.map_or(config.refresh.interval, NonZeroU64::get);
            let period = Duration::from_millis(interval_ms);
            let feeds = Arc::new(Feeds::new(catalog));

            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?
                .block_on(async {
                    let shutdown = async {
                        if let Err(e) = tokio::signal::ctrl_c().await {
                            error!("Failed to listen for shutdown signal: {}", e);
                        }
                    };
                    let printer = Arc::clone(&feeds);
                    run_refresh_loop(Arc::clone(&feeds), period, shutdown, |_| {
                        if let Err(e) = print_entries(&printer.recent_packages(limit)) {
                            error!("Failed to print packages feed: {}", e);
                        }
                    })
                    .await;
                });
            Ok(())
        }
    }
}
