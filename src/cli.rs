//! Command-line entry point (spec §10.4): parses arguments, loads
//! configuration, wires the reference collaborators, and drives one
//! orchestrator run.
//!
//! `task` names a crawl type (`full`, `incremental`, or `all` to run both
//! in sequence) — this crate's single configured content source is the
//! "task" the spec's CLI surface addresses; a multi-connector task
//! registry is out of scope (see DESIGN.md).

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{Config, Settings};
use crate::extract::{Extractor, FilesystemExtractor, WebExtractor};
use crate::external::{InMemoryIndex, InferContentDetector};
use crate::orchestrator::{CrawlReport, Orchestrator};
use crate::queue::CrawlQueue;

#[derive(Parser, Debug)]
#[command(name = "docflow", version, about = "Content connector ETL engine")]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short = 'c', long, env = "DOCFLOW_CONFIG", default_value = "docflow.toml")]
    pub cfgfile: PathBuf,

    /// Write logs to this file instead of stdout.
    #[arg(long)]
    pub logfile: Option<PathBuf>,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a crawl to completion: extract, transform, publish.
    Run {
        #[arg(value_enum, default_value_t = TaskArg::All)]
        task: TaskArg,
        /// RFC3339 timestamp; only files modified after this are extracted.
        /// Meaningful only for `incremental`.
        #[arg(long)]
        since: Option<String>,
    },
    /// Walk the content source and validate the transformer pipeline
    /// without writing to disk or publishing.
    Test {
        #[arg(value_enum, default_value_t = TaskArg::All)]
        task: TaskArg,
    },
    /// Release a stale lock and discard any in-progress crawl state.
    Reset,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum TaskArg {
    Full,
    Incremental,
    All,
}

impl Cli {
    pub fn is_verbose(&self) -> bool {
        self.verbose > 0
    }

    pub fn default_filter(&self) -> &'static str {
        if self.is_verbose() {
            "docflow=debug"
        } else {
            "docflow=info"
        }
    }

    /// Initializes the global tracing subscriber: `EnvFilter` seeded from
    /// `default_filter()` unless `RUST_LOG` is set, writing to `--logfile`
    /// when given, stdout otherwise.
    pub fn init_tracing(&self) -> anyhow::Result<()> {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| self.default_filter().into());

        match &self.logfile {
            Some(path) => {
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)?;
                tracing_subscriber::registry()
                    .with(filter)
                    .with(tracing_subscriber::fmt::layer().with_writer(std::sync::Mutex::new(file)))
                    .init();
            }
            None => {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(tracing_subscriber::fmt::layer())
                    .init();
            }
        }
        Ok(())
    }
}

fn crawl_types_for(task: TaskArg) -> Vec<crate::queue::CrawlType> {
    use crate::queue::CrawlType;
    match task {
        TaskArg::Full => vec![CrawlType::Full],
        TaskArg::Incremental => vec![CrawlType::Incremental],
        TaskArg::All => vec![CrawlType::Full, CrawlType::Incremental],
    }
}

fn build_extractor(settings: &Settings) -> Arc<dyn Extractor> {
    let root = settings.extract.root.to_string_lossy();
    if root.starts_with("http://") || root.starts_with("https://") {
        Arc::new(WebExtractor::new())
    } else {
        Arc::new(FilesystemExtractor::new())
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load_from_path(&cli.cfgfile)?;
    config.validate()?;
    let settings = Arc::new(Settings::from_config(config));

    let queue = Arc::new(CrawlQueue::new(&settings.base_dir));
    let index: Arc<InMemoryIndex> = Arc::new(InMemoryIndex::new());
    let detector = Arc::new(InferContentDetector::new());
    let extractor = build_extractor(&settings);

    install_signal_handler(queue.clone());

    match cli.command {
        Command::Run { task, since } => {
            let since = parse_since(since.as_deref())?;
            for crawl_type in crawl_types_for(task) {
                let orchestrator = Orchestrator::new(
                    settings.clone(),
                    queue.clone(),
                    index.clone(),
                    detector.clone(),
                    extractor.clone(),
                );
                let report = orchestrator.run_crawl(crawl_type, since).await?;
                log_report(&report);
            }
        }
        Command::Test { task } => {
            let mut validation_settings = (*settings).clone();
            validation_settings.extract.validation_only = true;
            let validation_settings = Arc::new(validation_settings);
            for crawl_type in crawl_types_for(task) {
                let orchestrator = Orchestrator::new(
                    validation_settings.clone(),
                    queue.clone(),
                    index.clone(),
                    detector.clone(),
                    extractor.clone(),
                );
                let report = orchestrator.run_crawl(crawl_type, None).await?;
                log_report(&report);
            }
        }
        Command::Reset => {
            queue.reset()?;
            tracing::info!("queue reset");
        }
    }

    Ok(())
}

fn log_report(report: &CrawlReport) {
    tracing::info!(
        state = ?report.state,
        extracted = report.extracted,
        published = report.published,
        deferred = report.deferred,
        "crawl finished"
    );
}

fn parse_since(value: Option<&str>) -> anyhow::Result<Option<DateTime<Utc>>> {
    match value {
        Some(s) => Ok(Some(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))),
        None => Ok(None),
    }
}

/// Ctrl-C/SIGTERM trigger cooperative cancellation: every phase worker
/// checks `CrawlQueue::is_shutting_down` between documents and winds down
/// without losing on-disk queue state.
fn install_signal_handler(queue: Arc<CrawlQueue>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("shutdown signal received, draining in-flight work");
            queue.request_shutdown();
        }
    });
}
