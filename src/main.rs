//! docflow - content connector ETL engine.
//!
//! Crawls a content source, transforms each document through a configurable
//! pipeline, and publishes the result to a search index.

use clap::Parser;

use docflow::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.init_tracing()?;
    cli::run(cli).await
}
