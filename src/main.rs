//! # Isranews Scraper
//!
//! Crawls category listings on isranews.org, extracts the full text and
//! metadata of every article found, and keeps one dataset per output file
//! that grows across runs.
//!
//! ## Features
//!
//! - Five built-in categories, custom `article/...` paths, or a YAML site file
//! - Page ranges, crawl-until-empty, and a "published since" filter
//! - Concurrent article extraction with retry and backoff
//! - Checkpoints so an interrupted run can resume without re-fetching
//! - Exports to CSV (UTF-8 BOM), Excel, JSON or plain text, merged with the
//!   previous export so articles are never lost or duplicated
//! - Plain HTTP fetching, or rendering through a Browserless service
//!
//! ## Usage
//!
//! ```sh
//! isranews_scraper -c all -s 1 -e 3 -f csv -o isranews
//! ```
//!
//! ## Architecture
//!
//! 1. **Prior state**: load the previous export and, if resuming, the checkpoint
//! 2. **Listing**: walk each category's pages and collect article stubs
//! 3. **Content**: fetch every article still missing its body (parallel)
//! 4. **Output**: recompute dates and write the merged dataset

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod checkpoint;
mod cli;
mod config;
mod dates;
mod error;
mod merge;
mod models;
mod outputs;
mod pipeline;
mod render;
mod scrapers;
mod utils;

use checkpoint::CheckpointStore;
use cli::{Cli, Prompter};
use pipeline::Pipeline;
use render::{BrowserlessRenderer, HttpRenderer, Renderer};
use utils::ensure_parent_writable;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("isranews_scraper starting up");

    let args = Cli::parse();
    debug!(?args.categories, ?args.format, ?args.output, "Parsed CLI arguments");

    // ---- Resolve configuration before touching the network ----
    let mut prompter = Prompter::stdio(args.interactive());
    let site = args.site()?;
    let base = site.base()?;
    let config = args.crawl_config(&site, &mut prompter)?;
    info!(
        categories = ?config.categories,
        start = config.start_page,
        end = config.end_page,
        filter_date = ?config.filter_date,
        format = %config.format,
        workers = config.max_workers,
        "Configuration resolved"
    );

    let output = config.output_path();
    if let Err(e) = ensure_parent_writable(&output).await {
        error!(
            path = %output.display(),
            error = %e,
            "Output location is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let resume = if CheckpointStore::new(&config.checkpoint_path).exists().await {
        args.resume_checkpoint(&mut prompter)
    } else {
        false
    };

    // ---- Renderer ----
    let renderer = match args.browserless_url.as_deref() {
        Some(url) => {
            let browserless = BrowserlessRenderer::new(url, args.browserless_token.as_deref())?;
            info!(?browserless, "Rendering pages through Browserless");
            Renderer::Browserless(browserless)
        }
        None => Renderer::Http(HttpRenderer::new()?),
    };

    // ---- Run ----
    let pipeline = Pipeline::new(config, base, renderer);
    let summary = match pipeline.run(resume).await {
        Ok(summary) => summary,
        Err(e) => {
            error!(
                error = %e,
                checkpoint = %pipeline.checkpoint().path().display(),
                "Run failed; progress so far is in the checkpoint"
            );
            return Err(e.into());
        }
    };

    println!(
        "Saved {} articles ({} new, {} enriched, {} failed) to {}",
        summary.total,
        summary.discovered,
        summary.enrich.enriched,
        summary.enrich.failed,
        summary.output.display()
    );

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        format = %pipeline.config().format,
        "Execution complete"
    );

    Ok(())
}
