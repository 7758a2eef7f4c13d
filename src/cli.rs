//! Command-line interface definitions for the Isranews scraper.
//!
//! Every run setting can come from a flag. Settings left unset are asked for
//! interactively when stdin is a terminal (and `--no-input` is absent), and
//! otherwise fall back to defaults: first page 1, last page 1, csv output
//! named `isranews`.

use crate::config::{
    CrawlConfig, DEFAULT_CHECKPOINT, DEFAULT_MAX_WORKERS, DEFAULT_OUTPUT_BASE, ExportFormat,
    Pacing, SiteConfig,
};
use crate::dates::parse_filter_date;
use crate::error::ConfigError;
use clap::Parser;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;

/// Command-line arguments for the Isranews scraper.
///
/// # Examples
///
/// ```sh
/// # Every category, pages 1-3, Excel output
/// isranews_scraper -c all -s 1 -e 3 -f excel -o isranews_news
///
/// # Two categories until their listings run out, only news since 1 Jan 2567
/// isranews_scraper -c "1,ศูนย์ข่าวสืบสวน" -e 0 -d 2567-01-01 --no-input
///
/// # Render through a headless browser service
/// BROWSERLESS_URL=http://localhost:3000 isranews_scraper -c all
/// ```
#[derive(Parser, Debug, Default)]
#[command(author, version, about)]
pub struct Cli {
    /// Categories: `all`, names, 1-based numbers or `article/...` paths, comma-separated
    #[arg(short, long)]
    pub categories: Option<String>,

    /// First listing page
    #[arg(short, long)]
    pub start: Option<u32>,

    /// Last listing page (0 = until a page has no articles)
    #[arg(short, long)]
    pub end: Option<u32>,

    /// Only keep listings on or after this date (YYYY-MM-DD, Buddhist years accepted)
    #[arg(short, long)]
    pub date: Option<String>,

    /// Export format: csv, excel, json or txt
    #[arg(short, long)]
    pub format: Option<String>,

    /// Output file name without extension
    #[arg(short, long)]
    pub output: Option<String>,

    /// Maximum concurrent page renders
    #[arg(long, alias = "max-threads", default_value_t = DEFAULT_MAX_WORKERS)]
    pub max_workers: usize,

    /// Checkpoint file for resuming interrupted runs
    #[arg(long, default_value = DEFAULT_CHECKPOINT)]
    pub checkpoint: PathBuf,

    /// Resume from an existing checkpoint without asking
    #[arg(long, conflicts_with = "fresh")]
    pub resume: bool,

    /// Discard an existing checkpoint without asking
    #[arg(long)]
    pub fresh: bool,

    /// YAML file describing the site (base URL and category table)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Browserless endpoint for rendering pages in a headless browser
    #[arg(long, env = "BROWSERLESS_URL")]
    pub browserless_url: Option<String>,

    /// Browserless API token
    #[arg(long, env = "BROWSERLESS_TOKEN", hide_env_values = true)]
    pub browserless_token: Option<String>,

    /// Never prompt; use defaults for anything unset
    #[arg(long)]
    pub no_input: bool,
}

impl Cli {
    /// Whether prompts may be shown.
    pub fn interactive(&self) -> bool {
        !self.no_input && io::stdin().is_terminal()
    }

    /// The site description: the `--config` file or the built-in table.
    pub fn site(&self) -> Result<SiteConfig, ConfigError> {
        match &self.config {
            Some(path) => SiteConfig::from_yaml_file(path),
            None => Ok(SiteConfig::default()),
        }
    }

    /// Build the run configuration, prompting for anything unset.
    pub fn crawl_config<R: BufRead, W: Write>(
        &self,
        site: &SiteConfig,
        prompter: &mut Prompter<R, W>,
    ) -> Result<CrawlConfig, ConfigError> {
        let selection = match &self.categories {
            Some(s) => s.clone(),
            None => prompter.categories(site).unwrap_or_else(|| "1".to_string()),
        };
        let categories = site.resolve_categories(&selection);

        let start_page = match self.start {
            Some(n) => n,
            None => prompter.number("First page (default 1): ").unwrap_or(1),
        };
        let end_page = match self.end {
            Some(n) => n,
            None => prompter
                .number("Last page (0 = until the end, default 1): ")
                .unwrap_or(1),
        };

        let filter_date = match &self.date {
            Some(d) => parse_filter_date(d)?,
            None => None,
        };

        let format = match &self.format {
            Some(f) => f.parse()?,
            None => prompter.format().unwrap_or(ExportFormat::Csv),
        };

        let output_base = match &self.output {
            Some(o) if !o.trim().is_empty() => o.trim().to_string(),
            _ => prompter
                .line(&format!("Output file name (default {DEFAULT_OUTPUT_BASE}): "))
                .unwrap_or_else(|| DEFAULT_OUTPUT_BASE.to_string()),
        };

        CrawlConfig {
            categories,
            start_page,
            end_page,
            filter_date,
            max_workers: self.max_workers,
            format,
            output_base,
            checkpoint_path: self.checkpoint.clone(),
            pacing: Pacing::default(),
        }
        .validate()
    }

    /// Whether to resume an existing checkpoint.
    pub fn resume_checkpoint<R: BufRead, W: Write>(&self, prompter: &mut Prompter<R, W>) -> bool {
        if self.resume {
            return true;
        }
        if self.fresh {
            return false;
        }
        prompter
            .line("A checkpoint from an unfinished run exists. Resume it? [Y/n]: ")
            .map(|answer| !answer.to_lowercase().starts_with('n'))
            .unwrap_or(true)
    }
}

/// Asks questions on a line-based terminal.
///
/// A disabled prompter, a blank answer, or end of input all mean "use the
/// default" and return `None`.
pub struct Prompter<R, W> {
    input: R,
    output: W,
    enabled: bool,
}

impl Prompter<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio(enabled: bool) -> Self {
        Self::new(io::stdin().lock(), io::stdout(), enabled)
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W, enabled: bool) -> Self {
        Self {
            input,
            output,
            enabled,
        }
    }

    /// Trimmed answer to `question`.
    pub fn line(&mut self, question: &str) -> Option<String> {
        if !self.enabled {
            return None;
        }
        write!(self.output, "{question}").ok()?;
        self.output.flush().ok()?;

        let mut answer = String::new();
        match self.input.read_line(&mut answer) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(answer.trim().to_string()).filter(|a| !a.is_empty()),
        }
    }

    /// A non-negative number; anything else means the default.
    pub fn number(&mut self, question: &str) -> Option<u32> {
        self.line(question).and_then(|a| a.parse().ok())
    }

    fn categories(&mut self, site: &SiteConfig) -> Option<String> {
        if !self.enabled {
            return None;
        }
        let _ = writeln!(self.output, "Categories (several with commas, or `all`):");
        for (i, cat) in site.categories.iter().enumerate() {
            let _ = writeln!(self.output, "  {}. {} ({})", i + 1, cat.name, cat.path);
        }
        let _ = writeln!(self.output, "  or a custom path such as article/...");
        self.line("Select: ")
    }

    fn format(&mut self) -> Option<ExportFormat> {
        if !self.enabled {
            return None;
        }
        let _ = writeln!(self.output, "Export format:");
        for (i, format) in ExportFormat::ALL.iter().enumerate() {
            let _ = writeln!(self.output, "  {}. {}", i + 1, format);
        }
        let choice = self.number("Select 1-4 (default 1): ")?;
        (choice as usize)
            .checked_sub(1)
            .and_then(|i| ExportFormat::ALL.get(i).copied())
    }
}
