//! The crawl-and-merge pipeline.
//!
//! A run goes through these steps:
//!
//! 1. **Prior state**: the previous export (if any), merged with the
//!    checkpoint of an interrupted run when resuming
//! 2. **Listing**: every category crawled concurrently; URLs already in the
//!    prior state are skipped
//! 3. **Merge**: fresh stubs reconciled with the prior state, then checkpointed
//! 4. **Content**: every record without body text is extracted concurrently;
//!    the checkpoint is rewritten after each article
//! 5. **Export**: the dataset is written and the checkpoint removed
//!
//! The two concurrent phases never overlap. A failed listing page stops only
//! its category; a failed article only gets the sentinel content. Storage
//! failures abort the run.

use crate::checkpoint::CheckpointStore;
use crate::config::CrawlConfig;
use crate::error::{PipelineError, StorageError};
use crate::merge::merge_records;
use crate::models::ArticleRecord;
use crate::outputs;
use crate::render::PageRenderer;
use crate::scrapers::article::ContentExtractor;
use crate::scrapers::category::{CategoryCrawler, SeenUrls, StopReason};
use crate::scrapers::listing::ListingFetcher;
use crate::utils::truncate_for_log;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::pin::pin;
use tracing::{error, info, instrument, warn};
use url::Url;

/// Counts from the content phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichStats {
    pub attempted: usize,
    pub enriched: usize,
    pub failed: usize,
}

/// What a finished run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Records carried in from the previous export and checkpoint.
    pub prior: usize,
    /// New stubs found by the listing phase.
    pub discovered: usize,
    pub enrich: EnrichStats,
    /// Records in the export.
    pub total: usize,
    pub output: PathBuf,
}

/// Coordinates listing crawls, content extraction, checkpoints and export.
pub struct Pipeline<R> {
    config: CrawlConfig,
    listing: ListingFetcher<R>,
    extractor: ContentExtractor<R>,
    checkpoint: CheckpointStore,
}

impl<R> Pipeline<R>
where
    R: PageRenderer + Clone,
{
    pub fn new(config: CrawlConfig, base: Url, renderer: R) -> Self {
        let checkpoint = CheckpointStore::new(&config.checkpoint_path);
        Self {
            listing: ListingFetcher::new(renderer.clone(), base, config.pacing),
            extractor: ContentExtractor::new(renderer, config.pacing),
            checkpoint,
            config,
        }
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    pub fn checkpoint(&self) -> &CheckpointStore {
        &self.checkpoint
    }

    /// Previous export merged with the checkpoint (when `resume` is set).
    ///
    /// An unreadable previous export is logged and ignored. A checkpoint that
    /// is not resumed is deleted.
    #[instrument(level = "info", skip(self))]
    pub async fn load_prior_state(
        &self,
        output: &Path,
        resume: bool,
    ) -> Result<Vec<ArticleRecord>, StorageError> {
        let previous = match outputs::load_previous(output, self.config.format).await {
            Ok(Some(records)) => records,
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Previous export not usable; starting from an empty dataset");
                Vec::new()
            }
        };

        if !resume {
            if self.checkpoint.exists().await {
                info!(path = %self.checkpoint.path().display(), "Discarding checkpoint");
            }
            self.checkpoint.remove().await?;
            return Ok(previous);
        }

        match self.checkpoint.load().await? {
            Some(saved) => {
                info!(previous = previous.len(), checkpoint = saved.len(), "Resuming from checkpoint");
                Ok(merge_records(previous, saved))
            }
            None => Ok(previous),
        }
    }

    /// Listing phase: crawl every category, skipping URLs in `seen`.
    ///
    /// Categories run concurrently; each category's stubs stay in discovery
    /// order and categories are appended as they finish.
    #[instrument(level = "info", skip_all, fields(categories = self.config.categories.len()))]
    pub async fn crawl_listings(&self, seen: &SeenUrls) -> Vec<ArticleRecord> {
        let crawler = CategoryCrawler::new(&self.listing, &self.config, seen);
        let crawler = &crawler;
        let workers = self.config.category_workers();
        info!(workers, "Starting listing crawl");

        let mut reports = pin!(
            stream::iter(self.config.categories.iter())
                .map(move |category| crawler.crawl(category))
                .buffer_unordered(workers)
        );

        let mut stubs = Vec::new();
        let mut finished = 0usize;
        while let Some(report) = reports.next().await {
            finished += 1;
            if let StopReason::FetchFailed(reason) = &report.stop {
                error!(category = %report.category, %reason, "Category stopped early");
            }
            info!(
                category = %report.category,
                found = report.records.len(),
                pages = report.pages_fetched,
                progress = %format!("{finished}/{}", self.config.categories.len()),
                "Category done"
            );
            stubs.extend(report.records);
        }

        info!(stubs = stubs.len(), "Listing crawl complete");
        stubs
    }

    /// Content phase: extract every record that still needs content.
    ///
    /// Each finished article is written back in place and checkpointed.
    #[instrument(level = "info", skip_all, fields(records = records.len()))]
    pub async fn enrich(&self, records: &mut [ArticleRecord]) -> Result<EnrichStats, StorageError> {
        let pending: Vec<(usize, String)> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.needs_content() && !r.url.is_empty())
            .map(|(i, r)| (i, r.url.clone()))
            .collect();
        let total = records.len();
        let mut stats = EnrichStats {
            attempted: pending.len(),
            ..Default::default()
        };
        info!(
            pending = pending.len(),
            already_done = total - pending.len(),
            workers = self.config.max_workers,
            "Starting content extraction"
        );

        let extractor = &self.extractor;
        let mut results = pin!(
            stream::iter(pending)
                .map(move |(i, url)| async move { (i, extractor.extract(&url).await) })
                .buffer_unordered(self.config.max_workers)
        );

        let mut done = 0usize;
        while let Some((i, extraction)) = results.next().await {
            done += 1;
            if let crate::models::Extraction::Failed { attempts, error } = &extraction {
                stats.failed += 1;
                warn!(url = %records[i].url, attempts, %error, "Article extraction failed; marked for retry");
            } else {
                stats.enriched += 1;
            }
            records[i].apply(extraction);
            info!(
                progress = %format!("{done}/{}", stats.attempted),
                index = i + 1,
                title = %truncate_for_log(&records[i].title, 80),
                "Article done"
            );
            self.checkpoint.save(records).await?;
        }

        info!(enriched = stats.enriched, failed = stats.failed, "Content extraction complete");
        Ok(stats)
    }

    /// Run the whole pipeline.
    #[instrument(level = "info", skip(self), fields(output = %self.config.output_path().display()))]
    pub async fn run(&self, resume: bool) -> Result<RunSummary, PipelineError> {
        let output = self.config.output_path();

        let prior = self.load_prior_state(&output, resume).await?;
        let prior_count = prior.len();
        let seen: SeenUrls = prior
            .iter()
            .filter(|r| !r.url.is_empty())
            .map(|r| r.url.clone())
            .collect();
        if !seen.is_empty() {
            info!(seen = seen.len(), "URLs already in the dataset will be skipped");
        }

        let stubs = self.crawl_listings(&seen).await;
        let discovered = stubs.len();

        let mut records = merge_records(prior, stubs);
        self.checkpoint.save(&records).await?;

        let enrich = self.enrich(&mut records).await?;

        outputs::export(&mut records, self.config.format, &output).await?;
        self.checkpoint.remove().await?;

        let summary = RunSummary {
            prior: prior_count,
            discovered,
            enrich,
            total: records.len(),
            output,
        };
        info!(?summary, "Run complete");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExportFormat, Pacing};
    use crate::models::CONTENT_ERROR_SENTINEL;
    use crate::render::testing::FakeRenderer;
    use crate::scrapers::article::fixtures::article_html;
    use crate::scrapers::listing::fixtures::numbered_listing;
    use crate::scrapers::listing::page_url;
    use tempfile::TempDir;

    const NEWS: &str = "article/isranews-news.html";
    const SOUTH: &str = "article/south-news/other-news.html";

    fn base() -> Url {
        Url::parse("https://www.isranews.org").unwrap()
    }

    fn article_url(i: usize) -> String {
        format!("https://www.isranews.org/article/isranews-news/{i}-story.html")
    }

    fn config(dir: &TempDir, categories: &[&str], format: ExportFormat) -> CrawlConfig {
        CrawlConfig {
            categories: categories.iter().map(|c| c.to_string()).collect(),
            start_page: 1,
            end_page: 0,
            max_workers: 4,
            format,
            output_base: dir.path().join("isranews").to_string_lossy().into_owned(),
            checkpoint_path: dir.path().join("checkpoint.json"),
            pacing: Pacing::none(),
            ..Default::default()
        }
    }

    /// `count` articles on page 1 of NEWS, then an empty page 2.
    fn site(count: usize) -> FakeRenderer {
        let fake = FakeRenderer::new()
            .page(&page_url(&base(), NEWS, 1), numbered_listing(1, count, "15 มกราคม 2567"))
            .page(&page_url(&base(), NEWS, 2), numbered_listing(0, 0, ""));
        for i in 1..=count {
            fake.push(
                &article_url(i),
                Ok(article_html(&[&format!("เนื้อหาข่าว {i}")], &["การเมือง"], &["แท็ก"], "1,000")),
            );
        }
        fake
    }

    #[tokio::test]
    async fn test_full_run_exports_enriched_records() {
        let dir = tempfile::tempdir().unwrap();
        let fake = site(10);
        let pipeline = Pipeline::new(config(&dir, &[NEWS], ExportFormat::Json), base(), &fake);

        let summary = pipeline.run(false).await.unwrap();
        assert_eq!(summary.discovered, 10);
        assert_eq!(summary.enrich.enriched, 10);
        assert_eq!(summary.total, 10);
        assert!(!pipeline.checkpoint().exists().await);

        let records = outputs::load_previous(&summary.output, ExportFormat::Json)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(records.len(), 10);
        assert_eq!(records[0].content, "เนื้อหาข่าว 1");
        assert_eq!(records[0].category, "การเมือง");
        assert_eq!(records[0].views, "1000");
        assert_eq!(records[0].date, "2024-01-15 00:00:00");
    }

    #[tokio::test]
    async fn test_rerun_with_unchanged_site_keeps_output_identical() {
        let dir = tempfile::tempdir().unwrap();
        let fake = site(3);
        let cfg = config(&dir, &[NEWS], ExportFormat::Csv);

        let first = Pipeline::new(cfg.clone(), base(), &fake).run(false).await.unwrap();
        let before = std::fs::read(&first.output).unwrap();

        let second = Pipeline::new(cfg, base(), &fake).run(false).await.unwrap();
        let after = std::fs::read(&second.output).unwrap();

        assert_eq!(before, after);
        assert_eq!(second.discovered, 0);
        assert_eq!(second.enrich.attempted, 0);
        assert_eq!(fake.calls_to(&article_url(1)), 1);
    }

    #[tokio::test]
    async fn test_cross_listed_article_kept_once() {
        let dir = tempfile::tempdir().unwrap();
        let fake = site(5)
            .page(&page_url(&base(), SOUTH, 1), numbered_listing(4, 4, ""))
            .page(&page_url(&base(), SOUTH, 2), numbered_listing(0, 0, ""));
        for i in 6..=7 {
            fake.push(&article_url(i), Ok(article_html(&["south"], &[], &[], "")));
        }
        let pipeline = Pipeline::new(config(&dir, &[NEWS, SOUTH], ExportFormat::Json), base(), &fake);

        let summary = pipeline.run(false).await.unwrap();
        // 1..=5 from NEWS, 4..=7 from SOUTH
        assert_eq!(summary.total, 7);
        for i in 1..=7 {
            assert_eq!(fake.calls_to(&article_url(i)), 1, "article {i}");
        }
    }

    #[tokio::test]
    async fn test_failed_article_gets_sentinel_and_is_retried_next_run() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeRenderer::new()
            .page(&page_url(&base(), NEWS, 1), numbered_listing(1, 2, ""))
            .page(&page_url(&base(), NEWS, 2), numbered_listing(0, 0, ""))
            .page(&article_url(1), article_html(&["ok"], &[], &[], ""))
            .timeout(&article_url(2));
        let cfg = config(&dir, &[NEWS], ExportFormat::Json);

        let summary = Pipeline::new(cfg.clone(), base(), &fake).run(false).await.unwrap();
        assert_eq!(summary.enrich.failed, 1);
        let records = outputs::load_previous(&summary.output, ExportFormat::Json)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(records[1].content, CONTENT_ERROR_SENTINEL);

        fake.push(&article_url(2), Ok(article_html(&["recovered"], &[], &[], "")));
        let summary = Pipeline::new(cfg, base(), &fake).run(false).await.unwrap();
        assert_eq!(summary.enrich.attempted, 1);
        let records = outputs::load_previous(&summary.output, ExportFormat::Json)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(records[0].content, "ok");
        assert_eq!(records[1].content, "recovered");
    }

    #[tokio::test]
    async fn test_resume_skips_enriched_checkpoint_records() {
        let dir = tempfile::tempdir().unwrap();
        let fake = site(3);
        let cfg = config(&dir, &[NEWS], ExportFormat::Json);
        let pipeline = Pipeline::new(cfg, base(), &fake);

        let mut done = ArticleRecord::stub("ข่าวที่ 1", "15 มกราคม 2567", article_url(1));
        done.content = "saved body".into();
        let pending = ArticleRecord::stub("ข่าวที่ 2", "15 มกราคม 2567", article_url(2));
        pipeline.checkpoint().save(&[done, pending]).await.unwrap();

        let summary = pipeline.run(true).await.unwrap();
        assert_eq!(summary.prior, 2);
        assert_eq!(summary.discovered, 1);
        assert_eq!(summary.total, 3);
        assert_eq!(fake.calls_to(&article_url(1)), 0);
        assert_eq!(fake.calls_to(&article_url(2)), 1);
        assert!(!pipeline.checkpoint().exists().await);
    }

    #[tokio::test]
    async fn test_declined_resume_discards_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let fake = site(1);
        let pipeline = Pipeline::new(config(&dir, &[NEWS], ExportFormat::Json), base(), &fake);
        let mut stale = ArticleRecord::stub("stale", "", "https://elsewhere/1");
        stale.content = "x".into();
        pipeline.checkpoint().save(&[stale]).await.unwrap();

        let prior = pipeline
            .load_prior_state(&pipeline.config().output_path(), false)
            .await
            .unwrap();
        assert!(prior.is_empty());
        assert!(!pipeline.checkpoint().exists().await);
    }

    #[tokio::test]
    async fn test_enrich_checkpoints_progress() {
        let dir = tempfile::tempdir().unwrap();
        let fake = site(2);
        let pipeline = Pipeline::new(config(&dir, &[NEWS], ExportFormat::Json), base(), &fake);
        let mut records = vec![
            ArticleRecord::stub("a", "", article_url(1)),
            ArticleRecord::stub("b", "", article_url(2)),
        ];

        let stats = pipeline.enrich(&mut records).await.unwrap();
        assert_eq!(stats.enriched, 2);
        let saved = pipeline.checkpoint().load().await.unwrap().unwrap();
        assert_eq!(saved, records);
        assert!(saved.iter().all(|r| !r.needs_content()));
    }

    #[tokio::test]
    async fn test_corrupt_previous_export_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let fake = site(1);
        let cfg = config(&dir, &[NEWS], ExportFormat::Json);
        std::fs::write(cfg.output_path(), "not json").unwrap();

        let summary = Pipeline::new(cfg, base(), &fake).run(false).await.unwrap();
        assert_eq!(summary.prior, 0);
        assert_eq!(summary.total, 1);
    }

    #[tokio::test]
    async fn test_unwritable_checkpoint_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let fake = site(1);
        let mut cfg = config(&dir, &[NEWS], ExportFormat::Json);
        cfg.checkpoint_path = dir.path().join("missing").join("cp.json");

        let err = Pipeline::new(cfg, base(), &fake).run(false).await.unwrap_err();
        assert!(matches!(err, PipelineError::Storage(StorageError::Io { .. })));
    }
}
