use std::sync::Arc;

use futures::StreamExt;
use log::info;

use super::batch_fetcher::BatchFetcher;
use super::chrome_fetcher::ChromeBackend;
use super::config::CrawlerConfig;
use super::diagnostics::{DiagnosticSink, StdoutSink};
use super::errors::CrawlerResult;
use super::logging::CrawlerLogger;
use super::outcome::{BatchSummary, FetchOutcome};
use super::render::{BrowserSession, RenderBackend};
use super::sitemap::{SitemapSource, SpiderSitemapSource, UrlDiscoverer};

pub const NO_URLS_LINE: &str = "No URLs found to crawl";
pub const BATCH_HEADER: &str = "\n=== Batch Crawling with Uniform Config ===";

/// What one run discovered and fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub urls_found: usize,
    /// Outcomes in the order the consumer received them
    pub outcomes: Vec<FetchOutcome>,
    pub summary: BatchSummary,
}

/// Discovery followed by one batch fetch over everything discovered.
pub struct Crawler<S, B> {
    discoverer: UrlDiscoverer<S>,
    fetcher: BatchFetcher<B>,
    session: BrowserSession,
    sink: Arc<dyn DiagnosticSink>,
}

impl<S: SitemapSource, B: RenderBackend> Crawler<S, B> {
    pub fn new(
        discoverer: UrlDiscoverer<S>,
        fetcher: BatchFetcher<B>,
        session: BrowserSession,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            discoverer,
            fetcher,
            session,
            sink,
        }
    }

    /// Runs discovery to completion, then drains the batch stream.
    /// An empty URL list ends the run before any browser is started.
    pub async fn run(&self) -> CrawlerResult<CrawlReport> {
        let mut logger = CrawlerLogger::new();
        let result = self.run_with(&mut logger).await;
        if let Err(ref e) = result {
            logger.log_error(e);
        }
        logger.log_final_summary();
        result
    }

    async fn run_with(&self, logger: &mut CrawlerLogger) -> CrawlerResult<CrawlReport> {
        logger.start_operation("discovery");
        let urls = self.discoverer.discover().await;
        logger.log_discovery(self.discoverer.sitemap_url(), urls.len());
        logger.end_operation("discovery", !urls.is_empty());

        if urls.is_empty() {
            self.sink.emit(NO_URLS_LINE);
            return Ok(CrawlReport::default());
        }

        let urls_found = urls.len();
        self.sink.emit(&format!("Found {} URLs to crawl", urls_found));
        self.sink.emit(BATCH_HEADER);

        logger.start_operation("batch");
        let mut stream = match self.fetcher.fetch_all(urls, &self.session).await {
            Ok(stream) => stream,
            Err(e) => {
                logger.end_operation("batch", false);
                return Err(e);
            }
        };

        let mut outcomes = Vec::with_capacity(urls_found);
        while let Some(outcome) = stream.next().await {
            logger.log_outcome(&outcome);
            outcomes.push(outcome);
            logger.log_batch_progress(outcomes.len(), urls_found);
        }

        let finished = stream.finish().await;
        logger.end_operation("batch", finished.is_ok());
        let summary = finished?;
        logger.log_batch_summary(&summary);

        Ok(CrawlReport {
            urls_found,
            outcomes,
            summary,
        })
    }
}

/// Wires the production collaborators from configuration and runs one crawl.
pub async fn run_crawler(config: &CrawlerConfig) -> CrawlerResult<CrawlReport> {
    config.validate()?;
    info!("crawling sitemap {}", config.sitemap.url);

    let sink: Arc<dyn DiagnosticSink> = Arc::new(StdoutSink);
    let discoverer = UrlDiscoverer::new(
        SpiderSitemapSource::new(config.sitemap.user_agent.clone()),
        config.sitemap.url.clone(),
        Arc::clone(&sink),
    );
    let backend = ChromeBackend::new(
        config.chrome_executable(),
        config.browser.download_dir.clone(),
    );
    let fetcher = BatchFetcher::new(backend, config.run_config(), Arc::clone(&sink));

    Crawler::new(discoverer, fetcher, config.session(), sink)
        .run()
        .await
}
