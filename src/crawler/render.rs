use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::errors::CrawlerResult;
use super::html_to_markdown::{DefaultMarkdownGenerator, MarkdownGenerator};
use super::outcome::CrawlResult;

/// How render contexts are launched for one batch. Immutable once the batch starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserSession {
    pub headless: bool,
    /// Extra process flags passed to the browser at launch
    pub extra_args: Vec<String>,
    /// Width of the render pool
    pub max_concurrent_pages: usize,
}

impl Default for BrowserSession {
    fn default() -> Self {
        Self {
            headless: true,
            extra_args: vec![
                "--disable-gpu".to_string(),
                "--disable-dev-shm-usage".to_string(),
                "--no-sandbox".to_string(),
            ],
            max_concurrent_pages: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    /// Let the browser reuse its HTTP cache
    Enabled,
    /// Always fetch from the network
    #[default]
    Bypass,
}

/// Per-page options applied uniformly to every URL of a batch.
#[derive(Clone)]
pub struct RunConfig {
    pub cache_mode: CacheMode,
    pub page_timeout: Duration,
    pub markdown_generator: Arc<dyn MarkdownGenerator>,
}

impl RunConfig {
    pub fn new(page_timeout: Duration) -> Self {
        Self {
            cache_mode: CacheMode::default(),
            page_timeout,
            markdown_generator: Arc::new(DefaultMarkdownGenerator),
        }
    }

    pub fn with_cache_mode(mut self, cache_mode: CacheMode) -> Self {
        self.cache_mode = cache_mode;
        self
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("cache_mode", &self.cache_mode)
            .field("page_timeout", &self.page_timeout)
            .finish_non_exhaustive()
    }
}

/// Creates the shared render context for a batch.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    type Context: RenderContext + 'static;

    async fn acquire(&self, session: &BrowserSession) -> CrawlerResult<Self::Context>;
}

/// A live rendering context shared by every page of one batch.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Number of pages that may render at the same time
    fn pool_size(&self) -> usize;

    /// Render one URL and convert it. Failures are reported inside the result.
    async fn render(&self, url: &str, run: &RunConfig) -> CrawlResult;

    /// Called exactly once when the batch completes.
    async fn release(&mut self) -> CrawlerResult<()>;

    /// Synchronous teardown used when the batch unwinds before `release` ran.
    fn abort(&mut self) {}
}
