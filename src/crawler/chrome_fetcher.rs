// Chromium render backend: one browser process per batch, one page per URL.
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{EnableParams, SetCacheDisabledParams};
use chromiumoxide::error::CdpError;
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use chromiumoxide::Page;
use futures::StreamExt;
use log::{debug, info, trace, warn};
use tokio::task::JoinHandle;

use super::errors::{BrowserError, CrawlerResult, RenderError};
use super::outcome::CrawlResult;
use super::render::{BrowserSession, CacheMode, RenderBackend, RenderContext, RunConfig};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Launches Chromium through chromiumoxide.
#[derive(Debug, Clone)]
pub struct ChromeBackend {
    executable: Option<PathBuf>,
    download_dir: PathBuf,
}

impl ChromeBackend {
    pub fn new(executable: Option<PathBuf>, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            executable,
            download_dir: download_dir.into(),
        }
    }

    async fn resolve_executable(&self) -> CrawlerResult<PathBuf> {
        match &self.executable {
            Some(path) if path.exists() => Ok(path.clone()),
            Some(path) => Err(BrowserError::ExecutableNotFound(path.display().to_string()).into()),
            None => ensure_chromium(&self.download_dir).await,
        }
    }
}

/// Download (or reuse) a bundled Chromium and return its executable path.
async fn ensure_chromium(download_dir: &Path) -> CrawlerResult<PathBuf> {
    tokio::fs::create_dir_all(download_dir)
        .await
        .map_err(|e| BrowserError::DownloadFailed(e.to_string()))?;
    let options = BrowserFetcherOptions::builder()
        .with_path(download_dir)
        .build()
        .map_err(|e| BrowserError::DownloadFailed(e.to_string()))?;
    let installation = BrowserFetcher::new(options)
        .fetch()
        .await
        .map_err(|e| BrowserError::DownloadFailed(e.to_string()))?;
    Ok(installation.executable_path)
}

#[async_trait]
impl RenderBackend for ChromeBackend {
    type Context = ChromeContext;

    async fn acquire(&self, session: &BrowserSession) -> CrawlerResult<ChromeContext> {
        let chrome_exec = self.resolve_executable().await?;
        info!("using Chromium at {}", chrome_exec.display());

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_exec)
            .request_timeout(REQUEST_TIMEOUT)
            .args(session.extra_args.clone());
        if !session.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(BrowserError::LaunchFailed)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    // chromiumoxide reports unknown CDP events as errors; they are not fatal
                    trace!("browser handler: {}", e);
                }
            }
            debug!("browser handler task finished");
        });

        Ok(ChromeContext {
            browser,
            handler_task: Some(handler_task),
            pool_size: session.max_concurrent_pages.max(1),
            closed: false,
        })
    }
}

/// A running Chromium shared by every page of the batch.
pub struct ChromeContext {
    browser: Browser,
    handler_task: Option<JoinHandle<()>>,
    pool_size: usize,
    closed: bool,
}

impl ChromeContext {
    async fn load(&self, page: &Page, url: &str, cache_mode: CacheMode) -> Result<String, RenderError> {
        if cache_mode == CacheMode::Bypass {
            page.execute(EnableParams::default())
                .await
                .map_err(navigation_error)?;
            page.execute(SetCacheDisabledParams::new(true))
                .await
                .map_err(navigation_error)?;
        }
        page.goto(url).await.map_err(navigation_error)?;
        page.content()
            .await
            .map_err(|e| RenderError::Content(e.to_string()))
    }
}

fn navigation_error(e: CdpError) -> RenderError {
    RenderError::Navigation(e.to_string())
}

/// Process control used when a batch releases its browser.
#[async_trait]
trait BrowserProcess: Send {
    async fn close(&mut self) -> Result<(), String>;
    async fn kill(&mut self) -> Option<io::Result<()>>;
    async fn wait(&mut self) -> io::Result<()>;
}

#[async_trait]
impl BrowserProcess for Browser {
    async fn close(&mut self) -> Result<(), String> {
        Browser::close(self).await.map(|_| ()).map_err(|e| e.to_string())
    }

    async fn kill(&mut self) -> Option<io::Result<()>> {
        Browser::kill(self).await
    }

    async fn wait(&mut self) -> io::Result<()> {
        Browser::wait(self).await.map(|_| ())
    }
}

/// Close, then reap the process. A failed close kills the process first so the wait returns.
async fn shut_down<P: BrowserProcess>(process: &mut P) -> Result<(), String> {
    let closed = process.close().await;
    if let Err(ref e) = closed {
        warn!("Chromium did not close cleanly ({}), killing it", e);
        if let Some(Err(e)) = process.kill().await {
            warn!("failed to kill Chromium: {}", e);
        }
    }
    if let Err(e) = process.wait().await {
        warn!("failed waiting for Chromium to exit: {}", e);
    }
    closed
}

#[async_trait]
impl RenderContext for ChromeContext {
    fn pool_size(&self) -> usize {
        self.pool_size
    }

    async fn render(&self, url: &str, run: &RunConfig) -> CrawlResult {
        debug!("rendering {}", url);
        let page = match self.browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => return CrawlResult::failure(url, RenderError::Navigation(e.to_string()).to_string()),
        };

        let loaded = tokio::time::timeout(run.page_timeout, self.load(&page, url, run.cache_mode)).await;
        if let Err(e) = page.close().await {
            debug!("failed to close page for {}: {}", url, e);
        }

        let html = match loaded {
            Ok(Ok(html)) => html,
            Ok(Err(e)) => return CrawlResult::failure(url, e.to_string()),
            Err(_) => {
                let ms = run.page_timeout.as_millis() as u64;
                return CrawlResult::failure(url, RenderError::Timeout(ms).to_string());
            }
        };

        match run.markdown_generator.generate(&html) {
            Ok(markdown) => CrawlResult::success(url, markdown),
            Err(e) => CrawlResult::failure(url, RenderError::Conversion(e.to_string()).to_string()),
        }
    }

    async fn release(&mut self) -> CrawlerResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let closed = shut_down(&mut self.browser).await;
        if let Some(handler_task) = self.handler_task.take() {
            let _ = handler_task.await;
        }
        closed.map_err(|e| BrowserError::ReleaseFailed(e).into())
    }

    fn abort(&mut self) {
        if let Some(handler_task) = self.handler_task.take() {
            handler_task.abort();
        }
        // dropping the Browser kills the child process
        self.closed = true;
    }
}
