use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::stream::{self, Stream, StreamExt};
use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::diagnostics::DiagnosticSink;
use super::errors::{BrowserError, CrawlerResult};
use super::outcome::{BatchSummary, FetchOutcome};
use super::render::{BrowserSession, RenderBackend, RenderContext, RunConfig};

/// Renders a fixed URL list through one shared render context.
pub struct BatchFetcher<B> {
    backend: B,
    run: RunConfig,
    sink: Arc<dyn DiagnosticSink>,
}

impl<B: RenderBackend> BatchFetcher<B> {
    pub fn new(backend: B, run: RunConfig, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { backend, run, sink }
    }

    /// Submits the whole list as one batch.
    ///
    /// The render context is acquired before this returns; a failure to acquire it
    /// is the only error surfaced here. Outcomes arrive on the returned stream in
    /// completion order, one per input URL, and the context is released before the
    /// stream ends.
    pub async fn fetch_all(
        &self,
        urls: Vec<String>,
        session: &BrowserSession,
    ) -> CrawlerResult<BatchStream> {
        let context = self.backend.acquire(session).await?;
        let pool_size = context.pool_size().max(1);
        info!(
            "render context acquired, submitting {} URL(s) with {} concurrent page(s)",
            urls.len(),
            pool_size
        );

        let (tx, rx) = mpsc::unbounded_channel();
        let run = self.run.clone();
        let sink = Arc::clone(&self.sink);

        let task = tokio::spawn(async move {
            let mut guard = ContextGuard::new(context);
            let mut summary = BatchSummary::default();
            {
                let context = guard.context();
                let run = &run;
                let mut renders = stream::iter(urls)
                    .map(|url| async move { context.render(&url, run).await })
                    .buffer_unordered(pool_size);

                while let Some(result) = renders.next().await {
                    let outcome = FetchOutcome::from(result);
                    sink.emit(&outcome.diagnostic_line());
                    summary.record(&outcome);
                    if tx.send(outcome).is_err() {
                        debug!("outcome receiver dropped, batch continues");
                    }
                }
            }
            guard.release().await?;
            debug!("render context released");
            Ok(summary)
        });

        Ok(BatchStream {
            outcomes: UnboundedReceiverStream::new(rx),
            task,
        })
    }
}

/// Outcomes of one batch, yielded as they complete.
pub struct BatchStream {
    outcomes: UnboundedReceiverStream<FetchOutcome>,
    task: JoinHandle<CrawlerResult<BatchSummary>>,
}

impl BatchStream {
    /// Waits for the batch to finish, including the release of its render context.
    pub async fn finish(self) -> CrawlerResult<BatchSummary> {
        drop(self.outcomes);
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(BrowserError::BatchAborted(e.to_string()).into()),
        }
    }
}

impl Stream for BatchStream {
    type Item = FetchOutcome;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.outcomes).poll_next(cx)
    }
}

/// Owns the render context for the life of the batch task.
struct ContextGuard<C: RenderContext> {
    context: C,
    released: bool,
}

impl<C: RenderContext> ContextGuard<C> {
    fn new(context: C) -> Self {
        Self {
            context,
            released: false,
        }
    }

    fn context(&self) -> &C {
        &self.context
    }

    async fn release(&mut self) -> CrawlerResult<()> {
        self.released = true;
        self.context.release().await
    }
}

impl<C: RenderContext> Drop for ContextGuard<C> {
    fn drop(&mut self) {
        if !self.released {
            warn!("batch ended before its render context was released, aborting it");
            self.context.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::diagnostics::MemorySink;
    use crate::crawler::errors::{CrawlerError, RenderError};
    use crate::crawler::outcome::{CrawlResult, MarkdownGenerationResult};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Clone)]
    enum Script {
        Ok { length: usize, delay_ms: u64 },
        Fail(&'static str),
        Panic,
    }

    #[derive(Default)]
    struct Counters {
        acquired: AtomicUsize,
        released: AtomicUsize,
        aborted: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    struct ScriptedBackend {
        pages: HashMap<String, Script>,
        counters: Arc<Counters>,
        fail_acquire: bool,
    }

    struct ScriptedContext {
        pages: HashMap<String, Script>,
        counters: Arc<Counters>,
        pool_size: usize,
    }

    #[async_trait]
    impl RenderBackend for ScriptedBackend {
        type Context = ScriptedContext;

        async fn acquire(&self, session: &BrowserSession) -> CrawlerResult<ScriptedContext> {
            if self.fail_acquire {
                return Err(BrowserError::LaunchFailed("no chromium".to_string()).into());
            }
            self.counters.acquired.fetch_add(1, Ordering::SeqCst);
            Ok(ScriptedContext {
                pages: self.pages.clone(),
                counters: Arc::clone(&self.counters),
                pool_size: session.max_concurrent_pages,
            })
        }
    }

    #[async_trait]
    impl RenderContext for ScriptedContext {
        fn pool_size(&self) -> usize {
            self.pool_size
        }

        async fn render(&self, url: &str, _run: &RunConfig) -> CrawlResult {
            let now = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.counters.max_in_flight.fetch_max(now, Ordering::SeqCst);
            let result = match self.pages.get(url).cloned() {
                Some(Script::Ok { length, delay_ms }) => {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    CrawlResult::success(url, MarkdownGenerationResult::raw("m".repeat(length)))
                }
                Some(Script::Fail(message)) => CrawlResult::failure(url, message),
                Some(Script::Panic) => panic!("render engine crashed"),
                None => CrawlResult::failure(url, RenderError::Navigation("unknown".into()).to_string()),
            };
            self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }

        async fn release(&mut self) -> CrawlerResult<()> {
            self.counters.released.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn abort(&mut self) {
            self.counters.aborted.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn fetcher(
        pages: &[(&str, Script)],
    ) -> (BatchFetcher<ScriptedBackend>, Arc<Counters>, Arc<MemorySink>) {
        let counters = Arc::new(Counters::default());
        let sink = Arc::new(MemorySink::new());
        let backend = ScriptedBackend {
            pages: pages
                .iter()
                .map(|(url, script)| (url.to_string(), script.clone()))
                .collect(),
            counters: Arc::clone(&counters),
            fail_acquire: false,
        };
        let fetcher = BatchFetcher::new(backend, RunConfig::default(), sink.clone());
        (fetcher, counters, sink)
    }

    fn session(pool: usize) -> BrowserSession {
        BrowserSession {
            max_concurrent_pages: pool,
            ..Default::default()
        }
    }

    async fn collect(mut stream: BatchStream) -> (Vec<FetchOutcome>, CrawlerResult<BatchSummary>) {
        let mut outcomes = Vec::new();
        while let Some(outcome) = stream.next().await {
            outcomes.push(outcome);
        }
        (outcomes, stream.finish().await)
    }

    #[tokio::test]
    async fn test_every_url_yields_exactly_one_outcome() {
        let pages = [
            ("https://x/a", Script::Ok { length: 10, delay_ms: 5 }),
            ("https://x/b", Script::Fail("net::ERR_CONNECTION_RESET")),
            ("https://x/c", Script::Ok { length: 0, delay_ms: 0 }),
        ];
        let (fetcher, counters, sink) = fetcher(&pages);
        let urls: Vec<String> = vec!["https://x/a", "https://x/b", "https://x/c", "https://x/a"]
            .into_iter()
            .map(String::from)
            .collect();

        let stream = fetcher.fetch_all(urls.clone(), &session(2)).await.unwrap();
        let (outcomes, summary) = collect(stream).await;

        let mut seen: Vec<String> = outcomes.iter().map(|o| o.url().to_string()).collect();
        let mut expected = urls;
        seen.sort();
        expected.sort();
        assert_eq!(seen, expected);

        let summary = summary.unwrap();
        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(sink.lines().len(), 4);
        assert_eq!(counters.acquired.load(Ordering::SeqCst), 1);
        assert_eq!(counters.released.load(Ordering::SeqCst), 1);
        assert_eq!(counters.aborted.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_outcomes_arrive_in_completion_order() {
        let pages = [
            ("https://x/slow", Script::Ok { length: 1, delay_ms: 200 }),
            ("https://x/fast", Script::Ok { length: 2, delay_ms: 0 }),
        ];
        let (fetcher, _, sink) = fetcher(&pages);
        let urls = vec!["https://x/slow".to_string(), "https://x/fast".to_string()];

        let mut stream = fetcher.fetch_all(urls, &session(2)).await.unwrap();
        let first = stream.next().await.unwrap();
        assert_eq!(first.url(), "https://x/fast");
        assert_eq!(sink.lines(), vec!["[OK] https://x/fast — Markdown length: 2".to_string()]);

        let second = stream.next().await.unwrap();
        assert_eq!(second.url(), "https://x/slow");
        assert!(stream.next().await.is_none());
        stream.finish().await.unwrap();
    }

    #[tokio::test]
    async fn test_pool_size_bounds_concurrency() {
        let pages: Vec<(String, Script)> = (0..8)
            .map(|i| (format!("https://x/{}", i), Script::Ok { length: i, delay_ms: 20 }))
            .collect();
        let page_refs: Vec<(&str, Script)> =
            pages.iter().map(|(u, s)| (u.as_str(), s.clone())).collect();
        let (fetcher, counters, _) = fetcher(&page_refs);
        let urls = pages.iter().map(|(u, _)| u.clone()).collect();

        let (outcomes, _) = collect(fetcher.fetch_all(urls, &session(3)).await.unwrap()).await;

        assert_eq!(outcomes.len(), 8);
        let max = counters.max_in_flight.load(Ordering::SeqCst);
        assert!(max <= 3, "at most 3 pages in flight, saw {}", max);
        assert!(max > 1, "pages should overlap, saw {}", max);
    }

    #[tokio::test]
    async fn test_failures_do_not_abort_the_batch() {
        let pages = [
            ("https://x/a", Script::Fail("Timeout 60000ms exceeded")),
            ("https://x/b", Script::Fail("browser crashed")),
        ];
        let (fetcher, counters, sink) = fetcher(&pages);
        let urls = vec!["https://x/a".to_string(), "https://x/b".to_string()];

        let (outcomes, summary) = collect(fetcher.fetch_all(urls, &session(1)).await.unwrap()).await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| !o.is_success()));
        assert_eq!(summary.unwrap().failed, 2);
        assert_eq!(
            sink.lines(),
            vec![
                "[FAIL] https://x/a — Error: Timeout 60000ms exceeded".to_string(),
                "[FAIL] https://x/b — Error: browser crashed".to_string(),
            ]
        );
        assert_eq!(counters.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_batch_still_releases() {
        let (fetcher, counters, sink) = fetcher(&[]);
        let (outcomes, summary) =
            collect(fetcher.fetch_all(Vec::new(), &session(4)).await.unwrap()).await;

        assert!(outcomes.is_empty());
        assert_eq!(summary.unwrap().total(), 0);
        assert!(sink.lines().is_empty());
        assert_eq!(counters.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dropped_consumer_still_runs_batch_to_completion() {
        let pages = [
            ("https://x/a", Script::Ok { length: 3, delay_ms: 10 }),
            ("https://x/b", Script::Ok { length: 4, delay_ms: 10 }),
        ];
        let (fetcher, counters, sink) = fetcher(&pages);
        let urls = vec!["https://x/a".to_string(), "https://x/b".to_string()];

        let stream = fetcher.fetch_all(urls, &session(2)).await.unwrap();
        let summary = stream.finish().await.unwrap();

        assert_eq!(summary.succeeded, 2);
        assert_eq!(sink.lines().len(), 2);
        assert_eq!(counters.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_acquire_failure_propagates() {
        let (mut fetcher, counters, _) = fetcher(&[]);
        fetcher.backend.fail_acquire = true;

        match fetcher.fetch_all(vec!["https://x/a".to_string()], &session(1)).await {
            Err(CrawlerError::Browser(BrowserError::LaunchFailed(_))) => {}
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("acquire should fail"),
        }
        assert_eq!(counters.released.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_panicking_render_aborts_context() {
        let pages = [("https://x/boom", Script::Panic)];
        let (fetcher, counters, _) = fetcher(&pages);

        let stream = fetcher
            .fetch_all(vec!["https://x/boom".to_string()], &session(1))
            .await
            .unwrap();
        let (outcomes, summary) = collect(stream).await;

        assert!(outcomes.is_empty());
        assert!(matches!(
            summary,
            Err(CrawlerError::Browser(BrowserError::BatchAborted(_)))
        ));
        assert_eq!(counters.released.load(Ordering::SeqCst), 0);
        assert_eq!(counters.aborted.load(Ordering::SeqCst), 1);
    }
}
