use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use spider::reqwest;

use super::diagnostics::DiagnosticSink;
use super::errors::DiscoveryError;

/// Namespace every sitemap `<urlset>` must declare.
pub const SITEMAP_NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Fetch capability used to download the sitemap document.
#[async_trait]
pub trait SitemapSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, DiscoveryError>;
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Downloads the sitemap with a single GET through spider's HTTP client.
#[derive(Debug, Clone)]
pub struct SpiderSitemapSource {
    user_agent: String,
    use_proxy: bool,
}

impl SpiderSitemapSource {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            use_proxy: true,
        }
    }

    /// Ignore proxy settings from the environment.
    pub fn without_proxy(mut self) -> Self {
        self.use_proxy = false;
        self
    }

    fn client(&self) -> Result<reqwest::Client, DiscoveryError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(self.user_agent.as_str())
            .timeout(REQUEST_TIMEOUT);
        if !self.use_proxy {
            builder = builder.no_proxy();
        }
        builder.build().map_err(network_error)
    }
}

fn network_error(e: reqwest::Error) -> DiscoveryError {
    DiscoveryError::Network(e.to_string())
}

#[async_trait]
impl SitemapSource for SpiderSitemapSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, DiscoveryError> {
        debug!("fetching sitemap {} as '{}'", url, self.user_agent);

        let response = self
            .client()?
            .get(url)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DiscoveryError::HttpStatus(status.as_u16()));
        }
        let body = response.bytes().await.map_err(network_error)?;
        Ok(body.to_vec())
    }
}

/// Extracts every namespaced `<loc>` value, in document order.
pub fn parse_sitemap(xml: &[u8]) -> Result<Vec<String>, DiscoveryError> {
    let text = std::str::from_utf8(xml).map_err(|e| DiscoveryError::Parse(e.to_string()))?;
    let document =
        roxmltree::Document::parse(text).map_err(|e| DiscoveryError::Parse(e.to_string()))?;

    let root = document.root_element();
    if root.tag_name().namespace() != Some(SITEMAP_NAMESPACE) {
        return Err(DiscoveryError::Parse(format!(
            "root element <{}> is not in the {} namespace",
            root.tag_name().name(),
            SITEMAP_NAMESPACE
        )));
    }

    Ok(document
        .descendants()
        .filter(|node| node.has_tag_name((SITEMAP_NAMESPACE, "loc")))
        .map(|node| node.text().unwrap_or_default().trim().to_string())
        .collect())
}

/// Turns the configured sitemap into the list of pages to crawl.
pub struct UrlDiscoverer<S> {
    source: S,
    sitemap_url: String,
    sink: Arc<dyn DiagnosticSink>,
}

impl<S: SitemapSource> UrlDiscoverer<S> {
    pub fn new(source: S, sitemap_url: impl Into<String>, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            source,
            sitemap_url: sitemap_url.into(),
            sink,
        }
    }

    pub fn sitemap_url(&self) -> &str {
        &self.sitemap_url
    }

    /// Never fails: fetch or parse errors are reported once and yield an empty list.
    pub async fn discover(&self) -> Vec<String> {
        match self.try_discover().await {
            Ok(urls) => {
                info!("sitemap {} declares {} URL(s)", self.sitemap_url, urls.len());
                urls
            }
            Err(e) => {
                warn!("sitemap discovery failed for {}: {}", self.sitemap_url, e);
                self.sink.emit(&format!("Error fetching sitemap: {}", e));
                Vec::new()
            }
        }
    }

    async fn try_discover(&self) -> Result<Vec<String>, DiscoveryError> {
        let body = self.source.fetch(&self.sitemap_url).await?;
        debug!("sitemap {} returned {} bytes", self.sitemap_url, body.len());
        parse_sitemap(&body)
    }
}
