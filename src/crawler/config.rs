use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::errors::{ConfigurationError, CrawlerResult};
use super::render::{BrowserSession, CacheMode, RunConfig};

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main configuration structure for the sitemap crawler
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Where the page list comes from
    pub sitemap: SitemapConfig,
    /// Shared browser launch options
    pub browser: BrowserConfig,
    /// Per-page run options
    pub run: RunOptions,
    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SitemapConfig {
    pub url: String,
    pub user_agent: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    pub extra_args: Vec<String>,
    /// Width of the render pool
    pub max_concurrent_pages: usize,
    /// Chromium binary to launch; downloaded into `download_dir` when unset
    pub chrome_executable: Option<String>,
    pub download_dir: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct RunOptions {
    pub page_timeout_ms: u64,
    /// `bypass` (default) or `enabled`
    pub cache_mode: CacheMode,
}

/// Configuration for logging behavior
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            url: "https://ai.pydantic.dev/sitemap.xml".to_string(),
            user_agent: "SitemapCrawler/1.0".to_string(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        let session = BrowserSession::default();
        Self {
            headless: session.headless,
            extra_args: session.extra_args,
            max_concurrent_pages: session.max_concurrent_pages,
            chrome_executable: None,
            download_dir: "target/chromium".to_string(),
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            page_timeout_ms: 60_000,
            cache_mode: CacheMode::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl CrawlerConfig {
    /// Load configuration from a YAML file
    pub fn load_from_yaml(file_path: &str) -> CrawlerResult<Self> {
        let config_content = std::fs::read_to_string(file_path)
            .map_err(|_| ConfigurationError::FileNotFound(file_path.to_string()))?;
        let config: CrawlerConfig = serde_yaml::from_str(&config_content)?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> CrawlerResult<()> {
        url::Url::parse(&self.sitemap.url)?;

        if self.sitemap.user_agent.is_empty() {
            return Err(invalid("User agent cannot be empty"));
        }
        if self.browser.max_concurrent_pages == 0 {
            return Err(invalid("Max concurrent pages must be greater than 0"));
        }
        if self.browser.chrome_executable.is_none() && self.browser.download_dir.is_empty() {
            return Err(invalid(
                "Download directory cannot be empty when no Chromium executable is configured",
            ));
        }
        if self.run.page_timeout_ms == 0 {
            return Err(invalid("Page timeout must be greater than 0"));
        }
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigurationError::InvalidLogLevel(self.logging.level.clone()).into());
        }

        Ok(())
    }

    /// Launch options shared by the whole batch
    pub fn session(&self) -> BrowserSession {
        BrowserSession {
            headless: self.browser.headless,
            extra_args: self.browser.extra_args.clone(),
            max_concurrent_pages: self.browser.max_concurrent_pages,
        }
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig::new(Duration::from_millis(self.run.page_timeout_ms))
            .with_cache_mode(self.run.cache_mode)
    }

    pub fn chrome_executable(&self) -> Option<PathBuf> {
        self.browser.chrome_executable.as_ref().map(PathBuf::from)
    }

    /// Initialize logging based on configuration. `RUST_LOG` still applies on top.
    pub fn init_logging(&self) -> CrawlerResult<()> {
        use log::LevelFilter;

        let log_level = match self.logging.level.as_str() {
            "trace" => LevelFilter::Trace,
            "debug" => LevelFilter::Debug,
            "info" => LevelFilter::Info,
            "warn" => LevelFilter::Warn,
            "error" => LevelFilter::Error,
            other => return Err(ConfigurationError::InvalidLogLevel(other.to_string()).into()),
        };

        env_logger::Builder::new()
            .filter_level(log_level)
            .parse_default_env()
            .try_init()
            .map_err(|e| ConfigurationError::ValidationFailed(e.to_string()))?;

        Ok(())
    }
}

fn invalid(message: &str) -> super::errors::CrawlerError {
    ConfigurationError::ValidationFailed(message.to_string()).into()
}
