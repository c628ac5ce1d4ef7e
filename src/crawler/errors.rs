use std::fmt;

/// Error types for the sitemap crawler
#[derive(Debug)]
pub enum CrawlerError {
    /// Sitemap fetch or parse errors
    Discovery(DiscoveryError),
    /// Shared browser lifecycle errors
    Browser(BrowserError),
    /// Configuration related errors
    Configuration(ConfigurationError),
}

/// Sitemap discovery specific errors
#[derive(Debug)]
pub enum DiscoveryError {
    /// Connection, DNS or transport failure
    Network(String),
    /// The server answered with a non-2xx status
    HttpStatus(u16),
    /// The body is not a sitemap document
    Parse(String),
}

/// Render/convert errors for a single page; reported inside its outcome, never propagated
#[derive(Debug)]
pub enum RenderError {
    Navigation(String),
    Timeout(u64),
    Content(String),
    Conversion(String),
    EmptyContent,
}

/// Browser session errors
#[derive(Debug)]
pub enum BrowserError {
    ExecutableNotFound(String),
    DownloadFailed(String),
    LaunchFailed(String),
    ReleaseFailed(String),
    BatchAborted(String),
}

/// Configuration specific errors
#[derive(Debug)]
pub enum ConfigurationError {
    FileNotFound(String),
    ParseError(String),
    ValidationFailed(String),
    InvalidLogLevel(String),
}

impl fmt::Display for CrawlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlerError::Discovery(e) => write!(f, "Discovery error: {}", e),
            CrawlerError::Browser(e) => write!(f, "Browser error: {}", e),
            CrawlerError::Configuration(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryError::Network(msg) => write!(f, "{}", msg),
            DiscoveryError::HttpStatus(code) => write!(f, "HTTP status {}", code),
            DiscoveryError::Parse(msg) => write!(f, "invalid sitemap XML: {}", msg),
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Navigation(msg) => write!(f, "Navigation failed: {}", msg),
            RenderError::Timeout(ms) => write!(f, "Page load timed out after {}ms", ms),
            RenderError::Content(msg) => write!(f, "Failed to read page content: {}", msg),
            RenderError::Conversion(msg) => write!(f, "Markdown conversion failed: {}", msg),
            RenderError::EmptyContent => write!(f, "HTML content is empty"),
        }
    }
}

impl fmt::Display for BrowserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserError::ExecutableNotFound(path) => {
                write!(f, "Chromium executable not found: {}", path)
            }
            BrowserError::DownloadFailed(msg) => write!(f, "Chromium download failed: {}", msg),
            BrowserError::LaunchFailed(msg) => write!(f, "Failed to launch Chromium: {}", msg),
            BrowserError::ReleaseFailed(msg) => write!(f, "Failed to close Chromium: {}", msg),
            BrowserError::BatchAborted(msg) => write!(f, "Batch aborted: {}", msg),
        }
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::FileNotFound(path) => {
                write!(f, "Configuration file not found: {}", path)
            }
            ConfigurationError::ParseError(msg) => write!(f, "Configuration parse error: {}", msg),
            ConfigurationError::ValidationFailed(msg) => {
                write!(f, "Configuration validation failed: {}", msg)
            }
            ConfigurationError::InvalidLogLevel(level) => {
                write!(f, "Invalid log level: {}", level)
            }
        }
    }
}

impl std::error::Error for CrawlerError {}
impl std::error::Error for DiscoveryError {}
impl std::error::Error for RenderError {}
impl std::error::Error for BrowserError {}
impl std::error::Error for ConfigurationError {}

impl From<url::ParseError> for CrawlerError {
    fn from(err: url::ParseError) -> Self {
        CrawlerError::Configuration(ConfigurationError::ValidationFailed(err.to_string()))
    }
}

impl From<serde_yaml::Error> for CrawlerError {
    fn from(err: serde_yaml::Error) -> Self {
        CrawlerError::Configuration(ConfigurationError::ParseError(err.to_string()))
    }
}

impl From<DiscoveryError> for CrawlerError {
    fn from(err: DiscoveryError) -> Self {
        CrawlerError::Discovery(err)
    }
}

impl From<BrowserError> for CrawlerError {
    fn from(err: BrowserError) -> Self {
        CrawlerError::Browser(err)
    }
}

impl From<ConfigurationError> for CrawlerError {
    fn from(err: ConfigurationError) -> Self {
        CrawlerError::Configuration(err)
    }
}

/// Result type alias for crawler operations
pub type CrawlerResult<T> = Result<T, CrawlerError>;
