use std::fmt;

/// Markdown produced for one rendered page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkdownGenerationResult {
    /// Unprocessed conversion output
    pub raw_markdown: String,
    /// Post-processed variant, when a generator produces one
    pub fit_markdown: Option<String>,
}

impl MarkdownGenerationResult {
    pub fn raw(markdown: impl Into<String>) -> Self {
        Self {
            raw_markdown: markdown.into(),
            fit_markdown: None,
        }
    }
}

/// Result of one render-and-convert operation as reported by a render context.
///
/// Only [`FetchOutcome`] leaves the batch fetcher; this shape stays at the
/// render boundary.
#[derive(Debug, Clone, Default)]
pub struct CrawlResult {
    pub url: String,
    pub success: bool,
    pub markdown: Option<MarkdownGenerationResult>,
    pub error_message: Option<String>,
}

impl CrawlResult {
    pub fn success(url: impl Into<String>, markdown: MarkdownGenerationResult) -> Self {
        Self {
            url: url.into(),
            success: true,
            markdown: Some(markdown),
            error_message: None,
        }
    }

    pub fn failure(url: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            success: false,
            markdown: None,
            error_message: Some(error_message.into()),
        }
    }
}

/// Outcome of fetching one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success { url: String, content_length: usize },
    Failure { url: String, error_detail: String },
}

const UNKNOWN_ERROR: &str = "Unknown error";

impl FetchOutcome {
    pub fn url(&self) -> &str {
        match self {
            FetchOutcome::Success { url, .. } | FetchOutcome::Failure { url, .. } => url,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }

    /// Progress line printed as the outcome is produced
    pub fn diagnostic_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchOutcome::Success {
                url,
                content_length,
            } => write!(f, "[OK] {} — Markdown length: {}", url, content_length),
            FetchOutcome::Failure { url, error_detail } => {
                write!(f, "[FAIL] {} — Error: {}", url, error_detail)
            }
        }
    }
}

impl From<CrawlResult> for FetchOutcome {
    fn from(result: CrawlResult) -> Self {
        if result.success {
            // character count of the raw body; fit_markdown is never measured
            let content_length = result
                .markdown
                .as_ref()
                .map(|md| md.raw_markdown.chars().count())
                .unwrap_or(0);
            FetchOutcome::Success {
                url: result.url,
                content_length,
            }
        } else {
            let error_detail = match result.error_message {
                Some(message) if !message.trim().is_empty() => message,
                _ => UNKNOWN_ERROR.to_string(),
            };
            FetchOutcome::Failure {
                url: result.url,
                error_detail,
            }
        }
    }
}

/// Per-batch tally returned once the batch has finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn record(&mut self, outcome: &FetchOutcome) {
        if outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}
