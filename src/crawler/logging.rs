use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::errors::CrawlerError;
use super::outcome::{BatchSummary, FetchOutcome};

/// Structured logging utilities for one crawler run
pub struct CrawlerLogger {
    start_time: Instant,
    operation_timers: HashMap<String, Instant>,
    stats: LoggingStats,
}

/// Statistics for logging operations
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoggingStats {
    pub total_operations: usize,
    pub successful_operations: usize,
    pub failed_operations: usize,
    pub pages_succeeded: usize,
    pub pages_failed: usize,
    pub errors_count: usize,
}

#[derive(Debug, Clone, Copy)]
enum LogLevel {
    Debug,
    Info,
    Warn,
}

/// Context information for structured logging
#[derive(Debug, Clone)]
struct LogContext {
    operation: &'static str,
    url: Option<String>,
    additional_data: Vec<(&'static str, String)>,
}

impl CrawlerLogger {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            operation_timers: HashMap::new(),
            stats: LoggingStats::default(),
        }
    }

    /// Start timing an operation
    pub fn start_operation(&mut self, operation_name: &str) {
        self.operation_timers
            .insert(operation_name.to_string(), Instant::now());
        info!("Starting operation: {}", operation_name);
    }

    /// End timing an operation and log the duration
    pub fn end_operation(&mut self, operation_name: &str, success: bool) {
        if let Some(start_time) = self.operation_timers.remove(operation_name) {
            let duration = start_time.elapsed();
            let status = if success { "SUCCESS" } else { "FAILED" };

            info!(
                "{} Operation '{}' completed in {:?}",
                status, operation_name, duration
            );

            self.stats.total_operations += 1;
            if success {
                self.stats.successful_operations += 1;
            } else {
                self.stats.failed_operations += 1;
            }
        }
    }

    /// Log the result of sitemap discovery
    pub fn log_discovery(&mut self, sitemap_url: &str, url_count: usize) {
        let context = LogContext {
            operation: "discovery",
            url: Some(sitemap_url.to_string()),
            additional_data: vec![("url_count", url_count.to_string())],
        };
        let level = if url_count == 0 {
            LogLevel::Warn
        } else {
            LogLevel::Info
        };
        self.log_structured(level, "Sitemap discovery completed", &context);
    }

    /// Record one page outcome
    pub fn log_outcome(&mut self, outcome: &FetchOutcome) {
        let (level, additional_data) = match outcome {
            FetchOutcome::Success { content_length, .. } => {
                self.stats.pages_succeeded += 1;
                (
                    LogLevel::Debug,
                    vec![("content_length", content_length.to_string())],
                )
            }
            FetchOutcome::Failure { error_detail, .. } => {
                self.stats.pages_failed += 1;
                (LogLevel::Warn, vec![("error", error_detail.clone())])
            }
        };
        let context = LogContext {
            operation: "render",
            url: Some(outcome.url().to_string()),
            additional_data,
        };
        self.log_structured(level, "Page finished", &context);
    }

    /// Log batch progress
    pub fn log_batch_progress(&self, current: usize, total: usize) {
        let percentage = if total > 0 {
            (current as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        debug!(
            "Batch progress: {}/{} ({:.1}%)",
            current, total, percentage
        );
    }

    /// Log a batch summary as reported by the fetcher
    pub fn log_batch_summary(&self, summary: &BatchSummary) {
        info!(
            "Batch finished: {} succeeded, {} failed",
            summary.succeeded, summary.failed
        );
        let recorded = self.stats.pages_succeeded + self.stats.pages_failed;
        if recorded != summary.total() {
            warn!(
                "Consumer saw {} outcome(s) but the batch produced {}",
                recorded,
                summary.total()
            );
        }
    }

    /// Log a fault that ended the run
    pub fn log_error(&mut self, err: &CrawlerError) {
        error!("Crawler run failed: {}", err);
        self.stats.errors_count += 1;
    }

    pub fn get_stats(&self) -> &LoggingStats {
        &self.stats
    }

    /// Get total elapsed time since logger creation
    pub fn get_total_elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Log final summary
    pub fn log_final_summary(&self) {
        let total_time = self.get_total_elapsed();

        info!("Crawler session completed in {:?}", total_time);
        info!("Final statistics:");
        info!("   Operations: {} ({} failed)", self.stats.total_operations, self.stats.failed_operations);
        info!("   Pages succeeded: {}", self.stats.pages_succeeded);
        info!("   Pages failed: {}", self.stats.pages_failed);
        info!("   Errors: {}", self.stats.errors_count);

        let pages = self.stats.pages_succeeded + self.stats.pages_failed;
        let success_rate = if pages > 0 {
            (self.stats.pages_succeeded as f64 / pages as f64) * 100.0
        } else {
            0.0
        };

        info!("   Success rate: {:.1}%", success_rate);
    }

    fn log_structured(&self, level: LogLevel, message: &str, context: &LogContext) {
        let log_entry = format!(
            "[{}] {} | URL: {} | Data: {:?}",
            context.operation,
            message,
            context.url.as_deref().unwrap_or("N/A"),
            context.additional_data
        );

        match level {
            LogLevel::Debug => debug!("{}", log_entry),
            LogLevel::Info => info!("{}", log_entry),
            LogLevel::Warn => warn!("{}", log_entry),
        }
    }
}

impl Default for CrawlerLogger {
    fn default() -> Self {
        Self::new()
    }
}
