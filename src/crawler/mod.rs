// Sitemap discovery, batch rendering and the glue between them.
pub mod batch_fetcher;
pub mod chrome_fetcher;
pub mod config;
pub mod crawler;
pub mod diagnostics;
pub mod errors;
pub mod html_to_markdown;
pub mod logging;
pub mod outcome;
pub mod render;
pub mod sitemap;

pub use batch_fetcher::{BatchFetcher, BatchStream};
pub use crawler::{run_crawler, CrawlReport, Crawler};
pub use errors::{CrawlerError, CrawlerResult};
pub use outcome::{BatchSummary, FetchOutcome};
