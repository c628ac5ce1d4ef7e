use sitemap_crawler::config::load_app_config;
use sitemap_crawler::crawler::run_crawler;

#[tokio::main]
async fn main() {
    let config = load_app_config();
    if let Err(e) = config.init_logging() {
        eprintln!("[logging] {}", e);
    }

    match run_crawler(&config).await {
        Ok(report) => log::info!(
            "run finished: {} URL(s) found, {} succeeded, {} failed",
            report.urls_found,
            report.summary.succeeded,
            report.summary.failed
        ),
        // the run never changes the exit status
        Err(e) => log::error!("crawler stopped: {}", e),
    }
}
