use std::path::Path;

use crate::crawler::config::CrawlerConfig;

/// Files checked in order; the first one that exists wins.
pub const CONFIG_CANDIDATES: [&str; 2] = ["config/crawler.yaml", "crawler.yaml"];

/// Try loading the crawler config from the common candidate paths.
/// A missing, unreadable or invalid file falls back to the defaults.
///
/// Runs before the logger is installed, so it reports on stderr.
pub fn load_app_config() -> CrawlerConfig {
    load_from_candidates(&CONFIG_CANDIDATES)
}

pub fn load_from_candidates(candidates: &[&str]) -> CrawlerConfig {
    for p in candidates {
        if !Path::new(p).exists() {
            continue;
        }
        match CrawlerConfig::load_from_yaml(p).and_then(|cfg| cfg.validate().map(|_| cfg)) {
            Ok(cfg) => {
                eprintln!("[config] loaded {}", p);
                return cfg;
            }
            Err(e) => {
                eprintln!("[config] ignoring {}: {}", p, e);
            }
        }
    }
    eprintln!("[config] using default crawler config");
    CrawlerConfig::default()
}
