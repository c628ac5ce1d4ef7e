mod loader;

pub use loader::{load_app_config, load_from_candidates, CONFIG_CANDIDATES};
