pub mod browser;
pub mod catalog;
pub mod config;
pub mod discovery;
pub mod error;

pub use config::{load_scraper_config, ScraperConfig};
pub use error::{ConfigError, Result};
