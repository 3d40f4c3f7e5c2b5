pub mod cli;
pub mod config;
pub mod manager;
pub mod rate_limit;
pub mod robots;
pub mod scrapers;
pub mod web_scraper;

pub use cli::{handle_command, HumanDuration, ScraperArgs, ScraperCommands};
pub use config::ScraperConfig;
pub use manager::{Pipeline, PipelineOptions, PipelineReport};
pub use scrapers::{ContentSource, SearchHit, SourceRegistry};
pub use web_scraper::WebScraper;

pub mod prelude {
    pub use super::scrapers::{ContentSource, SearchHit};
    pub use super::{Pipeline, ScraperConfig, WebScraper};
    pub use bv_core::{Error, Result, ScrapedContent};
}
