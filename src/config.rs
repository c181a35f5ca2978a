use crate::Result;
use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// The `ScraperConfig` struct holds the configuration settings for the scraper application.
/// It includes the listing endpoint, the site root for detail pages, the pool size and HTTP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// The listing endpoint returning the product references as JSON.
    pub listing_url: String,
    /// The root URL that product references are resolved against.
    pub site_root: String,
    /// Country filter; together with `container` it replaces `listing_url`.
    pub country: Option<String>,
    /// Container filter, e.g. `Bouteille`.
    pub container: Option<String>,
    /// The number of workers used by the pooled strategy.
    pub workers: i64,
    /// The timeout in seconds for HTTP requests.
    pub timeout_secs: u64,
    /// The user agent string to be used in HTTP requests.
    pub user_agent: String,
    /// Directory receiving a CSV export of the scraped records, if set.
    pub output_dir: Option<PathBuf>,
    /// Whether progress bars are drawn while batches run.
    pub show_progress: bool,
}

impl Default for ScraperConfig {
    /// Provides default values for the `ScraperConfig` struct.
    ///
    /// # Returns
    ///
    /// A `ScraperConfig` instance with default settings.
    fn default() -> Self {
        Self {
            listing_url: String::from(crate::DEFAULT_LISTING_URL),
            site_root: String::from(crate::DEFAULT_SITE_ROOT),
            country: None,
            container: None,
            workers: crate::DEFAULT_WORKERS,
            timeout_secs: crate::DEFAULT_TIMEOUT.as_secs(),
            user_agent: String::from("Mozilla/5.0 (compatible; RustBot/1.0)"),
            output_dir: None,
            show_progress: false,
        }
    }
}

impl ScraperConfig {
    /// Prefix of the environment variables overriding configuration values.
    pub const ENV_PREFIX: &'static str = "BEER_SCRAPE";

    /// Loads the configuration by layering, in increasing priority, the defaults,
    /// an optional configuration file and `BEER_SCRAPE_*` environment variables.
    ///
    /// # Arguments
    ///
    /// * `path` - An optional configuration file; its format is taken from the extension.
    ///
    /// # Returns
    ///
    /// A `Result` containing the merged configuration, or an error if a source is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Some(path) = path {
            debug!("Reading configuration from {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        }

        let settings = builder
            .add_source(Environment::with_prefix(Self::ENV_PREFIX).try_parsing(true))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// The timeout duration for HTTP requests.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The listing endpoint to scrape: the search endpoint filtered by `country` and
    /// `container` when both are set, `listing_url` otherwise.
    pub fn resolved_listing_url(&self) -> String {
        match (&self.country, &self.container) {
            (Some(country), Some(container)) => self.listing_url_for(country, container),
            _ => self.listing_url.clone(),
        }
    }

    /// Builds a search endpoint URL filtering the listing by country and container.
    pub fn listing_url_for(&self, country: &str, container: &str) -> String {
        format!(
            "{}fr-FR/api/search/searchProducts?country={}&container={}",
            with_trailing_slash(&self.site_root),
            urlencoding::encode(country),
            urlencoding::encode(container)
        )
    }
}

fn with_trailing_slash(root: &str) -> String {
    if root.ends_with('/') {
        root.to_string()
    } else {
        format!("{}/", root)
    }
}
