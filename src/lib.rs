use std::time::Duration;
use thiserror::Error;

pub mod config;
pub mod export;
pub mod listing;
pub mod report;
pub mod runner;
pub mod scraper;
pub mod types;

// Re-export commonly used types
pub use config::ScraperConfig;
pub use runner::{BatchRunner, Extract, ProductPageExtractor, Strategy};
pub use types::{BatchResult, FieldValue, Record};

/// The `ScraperError` enum represents the errors that can occur while listing, fetching,
/// parsing and batching product pages.
#[derive(Error, Debug)]
pub enum ScraperError {
    /// The HTTP transport failed before a response was received.
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    /// The remote server answered with a non-success status.
    #[error("Fetching {url} failed with status {status}")]
    FetchError { url: String, status: u16 },
    /// The expected structure is missing from a fetched document.
    #[error("Parsing failed: {0}")]
    ParseError(String),
    /// A batch was aborted by the first failing extraction.
    #[error("Batch aborted at {identifier}: {source}")]
    BatchError {
        identifier: String,
        #[source]
        source: Box<ScraperError>,
    },
    /// The execution strategy is invalid.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
    /// The layered settings could not be loaded.
    #[error("Failed to load settings: {0}")]
    SettingsError(#[from] ::config::ConfigError),
    /// A pool worker terminated abnormally.
    #[error("Worker failed: {0}")]
    WorkerError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ScraperError {
    /// Returns `true` for transport failures and non-success statuses.
    pub fn is_fetch_error(&self) -> bool {
        matches!(self, Self::RequestError(_) | Self::FetchError { .. })
    }

    /// Returns `true` when the document was fetched but could not be parsed.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::ParseError(_))
    }
}

/// A type alias for `Result` with the `ScraperError` error type.
pub type Result<T> = std::result::Result<T, ScraperError>;

// Constants

/// The default timeout duration for HTTP requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// The default number of pool workers.
pub const DEFAULT_WORKERS: i64 = 4;
/// The default site root that listing references are resolved against.
pub const DEFAULT_SITE_ROOT: &str = "https://www.beerwulf.com/";
/// The default listing endpoint: French bottled beers.
pub const DEFAULT_LISTING_URL: &str =
    "https://www.beerwulf.com/fr-FR/api/search/searchProducts?country=France&container=Bouteille";
