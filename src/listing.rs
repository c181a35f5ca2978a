use crate::{Result, ScraperConfig, ScraperError};
use reqwest::{Client, Response};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// One entry of the listing endpoint payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingItem {
    content_reference: String,
}

#[derive(Debug, Deserialize)]
struct ListingPage {
    #[serde(default)]
    items: Vec<ListingItem>,
}

/// The `PageFetcher` struct is the HTTP transport shared by the listing step and the
/// product page extraction.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    /// The HTTP client used for making requests.
    client: Client,
}

impl PageFetcher {
    /// Creates a new `PageFetcher` with the given configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration settings for the scraper.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `PageFetcher` instance, or an error if the client could not be created.
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .gzip(true)
            .build()
            .map_err(ScraperError::RequestError)?;

        Ok(Self { client })
    }

    /// Fetches the raw content of a page.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL of the page.
    ///
    /// # Returns
    ///
    /// A `Result` containing the page body, or a fetch error if the server does not answer
    /// with a success status.
    pub async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.get(url).await?;
        Ok(response.text().await?)
    }

    /// Fetches the listing endpoint and resolves every referenced product against `site_root`.
    ///
    /// # Arguments
    ///
    /// * `url` - The listing endpoint.
    /// * `site_root` - The root URL product references are relative to.
    ///
    /// # Returns
    ///
    /// A `Result` containing the product page URLs in listing order.
    pub async fn fetch_listing(&self, url: &str, site_root: &str) -> Result<Vec<String>> {
        let body = self.fetch(url).await?;
        let pages = parse_listing(&body, site_root)?;

        if pages.is_empty() {
            warn!("Listing {} returned no items", url);
        } else {
            info!("Listing {} returned {} product pages", url, pages.len());
        }

        Ok(pages)
    }

    /// Downloads a remote resource into `destination`, replacing any existing file.
    pub async fn download(&self, url: &str, destination: &Path) -> Result<u64> {
        let response = self.get(url).await?;
        let bytes = response.bytes().await?;
        tokio::fs::write(destination, &bytes).await?;

        debug!("Saved {} bytes from {} to {}", bytes.len(), url, destination.display());
        Ok(bytes.len() as u64)
    }

    async fn get(&self, url: &str) -> Result<Response> {
        debug!("Fetching {}", url);

        let response = self
            .client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,application/json;q=0.8,*/*;q=0.7")
            .header("Accept-Language", "fr-FR,fr;q=0.9,en;q=0.5")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::FetchError {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

/// Parses a listing payload into absolute product page URLs, keeping the item order.
///
/// # Arguments
///
/// * `body` - The JSON listing document.
/// * `site_root` - The root URL product references are relative to.
///
/// # Returns
///
/// A `Result` containing the URLs, or a parse error if the document is not a listing.
pub fn parse_listing(body: &str, site_root: &str) -> Result<Vec<String>> {
    let page: ListingPage = serde_json::from_str(body)
        .map_err(|e| ScraperError::ParseError(format!("Invalid listing document: {}", e)))?;

    let root = site_root.trim_end_matches('/');
    Ok(page
        .items
        .into_iter()
        .map(|item| format!("{}/{}", root, item.content_reference.trim_start_matches('/')))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> PageFetcher {
        PageFetcher::new(&ScraperConfig::default()).unwrap()
    }

    #[test]
    fn test_parse_listing_keeps_order() {
        let body = r#"{
            "items": [
                {"contentReference": "fr-FR/p/bieres/gallia-pale", "price": 2.5},
                {"contentReference": "/fr-FR/p/bieres/brasserie-du-mont-blanc"}
            ],
            "totalCount": 2
        }"#;

        let pages = parse_listing(body, "https://www.beerwulf.com/").unwrap();

        assert_eq!(
            pages,
            vec![
                "https://www.beerwulf.com/fr-FR/p/bieres/gallia-pale",
                "https://www.beerwulf.com/fr-FR/p/bieres/brasserie-du-mont-blanc",
            ]
        );
    }

    #[test]
    fn test_parse_listing_rejects_garbage() {
        let result = parse_listing("<html></html>", "https://www.beerwulf.com/");
        assert!(matches!(result, Err(ScraperError::ParseError(_))));
    }

    #[tokio::test]
    async fn test_fetch_listing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/search")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"items": [{"contentReference": "p/one"}, {"contentReference": "p/two"}]}"#)
            .create_async()
            .await;

        let root = server.url();
        let pages = fetcher()
            .fetch_listing(&format!("{}/api/search", root), &root)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(pages, vec![format!("{}/p/one", root), format!("{}/p/two", root)]);
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let url = format!("{}/missing", server.url());
        let err = fetcher().fetch(&url).await.unwrap_err();

        assert!(err.is_fetch_error());
        match err {
            ScraperError::FetchError { url: failed, status } => {
                assert_eq!(failed, url);
                assert_eq!(status, 404);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_download_writes_file() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/label.png")
            .with_status(200)
            .with_body("not really a png")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("label.png");
        let written = fetcher()
            .download(&format!("{}/label.png", server.url()), &destination)
            .await
            .unwrap();

        assert_eq!(written, 16);
        assert_eq!(std::fs::read_to_string(destination).unwrap(), "not really a png");
    }
}
