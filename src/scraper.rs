use crate::{Record, Result, ScraperError};
use scraper::{ElementRef, Html, Selector};
use tracing::instrument;

/// Field names of a product record, in export order.
pub const FIELD_NAME: &str = "name";
pub const FIELD_STYLE: &str = "style";
pub const FIELD_VOLUME: &str = "volume";
pub const FIELD_ALCOHOL: &str = "alcohol";
pub const FIELD_ORIGIN: &str = "origin";
pub const FIELD_BREWER: &str = "brewer";

/// CSS selectors describing where product fields live on a detail page.
///
/// The plain detail cells (`detail`) appear in a fixed order: style, alcohol
/// content, brewer. Volume and origin carry their own marker class.
#[derive(Debug, Clone)]
pub struct ProductLayout {
    pub container: String,
    pub name: String,
    pub detail: String,
    pub volume: String,
    pub origin: String,
}

impl Default for ProductLayout {
    fn default() -> Self {
        Self {
            container: String::from("div.small-12.content-column"),
            name: String::from("h1"),
            detail: String::from(r#"dd[class="small-6 medium-9 columns"]"#),
            volume: String::from("dd.js-beer-volume"),
            origin: String::from("dd.js-beer-country"),
        }
    }
}

/// The `ProductScraper` struct turns a product detail page into a [`Record`].
#[derive(Debug, Clone)]
pub struct ProductScraper {
    container: Selector,
    name: Selector,
    detail: Selector,
    volume: Selector,
    origin: Selector,
    link: Selector,
}

impl ProductScraper {
    /// Creates a new `ProductScraper` from the given layout.
    ///
    /// # Arguments
    ///
    /// * `layout` - The selectors locating each product field.
    ///
    /// # Returns
    ///
    /// A `Result` containing the scraper, or an error if one of the selectors is invalid.
    pub fn new(layout: &ProductLayout) -> Result<Self> {
        Ok(Self {
            container: parse_selector(&layout.container)?,
            name: parse_selector(&layout.name)?,
            detail: parse_selector(&layout.detail)?,
            volume: parse_selector(&layout.volume)?,
            origin: parse_selector(&layout.origin)?,
            link: parse_selector("a")?,
        })
    }

    /// Extracts the product fields from the given HTML string.
    ///
    /// # Arguments
    ///
    /// * `html` - The HTML string to be parsed.
    /// * `url` - The URL of the HTML document, used in error messages.
    ///
    /// # Returns
    ///
    /// A `Result` containing the product record, or a parse error naming the first missing field.
    #[instrument(skip(self, html), fields(html_length = html.len()))]
    pub fn extract(&self, html: &str, url: &str) -> Result<Record> {
        let document = Html::parse_document(html);
        let missing = |what: &str| ScraperError::ParseError(format!("{}: missing {}", url, what));

        let info = document
            .select(&self.container)
            .next()
            .ok_or_else(|| missing("product section"))?;

        let name = info
            .select(&self.name)
            .next()
            .map(text_of)
            .ok_or_else(|| missing(FIELD_NAME))?;

        let details: Vec<ElementRef> = info.select(&self.detail).collect();

        let style = details
            .first()
            .and_then(|cell| cell.select(&self.link).next())
            .map(text_of)
            .ok_or_else(|| missing(FIELD_STYLE))?;

        let volume = info
            .select(&self.volume)
            .next()
            .map(text_of)
            .ok_or_else(|| missing(FIELD_VOLUME))?;
        let volume = parse_volume(&volume).ok_or_else(|| {
            ScraperError::ParseError(format!("{}: invalid volume '{}'", url, volume))
        })?;

        let alcohol = details
            .get(1)
            .map(|cell| text_of(*cell))
            .ok_or_else(|| missing(FIELD_ALCOHOL))?;
        let alcohol = parse_alcohol(&alcohol).ok_or_else(|| {
            ScraperError::ParseError(format!("{}: invalid alcohol content '{}'", url, alcohol))
        })?;

        let origin = info
            .select(&self.origin)
            .next()
            .map(text_of)
            .ok_or_else(|| missing(FIELD_ORIGIN))?;

        let brewer = details
            .get(2)
            .map(|cell| text_of(*cell))
            .ok_or_else(|| missing(FIELD_BREWER))?;

        Ok(Record::new()
            .with_field(FIELD_NAME, name)
            .with_field(FIELD_STYLE, style)
            .with_field(FIELD_VOLUME, volume)
            .with_field(FIELD_ALCOHOL, alcohol)
            .with_field(FIELD_ORIGIN, origin)
            .with_field(FIELD_BREWER, brewer))
    }
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| ScraperError::ParseError(format!("Invalid selector '{}': {}", css, e)))
}

/// Collects the text of an element with whitespace normalized.
fn text_of(element: ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// "33 cl" -> 33
fn parse_volume(text: &str) -> Option<i64> {
    text.split_whitespace().next()?.parse().ok()
}

/// "5,5%" -> 5.5
fn parse_alcohol(text: &str) -> Option<f64> {
    text.replace(',', ".").replace('%', "").trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldValue;

    const PRODUCT_PAGE: &str = r#"
        <!DOCTYPE html>
        <html>
            <body>
                <div class="small-12 content-column">
                    <h1>
                        Gallia Pale Ale
                    </h1>
                    <dl>
                        <dt>Style</dt>
                        <dd class="small-6 medium-9 columns"><a href="/styles/pale-ale">Pale Ale</a></dd>
                        <dt>Contenu</dt>
                        <dd class="small-6 medium-9 columns js-beer-volume">33 cl</dd>
                        <dt>Degré d'alcool</dt>
                        <dd class="small-6 medium-9 columns">5,5%</dd>
                        <dt>Origine</dt>
                        <dd class="small-6 medium-9 columns js-beer-country">France</dd>
                        <dt>Brasseur</dt>
                        <dd class="small-6 medium-9 columns">Brasserie Gallia Paris</dd>
                    </dl>
                </div>
            </body>
        </html>
    "#;

    fn scraper() -> ProductScraper {
        ProductScraper::new(&ProductLayout::default()).unwrap()
    }

    #[test]
    fn test_product_extraction() {
        let record = scraper().extract(PRODUCT_PAGE, "https://example.com/gallia").unwrap();

        assert_eq!(
            record.field_names().collect::<Vec<_>>(),
            vec!["name", "style", "volume", "alcohol", "origin", "brewer"]
        );
        assert_eq!(record.get(FIELD_NAME), Some(&FieldValue::from("Gallia Pale Ale")));
        assert_eq!(record.get(FIELD_STYLE), Some(&FieldValue::from("Pale Ale")));
        assert_eq!(record.get(FIELD_VOLUME), Some(&FieldValue::Integer(33)));
        assert_eq!(record.get(FIELD_ALCOHOL), Some(&FieldValue::Float(5.5)));
        assert_eq!(record.get(FIELD_ORIGIN), Some(&FieldValue::from("France")));
        assert_eq!(record.get(FIELD_BREWER), Some(&FieldValue::from("Brasserie Gallia Paris")));
    }

    #[test]
    fn test_missing_section() {
        let result = scraper().extract("<html><body></body></html>", "https://example.com/empty");

        match result {
            Err(ScraperError::ParseError(message)) => {
                assert!(message.contains("https://example.com/empty"));
                assert!(message.contains("product section"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_volume() {
        let html = PRODUCT_PAGE.replace("33 cl", "unknown");
        let result = scraper().extract(&html, "https://example.com/gallia");

        assert!(matches!(result, Err(ScraperError::ParseError(m)) if m.contains("invalid volume")));
    }

    #[test]
    fn test_invalid_selector() {
        let layout = ProductLayout {
            container: String::from("div[["),
            ..ProductLayout::default()
        };

        assert!(ProductScraper::new(&layout).is_err());
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_volume("75 cl"), Some(75));
        assert_eq!(parse_volume(""), None);
        assert_eq!(parse_alcohol("8,0 %"), Some(8.0));
        assert_eq!(parse_alcohol("n/a"), None);
    }
}
