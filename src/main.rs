use anyhow::Context;
use beer_scrape::{
    config::ScraperConfig,
    export,
    listing::PageFetcher,
    report::TimingReport,
    runner::{BatchRunner, ProductPageExtractor, Strategy},
    BatchResult,
};
use std::path::PathBuf;
use tracing::{error, info, warn};

/// The main entry point of the application.
///
/// This function initializes logging, loads the configuration, fetches the product listing,
/// extracts every product page once per strategy, prints the timing comparison and
/// optionally exports the records to CSV.
///
/// # Returns
///
/// A `Result` indicating the success or failure of the operation.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Optional configuration file as the first argument
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = ScraperConfig::load(config_path.as_deref()).context("loading configuration")?;

    let listing_url = config.resolved_listing_url();

    let fetcher = PageFetcher::new(&config)?;
    let pages = fetcher
        .fetch_listing(&listing_url, &config.site_root)
        .await
        .with_context(|| format!("fetching listing {}", listing_url))?;

    if pages.is_empty() {
        warn!("No product pages found in listing {}", listing_url);
        return Ok(());
    }

    let runner =
        BatchRunner::new(ProductPageExtractor::from_config(&config)?).with_progress(config.show_progress);

    let mut report = TimingReport::new(listing_url);
    let mut exported: Option<BatchResult> = None;

    // Each strategy runs independently; a failure is reported, not propagated.
    for strategy in [Ok(Strategy::Sequential), Strategy::pooled(config.workers)] {
        let strategy = match strategy {
            Ok(strategy) => strategy,
            Err(e) => {
                error!("Mode 'parallel' rejected: {}", e);
                report = report.with_rejected("parallel", &e);
                continue;
            }
        };
        let outcome = runner.run(&pages, strategy).await;
        match &outcome {
            Ok(result) => info!("Mode '{}' took {:.2?}", strategy.name(), result.elapsed),
            Err(e) => error!("Mode '{}' failed: {}", strategy.name(), e),
        }
        report = report.with_run(strategy, &outcome);
        if exported.is_none() {
            exported = outcome.ok();
        }
    }

    println!("\n{}", report.build());

    if let (Some(dir), Some(result)) = (&config.output_dir, &exported) {
        let path = export::timestamped_csv_path(dir, "beers");
        export::save_csv(&result.records, &path)
            .with_context(|| format!("exporting records to {}", path.display()))?;
        println!("Records saved to {}", path.display());
    }

    Ok(())
}
