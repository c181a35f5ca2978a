use crate::listing::PageFetcher;
use crate::scraper::{ProductLayout, ProductScraper};
use crate::{BatchResult, Record, Result, ScraperConfig, ScraperError};
use futures::{stream, StreamExt, TryStreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

/// Turns one page identifier into one record.
///
/// This is the only seam between the batch runner and the outside world: fetching
/// and parsing both happen behind it.
pub trait Extract: Send + Sync + 'static {
    fn extract(&self, identifier: &str) -> impl Future<Output = Result<Record>> + Send;
}

/// Fetches a product page over HTTP and parses it into a record.
pub struct ProductPageExtractor {
    fetcher: PageFetcher,
    scraper: ProductScraper,
}

impl ProductPageExtractor {
    pub fn new(fetcher: PageFetcher, scraper: ProductScraper) -> Self {
        Self { fetcher, scraper }
    }

    /// Builds an extractor with a fresh HTTP client and the default page layout.
    pub fn from_config(config: &ScraperConfig) -> Result<Self> {
        Ok(Self::new(
            PageFetcher::new(config)?,
            ProductScraper::new(&ProductLayout::default())?,
        ))
    }
}

impl Extract for ProductPageExtractor {
    async fn extract(&self, identifier: &str) -> Result<Record> {
        let html = self.fetcher.fetch(identifier).await?;
        self.scraper.extract(&html, identifier)
    }
}

/// The execution policy of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One page at a time, in input order.
    Sequential,
    /// A fixed-size pool of concurrent workers.
    Pooled(usize),
}

impl Strategy {
    /// Builds a pooled strategy, rejecting non-positive worker counts.
    pub fn pooled(workers: i64) -> Result<Self> {
        if workers <= 0 {
            return Err(ScraperError::ConfigError(format!(
                "Worker count must be positive, got {}",
                workers
            )));
        }
        Ok(Self::Pooled(workers as usize))
    }

    /// Parses a mode name as used in configuration: `sequential` or `parallel`.
    pub fn from_mode(mode: &str, workers: i64) -> Result<Self> {
        match mode.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "parallel" | "pooled" => Self::pooled(workers),
            other => Err(ScraperError::ConfigError(format!(
                "Unknown mode '{}', expected 'sequential' or 'parallel'",
                other
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Pooled(_) => "parallel",
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Self::Pooled(0) => Err(ScraperError::ConfigError(
                "Worker count must be positive, got 0".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => f.write_str("sequential"),
            Self::Pooled(workers) => write!(f, "parallel ({} workers)", workers),
        }
    }
}

type WorkQueue = Arc<Mutex<VecDeque<(usize, String)>>>;

/// The `BatchRunner` struct turns an ordered list of page identifiers into an ordered
/// list of records, timing the run.
pub struct BatchRunner<E> {
    extractor: Arc<E>,
    show_progress: bool,
}

impl<E: Extract> BatchRunner<E> {
    pub fn new(extractor: E) -> Self {
        Self::from_shared(Arc::new(extractor))
    }

    /// Creates a runner around an extractor the caller keeps a handle to.
    pub fn from_shared(extractor: Arc<E>) -> Self {
        Self {
            extractor,
            show_progress: false,
        }
    }

    /// Draws a progress bar on the terminal while batches run.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Extracts one record per identifier with the given strategy.
    ///
    /// # Arguments
    ///
    /// * `identifiers` - The page identifiers, in the order records must be returned.
    /// * `strategy` - How extraction work is scheduled.
    ///
    /// # Returns
    ///
    /// A `Result` containing the elapsed time and the records in input order, or a
    /// `BatchError` for the first failing identifier. No partial result is ever returned.
    #[instrument(skip(self, identifiers, strategy), fields(pages = identifiers.len(), strategy = %strategy))]
    pub async fn run(&self, identifiers: &[String], strategy: Strategy) -> Result<BatchResult> {
        strategy.validate()?;

        if identifiers.is_empty() {
            debug!("Nothing to extract");
            return Ok(BatchResult::empty());
        }

        info!("Extracting {} pages", identifiers.len());
        let progress = self.progress_bar(identifiers.len(), strategy);

        let started = Instant::now();
        let outcome = match strategy {
            Strategy::Sequential => self.run_sequential(identifiers, &progress).await,
            Strategy::Pooled(workers) => self.run_pooled(identifiers, workers, &progress).await,
        };
        let elapsed = started.elapsed();

        match outcome {
            Ok(records) => {
                progress.finish_with_message(format!("Extracted {} pages", records.len()));
                info!("Extracted {} pages in {:.2?}", records.len(), elapsed);
                Ok(BatchResult { elapsed, records })
            }
            Err(e) => {
                progress.abandon_with_message("Batch aborted");
                error!("Batch aborted after {:.2?}: {}", elapsed, e);
                Err(e)
            }
        }
    }

    async fn run_sequential(
        &self,
        identifiers: &[String],
        progress: &ProgressBar,
    ) -> Result<Vec<Record>> {
        stream::iter(identifiers)
            .then(|identifier| async move {
                let outcome = self.extractor.extract(identifier).await;
                progress.inc(1);
                outcome.map_err(|source| batch_error(identifier, source))
            })
            .try_collect()
            .await
    }

    async fn run_pooled(
        &self,
        identifiers: &[String],
        workers: usize,
        progress: &ProgressBar,
    ) -> Result<Vec<Record>> {
        let queue: WorkQueue = Arc::new(Mutex::new(
            identifiers.iter().cloned().enumerate().collect(),
        ));
        let (results_tx, mut results_rx) = mpsc::unbounded_channel();

        let pool_size = workers.min(identifiers.len());
        let mut pool = JoinSet::new();
        for worker in 0..pool_size {
            pool.spawn(work(
                worker,
                Arc::clone(&self.extractor),
                Arc::clone(&queue),
                results_tx.clone(),
            ));
        }
        drop(results_tx);
        debug!("Started {} workers", pool_size);

        let mut slots: Vec<Option<Record>> = vec![None; identifiers.len()];
        let mut failure = None;

        while let Some((index, outcome)) = results_rx.recv().await {
            match outcome {
                Ok(record) => {
                    slots[index] = Some(record);
                    progress.inc(1);
                }
                Err(source) => {
                    failure = Some(batch_error(&identifiers[index], source));
                    break;
                }
            }
        }

        if failure.is_some() {
            pool.abort_all();
        }

        // Every worker is joined before returning, whatever the outcome.
        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                if e.is_panic() {
                    warn!("Worker panicked: {}", e);
                    if failure.is_none() {
                        failure = Some(ScraperError::WorkerError(e.to_string()));
                    }
                }
            }
        }
        debug!("Worker pool torn down");

        if let Some(e) = failure {
            return Err(e);
        }

        slots
            .into_iter()
            .zip(identifiers)
            .map(|(slot, identifier)| {
                slot.ok_or_else(|| {
                    ScraperError::WorkerError(format!("No record produced for {}", identifier))
                })
            })
            .collect()
    }

    fn progress_bar(&self, len: usize, strategy: Strategy) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let bar = ProgressBar::new(len as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.green} {msg} [{bar:30}] {pos}/{len}")
        {
            bar.set_style(style);
        }
        bar.set_message(format!("Scraping ({})", strategy));
        bar
    }
}

/// Pulls identifiers off the shared queue until it is empty or an extraction fails.
async fn work<E: Extract>(
    worker: usize,
    extractor: Arc<E>,
    queue: WorkQueue,
    results: UnboundedSender<(usize, Result<Record>)>,
) {
    while let Some((index, identifier)) = next_item(&queue) {
        debug!(worker, index, "Extracting {}", identifier);

        let outcome = extractor.extract(&identifier).await;
        let failed = outcome.is_err();
        if results.send((index, outcome)).is_err() || failed {
            break;
        }
    }
}

fn next_item(queue: &WorkQueue) -> Option<(usize, String)> {
    queue.lock().ok()?.pop_front()
}

fn batch_error(identifier: &str, source: ScraperError) -> ScraperError {
    ScraperError::BatchError {
        identifier: identifier.to_string(),
        source: Box::new(source),
    }
}
