use crate::{BatchResult, Result, ScraperError, Strategy};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Outcome of one strategy run as it appears in the report.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed { elapsed: Duration, records: usize },
    Failed(String),
}

/// One line of the comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct RunEntry {
    /// Display name of the strategy, e.g. `parallel (4 workers)`.
    pub mode: String,
    pub outcome: RunOutcome,
}

/// The `TimingReport` struct collects the outcome of each strategy run and renders
/// the comparative print-out.
pub struct TimingReport {
    /// The listing the batches were built from.
    source: String,
    /// The runs, in execution order.
    entries: Vec<RunEntry>,
    generated_at: DateTime<Utc>,
}

impl TimingReport {
    /// Creates a new, empty `TimingReport`.
    ///
    /// # Arguments
    ///
    /// * `source` - The listing the batches were built from.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            entries: Vec::new(),
            generated_at: Utc::now(),
        }
    }

    /// Adds the outcome of one strategy run. A failed run is kept so the other runs
    /// are still reported.
    pub fn with_run(mut self, strategy: Strategy, outcome: &Result<BatchResult>) -> Self {
        let outcome = match outcome {
            Ok(result) => RunOutcome::Completed {
                elapsed: result.elapsed,
                records: result.records.len(),
            },
            Err(e) => RunOutcome::Failed(e.to_string()),
        };
        self.entries.push(RunEntry {
            mode: strategy.to_string(),
            outcome,
        });
        self
    }

    /// Records a mode that never ran because its configuration was rejected.
    pub fn with_rejected(mut self, mode: impl Into<String>, error: &ScraperError) -> Self {
        self.entries.push(RunEntry {
            mode: mode.into(),
            outcome: RunOutcome::Failed(error.to_string()),
        });
        self
    }

    pub fn entries(&self) -> &[RunEntry] {
        &self.entries
    }

    /// The ratio between the slowest and the fastest completed run, if at least two
    /// runs completed.
    pub fn speedup(&self) -> Option<f64> {
        let durations: Vec<f64> = self
            .entries
            .iter()
            .filter_map(|entry| match entry.outcome {
                RunOutcome::Completed { elapsed, .. } => Some(elapsed.as_secs_f64()),
                RunOutcome::Failed(_) => None,
            })
            .collect();

        if durations.len() < 2 {
            return None;
        }

        let slowest = durations.iter().cloned().fold(f64::MIN, f64::max);
        let fastest = durations.iter().cloned().fold(f64::MAX, f64::min);
        if fastest <= 0.0 {
            return None;
        }
        Some(slowest / fastest)
    }

    /// Builds the report text.
    pub fn build(&self) -> String {
        let mut lines = vec![
            "=== Timing Comparison ===".to_string(),
            format!("Listing: {}", self.source),
            format!("Generated: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")),
        ];

        lines.extend(self.entries.iter().map(|entry| match &entry.outcome {
            RunOutcome::Completed { elapsed, records } => format!(
                "Mode '{}' took {:.3} seconds ({} records)",
                entry.mode,
                elapsed.as_secs_f64(),
                records
            ),
            RunOutcome::Failed(reason) => {
                format!("Mode '{}' failed: {}", entry.mode, reason)
            }
        }));

        if let Some(speedup) = self.speedup() {
            lines.push(format!("Speedup: {:.2}x", speedup));
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Record;

    fn completed(millis: u64, records: usize) -> Result<BatchResult> {
        Ok(BatchResult {
            elapsed: Duration::from_millis(millis),
            records: vec![Record::new(); records],
        })
    }

    #[test]
    fn test_report_lists_each_run() {
        let report = TimingReport::new("https://example.com/api")
            .with_run(Strategy::Sequential, &completed(4000, 12))
            .with_run(Strategy::Pooled(4), &completed(1000, 12));

        let text = report.build();

        assert!(text.contains("Listing: https://example.com/api"));
        assert!(text.contains("Mode 'sequential' took 4.000 seconds (12 records)"));
        assert!(text.contains("Mode 'parallel (4 workers)' took 1.000 seconds (12 records)"));
        assert!(text.contains("Speedup: 4.00x"));
    }

    #[test]
    fn test_failed_run_does_not_hide_the_other() {
        let failure = Err(ScraperError::BatchError {
            identifier: "https://example.com/p/2".to_string(),
            source: Box::new(ScraperError::ParseError("missing name".to_string())),
        });

        let report = TimingReport::new("listing")
            .with_run(Strategy::Sequential, &failure)
            .with_run(Strategy::Pooled(2), &completed(250, 3));

        let text = report.build();

        assert_eq!(report.entries().len(), 2);
        assert!(text.contains("Mode 'sequential' failed: Batch aborted at https://example.com/p/2"));
        assert!(text.contains("Mode 'parallel (2 workers)' took 0.250 seconds (3 records)"));
        assert_eq!(report.speedup(), None);
    }

    #[test]
    fn test_rejected_pool_is_reported_next_to_sequential_run() {
        let rejected = Strategy::pooled(-1).unwrap_err();

        let report = TimingReport::new("listing")
            .with_run(Strategy::Sequential, &completed(500, 3))
            .with_rejected("parallel", &rejected);

        let text = report.build();

        assert_eq!(report.entries().len(), 2);
        assert_eq!(report.entries()[1].mode, "parallel");
        assert!(text.contains("Mode 'sequential' took 0.500 seconds (3 records)"));
        assert!(text.contains(&format!("Mode 'parallel' failed: {}", rejected)));
        assert_eq!(report.speedup(), None);
    }
}
