//! Filesystem helpers and CSV persistence for scraped records.

use crate::{FieldValue, Record, Result, ScraperError};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Creates `dir` and its parents if it does not exist yet.
///
/// Returns `true` when the directory was created by this call.
pub fn ensure_dir(dir: &Path) -> Result<bool> {
    if dir.is_dir() {
        return Ok(false);
    }
    fs::create_dir_all(dir)?;
    info!("Directory '{}' created", dir.display());
    Ok(true)
}

pub fn remove_file(path: &Path) -> Result<()> {
    fs::remove_file(path)?;
    debug!("Removed file {}", path.display());
    Ok(())
}

/// Removes a directory and everything below it.
pub fn remove_dir(dir: &Path) -> Result<()> {
    fs::remove_dir_all(dir)?;
    debug!("Removed directory {}", dir.display());
    Ok(())
}

/// A timestamped CSV path inside `dir`, e.g. `records_20241016_143205.csv`.
pub fn timestamped_csv_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{}_{}.csv", stem, Local::now().format("%Y%m%d_%H%M%S")))
}

/// Writes the records to `path` with one header row taken from the first record.
///
/// Every record must carry the same fields, in the same order, as the first one.
pub fn save_csv(records: &[Record], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;

    if let Some(first) = records.first() {
        let header: Vec<&str> = first.field_names().collect();
        writer.write_record(&header)?;

        for (row, record) in records.iter().enumerate() {
            if !record.field_names().eq(header.iter().copied()) {
                return Err(ScraperError::ParseError(format!(
                    "Record {} does not match the CSV header {:?}",
                    row, header
                )));
            }
            writer.write_record(record.fields().iter().map(|(_, value)| value.to_string()))?;
        }
    }

    writer.flush()?;
    info!("Saved {} records to '{}'", records.len(), path.display());
    Ok(())
}

/// Reads records written by [`save_csv`], re-typing each cell as integer, float or text.
pub fn load_csv(path: &Path) -> Result<Vec<Record>> {
    let mut reader = csv::Reader::from_path(path)?;
    let header = reader.headers()?.clone();

    let records = reader
        .records()
        .map(|row| -> Result<Record> {
            let row = row?;
            Ok(header
                .iter()
                .zip(row.iter())
                .fold(Record::new(), |record, (name, cell)| {
                    record.with_field(name, FieldValue::infer(cell))
                }))
        })
        .collect::<Result<Vec<_>>>()?;

    debug!("Loaded {} records from '{}'", records.len(), path.display());
    Ok(records)
}
