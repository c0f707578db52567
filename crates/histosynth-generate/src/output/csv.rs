use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};

use histosynth_core::{History, SynthesizedTables, names};

use crate::errors::GenerationError;
use crate::merge::FullView;
use crate::model::FileFingerprint;

/// Write `rows` to `path` as CSV with serde-derived headers.
pub fn write_table<T: Serialize>(
    path: &Path,
    table: &str,
    rows: &[T],
) -> Result<FileFingerprint, GenerationError> {
    let file = BufWriter::new(File::create(path)?);
    let counting = CountingWriter::new(file);
    let mut writer = ::csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(counting);

    for row in rows {
        writer.serialize(row)?;
    }

    writer.flush()?;
    let mut counting = writer.into_inner().map_err(|err| err.into_error())?;
    counting.flush()?;

    Ok(FileFingerprint {
        table: table.to_string(),
        path: path.display().to_string(),
        rows: rows.len() as u64,
        bytes: counting.bytes_written(),
        sha256: counting.digest(),
    })
}

/// Write the new-rows tables into `dir`, one file per table.
pub fn write_synthesized(
    dir: &Path,
    tables: &SynthesizedTables,
) -> Result<Vec<FileFingerprint>, GenerationError> {
    std::fs::create_dir_all(dir)?;
    let mut files = TableFiles::new(dir);
    files.write(names::LOCATIONS, &tables.locations)?;
    files.write(names::CUSTOMERS, &tables.customers)?;
    files.write(names::EMPLOYEES, &tables.employees)?;
    files.write(names::EMPLOYMENT_PERIODS, &tables.employment_periods)?;
    files.write(names::ORDERS, &tables.orders)?;
    files.write(names::LINE_ITEMS, &tables.line_items)?;
    files.write(names::INVENTORY, &tables.inventory)?;
    files.write(names::REVIEWS, &tables.reviews)?;
    files.write(names::WEB_STATS, &tables.web_stats)?;
    files.write(names::SKILL_REVIEWS, &tables.skill_reviews)?;
    files.write(names::TERMINATION_REASONS, &tables.termination_reasons)?;
    files.write(names::LINE_ITEM_RETURNS, &tables.line_item_returns)?;
    Ok(files.into_fingerprints())
}

/// Write history followed by new rows into `dir`.
pub fn write_full_view(dir: &Path, view: &FullView) -> Result<Vec<FileFingerprint>, GenerationError> {
    std::fs::create_dir_all(dir)?;
    let mut files = TableFiles::new(dir);
    files.write(names::LOCATIONS, &view.locations)?;
    files.write(names::CUSTOMERS, &view.customers)?;
    files.write(names::EMPLOYEES, &view.employees)?;
    files.write(names::EMPLOYMENT_PERIODS, &view.employment_periods)?;
    files.write(names::ORDERS, &view.orders)?;
    files.write(names::LINE_ITEMS, &view.line_items)?;
    files.write(names::INVENTORY, &view.inventory)?;
    files.write(names::DISCOUNTS, &view.discounts)?;
    files.write(names::ITEMS, &view.items)?;
    files.write(names::REVIEWS, &view.reviews)?;
    files.write(names::WEB_STATS, &view.web_stats)?;
    files.write(names::SKILL_REVIEWS, &view.skill_reviews)?;
    files.write(names::TERMINATION_REASONS, &view.termination_reasons)?;
    files.write(names::LINE_ITEM_RETURNS, &view.line_item_returns)?;
    Ok(files.into_fingerprints())
}

/// Write a history in the layout `load_history` reads back.
pub fn write_history(dir: &Path, history: &History) -> Result<Vec<FileFingerprint>, GenerationError> {
    std::fs::create_dir_all(dir)?;
    let mut files = TableFiles::new(dir);
    files.write(names::CUSTOMERS, &history.customers)?;
    files.write(names::EMPLOYEES, &history.employees)?;
    files.write(names::EMPLOYMENT_PERIODS, &history.employment_periods)?;
    files.write(names::ORDERS, &history.orders)?;
    files.write(names::LINE_ITEMS, &history.line_items)?;
    files.write(names::INVENTORY, &history.inventory)?;
    files.write(names::DISCOUNTS, &history.discounts)?;
    files.write(names::ITEMS, &history.items)?;
    files.write(names::REVIEWS, &history.reviews)?;
    files.write(names::WEB_STATS, &history.web_stats)?;
    files.write(names::SKILL_REVIEWS, &history.skill_reviews)?;
    files.write(names::TERMINATION_REASONS, &history.termination_reasons)?;
    files.write(names::LINE_ITEM_RETURNS, &history.line_item_returns)?;
    Ok(files.into_fingerprints())
}

struct TableFiles<'a> {
    dir: &'a Path,
    fingerprints: Vec<FileFingerprint>,
}

impl<'a> TableFiles<'a> {
    fn new(dir: &'a Path) -> Self {
        Self {
            dir,
            fingerprints: Vec::new(),
        }
    }

    fn write<T: Serialize>(&mut self, table: &str, rows: &[T]) -> Result<(), GenerationError> {
        let path = self.dir.join(format!("{table}.csv"));
        let fingerprint = write_table(&path, table, rows)?;
        self.fingerprints.push(fingerprint);
        Ok(())
    }

    fn into_fingerprints(self) -> Vec<FileFingerprint> {
        self.fingerprints
    }
}

struct CountingWriter<W: Write> {
    inner: W,
    bytes: u64,
    hasher: Sha256,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            bytes: 0,
            hasher: Sha256::new(),
        }
    }

    fn bytes_written(&self) -> u64 {
        self.bytes
    }

    fn digest(&self) -> String {
        hex::encode(self.hasher.clone().finalize())
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let size = self.inner.write(buf)?;
        self.hasher.update(&buf[..size]);
        self.bytes = self.bytes.saturating_add(size as u64);
        Ok(size)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
