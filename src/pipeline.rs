//! Pipeline functions for programmatic use by both CLI and GUI.
//!
//! One cycle is: re-read the result export, skip if it is unchanged, otherwise
//! re-read the standards table, recompute every row and rewrite the report if
//! the table changed.

use crate::calc::{compute_table, OutputRow};
use crate::error::{Error, Result};
use crate::layout::ResultLayout;
use crate::report::{write_report, ReportEmitter};
use crate::settings::{save_paths, WatchPaths};
use crate::table::{parse_reference_rows, parse_result_records, to_result_rows, Record};
use chrono::{DateTime, Local};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Outcome of a cycle that recomputed the table.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Full recomputed table, in result-file order
    pub rows: Vec<OutputRow>,
    /// Whether the report file was rewritten (false when the table was unchanged)
    pub written: bool,
    pub finished_at: DateTime<Local>,
}

/// Check that both inputs can be read and the report can be written.
///
/// The report is probed by opening it for writing without truncating it.
pub fn validate(paths: &WatchPaths) -> Result<()> {
    check_readable(&paths.standards)?;
    check_readable(&paths.results)?;
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&paths.report)
        .map_err(|e| invalid(&paths.report, format!("not writable: {}", e)))?;
    Ok(())
}

fn check_readable(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(invalid(path, "not a file".to_string()));
    }
    File::open(path).map_err(|e| invalid(path, format!("not readable: {}", e)))?;
    Ok(())
}

fn invalid(path: &Path, reason: String) -> Error {
    Error::Validation {
        path: path.to_path_buf(),
        reason,
    }
}

/// Store the configured paths, logging rather than failing on error.
pub fn persist_paths(file: Option<&Path>, paths: &WatchPaths) {
    if let Some(file) = file {
        if let Err(e) = save_paths(file, paths) {
            log::warn!("Could not save paths to {}: {}", file.display(), e);
        }
    }
}

/// Run parse, recompute and emit once, without polling.
pub fn compute_once(paths: &WatchPaths, layout: &ResultLayout) -> Result<Vec<OutputRow>> {
    validate(paths)?;
    let references = parse_reference_rows(&paths.standards, layout)?;
    let records = parse_result_records(&paths.results, layout)?;
    let rows = to_result_rows(&records, layout)?;
    let output = compute_table(&rows, &references)?;
    write_report(&paths.report, &output, layout.report_delimiter)?;
    log::info!(
        "Wrote {} rows to {}",
        output.len(),
        paths.report.display()
    );
    Ok(output)
}

/// State carried from one cycle to the next within a run.
#[derive(Debug)]
pub struct Cycle {
    paths: WatchPaths,
    layout: ResultLayout,
    settings_file: Option<PathBuf>,
    emitter: ReportEmitter,
    last_records: Option<Vec<Record>>,
    count: u64,
}

impl Cycle {
    pub fn new(paths: WatchPaths, layout: ResultLayout, settings_file: Option<PathBuf>) -> Self {
        let emitter = ReportEmitter::new(&paths.report, layout.report_delimiter);
        Self {
            paths,
            layout,
            settings_file,
            emitter,
            last_records: None,
            count: 0,
        }
    }

    /// Number of cycles run so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Run one cycle. Returns `None` when the result export is unchanged.
    ///
    /// The first cycle always recomputes. Any error is fatal for the run and
    /// leaves the report on disk as it was.
    pub fn run(&mut self) -> Result<Option<CycleReport>> {
        // The first cycle's record was written while validating
        if self.count > 0 {
            persist_paths(self.settings_file.as_deref(), &self.paths);
        }
        self.count += 1;
        log::debug!("Cycle {}: reading {}", self.count, self.paths.results.display());

        let records = parse_result_records(&self.paths.results, &self.layout)?;
        if self.last_records.as_ref() == Some(&records) {
            log::info!("Result file unchanged, nothing to recompute");
            return Ok(None);
        }

        let references = parse_reference_rows(&self.paths.standards, &self.layout)?;
        let rows = to_result_rows(&records, &self.layout)?;
        let output = compute_table(&rows, &references)?;
        let written = self.emitter.emit_if_changed(&output)?;
        self.last_records = Some(records);

        Ok(Some(CycleReport {
            rows: output,
            written,
            finished_at: Local::now(),
        }))
    }
}
