//! Writing the recomputed table to the report file.
//!
//! The report is semicolon-delimited, every field quoted, no header. It is
//! written to a temporary file next to the destination and renamed over it,
//! so a failed write leaves the previous report as it was.

use crate::calc::OutputRow;
use crate::error::{Error, Result};
use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Write `rows` to `path`, replacing any previous report.
pub fn write_report(path: &Path, rows: &[OutputRow], delimiter: u8) -> Result<()> {
    let wrap = |source: std::io::Error| Error::ReportWrite {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let tmp = NamedTempFile::new_in(dir).map_err(wrap)?;
    {
        let mut writer = WriterBuilder::new()
            .delimiter(delimiter)
            .quote_style(QuoteStyle::Always)
            .has_headers(false)
            .from_writer(tmp.as_file());
        for row in rows {
            writer.serialize(row).map_err(|e| wrap(e.into()))?;
        }
        writer.flush().map_err(wrap)?;
    }
    tmp.as_file().sync_all().map_err(wrap)?;
    tmp.persist(path).map_err(|e| wrap(e.error))?;
    Ok(())
}

/// Read a report back into rows.
pub fn read_report(path: &Path, delimiter: u8) -> Result<Vec<OutputRow>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

/// Report writer that skips rewriting an unchanged table.
#[derive(Debug)]
pub struct ReportEmitter {
    path: PathBuf,
    delimiter: u8,
    last: Option<Vec<OutputRow>>,
}

impl ReportEmitter {
    pub fn new(path: impl Into<PathBuf>, delimiter: u8) -> Self {
        Self {
            path: path.into(),
            delimiter,
            last: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the table unless it equals the last one written.
    ///
    /// Returns whether the file was written. On failure the remembered table is
    /// left as it was, so the next call tries again.
    pub fn emit_if_changed(&mut self, rows: &[OutputRow]) -> Result<bool> {
        if self.last.as_deref() == Some(rows) {
            log::info!("Report unchanged, not rewriting {}", self.path.display());
            return Ok(false);
        }
        write_report(&self.path, rows, self.delimiter)?;
        log::info!("Wrote {} rows to {}", rows.len(), self.path.display());
        self.last = Some(rows.to_vec());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(number: &str, name: &str, concentration: &str) -> OutputRow {
        OutputRow {
            number: number.to_string(),
            name: name.to_string(),
            line: "Cu 1".to_string(),
            concentration: concentration.to_string(),
            kal: " ".to_string(),
            secondary_factor: String::new(),
            position: "3".to_string(),
            absorbance: "0.25".to_string(),
            date: "01.03.2016".to_string(),
            time: "10:15:00".to_string(),
        }
    }

    #[test]
    fn test_report_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        write_report(&path, &[output("1", "STD", "0.0")], b';').unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "\"1\";\"STD\";\"Cu 1\";\"0.0\";\" \";\"\";\"3\";\"0.25\";\"01.03.2016\";\"10:15:00\"\n"
        );
    }

    #[test]
    fn test_report_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        let rows = vec![
            output("1", "STD; \"high\"", "0.0"),
            output("2", "sample, 2", "20.0"),
        ];
        write_report(&path, &rows, b';').unwrap();
        assert_eq!(read_report(&path, b';').unwrap(), rows);
    }

    #[test]
    fn test_failed_write_keeps_previous_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        write_report(&path, &[output("1", "STD", "0.0")], b';').unwrap();
        let before = std::fs::read(&path).unwrap();

        let missing = dir.path().join("no-such-dir").join("report.csv");
        let err = write_report(&missing, &[output("2", "X", "1.0")], b';').unwrap_err();
        assert!(matches!(err, Error::ReportWrite { .. }));
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_emitter_skips_unchanged_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        let mut emitter = ReportEmitter::new(&path, b';');
        let rows = vec![output("1", "STD", "0.0")];

        assert!(emitter.emit_if_changed(&rows).unwrap());
        std::fs::write(&path, "sentinel").unwrap();
        assert!(!emitter.emit_if_changed(&rows).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "sentinel");

        let changed = vec![output("1", "STD", "1.0")];
        assert!(emitter.emit_if_changed(&changed).unwrap());
        assert_eq!(read_report(&path, b';').unwrap(), changed);
    }
}
