//! Delimited table reading for the standards table and the instrument export.
//!
//! Instrument exports interleave data rows with human-readable headers and
//! footers. Those are dropped by row shape (field count) and by content (the
//! row number must be all digits), never reported as errors.

use crate::error::{Error, Result};
use crate::layout::{strip_line, ResultLayout};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// A raw row: one string per field, in file order.
pub type Record = Vec<String>;

/// Read every row of a delimited file, keeping those of the expected shape.
///
/// `expected_len` drops rows with a different field count; `keep` drops rows
/// failing the predicate. Fields are decoded lossily so stray non-UTF-8 bytes in
/// instrument exports do not abort the read.
pub fn parse_table(
    path: &Path,
    delimiter: u8,
    expected_len: Option<usize>,
    keep: Option<&dyn Fn(&[String]) -> bool>,
) -> Result<Vec<Record>> {
    let file = File::open(path)?;
    read_table(file, delimiter, expected_len, keep)
}

/// Same as [`parse_table`] over any reader.
pub fn read_table<R: Read>(
    input: R,
    delimiter: u8,
    expected_len: Option<usize>,
    keep: Option<&dyn Fn(&[String]) -> bool>,
) -> Result<Vec<Record>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(input);

    let mut rows = Vec::new();
    for result in reader.byte_records() {
        let record = result?;
        if expected_len.is_some_and(|n| record.len() != n) {
            continue;
        }
        let fields: Record = record
            .iter()
            .map(|f| String::from_utf8_lossy(f).into_owned())
            .collect();
        if keep.is_some_and(|f| !f(fields.as_slice())) {
            continue;
        }
        rows.push(fields);
    }
    Ok(rows)
}

/// Whether the first field, trimmed, is a non-empty run of ASCII digits.
pub fn is_numbered(fields: &[String]) -> bool {
    fields.first().is_some_and(|f| {
        let f = f.trim();
        !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit())
    })
}

/// Read the instrument export, keeping only numbered rows of the layout's width.
pub fn parse_result_records(path: &Path, layout: &ResultLayout) -> Result<Vec<Record>> {
    parse_table(
        path,
        layout.result_delimiter,
        Some(layout.row_len),
        Some(&is_numbered),
    )
}

/// Read the standards table.
pub fn parse_reference_rows(path: &Path, layout: &ResultLayout) -> Result<Vec<ReferenceRow>> {
    let min_len = layout.reference_min_len;
    let wide_enough = move |fields: &[String]| fields.len() >= min_len;
    let records = parse_table(path, layout.reference_delimiter, None, Some(&wide_enough))?;
    Ok(records.iter().map(|r| ReferenceRow::from_fields(r)).collect())
}

// ============================================================================
// Typed rows
// ============================================================================

/// One calibration standard from the standards table.
///
/// Numeric columns are kept as text and only parsed when a match needs them,
/// so a header line in the table costs nothing unless it is actually used.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceRow {
    /// Standard name, trimmed
    pub name: String,
    /// Analytical line, digits and spaces stripped
    pub line: String,
    pub concentration: String,
    pub absorbance: String,
    pub secondary: String,
}

impl ReferenceRow {
    /// Build from a row of at least five fields; missing fields read as empty.
    pub fn from_fields(fields: &[String]) -> Self {
        let get = |i: usize| fields.get(i).map(String::as_str).unwrap_or("");
        Self {
            name: get(0).trim().to_string(),
            line: strip_line(get(1)).to_string(),
            concentration: get(2).trim().to_string(),
            absorbance: get(3).trim().to_string(),
            secondary: get(4).trim().to_string(),
        }
    }

    /// Whether this is a standard entry rather than a header or note line.
    pub fn is_entry(&self) -> bool {
        self.concentration.parse::<f64>().is_ok()
    }

    /// Nominal concentration of this standard.
    pub fn concentration_value(&self) -> Result<f64> {
        self.concentration.parse().map_err(|_| {
            Error::computation(
                &self.name,
                format!(
                    "standard concentration {:?} for line {:?} is not a number",
                    self.concentration, self.line
                ),
            )
        })
    }
}

/// One measurement row from the instrument export.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub number: String,
    pub name: String,
    /// Analytical line as exported (strip with [`ResultRow::stripped_line`])
    pub line: String,
    /// Dilution/normalisation factor; blank means 1.0
    pub secondary: String,
    pub position: String,
    pub absorbance: String,
    pub date: String,
    pub time: String,
}

impl ResultRow {
    /// Extract the layout's columns from a raw row.
    pub fn from_fields(fields: &[String], layout: &ResultLayout) -> Result<Self> {
        let number = fields.get(layout.number).map(String::as_str).unwrap_or("");
        let get = |i: usize, what: &str| -> Result<String> {
            fields.get(i).cloned().ok_or_else(|| {
                Error::computation(
                    number,
                    format!("{} column {} missing ({} fields)", what, i, fields.len()),
                )
            })
        };
        Ok(Self {
            number: get(layout.number, "number")?,
            name: get(layout.name, "name")?,
            line: get(layout.line, "line")?,
            secondary: get(layout.secondary, "secondary")?,
            position: get(layout.position, "position")?,
            absorbance: get(layout.absorbance, "absorbance")?,
            date: get(layout.date, "date")?,
            time: get(layout.time, "time")?,
        })
    }

    pub fn stripped_line(&self) -> &str {
        strip_line(&self.line)
    }

    /// Measured absorbance as a number.
    pub fn absorbance_value(&self) -> Result<f64> {
        self.absorbance.trim().parse().map_err(|_| {
            Error::computation(
                &self.number,
                format!("absorbance {:?} is not a number", self.absorbance),
            )
        })
    }

    /// Whether this row's name is the name of any standard.
    pub fn is_standard(&self, references: &[ReferenceRow]) -> bool {
        let name = self.name.trim();
        references.iter().any(|r| r.is_entry() && r.name == name)
    }
}

/// Convert filtered raw rows into typed result rows.
pub fn to_result_rows(records: &[Record], layout: &ResultLayout) -> Result<Vec<ResultRow>> {
    records
        .iter()
        .map(|r| ResultRow::from_fields(r, layout))
        .collect()
}
