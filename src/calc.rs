//! Concentration recomputation and the report row it produces.

use crate::error::{Error, Result};
use crate::matcher::{find_standard, Calibration};
use crate::table::{ReferenceRow, ResultRow};
use serde::{Deserialize, Serialize};

/// Placeholder written to the calibration-flag column.
pub const KAL_PLACEHOLDER: &str = " ";

/// One row of the emitted report. Only `concentration` is computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRow {
    pub number: String,
    pub name: String,
    pub line: String,
    pub concentration: String,
    pub kal: String,
    pub secondary_factor: String,
    pub position: String,
    pub absorbance: String,
    pub date: String,
    pub time: String,
}

impl OutputRow {
    /// Column titles, for display only; the report has no header row.
    pub const HEADERS: [&'static str; 10] = [
        "Number",
        "Name",
        "Line",
        "Concentration",
        "Kal",
        "Secondary",
        "Position",
        "Absorbance",
        "Date",
        "Time",
    ];
    /// Index of the computed column in [`OutputRow::fields`].
    pub const CONCENTRATION_COLUMN: usize = 3;

    pub fn new(row: &ResultRow, concentration: f64) -> Self {
        Self {
            number: row.number.clone(),
            name: row.name.clone(),
            line: row.line.clone(),
            concentration: format_concentration(concentration),
            kal: KAL_PLACEHOLDER.to_string(),
            secondary_factor: row.secondary.clone(),
            position: row.position.clone(),
            absorbance: row.absorbance.clone(),
            date: row.date.clone(),
            time: row.time.clone(),
        }
    }

    /// Fields in report column order.
    pub fn fields(&self) -> [&str; 10] {
        [
            self.number.as_str(),
            self.name.as_str(),
            self.line.as_str(),
            self.concentration.as_str(),
            self.kal.as_str(),
            self.secondary_factor.as_str(),
            self.position.as_str(),
            self.absorbance.as_str(),
            self.date.as_str(),
            self.time.as_str(),
        ]
    }
}

/// Shortest text that reads back as the same value, always with a decimal point.
pub fn format_concentration(value: f64) -> String {
    format!("{:?}", value)
}

/// Apply the two-factor ratio formula to one row.
///
/// `a = standard concentration * row absorbance / standard absorbance` (0 when
/// the standard absorbance is 0) and `b = row secondary / standard secondary`
/// (0 when the row's secondary is not a number; a blank row secondary reads as
/// 1). The result is `a * b`. A standard secondary of 0 is an error.
pub fn concentration(calibration: &Calibration, row: &ResultRow) -> Result<f64> {
    let absorbance = row.absorbance_value()?;

    let a = if calibration.absorbance == 0.0 {
        0.0
    } else {
        calibration.concentration * absorbance / calibration.absorbance
    };

    let raw = row.secondary.trim();
    let secondary = if raw.is_empty() {
        Some(1.0)
    } else {
        raw.parse::<f64>().ok()
    };
    let b = match secondary {
        Some(_) if calibration.secondary_factor == 0.0 => {
            return Err(Error::computation(
                &row.number,
                "standard secondary factor is 0, cannot scale the row's secondary factor",
            ));
        }
        Some(s) => s / calibration.secondary_factor,
        None => 0.0,
    };

    Ok(a * b)
}

/// Recompute every row of a run against the standards table.
///
/// Any failure aborts the whole table so no partial report can be written.
pub fn compute_table(rows: &[ResultRow], references: &[ReferenceRow]) -> Result<Vec<OutputRow>> {
    let mut output = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let calibration = find_standard(rows, index, references)
            .inspect_err(|e| log_failure(row, None, e))?;
        let value = concentration(&calibration, row)
            .inspect_err(|e| log_failure(row, Some(&calibration), e))?;
        output.push(OutputRow::new(row, value));
    }
    Ok(output)
}

fn log_failure(row: &ResultRow, calibration: Option<&Calibration>, e: &Error) {
    log::error!(
        "Row {} ({} {}): {} [standard: {:?}, absorbance: {:?}, secondary: {:?}]",
        row.number.trim(),
        row.name.trim(),
        row.line.trim(),
        e,
        calibration,
        row.absorbance,
        row.secondary
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn row(abs: &str, secondary: &str) -> ResultRow {
        ResultRow {
            number: "1".to_string(),
            name: "SMP".to_string(),
            line: "A2".to_string(),
            secondary: secondary.to_string(),
            position: "12".to_string(),
            absorbance: abs.to_string(),
            date: "2016-03-01".to_string(),
            time: "10:00".to_string(),
        }
    }

    fn calibration(concentration: f64, absorbance: f64, secondary_factor: f64) -> Calibration {
        Calibration {
            found: true,
            concentration,
            absorbance,
            secondary_factor,
        }
    }

    #[test]
    fn test_ratio_formula() {
        let c = concentration(&calibration(10.0, 2.0, 1.0), &row("4", "")).unwrap();
        assert_relative_eq!(c, 20.0);

        // (10 * 4 / 2) * (5 / 2.5)
        let c = concentration(&calibration(10.0, 2.0, 2.5), &row("4", "5")).unwrap();
        assert_relative_eq!(c, 40.0);
    }

    #[test]
    fn test_zero_standard_absorbance() {
        let c = concentration(&calibration(10.0, 0.0, 1.0), &row("4", "")).unwrap();
        assert_eq!(c, 0.0);
    }

    #[test]
    fn test_blank_secondary_reads_as_one() {
        let c = concentration(&calibration(3.0, 1.0, 2.0), &row("1", "  ")).unwrap();
        assert_relative_eq!(c, 1.5);
    }

    #[test]
    fn test_unparsable_secondary_zeroes_result() {
        let c = concentration(&calibration(10.0, 2.0, 1.0), &row("4", "x")).unwrap();
        assert_eq!(c, 0.0);
    }

    #[test]
    fn test_zero_standard_secondary_is_fatal() {
        let err = concentration(&calibration(10.0, 2.0, 0.0), &row("4", "2")).unwrap_err();
        assert!(matches!(err, Error::Computation { ref row, .. } if row == "1"), "{:?}", err);

        let err = concentration(&calibration(10.0, 2.0, 0.0), &row("4", "")).unwrap_err();
        assert!(matches!(err, Error::Computation { .. }));
    }

    #[test]
    fn test_unreadable_row_secondary_wins_over_zero_standard() {
        let c = concentration(&calibration(10.0, 2.0, 0.0), &row("4", "n/a")).unwrap();
        assert_eq!(c, 0.0);
    }

    #[test]
    fn test_no_calibration_is_zero() {
        let c = concentration(&Calibration::NONE, &row("4", "3")).unwrap();
        assert_eq!(c, 0.0);
    }

    #[test]
    fn test_non_numeric_absorbance_is_fatal() {
        let err = concentration(&Calibration::NONE, &row("OVER", "")).unwrap_err();
        assert!(matches!(err, Error::Computation { .. }));
    }

    #[test]
    fn test_format_concentration() {
        assert_eq!(format_concentration(20.0), "20.0");
        assert_eq!(format_concentration(0.0), "0.0");
        assert_eq!(format_concentration(0.125), "0.125");
        let v = 1.0 / 3.0;
        assert_eq!(format_concentration(v).parse::<f64>().unwrap(), v);
    }

    #[test]
    fn test_output_row_passes_fields_through() {
        let out = OutputRow::new(&row("4", "2"), 20.0);
        assert_eq!(
            out.fields(),
            ["1", "SMP", "A2", "20.0", " ", "2", "12", "4", "2016-03-01", "10:00"]
        );
        assert_eq!(out.fields()[OutputRow::CONCENTRATION_COLUMN], out.concentration);
    }

    #[test]
    fn test_compute_table() {
        let refs = vec![ReferenceRow::from_fields(&[
            "STD".to_string(),
            "A".to_string(),
            "10".to_string(),
            "2".to_string(),
            "".to_string(),
        ])];
        let mut standard = row("2", "");
        standard.name = "STD".to_string();
        standard.line = "A1".to_string();
        let rows = vec![standard, row("4", "")];

        let out = compute_table(&rows, &refs).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].concentration, "0.0");
        assert_eq!(out[1].concentration, "20.0");
    }

    #[test]
    fn test_compute_table_aborts_on_bad_row() {
        let rows = vec![row("4", ""), row("bad", "")];
        assert!(compute_table(&rows, &[]).is_err());
    }
}
