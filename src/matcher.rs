//! Locating the calibration standard that brackets a sample.
//!
//! Instrument runs interleave standards with samples in one chronological
//! stream. A sample is normalised against the nearest standard measured
//! before it, found by walking the run backwards from the sample itself.

use crate::error::{Error, Result};
use crate::table::{ReferenceRow, ResultRow};

/// Calibration parameters taken from a matched standard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Whether a bracketing standard on the same line was found
    pub found: bool,
    /// Nominal concentration of the standard (from the standards table)
    pub concentration: f64,
    /// Absorbance the instrument measured for the standard
    pub absorbance: f64,
    /// Secondary factor the standard was run with
    pub secondary_factor: f64,
}

impl Calibration {
    /// No standard applies. Evaluates to a concentration of 0.
    pub const NONE: Calibration = Calibration {
        found: false,
        concentration: 0.0,
        absorbance: 1.0,
        secondary_factor: 1.0,
    };
}

impl Default for Calibration {
    fn default() -> Self {
        Self::NONE
    }
}

/// Read a secondary-factor field: blank is 1.0, anything else must be a number.
pub fn secondary_factor(row: &ResultRow) -> Result<f64> {
    let raw = row.secondary.trim();
    if raw.is_empty() {
        return Ok(1.0);
    }
    raw.parse().map_err(|_| {
        Error::computation(
            &row.number,
            format!("standard secondary factor {:?} is not a number", row.secondary),
        )
    })
}

/// Find the standard for `rows[index]` among `rows[..=index]`.
///
/// The walk goes backwards starting at the row itself and stops at the first
/// row whose name is a standard name:
/// - the row itself being a standard yields no match;
/// - a standard on the same stripped line is the match;
/// - a standard on another line also ends the walk, with no match.
///
/// Rows after `index` are never looked at.
pub fn find_standard(
    rows: &[ResultRow],
    index: usize,
    references: &[ReferenceRow],
) -> Result<Calibration> {
    let current = rows.get(index).ok_or_else(|| {
        Error::computation(
            &index.to_string(),
            format!("row index out of range ({} rows)", rows.len()),
        )
    })?;
    let target = current.stripped_line();

    for (i, candidate) in rows[..=index].iter().enumerate().rev() {
        if !candidate.is_standard(references) {
            continue;
        }
        if i == index || candidate.stripped_line() != target {
            return Ok(Calibration::NONE);
        }

        let concentration = match references.iter().find(|r| r.is_entry() && r.line == target) {
            Some(reference) => reference.concentration_value()?,
            None => {
                log::warn!(
                    "Row {}: no standard in the table lists line {:?}",
                    current.number.trim(),
                    target
                );
                0.0
            }
        };
        return Ok(Calibration {
            found: true,
            concentration,
            absorbance: candidate.absorbance_value()?,
            secondary_factor: secondary_factor(candidate)?,
        });
    }

    Ok(Calibration::NONE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(name: &str, line: &str, conc: &str) -> ReferenceRow {
        ReferenceRow::from_fields(&[
            name.to_string(),
            line.to_string(),
            conc.to_string(),
            "0.1".to_string(),
            "".to_string(),
        ])
    }

    fn row(number: &str, name: &str, line: &str, abs: &str, secondary: &str) -> ResultRow {
        ResultRow {
            number: number.to_string(),
            name: name.to_string(),
            line: line.to_string(),
            secondary: secondary.to_string(),
            position: String::new(),
            absorbance: abs.to_string(),
            date: String::new(),
            time: String::new(),
        }
    }

    #[test]
    fn test_nearest_standard_on_same_line() {
        let refs = vec![reference("STD", "A", "10")];
        let rows = vec![row("1", "STD", "A1", "2", ""), row("2", "SMP", "A2", "4", "")];

        let cal = find_standard(&rows, 1, &refs).unwrap();
        assert!(cal.found);
        assert_eq!(cal.concentration, 10.0);
        assert_eq!(cal.absorbance, 2.0);
        assert_eq!(cal.secondary_factor, 1.0);
    }

    #[test]
    fn test_standard_row_does_not_match_itself() {
        let refs = vec![reference("STD", "A", "10")];
        let rows = vec![row("1", "STD", "A1", "2", ""), row("2", "STD", "A2", "3", "")];

        assert_eq!(find_standard(&rows, 1, &refs).unwrap(), Calibration::NONE);
        assert_eq!(find_standard(&rows, 0, &refs).unwrap(), Calibration::NONE);
    }

    #[test]
    fn test_walk_stops_at_first_standard_even_on_other_line() {
        let refs = vec![reference("STD-A", "A", "10"), reference("STD-B", "B", "20")];
        let rows = vec![
            row("1", "STD-A", "A", "2", ""),
            row("2", "SMP", "A", "4", ""),
            row("3", "STD-B", "B", "5", ""),
            row("4", "SMP", "A", "4", ""),
        ];

        assert!(find_standard(&rows, 1, &refs).unwrap().found);
        // STD-B bounds the search, STD-A is never reached
        assert_eq!(find_standard(&rows, 3, &refs).unwrap(), Calibration::NONE);
    }

    #[test]
    fn test_walk_skips_samples() {
        let refs = vec![reference("STD", "Cu", "5")];
        let rows = vec![
            row("1", "STD", "Cu 1", "0.5", "2"),
            row("2", "S1", "Cu 2", "1", ""),
            row("3", "S2", "Cu 3", "1", ""),
            row("4", "S3", "Cu 4", "1", ""),
        ];

        let cal = find_standard(&rows, 3, &refs).unwrap();
        assert!(cal.found);
        assert_eq!(cal.absorbance, 0.5);
        assert_eq!(cal.secondary_factor, 2.0);
    }

    #[test]
    fn test_later_rows_are_invisible() {
        let refs = vec![reference("STD", "A", "10")];
        let rows = vec![row("1", "SMP", "A", "4", ""), row("2", "STD", "A", "2", "")];

        assert_eq!(find_standard(&rows, 0, &refs).unwrap(), Calibration::NONE);
    }

    #[test]
    fn test_no_standard_at_all() {
        let refs = vec![reference("STD", "A", "10")];
        let rows = vec![row("1", "X", "A", "4", ""), row("2", "Y", "A", "4", "")];

        assert_eq!(find_standard(&rows, 1, &refs).unwrap(), Calibration::NONE);
    }

    #[test]
    fn test_line_missing_from_table_gives_zero_concentration() {
        // The candidate's name is a standard, but the table only knows line B
        let refs = vec![reference("STD", "B", "10")];
        let rows = vec![row("1", "STD", "A", "2", ""), row("2", "SMP", "A", "4", "")];

        let cal = find_standard(&rows, 1, &refs).unwrap();
        assert!(cal.found);
        assert_eq!(cal.concentration, 0.0);
    }

    #[test]
    fn test_bad_standard_absorbance_is_fatal() {
        let refs = vec![reference("STD", "A", "10")];
        let rows = vec![row("1", "STD", "A", "n/a", ""), row("2", "SMP", "A", "4", "")];

        let err = find_standard(&rows, 1, &refs).unwrap_err();
        assert!(matches!(err, Error::Computation { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_index_out_of_range() {
        assert!(find_standard(&[], 0, &[]).is_err());
    }
}
