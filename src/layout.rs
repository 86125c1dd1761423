//! Fixed file layouts for the instrument export, the standards table and the report.
//!
//! Column positions are 0-based. A layout is built once and handed to the
//! parser, the matcher and the monitor; nothing reads these from globals.

/// Column positions and delimiters for the files the pipeline touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultLayout {
    /// Delimiter of the instrument result export
    pub result_delimiter: u8,
    /// Exact number of fields a result row must have
    pub row_len: usize,
    pub number: usize,
    pub name: usize,
    pub line: usize,
    pub absorbance: usize,
    pub date: usize,
    pub time: usize,
    pub position: usize,
    pub secondary: usize,
    /// Delimiter of the standards (reference) table
    pub reference_delimiter: u8,
    /// Minimum number of fields a standards row must have
    pub reference_min_len: usize,
    /// Delimiter of the emitted report
    pub report_delimiter: u8,
}

impl Default for ResultLayout {
    fn default() -> Self {
        Self {
            result_delimiter: b';',
            row_len: 44,
            number: 0,
            name: 1,
            line: 2,
            absorbance: 18,
            date: 21,
            time: 22,
            position: 32,
            secondary: 36,
            reference_delimiter: b',',
            reference_min_len: 5,
            report_delimiter: b';',
        }
    }
}

impl ResultLayout {
    /// Highest column index this layout reads from a result row.
    pub fn max_column(&self) -> usize {
        [
            self.number,
            self.name,
            self.line,
            self.absorbance,
            self.date,
            self.time,
            self.position,
            self.secondary,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

/// Strip leading/trailing ASCII digits and spaces, leaving the analytical line name.
///
/// Example: `"Fe 2"` -> `"Fe"`, `"A1"` -> `"A"`.
pub fn strip_line(raw: &str) -> &str {
    raw.trim_matches(|c: char| c.is_ascii_digit() || c == ' ')
}
