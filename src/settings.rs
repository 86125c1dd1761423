//! Last-used file locations, kept between runs.
//!
//! Stored as three lines in a fixed order: standards table, report, result
//! export. A missing or damaged record falls back to [`WatchPaths::default`].

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// The three files a run works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchPaths {
    /// Standards (reference) table, read each cycle
    pub standards: PathBuf,
    /// Report written by the monitor
    pub report: PathBuf,
    /// Instrument result export, re-read each cycle
    pub results: PathBuf,
}

impl Default for WatchPaths {
    fn default() -> Self {
        Self {
            standards: PathBuf::from("standards.csv"),
            report: PathBuf::from("report.csv"),
            results: PathBuf::from("results.csv"),
        }
    }
}

impl WatchPaths {
    /// Fail with the first path left empty.
    pub fn check_non_empty(&self) -> Result<()> {
        if self.standards.as_os_str().is_empty() {
            return Err(Error::MissingPath("standards"));
        }
        if self.report.as_os_str().is_empty() {
            return Err(Error::MissingPath("report"));
        }
        if self.results.as_os_str().is_empty() {
            return Err(Error::MissingPath("result"));
        }
        Ok(())
    }

    fn parse(text: &str) -> Option<Self> {
        let mut lines = text.lines().map(str::trim_end);
        let mut next = || lines.next().filter(|l| !l.is_empty()).map(PathBuf::from);
        Some(Self {
            standards: next()?,
            report: next()?,
            results: next()?,
        })
    }

    fn to_text(&self) -> String {
        format!(
            "{}\n{}\n{}\n",
            self.standards.display(),
            self.report.display(),
            self.results.display()
        )
    }
}

/// Location of the record in the per-user configuration directory.
pub fn settings_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("org", "Aspect", "AspectCSAdjust")
        .map(|dirs| dirs.config_dir().join("paths.txt"))
}

/// Load the record, or the defaults if it cannot be read.
pub fn load_paths(file: &Path) -> WatchPaths {
    match std::fs::read_to_string(file) {
        Ok(text) => WatchPaths::parse(&text).unwrap_or_else(|| {
            log::warn!("Ignoring damaged path record {}", file.display());
            WatchPaths::default()
        }),
        Err(e) => {
            log::debug!("No path record at {}: {}", file.display(), e);
            WatchPaths::default()
        }
    }
}

/// Load from the default location.
pub fn load_saved_paths() -> WatchPaths {
    settings_path()
        .map(|p| load_paths(&p))
        .unwrap_or_default()
}

/// Store the record, creating its directory if needed.
pub fn save_paths(file: &Path, paths: &WatchPaths) -> Result<()> {
    if let Some(dir) = file.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    std::fs::write(file, paths.to_text())?;
    Ok(())
}
