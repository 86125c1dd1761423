//! Aspect CS Adjust
//!
//! Recomputes sample concentrations in an instrument result export against the
//! calibration standards that bracket them, and keeps a report file in step
//! with the export while the instrument is running.
//!
//! This library provides:
//! - `table`: reading the standards table and the result export
//! - `matcher`: finding the standard that applies to a sample
//! - `calc`: the concentration formula and report rows
//! - `report`: writing the report
//! - `pipeline`: one parse/recompute/emit cycle
//! - `monitor`: the background poll loop
//!
//! Binaries:
//! - `cs-adjust`: headless monitor and one-shot recompute
//! - `cs-adjust-ui`: desktop window around the monitor

pub mod calc;
pub mod error;
pub mod layout;
pub mod matcher;
pub mod monitor;
pub mod pipeline;
pub mod report;
pub mod settings;
pub mod table;

pub use calc::OutputRow;
pub use error::{Error, Result};
pub use layout::ResultLayout;
pub use monitor::{Monitor, MonitorConfig, PollEvent, PollState};
pub use settings::WatchPaths;
