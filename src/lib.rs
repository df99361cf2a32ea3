#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Cross-run averaging of tables and delays.
pub mod aggregate;
/// Command-line front ends shared by the demo binaries.
pub mod apps;
/// Client clock error estimation and correction.
pub mod clock;
/// Joining per-process tables into per-frame records.
pub mod combine;
/// Analysis configuration types.
pub mod config;
/// Centralized constants: file format, table and column names.
pub mod constants;
/// Rebasing absolute timestamps into per-frame delays.
pub mod delay;
/// Raw RGBA frame dumps.
pub mod image;
/// Parsed measurement files.
pub mod measurement;
/// Derived latency series and summary statistics.
pub mod metrics;
/// Measurement log parser.
pub mod parser;
/// In-memory tables and cell values.
pub mod table;
/// Input transports (filesystem today).
pub mod transport;
/// Shared type aliases.
pub mod types;

mod errors;
#[cfg(test)]
mod fixtures;

pub use aggregate::{avg_rtt, average_table, combine_delays, med_clock_error};
pub use clock::{
    ClockModel, client_clock_error_fn, fix_client_clock_error, min_client_clock_error,
};
pub use combine::{combine_all, combine_frame_times, combine_tracking_times};
pub use config::{AnalysisConfig, ClockConfig, CombineOptions};
pub use delay::{convert_time_to_delay, frame_times_to_delays};
pub use errors::MeasurementError;
pub use measurement::MeasurementFile;
pub use parser::{load_measurements, parse_measurements};
pub use table::{ColumnKind, Table, Value};
pub use transport::fs::{load_dataset, load_measurement_pass, pass_files};
pub use types::{ColumnName, Micros, PassId, RunId, TableName};
