//! Streaming parser for concatenated measurement tables.
//!
//! A measurement file is a sequence of small CSV tables:
//!
//! ```text
//! table_name
//! column1,column2,column3
//! value1,value2,value3
//! ---
//! ```
//!
//! The parser is a three-state machine driven one stripped line at a time.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, warn};

use crate::constants::format::{FIELD_SEPARATOR, TABLE_DIVIDER};
use crate::errors::MeasurementError;
use crate::measurement::MeasurementFile;
use crate::table::{Table, Value};
use crate::types::Origin;

/// Parser position within the table grammar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParserState {
    /// Between tables; a divider line is a no-op here.
    ExpectingTableName,
    /// A table name was read; the next line declares its columns.
    ExpectingColumnNames,
    /// Reading value lines until a divider.
    ExpectingValues,
}

/// Line-at-a-time parser accumulating tables into a `MeasurementFile`.
pub struct TableParser {
    origin: Origin,
    state: ParserState,
    pending_name: Option<String>,
    current: Option<Table>,
    measurement: MeasurementFile,
}

impl TableParser {
    /// Create a parser; `origin` names the input in error messages.
    pub fn new(origin: impl Into<Origin>) -> Self {
        Self {
            origin: origin.into(),
            state: ParserState::ExpectingTableName,
            pending_name: None,
            current: None,
            measurement: MeasurementFile::new(),
        }
    }

    /// Current state of the machine.
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Feed one raw line (`line_no` is 1-based and only used for errors).
    pub fn feed_line(&mut self, line_no: usize, raw: &str) -> Result<(), MeasurementError> {
        let line = raw.trim();
        match self.state {
            ParserState::ExpectingTableName => {
                if line == TABLE_DIVIDER || line.is_empty() {
                    return Ok(());
                }
                if !is_identifier(line) {
                    return Err(self.format_error(
                        line_no,
                        format!("invalid table name '{line}'"),
                    ));
                }
                self.pending_name = Some(line.to_string());
                self.state = ParserState::ExpectingColumnNames;
            }
            ParserState::ExpectingColumnNames => {
                let columns: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
                if let Some(bad) = columns.iter().find(|column| !is_identifier(column)) {
                    return Err(self.format_error(
                        line_no,
                        format!("invalid column name '{bad}'"),
                    ));
                }
                let name = self.pending_name.take().unwrap_or_default();
                self.current = Some(Table::new(name, columns));
                self.state = ParserState::ExpectingValues;
            }
            ParserState::ExpectingValues => {
                if line == TABLE_DIVIDER {
                    self.finish_table();
                    self.state = ParserState::ExpectingTableName;
                    return Ok(());
                }
                let Some(expected) = self.current.as_ref().map(Table::width) else {
                    return Err(self.format_error(line_no, "value line outside of a table".into()));
                };
                let values: Vec<Value> = line
                    .split(FIELD_SEPARATOR)
                    .take(expected)
                    .map(Value::text)
                    .collect();
                if values.len() != expected {
                    let found = values.len();
                    let table = self.current.as_ref().map(Table::name).unwrap_or_default();
                    return Err(self.format_error(
                        line_no,
                        format!(
                            "column count mismatch in table '{table}': expected {expected} values, got {found}"
                        ),
                    ));
                }
                if let Some(table) = self.current.as_mut() {
                    table.push_row(values)?;
                }
            }
        }
        Ok(())
    }

    /// Close any open table and return the parsed measurement.
    ///
    /// End of input is accepted in every state; a table name with no column
    /// line yields no table.
    pub fn finish(mut self) -> MeasurementFile {
        if let Some(name) = self.pending_name.take() {
            debug!(origin = %self.origin, table = %name, "table name without columns at end of input");
        }
        self.finish_table();
        self.measurement
    }

    fn finish_table(&mut self) {
        let Some(table) = self.current.take() else {
            return;
        };
        debug!(
            origin = %self.origin,
            table = %table.name(),
            rows = table.len(),
            columns = table.width(),
            "parsed measurement table"
        );
        let name = table.name().to_string();
        if self.measurement.insert(table).is_some() {
            warn!(origin = %self.origin, table = %name, "duplicate table replaced earlier one");
        }
    }

    fn format_error(&self, line: usize, reason: String) -> MeasurementError {
        MeasurementError::Format {
            origin: self.origin.clone(),
            line,
            reason,
        }
    }
}

/// Parse measurement tables from any buffered reader.
pub fn parse_measurements<R: BufRead>(
    reader: R,
    origin: impl Into<Origin>,
) -> Result<MeasurementFile, MeasurementError> {
    let mut parser = TableParser::new(origin);
    for (idx, line) in reader.lines().enumerate() {
        parser.feed_line(idx + 1, &line?)?;
    }
    Ok(parser.finish())
}

/// Parse a measurement file from disk. The file is closed on every exit path.
pub fn load_measurements(path: &Path) -> Result<MeasurementFile, MeasurementError> {
    let file = File::open(path)?;
    let measurement = parse_measurements(BufReader::new(file), path.display().to_string())?;
    debug!(
        path = %path.display(),
        tables = measurement.len(),
        "loaded measurement file"
    );
    Ok(measurement)
}

/// Identifier syntax for table and column names: a letter or underscore,
/// followed by letters, digits, or underscores.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|ch| ch.is_alphanumeric() || ch == '_')
        }
        _ => false,
    }
}
