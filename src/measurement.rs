use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::constants::format::MEMORY_ORIGIN;
use crate::errors::MeasurementError;
use crate::parser::{load_measurements, parse_measurements};
use crate::table::Table;
use crate::types::TableName;

/// One process capture for one run: table name to table, in file order.
///
/// Read-only once parsed; every derived table is a new value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeasurementFile {
    tables: IndexMap<TableName, Table>,
}

impl MeasurementFile {
    /// Create an empty measurement.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a measurement file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MeasurementError> {
        load_measurements(path.as_ref())
    }

    /// Insert a table under its own name, returning any table it replaced.
    pub fn insert(&mut self, table: Table) -> Option<Table> {
        self.tables.insert(table.name().to_string(), table)
    }

    /// Look up a table by name.
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Look up a table by name, failing with `MissingTable`.
    pub fn table(&self, name: &str) -> Result<&Table, MeasurementError> {
        self.get(name).ok_or_else(|| MeasurementError::MissingTable {
            table: name.to_string(),
        })
    }

    /// True when the named table is present.
    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Tables in file order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    /// Table names in file order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// True when no table was parsed.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Serialize every table back into the measurement log format.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for table in self.tables.values() {
            table.write_to(writer)?;
        }
        Ok(())
    }
}

impl FromStr for MeasurementFile {
    type Err = MeasurementError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        parse_measurements(text.as_bytes(), MEMORY_ORIGIN)
    }
}

impl FromIterator<Table> for MeasurementFile {
    fn from_iter<I: IntoIterator<Item = Table>>(iter: I) -> Self {
        let mut measurement = Self::new();
        for table in iter {
            measurement.insert(table);
        }
        measurement
    }
}
