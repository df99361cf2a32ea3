use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::constants::format::{FIELD_SEPARATOR, TABLE_DIVIDER};
use crate::errors::MeasurementError;
use crate::types::{ColumnName, TableName};

/// A single cell.
///
/// Parsed cells start out as `Text`; the combine stage coerces timestamp
/// columns to `Int`, and averaging produces `Float`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Missing value (stage never reached, or absent side of an outer join).
    Null,
    /// 64-bit integer, typically microsecond ticks.
    Int(i64),
    /// Floating-point value (averages, drift-corrected timestamps).
    Float(f64),
    /// Raw text as read from a measurement file.
    Text(String),
}

impl Value {
    /// Build a text cell.
    pub fn text(raw: impl Into<String>) -> Self {
        Value::Text(raw.into())
    }

    /// True for `Value::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Normalize to `Null`, `Int`, or `Float`, or `None` when the cell is not numeric.
    ///
    /// Empty text counts as `Null`.
    pub fn to_numeric(&self) -> Option<Value> {
        match self {
            Value::Null | Value::Int(_) | Value::Float(_) => Some(self.clone()),
            Value::Text(raw) => {
                let raw = raw.trim();
                if raw.is_empty() {
                    return Some(Value::Null);
                }
                if let Ok(int) = raw.parse::<i64>() {
                    return Some(Value::Int(int));
                }
                raw.parse::<f64>().ok().map(Value::Float)
            }
        }
    }

    /// Integer view of the cell. Floats convert only when they hold a whole number.
    pub fn as_i64(&self) -> Option<i64> {
        match self.to_numeric()? {
            Value::Int(int) => Some(int),
            Value::Float(float) if float.is_finite() && float.fract() == 0.0 => Some(float as i64),
            _ => None,
        }
    }

    /// Floating-point view of the cell.
    pub fn as_f64(&self) -> Option<f64> {
        match self.to_numeric()? {
            Value::Int(int) => Some(int as f64),
            Value::Float(float) => Some(float),
            _ => None,
        }
    }

    /// `self - rhs`, staying integral when both sides are integral.
    ///
    /// Null on either side yields `Null`; a non-numeric side yields `None`.
    pub fn numeric_sub(&self, rhs: &Value) -> Option<Value> {
        match (self.to_numeric()?, rhs.to_numeric()?) {
            (Value::Null, _) | (_, Value::Null) => Some(Value::Null),
            (Value::Int(left), Value::Int(right)) => Some(Value::Int(left.wrapping_sub(right))),
            (left, right) => Some(Value::Float(left.as_f64()? - right.as_f64()?)),
        }
    }

    /// Total order used for sorting: nulls first, then numbers, then text.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self.to_numeric(), other.to_numeric()) {
            (Some(Value::Null), Some(Value::Null)) => Ordering::Equal,
            (Some(Value::Null), _) => Ordering::Less,
            (_, Some(Value::Null)) => Ordering::Greater,
            (Some(Value::Int(left)), Some(Value::Int(right))) => left.cmp(&right),
            (Some(left), Some(right)) => {
                let left = left.as_f64().unwrap_or(f64::NAN);
                let right = right.as_f64().unwrap_or(f64::NAN);
                left.total_cmp(&right)
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.to_string().cmp(&other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(int) => write!(f, "{int}"),
            Value::Float(float) => write!(f, "{float}"),
            Value::Text(text) => f.write_str(text),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

/// Column shape inferred from the first data row of a table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Every first-row cell parsed as a number (or was null).
    Numeric,
    /// The first-row cell was free text.
    Text,
}

/// Ordered sequence of records sharing a fixed, ordered list of named columns.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    name: TableName,
    columns: Vec<ColumnName>,
    kinds: Vec<ColumnKind>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table with the given column names.
    pub fn new<I, S>(name: impl Into<TableName>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ColumnName>,
    {
        let columns: Vec<ColumnName> = columns.into_iter().map(Into::into).collect();
        let kinds = vec![ColumnKind::Numeric; columns.len()];
        Self {
            name: name.into(),
            columns,
            kinds,
            rows: Vec::new(),
        }
    }

    /// Create a table and push every row, checking widths.
    pub fn from_rows<I, S>(
        name: impl Into<TableName>,
        columns: I,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self, MeasurementError>
    where
        I: IntoIterator<Item = S>,
        S: Into<ColumnName>,
    {
        let mut table = Self::new(name, columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the same table under another name.
    pub fn with_name(mut self, name: impl Into<TableName>) -> Self {
        self.name = name.into();
        self
    }

    /// Ordered column names.
    pub fn columns(&self) -> &[ColumnName] {
        &self.columns
    }

    /// Column kinds, parallel to `columns()`.
    pub fn column_kinds(&self) -> &[ColumnKind] {
        &self.kinds
    }

    /// All rows in order.
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Position of a column, if present.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|name| name == column)
    }

    /// True when the column exists.
    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    /// Position of a column, or `MissingColumn`.
    pub fn require_column(&self, column: &str) -> Result<usize, MeasurementError> {
        self.column_index(column)
            .ok_or_else(|| MeasurementError::MissingColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    /// Append a row. The first row pushed fixes the column kinds.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), MeasurementError> {
        if row.len() != self.columns.len() {
            return Err(MeasurementError::RowWidth {
                table: self.name.clone(),
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        if self.rows.is_empty() {
            self.kinds = row
                .iter()
                .map(|value| match value.to_numeric() {
                    Some(_) => ColumnKind::Numeric,
                    None => ColumnKind::Text,
                })
                .collect();
        }
        self.rows.push(row);
        Ok(())
    }

    /// Cell at `row` in the named column.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|values| &values[idx])
    }

    /// Every cell of the named column, in row order.
    pub fn column_values(&self, column: &str) -> Result<Vec<&Value>, MeasurementError> {
        let idx = self.require_column(column)?;
        Ok(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Integer view of a column; nulls stay `None`, non-numeric cells fail.
    pub fn column_i64(&self, column: &str) -> Result<Vec<Option<i64>>, MeasurementError> {
        self.column_values(column)?
            .into_iter()
            .map(|value| {
                if value.is_null() || value.to_numeric() == Some(Value::Null) {
                    return Ok(None);
                }
                value
                    .as_i64()
                    .map(Some)
                    .ok_or_else(|| invalid_value(column, value))
            })
            .collect()
    }

    /// Float view of a column; nulls stay `None`, non-numeric cells fail.
    pub fn column_f64(&self, column: &str) -> Result<Vec<Option<f64>>, MeasurementError> {
        self.column_values(column)?
            .into_iter()
            .map(|value| match value.to_numeric() {
                Some(Value::Null) => Ok(None),
                Some(number) => Ok(number.as_f64()),
                None => Err(invalid_value(column, value)),
            })
            .collect()
    }

    /// Rename columns in place. Pairs naming absent columns are ignored.
    pub fn rename_columns<A, B>(&mut self, renames: &[(A, B)])
    where
        A: AsRef<str>,
        B: AsRef<str>,
    {
        for column in &mut self.columns {
            if let Some((_, to)) = renames.iter().find(|(from, _)| column == from.as_ref()) {
                *column = to.as_ref().to_string();
            }
        }
    }

    /// New table holding only the named columns, in the given order.
    pub fn select<S: AsRef<str>>(&self, columns: &[S]) -> Result<Table, MeasurementError> {
        let indices = columns
            .iter()
            .map(|column| self.require_column(column.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Table {
            name: self.name.clone(),
            columns: columns
                .iter()
                .map(|column| column.as_ref().to_string())
                .collect(),
            kinds: indices.iter().map(|&idx| self.kinds[idx]).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&idx| row[idx].clone()).collect())
                .collect(),
        })
    }

    /// Set a column from one value per row, appending it when absent.
    pub fn set_column(
        &mut self,
        column: &str,
        values: Vec<Value>,
    ) -> Result<(), MeasurementError> {
        if values.len() != self.rows.len() {
            return Err(MeasurementError::RowWidth {
                table: self.name.clone(),
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        match self.column_index(column) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(column.to_string());
                self.kinds.push(ColumnKind::Numeric);
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// Subtract `amounts[row]` from every listed column, row by row.
    pub fn subtract_per_row<S: AsRef<str>>(
        &mut self,
        columns: &[S],
        amounts: &[Value],
    ) -> Result<(), MeasurementError> {
        if amounts.len() != self.rows.len() {
            return Err(MeasurementError::RowWidth {
                table: self.name.clone(),
                expected: self.rows.len(),
                found: amounts.len(),
            });
        }
        let indices = columns
            .iter()
            .map(|column| self.require_column(column.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        for (row, amount) in self.rows.iter_mut().zip(amounts) {
            for &idx in &indices {
                row[idx] = row[idx]
                    .numeric_sub(amount)
                    .ok_or_else(|| invalid_value(&self.columns[idx], &row[idx]))?;
            }
        }
        Ok(())
    }

    /// Keep only rows for which `keep` returns true.
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[Value]) -> bool,
    {
        self.rows.retain(|row| keep(row));
    }

    /// Stable sort by the named columns, ascending.
    pub fn sort_by_columns<S: AsRef<str>>(&mut self, columns: &[S]) -> Result<(), MeasurementError> {
        let indices = columns
            .iter()
            .map(|column| self.require_column(column.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        self.rows.sort_by(|left, right| {
            indices
                .iter()
                .map(|&idx| left[idx].sort_cmp(&right[idx]))
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        });
        Ok(())
    }

    /// Replace every null cell with `fill`.
    pub fn fill_null(&mut self, fill: Value) {
        for cell in self.rows.iter_mut().flatten() {
            if cell.is_null() {
                *cell = fill.clone();
            }
        }
    }

    /// Coerce every cell to a 64-bit integer; nulls stay null, fractions truncate.
    pub fn coerce_int64(&mut self) -> Result<(), MeasurementError> {
        for row in &mut self.rows {
            for (idx, cell) in row.iter_mut().enumerate() {
                let coerced = match cell.to_numeric() {
                    Some(Value::Null) => Value::Null,
                    Some(Value::Int(int)) => Value::Int(int),
                    Some(Value::Float(float)) if float.is_finite() => Value::Int(float.trunc() as i64),
                    _ => return Err(invalid_value(&self.columns[idx], cell)),
                };
                *cell = coerced;
            }
        }
        self.kinds = vec![ColumnKind::Numeric; self.columns.len()];
        Ok(())
    }

    /// Inner hash join on `key`: left row order, then right match order.
    pub fn inner_join(&self, right: &Table, key: &str) -> Result<Table, MeasurementError> {
        let plan = JoinPlan::new(self, right, key)?;
        let right_index = plan.right_index(right)?;
        let mut joined = plan.output_table(self, right);
        for (left_row, left_key) in self.rows.iter().zip(plan.left_keys(self)?) {
            let Some(key) = left_key else {
                continue;
            };
            for &right_row in right_index.get(&key).into_iter().flatten() {
                joined
                    .rows
                    .push(plan.merge_rows(Some(left_row), Some(&right.rows[right_row])));
            }
        }
        Ok(joined)
    }

    /// Full outer hash join on `key`, ordered by key ascending (null keys last).
    ///
    /// Rows missing on one side are filled with `Null`; the key column takes
    /// whichever side is present.
    pub fn outer_join(&self, right: &Table, key: &str) -> Result<Table, MeasurementError> {
        let plan = JoinPlan::new(self, right, key)?;
        let right_index = plan.right_index(right)?;
        let left_keys = plan.left_keys(self)?;

        let mut left_index: HashMap<i64, Vec<usize>> = HashMap::new();
        let mut left_unkeyed = Vec::new();
        for (row, key) in left_keys.iter().enumerate() {
            match key {
                Some(key) => left_index.entry(*key).or_default().push(row),
                None => left_unkeyed.push(row),
            }
        }

        let mut keys: Vec<i64> = left_index.keys().chain(right_index.keys()).copied().collect();
        keys.sort_unstable();
        keys.dedup();

        let mut joined = plan.output_table(self, right);
        for key in keys {
            let left_rows = left_index.get(&key).map(Vec::as_slice).unwrap_or(&[]);
            let right_rows = right_index.get(&key).map(Vec::as_slice).unwrap_or(&[]);
            match (left_rows.is_empty(), right_rows.is_empty()) {
                (false, false) => {
                    for &left_row in left_rows {
                        for &right_row in right_rows {
                            joined.rows.push(plan.merge_rows(
                                Some(&self.rows[left_row]),
                                Some(&right.rows[right_row]),
                            ));
                        }
                    }
                }
                (false, true) => {
                    for &left_row in left_rows {
                        joined
                            .rows
                            .push(plan.merge_rows(Some(&self.rows[left_row]), None));
                    }
                }
                (true, false) => {
                    for &right_row in right_rows {
                        joined
                            .rows
                            .push(plan.merge_rows(None, Some(&right.rows[right_row])));
                    }
                }
                (true, true) => {}
            }
        }
        for &left_row in &left_unkeyed {
            joined
                .rows
                .push(plan.merge_rows(Some(&self.rows[left_row]), None));
        }
        for row in &right.rows {
            if row[plan.right_key].to_numeric() == Some(Value::Null) {
                joined.rows.push(plan.merge_rows(None, Some(row)));
            }
        }
        Ok(joined)
    }

    /// Serialize in the measurement log format, terminated by the table divider.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "{}", self.name)?;
        writeln!(writer, "{}", join_fields(self.columns.iter()))?;
        for row in &self.rows {
            writeln!(writer, "{}", join_fields(row.iter()))?;
        }
        writeln!(writer, "{TABLE_DIVIDER}")
    }
}

fn join_fields<T: fmt::Display>(fields: impl Iterator<Item = T>) -> String {
    fields
        .map(|field| field.to_string())
        .collect::<Vec<_>>()
        .join(&FIELD_SEPARATOR.to_string())
}

fn invalid_value(column: &str, value: &Value) -> MeasurementError {
    MeasurementError::InvalidValue {
        column: column.to_string(),
        value: value.to_string(),
    }
}

/// Column layout shared by inner and outer joins.
struct JoinPlan {
    key: ColumnName,
    left_width: usize,
    left_key: usize,
    right_key: usize,
    right_kept: Vec<usize>,
}

impl JoinPlan {
    fn new(left: &Table, right: &Table, key: &str) -> Result<Self, MeasurementError> {
        let left_key = left.require_column(key)?;
        let right_key = right.require_column(key)?;
        let right_kept: Vec<usize> = (0..right.width()).filter(|&idx| idx != right_key).collect();
        for &idx in &right_kept {
            if left.has_column(&right.columns[idx]) {
                return Err(MeasurementError::DuplicateColumn {
                    column: right.columns[idx].clone(),
                });
            }
        }
        Ok(Self {
            key: key.to_string(),
            left_width: left.width(),
            left_key,
            right_key,
            right_kept,
        })
    }

    fn output_table(&self, left: &Table, right: &Table) -> Table {
        let mut columns = left.columns.clone();
        let mut kinds = left.kinds.clone();
        for &idx in &self.right_kept {
            columns.push(right.columns[idx].clone());
            kinds.push(right.kinds[idx]);
        }
        Table {
            name: left.name.clone(),
            columns,
            kinds,
            rows: Vec::new(),
        }
    }

    fn key_of(&self, value: &Value) -> Result<Option<i64>, MeasurementError> {
        if value.to_numeric() == Some(Value::Null) {
            return Ok(None);
        }
        value
            .as_i64()
            .map(Some)
            .ok_or_else(|| invalid_value(&self.key, value))
    }

    fn left_keys(&self, left: &Table) -> Result<Vec<Option<i64>>, MeasurementError> {
        left.rows
            .iter()
            .map(|row| self.key_of(&row[self.left_key]))
            .collect()
    }

    fn right_index(&self, right: &Table) -> Result<HashMap<i64, Vec<usize>>, MeasurementError> {
        let mut index: HashMap<i64, Vec<usize>> = HashMap::new();
        for (row, values) in right.rows.iter().enumerate() {
            if let Some(key) = self.key_of(&values[self.right_key])? {
                index.entry(key).or_default().push(row);
            }
        }
        Ok(index)
    }

    fn merge_rows(&self, left: Option<&Vec<Value>>, right: Option<&Vec<Value>>) -> Vec<Value> {
        let mut merged = match left {
            Some(row) => row.clone(),
            None => {
                let mut row = vec![Value::Null; self.left_width];
                if let Some(right) = right {
                    row[self.left_key] = right[self.right_key].clone();
                }
                row
            }
        };
        match right {
            Some(row) => merged.extend(self.right_kept.iter().map(|&idx| row[idx].clone())),
            None => merged.extend(std::iter::repeat_n(Value::Null, self.right_kept.len())),
        }
        merged
    }
}
