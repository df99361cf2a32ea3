//! Cross-run aggregation of measurement tables.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::clock::ClockModel;
use crate::constants::columns::{CLOCK_ERROR, FRAME_ID, RTT};
use crate::constants::tables;
use crate::delay::frame_times_to_delays;
use crate::errors::MeasurementError;
use crate::measurement::MeasurementFile;
use crate::metrics::{mean, median};
use crate::table::{ColumnKind, Table, Value};

/// Average a named table across captures, aligned by row index.
///
/// Numeric columns become the mean of the non-null cells at each row index;
/// text columns keep the first capture's cell. Captures with fewer rows
/// simply do not contribute to the later rows.
pub fn average_table(
    captures: &[MeasurementFile],
    name: &str,
) -> Result<Table, MeasurementError> {
    if captures.is_empty() {
        return Err(MeasurementError::Aggregation(format!(
            "cannot average '{name}' over zero captures"
        )));
    }
    let sources = captures
        .iter()
        .enumerate()
        .map(|(idx, capture)| {
            capture.get(name).ok_or_else(|| {
                MeasurementError::Aggregation(format!("table '{name}' missing from capture {idx}"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let first = sources[0];
    let row_count = sources.iter().map(|table| table.len()).max().unwrap_or_default();
    let mut averaged = Table::new(name, first.columns().iter().cloned());
    for row in 0..row_count {
        let mut values = Vec::with_capacity(first.width());
        for (column, kind) in first.columns().iter().zip(first.column_kinds()) {
            let cells = sources.iter().filter_map(|table| table.value(row, column));
            let value = match kind {
                ColumnKind::Text => cells.cloned().next().unwrap_or(Value::Null),
                ColumnKind::Numeric => {
                    let numbers: Vec<f64> = cells.filter_map(Value::as_f64).collect();
                    mean(&numbers).map(Value::Float).unwrap_or(Value::Null)
                }
            };
            values.push(value);
        }
        averaged.push_row(values)?;
    }
    debug!(table = %name, captures = captures.len(), rows = averaged.len(), "averaged table");
    Ok(averaged)
}

/// Per-frame delays averaged across captures, grouped by `frame_id`.
///
/// Each capture is delay-normalized (clock-corrected when a model is given)
/// and every other column becomes the mean of the non-null cells for that
/// frame. Rows come out sorted by `frame_id`.
pub fn combine_delays(
    captures: &[MeasurementFile],
    model: Option<ClockModel>,
) -> Result<Table, MeasurementError> {
    if captures.is_empty() {
        return Err(MeasurementError::Aggregation(
            "cannot combine delays over zero captures".to_string(),
        ));
    }
    let delays = captures
        .iter()
        .map(|capture| frame_times_to_delays(capture, model))
        .collect::<Result<Vec<_>, _>>()?;

    let columns: Vec<String> = delays[0].columns().to_vec();
    let mut groups: BTreeMap<i64, Vec<(f64, usize)>> = BTreeMap::new();
    for table in &delays {
        let ids = table.column_i64(FRAME_ID)?;
        let values = columns
            .iter()
            .map(|column| table.column_f64(column))
            .collect::<Result<Vec<_>, _>>()?;
        for (row, id) in ids.iter().enumerate() {
            let Some(id) = id else {
                continue;
            };
            let sums = groups
                .entry(*id)
                .or_insert_with(|| vec![(0.0, 0); columns.len()]);
            for (sum, column) in sums.iter_mut().zip(&values) {
                if let Some(value) = column[row] {
                    sum.0 += value;
                    sum.1 += 1;
                }
            }
        }
    }

    let mut combined = Table::new(tables::FRAME_DELAYS, columns.iter().cloned());
    for (id, sums) in groups {
        let row = columns
            .iter()
            .zip(sums)
            .map(|(column, (sum, count))| {
                if column == FRAME_ID {
                    Value::Int(id)
                } else if count == 0 {
                    Value::Null
                } else {
                    Value::Float(sum / count as f64)
                }
            })
            .collect();
        combined.push_row(row)?;
    }
    debug!(captures = captures.len(), frames = combined.len(), "combined delays");
    Ok(combined)
}

/// Mean across captures of each capture's mean `rtt`.
///
/// Captures with an empty network table are skipped; `None` if none remain.
pub fn avg_rtt(captures: &[MeasurementFile]) -> Result<Option<f64>, MeasurementError> {
    network_statistic(captures, RTT, mean)
}

/// Mean across captures of each capture's median `clock_error`.
///
/// Captures with an empty network table are skipped; `None` if none remain.
pub fn med_clock_error(captures: &[MeasurementFile]) -> Result<Option<f64>, MeasurementError> {
    network_statistic(captures, CLOCK_ERROR, median)
}

fn network_statistic(
    captures: &[MeasurementFile],
    column: &str,
    per_capture: fn(&[f64]) -> Option<f64>,
) -> Result<Option<f64>, MeasurementError> {
    let mut per_run = Vec::with_capacity(captures.len());
    for (idx, capture) in captures.iter().enumerate() {
        let network = capture.table(tables::NETWORK)?;
        if network.is_empty() {
            warn!(capture = idx, column, "empty network table skipped");
            continue;
        }
        let values: Vec<f64> = network.column_f64(column)?.into_iter().flatten().collect();
        if let Some(value) = per_capture(&values) {
            per_run.push(value);
        }
    }
    Ok(mean(&per_run))
}
