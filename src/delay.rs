use tracing::debug;

use crate::clock::{ClockModel, fix_client_clock_error};
use crate::combine::combine_frame_times;
use crate::constants::clock::DEFAULT_TRANSFER_FLOOR_US;
use crate::constants::columns::{DELAY_EXEMPT_COLUMNS, PRESENT_CALLED};
use crate::constants::tables;
use crate::errors::MeasurementError;
use crate::measurement::MeasurementFile;
use crate::table::{Table, Value};

/// Rebase timestamps onto each frame's own `present_called`.
///
/// Every column outside the exempt set becomes `column - present_called`;
/// `present_called` itself is then shifted so the first row starts at 0.
pub fn convert_time_to_delay(table: &Table) -> Result<Table, MeasurementError> {
    let present: Vec<Value> = table
        .column_values(PRESENT_CALLED)?
        .into_iter()
        .cloned()
        .collect();
    let rebased: Vec<&str> = table
        .columns()
        .iter()
        .map(String::as_str)
        .filter(|column| !DELAY_EXEMPT_COLUMNS.contains(column))
        .collect();

    let mut delays = table.clone().with_name(tables::FRAME_DELAYS);
    delays.subtract_per_row(&rebased, &present)?;

    if let Some(origin) = present.first() {
        let anchored = present
            .iter()
            .map(|value| {
                value
                    .numeric_sub(origin)
                    .ok_or_else(|| MeasurementError::InvalidValue {
                        column: PRESENT_CALLED.to_string(),
                        value: value.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        delays.set_column(PRESENT_CALLED, anchored)?;
    }
    debug!(rows = delays.len(), columns = rebased.len(), "converted timestamps to delays");
    Ok(delays)
}

/// Per-frame delay table for one measurement.
///
/// With a `model` the client clock correction is applied to the absolute
/// timestamps before rebasing, since the drift model is time-dependent.
pub fn frame_times_to_delays(
    measurement: &MeasurementFile,
    model: Option<ClockModel>,
) -> Result<Table, MeasurementError> {
    let frames = combine_frame_times(measurement)?;
    let frames = match model {
        Some(model) => fix_client_clock_error(&frames, Some(model), DEFAULT_TRANSFER_FLOOR_US)?,
        None => frames,
    };
    convert_time_to_delay(&frames)
}
