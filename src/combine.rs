use std::collections::HashSet;

use tracing::debug;

use crate::config::CombineOptions;
use crate::constants::columns::{
    DRIVER_POSE_ACCESSED, FRAME_ID, FRAME_INDEX, FRAME_TIME_COLUMNS, IDENTIFYING_COLUMNS,
    POSE_ACCESSED, POSE_TIMESTAMP, PRESENT_CALLED, TRACKING_PROCESSED, TRACKING_RECEIVED,
};
use crate::constants::sources;
use crate::constants::tables;
use crate::errors::MeasurementError;
use crate::measurement::MeasurementFile;
use crate::table::{Table, Value};

/// Join driver, server, and client frame tables on `frame_id`.
///
/// Driver and server are inner-joined; the client table is outer-joined so
/// frames never confirmed by the client survive. The result carries the fixed
/// frame-time schema, nulls filled with 0, every cell an `Int`.
pub fn combine_frame_times(measurement: &MeasurementFile) -> Result<Table, MeasurementError> {
    let driver = measurement.table(tables::DRIVER_FRAME_TIME)?;
    let server = measurement.table(tables::SERVER_FRAME_TIME)?;
    let client = measurement.table(tables::CLIENT_FRAME_TIME)?;

    let joined = driver
        .inner_join(server, FRAME_ID)?
        .outer_join(client, FRAME_ID)?;
    let mut frames = joined
        .select(&FRAME_TIME_COLUMNS)?
        .with_name(tables::FRAME_TIMES);
    frames.fill_null(Value::Int(0));
    frames.coerce_int64()?;
    Ok(frames)
}

/// Join tracking tables on `pose_timestamp` (inner joins throughout).
///
/// Shared column names get a process prefix, e.g. `tracking_received`
/// becomes `server_tracking_received`, and `pose_accessed` becomes
/// `driver_pose_accessed`. With `client_tracking` the client table is joined first.
pub fn combine_tracking_times(
    measurement: &MeasurementFile,
    client_tracking: bool,
) -> Result<Table, MeasurementError> {
    let server = prefixed_tracking(measurement, tables::SERVER_TRACKING, sources::SERVER)?;
    let driver = prefixed_tracking(measurement, tables::DRIVER_TRACKING, sources::DRIVER)?;
    let mut access = measurement.table(tables::DRIVER_POSE_ACCESS)?.clone();
    access.rename_columns(&[(POSE_ACCESSED, DRIVER_POSE_ACCESSED)]);

    let combined = if client_tracking {
        prefixed_tracking(measurement, tables::CLIENT_TRACKING, sources::CLIENT)?
            .inner_join(&server, POSE_TIMESTAMP)?
            .inner_join(&driver, POSE_TIMESTAMP)?
    } else {
        server.inner_join(&driver, POSE_TIMESTAMP)?
    };
    let mut combined = combined
        .inner_join(&access, POSE_TIMESTAMP)?
        .with_name(tables::TRACKING_TIMES);
    combined.coerce_int64()?;
    Ok(combined)
}

/// Join tracking and frame tables into one record per retained frame.
///
/// Rows where the driver accessed the pose at or after `present_called` are
/// removed. By default one row per `frame_id` survives: the one with the
/// largest `driver_pose_accessed` (ties keep the later row). With
/// `keep_dropped`, `frame_index == 0` becomes null and only rows whose
/// `frame_index` is null or repeated are kept, surfacing dropped frames.
pub fn combine_all(
    measurement: &MeasurementFile,
    options: CombineOptions,
) -> Result<Table, MeasurementError> {
    let tracking = combine_tracking_times(measurement, options.client_tracking)?;
    let frames = combine_frame_times(measurement)?;
    let mut all = tracking
        .outer_join(&frames, POSE_TIMESTAMP)?
        .with_name(tables::ALL_TIMES);

    let accessed = all.require_column(DRIVER_POSE_ACCESSED)?;
    let present = all.require_column(PRESENT_CALLED)?;
    let joined_rows = all.len();
    all.retain_rows(|row| match (row[accessed].as_i64(), row[present].as_i64()) {
        (Some(accessed), Some(present)) => accessed < present,
        _ => false,
    });
    debug!(
        removed = joined_rows - all.len(),
        kept = all.len(),
        "filtered rows violating pose access ordering"
    );

    all.sort_by_columns(&[FRAME_ID, DRIVER_POSE_ACCESSED])?;
    if options.keep_dropped {
        retain_dropped_frames(&mut all)?;
    } else {
        keep_last_per_frame(&mut all)?;
    }

    let order: Vec<String> = IDENTIFYING_COLUMNS
        .iter()
        .map(|column| column.to_string())
        .chain(
            all.columns()
                .iter()
                .filter(|column| !IDENTIFYING_COLUMNS.contains(&column.as_str()))
                .cloned(),
        )
        .collect();
    all.select(&order)
}

fn prefixed_tracking(
    measurement: &MeasurementFile,
    table: &str,
    source: &str,
) -> Result<Table, MeasurementError> {
    let mut tracking = measurement.table(table)?.clone();
    tracking.rename_columns(&[
        (TRACKING_RECEIVED, format!("{source}_{TRACKING_RECEIVED}")),
        (TRACKING_PROCESSED, format!("{source}_{TRACKING_PROCESSED}")),
    ]);
    Ok(tracking)
}

/// Rows must already be sorted by `frame_id`; keeps the last row of each run.
fn keep_last_per_frame(all: &mut Table) -> Result<(), MeasurementError> {
    let ids = all.column_i64(FRAME_ID)?;
    let keep: Vec<bool> = (0..ids.len())
        .map(|row| row + 1 == ids.len() || ids[row + 1] != ids[row])
        .collect();
    let before = all.len();
    let mut row = 0;
    all.retain_rows(|_| {
        let kept = keep[row];
        row += 1;
        kept
    });
    debug!(
        duplicates = before - all.len(),
        frames = all.len(),
        "deduplicated rows per frame_id"
    );
    Ok(())
}

fn retain_dropped_frames(all: &mut Table) -> Result<(), MeasurementError> {
    let index = all.require_column(FRAME_INDEX)?;
    let nulled: Vec<Value> = all
        .rows()
        .iter()
        .map(|row| match row[index].as_i64() {
            Some(0) => Value::Null,
            _ => row[index].clone(),
        })
        .collect();
    all.set_column(FRAME_INDEX, nulled)?;

    let mut seen = HashSet::new();
    all.retain_rows(|row| match row[index].as_i64() {
        None => true,
        Some(frame_index) => !seen.insert(frame_index),
    });
    debug!(rows = all.len(), "kept dropped and repeated frames");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{FrameSpec, build_measurement};

    #[test]
    fn frame_times_use_fixed_schema_and_integer_cells() {
        let measurement = build_measurement(&FrameSpec::sequence(3));
        let frames = combine_frame_times(&measurement).unwrap();
        assert_eq!(frames.columns(), &FRAME_TIME_COLUMNS.map(String::from));
        assert_eq!(frames.len(), 3);
        assert!(
            frames
                .rows()
                .iter()
                .flatten()
                .all(|cell| matches!(cell, Value::Int(_)))
        );
    }

    #[test]
    fn frames_missing_on_client_are_zero_filled() {
        let mut specs = FrameSpec::sequence(2);
        specs[1].client = false;
        let measurement = build_measurement(&specs);
        let frames = combine_frame_times(&measurement).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames.value(1, "end_frame"), Some(&Value::Int(0)));
        assert_eq!(frames.value(1, "frame_index"), Some(&Value::Int(0)));
        assert_ne!(frames.value(1, "present_called"), Some(&Value::Int(0)));
    }

    #[test]
    fn tracking_columns_are_prefixed_per_process() {
        let measurement = build_measurement(&FrameSpec::sequence(2));
        let tracking = combine_tracking_times(&measurement, true).unwrap();
        for column in [
            "client_tracking_received",
            "server_tracking_received",
            "driver_tracking_processed",
            "driver_pose_accessed",
        ] {
            assert!(tracking.has_column(column), "missing {column}");
        }
        let without_client = combine_tracking_times(&measurement, false).unwrap();
        assert!(!without_client.has_column("client_tracking_received"));
        assert_eq!(without_client.len(), 2);
    }

    #[test]
    fn combine_all_puts_identifying_columns_first() {
        let measurement = build_measurement(&FrameSpec::sequence(2));
        let all = combine_all(&measurement, CombineOptions::default()).unwrap();
        assert_eq!(&all.columns()[..5], &IDENTIFYING_COLUMNS.map(String::from));
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn combine_all_keeps_latest_valid_pose_access_per_frame() {
        let mut specs = FrameSpec::sequence(1);
        // Three candidate poses: two before present_called, one after.
        specs[0].extra_pose_accesses = vec![-3_000, -200, 400];
        let measurement = build_measurement(&specs);
        let all = combine_all(&measurement, CombineOptions::default()).unwrap();
        assert_eq!(all.len(), 1);
        let accessed = all.value(0, "driver_pose_accessed").unwrap().as_i64().unwrap();
        let present = all.value(0, "present_called").unwrap().as_i64().unwrap();
        assert_eq!(present - accessed, 200);
    }

    #[test]
    fn keep_dropped_surfaces_frames_without_index() {
        let mut specs = FrameSpec::sequence(3);
        specs[1].frame_index = 0;
        let measurement = build_measurement(&specs);
        let options = CombineOptions::default().with_keep_dropped(true);
        let all = combine_all(&measurement, options).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all.value(0, "frame_id"), Some(&Value::Int(2)));
        assert_eq!(all.value(0, "frame_index"), Some(&Value::Null));
    }

    #[test]
    fn keep_dropped_keeps_repeated_frame_index_after_first() {
        let mut specs = FrameSpec::sequence(4);
        specs[2].frame_index = 2;
        let measurement = build_measurement(&specs);
        let options = CombineOptions::default().with_keep_dropped(true);
        let all = combine_all(&measurement, options).unwrap();
        assert_eq!(all.column_i64("frame_id").unwrap(), vec![Some(3)]);
        assert_eq!(all.column_i64("frame_index").unwrap(), vec![Some(2)]);
    }

    #[test]
    fn equal_pose_access_keeps_later_joined_row() {
        let specs = FrameSpec::sequence(1);
        let mut measurement = build_measurement(&specs);
        let mut server = measurement.table(tables::SERVER_TRACKING).unwrap().clone();
        let later_received = specs[0].present_called - 1_450;
        server
            .push_row(vec![
                Value::Int(specs[0].pose_timestamp()),
                Value::Int(later_received),
                Value::Int(later_received + 50),
            ])
            .unwrap();
        measurement.insert(server);

        let tracking = combine_tracking_times(&measurement, false).unwrap();
        assert_eq!(tracking.len(), 2);

        let all = combine_all(&measurement, CombineOptions::default()).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(
            all.value(0, "server_tracking_received"),
            Some(&Value::Int(later_received))
        );
    }
}
