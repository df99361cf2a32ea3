//! Client clock alignment.
//!
//! Client and server clocks are not synchronized. A pose can never reach the
//! server before the client sampled it, so any negative
//! `server_tracking_received - tracking_sampled` is clock error, not causality.
//! That bound yields either a per-run scalar correction or, across many runs,
//! a least-squares drift line over session time.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::combine::combine_all;
use crate::config::CombineOptions;
use crate::constants::columns::{
    CLIENT_CLOCK_COLUMNS, CLIENT_CLOCK_ERROR, PRESENT_CALLED, SERVER_TRACKING_RECEIVED,
    TRACKING_SAMPLED,
};
use crate::errors::MeasurementError;
use crate::measurement::MeasurementFile;
use crate::table::{Table, Value};
use crate::types::Micros;

/// Linear clock drift model: correction = `slope * t + intercept` (µs).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClockModel {
    /// Drift in µs of correction per µs of session time.
    pub slope: f64,
    /// Correction at time zero, in µs.
    pub intercept: f64,
}

impl ClockModel {
    /// Correction to subtract from a client timestamp taken at `time`.
    pub fn correction_at(&self, time: f64) -> f64 {
        self.slope * time + self.intercept
    }
}

/// One observation of apparent client to server delay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClockErrorPoint {
    /// Server-clock time of the frame (`present_called`).
    pub time: f64,
    /// `server_tracking_received - tracking_sampled`; negative means clock error.
    pub error: f64,
}

/// Scalar client clock correction for one run.
///
/// Returns 0 when no row shows a negative apparent delay; otherwise the
/// magnitude of the worst violation plus `transfer_floor_us`.
pub fn min_client_clock_error(
    table: &Table,
    transfer_floor_us: Micros,
) -> Result<Micros, MeasurementError> {
    let received = table.column_i64(SERVER_TRACKING_RECEIVED)?;
    let sampled = table.column_i64(TRACKING_SAMPLED)?;
    let min_err = received
        .iter()
        .zip(&sampled)
        .filter_map(|(received, sampled)| (*received)?.checked_sub((*sampled)?))
        .min();
    match min_err {
        None => {
            debug!(table = %table.name(), "no tracking rows to estimate clock error from");
            Ok(0)
        }
        Some(err) if err >= 0 => Ok(0),
        Some(err) => transfer_floor_us
            .checked_sub(err)
            .ok_or_else(|| {
                MeasurementError::ClockFit(format!(
                    "clock error {err} with transfer floor {transfer_floor_us} overflows"
                ))
            }),
    }
}

/// Collect clock error observations across `[pass][run]` measurements.
///
/// Rows without a `tracking_sampled` are ignored. With `only_take_min_of_run`
/// each run contributes its single lowest-error row. Points are deduplicated
/// by time (first kept) and sorted by time.
pub fn clock_error_points(
    runs: &[Vec<MeasurementFile>],
    only_take_min_of_run: bool,
) -> Result<Vec<ClockErrorPoint>, MeasurementError> {
    let mut points = Vec::new();
    for (pass_idx, pass) in runs.iter().enumerate() {
        for (run_idx, measurement) in pass.iter().enumerate() {
            let all = combine_all(measurement, CombineOptions::default())?;
            let time = all.column_f64(PRESENT_CALLED)?;
            let received = all.column_f64(SERVER_TRACKING_RECEIVED)?;
            let sampled = all.column_f64(TRACKING_SAMPLED)?;
            let run_points: Vec<ClockErrorPoint> = time
                .iter()
                .zip(received.iter().zip(&sampled))
                .filter_map(|(time, (received, sampled))| {
                    let sampled = (*sampled).filter(|sampled| *sampled != 0.0)?;
                    Some(ClockErrorPoint {
                        time: (*time)?,
                        error: (*received)? - sampled,
                    })
                })
                .collect();
            if run_points.is_empty() {
                warn!(pass = pass_idx, run = run_idx, "run has no tracked frames; skipped for clock fit");
                continue;
            }
            if only_take_min_of_run {
                let mut min = run_points[0];
                for point in &run_points[1..] {
                    if point.error < min.error {
                        min = *point;
                    }
                }
                points.push(min);
            } else {
                points.extend(run_points);
            }
        }
    }

    let mut seen = HashSet::with_capacity(points.len());
    points.retain(|point| seen.insert(point.time.to_bits()));
    points.sort_by(|left, right| left.time.total_cmp(&right.time));
    Ok(points)
}

/// Fit a drift line to clock error observations across many runs.
///
/// The fitted line maps session time to the correction `-error`.
pub fn client_clock_error_fn(
    runs: &[Vec<MeasurementFile>],
    only_take_min_of_run: bool,
) -> Result<ClockModel, MeasurementError> {
    let points = clock_error_points(runs, only_take_min_of_run)?;
    let times: Vec<f64> = points.iter().map(|point| point.time).collect();
    let corrections: Vec<f64> = points.iter().map(|point| -point.error).collect();
    let model = fit_line(&times, &corrections)?;
    info!(
        points = points.len(),
        slope = model.slope,
        intercept = model.intercept,
        "fitted client clock drift"
    );
    Ok(model)
}

/// Ordinary least-squares fit of `ys = slope * xs + intercept`.
pub fn fit_line(xs: &[f64], ys: &[f64]) -> Result<ClockModel, MeasurementError> {
    if xs.len() != ys.len() {
        return Err(MeasurementError::ClockFit(format!(
            "{} times but {} errors",
            xs.len(),
            ys.len()
        )));
    }
    if xs.len() < 2 {
        return Err(MeasurementError::ClockFit(format!(
            "need at least 2 points, got {}",
            xs.len()
        )));
    }
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let (sxx, sxy) = xs
        .iter()
        .zip(ys)
        .fold((0.0, 0.0), |(sxx, sxy), (x, y)| {
            let dx = x - mean_x;
            (sxx + dx * dx, sxy + dx * (y - mean_y))
        });
    if sxx == 0.0 {
        return Err(MeasurementError::ClockFit(
            "all points share the same time".to_string(),
        ));
    }
    let slope = sxy / sxx;
    Ok(ClockModel {
        slope,
        intercept: mean_y - slope * mean_x,
    })
}

/// Shift every client-clock column by the estimated clock error.
///
/// With a `model` the correction is drift-aware per row (evaluated at the
/// uncorrected `tracking_sampled`); without one it is the per-run scalar from
/// [`min_client_clock_error`]. The correction is recorded in
/// `client_clock_error` and subtracted from the client columns present.
pub fn fix_client_clock_error(
    table: &Table,
    model: Option<ClockModel>,
    transfer_floor_us: Micros,
) -> Result<Table, MeasurementError> {
    let corrections: Vec<Value> = match model {
        Some(model) => table
            .column_f64(TRACKING_SAMPLED)?
            .into_iter()
            .map(|sampled| match sampled {
                Some(sampled) => Value::Float(model.correction_at(sampled)),
                None => Value::Null,
            })
            .collect(),
        None => {
            let err = min_client_clock_error(table, transfer_floor_us)?;
            vec![Value::Int(err); table.len()]
        }
    };

    let mut fixed = table.clone();
    fixed.set_column(CLIENT_CLOCK_ERROR, corrections.clone())?;
    let client_columns: Vec<&str> = CLIENT_CLOCK_COLUMNS
        .iter()
        .copied()
        .filter(|column| fixed.has_column(column))
        .collect();
    fixed.subtract_per_row(&client_columns, &corrections)?;
    debug!(
        table = %fixed.name(),
        columns = client_columns.len(),
        drift_model = model.is_some(),
        "applied client clock correction"
    );
    Ok(fixed)
}
