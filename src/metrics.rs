use crate::constants::clock::MICROS_PER_SECOND;
use crate::constants::columns::{END_FRAME, FRAME_ID, PRESENT_CALLED, TRACKING_SAMPLED};
use crate::errors::MeasurementError;
use crate::table::Table;

/// Summary statistics over one latency series.
#[derive(Clone, Debug, PartialEq)]
pub struct SeriesSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

impl SeriesSummary {
    /// Summarize `values`; `None` for an empty series.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mean = mean(values)?;
        let median = median(values)?;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(Self {
            count: values.len(),
            mean,
            median,
            min,
            max,
        })
    }
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median; the two middle values are averaged for even lengths.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Per-frame latencies read from a delay-normalized table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LatencySeries {
    /// Frame ids relative to the first frame of the table.
    pub frames: Vec<i64>,
    /// Time from `present_called` until the client finished the frame.
    pub delay_after_present: Vec<f64>,
    /// Time from pose sampling until the client finished the frame.
    pub motion_to_photon: Vec<f64>,
    /// Time from pose sampling until `present_called`.
    pub tracking_latency: Vec<f64>,
}

/// Extract latency series from a delay-normalized table.
///
/// Rows missing any of the needed cells are skipped.
pub fn latency_series(delays: &Table) -> Result<LatencySeries, MeasurementError> {
    let ids = delays.column_i64(FRAME_ID)?;
    let end_frame = delays.column_f64(END_FRAME)?;
    let sampled = delays.column_f64(TRACKING_SAMPLED)?;
    let first_id = ids.iter().flatten().next().copied().unwrap_or_default();

    let mut series = LatencySeries::default();
    for ((id, end_frame), sampled) in ids.iter().zip(&end_frame).zip(&sampled) {
        let (Some(id), Some(end_frame), Some(sampled)) = (id, end_frame, sampled) else {
            continue;
        };
        series.frames.push(id - first_id);
        series.delay_after_present.push(*end_frame);
        series.motion_to_photon.push(end_frame - sampled);
        series.tracking_latency.push(-sampled);
    }
    Ok(series)
}

/// Successive frame-to-frame delays on the client and on the driver.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InterFrameDelays {
    pub client: Vec<f64>,
    pub driver: Vec<f64>,
}

/// Compute inter-frame delays from a delay-normalized table.
///
/// The client finished frame `i` at `present_called + end_frame`; the driver
/// presented it at `present_called`.
pub fn inter_frame_delays(delays: &Table) -> Result<InterFrameDelays, MeasurementError> {
    let present = delays.column_f64(PRESENT_CALLED)?;
    let end_frame = delays.column_f64(END_FRAME)?;
    let client_done: Vec<Option<f64>> = present
        .iter()
        .zip(&end_frame)
        .map(|(present, end_frame)| Some((*present)? + (*end_frame)?))
        .collect();
    Ok(InterFrameDelays {
        client: successive_differences(&client_done),
        driver: successive_differences(&present),
    })
}

/// Frames per second for an inter-frame delay in µs; `None` for a zero delay.
pub fn fps(delay_us: f64) -> Option<f64> {
    if delay_us == 0.0 {
        None
    } else {
        Some(MICROS_PER_SECOND / delay_us)
    }
}

fn successive_differences(values: &[Option<f64>]) -> Vec<f64> {
    values
        .windows(2)
        .filter_map(|pair| Some(pair[1]? - pair[0]?))
        .collect()
}
