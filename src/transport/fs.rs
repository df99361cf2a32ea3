use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::constants::format::{PASS_FILE_EXTENSION, PASS_FILE_PREFIX, RUN_ID_MARKER};
use crate::errors::MeasurementError;
use crate::measurement::MeasurementFile;
use crate::types::{PassId, RunId};

/// Run files of one pass directly under `dir`, ordered by run id then name.
///
/// Files are named `wvb_measurements_pass_<pass>_<run>.csv`, where the run
/// part may carry a `run_` marker. Files whose run part is not a number sort last.
pub fn pass_files(dir: &Path, pass_id: PassId) -> Result<Vec<PathBuf>, MeasurementError> {
    let prefix = format!("{PASS_FILE_PREFIX}{pass_id}_");
    let mut candidates: Vec<(Option<RunId>, PathBuf)> = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|err| MeasurementError::Io(err.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        let Some(run_part) = name
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(PASS_FILE_EXTENSION))
        else {
            continue;
        };
        candidates.push((run_id(run_part), entry.path().to_path_buf()));
    }
    candidates.sort_by(|(left_run, left), (right_run, right)| {
        left_run
            .unwrap_or(RunId::MAX)
            .cmp(&right_run.unwrap_or(RunId::MAX))
            .then_with(|| left.cmp(right))
    });
    debug!(dir = %dir.display(), pass = pass_id, files = candidates.len(), "discovered pass files");
    Ok(candidates.into_iter().map(|(_, path)| path).collect())
}

/// Parse every run file of one pass, preserving discovery order.
pub fn load_measurement_pass(
    dir: &Path,
    pass_id: PassId,
) -> Result<Vec<MeasurementFile>, MeasurementError> {
    let paths = pass_files(dir, pass_id)?;
    let runs = paths
        .par_iter()
        .map(|path| MeasurementFile::load(path))
        .collect::<Result<Vec<_>, _>>()?;
    info!(dir = %dir.display(), pass = pass_id, runs = runs.len(), "loaded measurement pass");
    Ok(runs)
}

/// Load several passes, indexed `[pass][run]`.
pub fn load_dataset(
    dir: &Path,
    pass_ids: &[PassId],
) -> Result<Vec<Vec<MeasurementFile>>, MeasurementError> {
    pass_ids
        .iter()
        .map(|&pass_id| load_measurement_pass(dir, pass_id))
        .collect()
}

fn run_id(run_part: &str) -> Option<RunId> {
    run_part
        .strip_prefix(RUN_ID_MARKER)
        .unwrap_or(run_part)
        .parse()
        .ok()
}
