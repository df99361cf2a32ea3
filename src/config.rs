use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::clock::DEFAULT_TRANSFER_FLOOR_US;
use crate::errors::MeasurementError;
use crate::types::Micros;

/// Controls how per-process tables are merged into one per-frame table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombineOptions {
    /// Join the client tracking table before the server/driver tracking tables.
    pub client_tracking: bool,
    /// Keep frames that never received a displayed index (loss analysis)
    /// instead of deduplicating per `frame_id`.
    pub keep_dropped: bool,
}

impl CombineOptions {
    /// Enable or disable the client tracking join.
    pub fn with_client_tracking(mut self, client_tracking: bool) -> Self {
        self.client_tracking = client_tracking;
        self
    }

    /// Enable or disable dropped-frame retention.
    pub fn with_keep_dropped(mut self, keep_dropped: bool) -> Self {
        self.keep_dropped = keep_dropped;
        self
    }
}

/// Controls client clock error estimation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Floor for client to server transfer time added to the min-based estimate.
    pub transfer_floor_us: Micros,
    /// Use one minimum-error point per run when fitting drift.
    pub only_take_min_of_run: bool,
    /// Fit a drift line across all loaded runs instead of a per-run scalar.
    pub drift_fit: bool,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            transfer_floor_us: DEFAULT_TRANSFER_FLOOR_US,
            only_take_min_of_run: true,
            drift_fit: false,
        }
    }
}

/// Top-level analysis configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Table merge policy.
    pub combine: CombineOptions,
    /// Clock alignment policy.
    pub clock: ClockConfig,
}

impl AnalysisConfig {
    /// Load a JSON config file; absent fields keep their defaults.
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self, MeasurementError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw).map_err(|err| {
            MeasurementError::Configuration(format!(
                "failed to parse config '{}': {err}",
                path.display()
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot use.
    pub fn validate(&self) -> Result<(), MeasurementError> {
        if self.clock.transfer_floor_us < 0 {
            return Err(MeasurementError::Configuration(format!(
                "transfer_floor_us must be non-negative, got {}",
                self.clock.transfer_floor_us
            )));
        }
        Ok(())
    }
}
