/// Name of a table inside a measurement file.
/// Examples: `driver_frame_time_measurements`, `network_measurements`
pub type TableName = String;
/// Name of a column inside a table.
/// Examples: `frame_id`, `present_called`, `server_tracking_received`
pub type ColumnName = String;
/// Absolute or relative time in microsecond ticks.
/// Example: `1200` (a stage finishing 1.2 ms after `present_called`)
pub type Micros = i64;
/// Identifier of a measurement pass (a batch of repeated runs).
/// Example: `0` in `wvb_measurements_pass_0_run_3.csv`
pub type PassId = u32;
/// Identifier of one run inside a pass.
/// Example: `3` in `wvb_measurements_pass_0_run_3.csv`
pub type RunId = u32;
/// Human-readable origin of parsed text, used in error messages.
/// Examples: `/data/wvb_measurements_pass_0_run_1.csv`, `<memory>`
pub type Origin = String;
