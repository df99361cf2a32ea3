/// Constants describing the on-disk measurement log format.
pub mod format {
    /// Line separating consecutive tables in a measurement file.
    pub const TABLE_DIVIDER: &str = "---";
    /// Field separator for column and value lines.
    pub const FIELD_SEPARATOR: char = ',';
    /// Origin label used when parsing text that did not come from a file.
    pub const MEMORY_ORIGIN: &str = "<memory>";
    /// Filename prefix shared by every run file of every pass.
    pub const PASS_FILE_PREFIX: &str = "wvb_measurements_pass_";
    /// Filename extension of run files.
    pub const PASS_FILE_EXTENSION: &str = ".csv";
    /// Optional marker written by the capture server before the run id.
    pub const RUN_ID_MARKER: &str = "run_";
    /// Bytes per pixel of the raw RGBA8 image interface.
    pub const RGBA_BYTES_PER_PIXEL: usize = 4;
}

/// Table names written by the capture server.
pub mod tables {
    /// Per-socket traffic counters.
    pub const SOCKET: &str = "socket_measurements";
    /// Driver-side frame timestamps keyed by `frame_id`.
    pub const DRIVER_FRAME_TIME: &str = "driver_frame_time_measurements";
    /// Driver-side tracking timestamps keyed by `pose_timestamp`.
    pub const DRIVER_TRACKING: &str = "driver_tracking_measurements";
    /// Driver pose access timestamps keyed by `pose_timestamp`.
    pub const DRIVER_POSE_ACCESS: &str = "driver_pose_access_measurements";
    /// Server-side frame timestamps keyed by `frame_id`.
    pub const SERVER_FRAME_TIME: &str = "server_frame_time_measurements";
    /// Server-side tracking timestamps keyed by `pose_timestamp`.
    pub const SERVER_TRACKING: &str = "server_tracking_measurements";
    /// Server-side image quality samples.
    pub const SERVER_IMAGE_QUALITY: &str = "server_image_quality_measurements";
    /// Client-side frame timestamps keyed by `frame_id`.
    pub const CLIENT_FRAME_TIME: &str = "client_frame_time_measurements";
    /// Client-side tracking timestamps keyed by `pose_timestamp`.
    pub const CLIENT_TRACKING: &str = "client_tracking_measurements";
    /// Client-side image quality samples.
    pub const CLIENT_IMAGE_QUALITY: &str = "client_image_quality_measurements";
    /// Round-trip time and clock error samples.
    pub const NETWORK: &str = "network_measurements";
    /// Single-row counters (dropped frames, codec delays).
    pub const MISC: &str = "misc_measurements";

    /// Derived: driver, server, and client frame tables joined on `frame_id`.
    pub const FRAME_TIMES: &str = "frame_times";
    /// Derived: tracking tables joined on `pose_timestamp`.
    pub const TRACKING_TIMES: &str = "tracking_times";
    /// Derived: frame and tracking tables joined, filtered, and deduplicated.
    pub const ALL_TIMES: &str = "all_times";
    /// Derived: frame times rebased onto `present_called`.
    pub const FRAME_DELAYS: &str = "frame_delays";
}

/// Column names and fixed column lists used by the combine and delay stages.
pub mod columns {
    /// Surrogate key shared by driver, server, and client frame tables.
    pub const FRAME_ID: &str = "frame_id";
    /// Client display index; 0 marks a frame that was never displayed.
    pub const FRAME_INDEX: &str = "frame_index";
    /// Server flag for frames dropped before encoding.
    pub const DROPPED: &str = "dropped";
    /// Client-reported frame delay.
    pub const FRAME_DELAY: &str = "frame_delay";
    /// Key shared by every tracking table.
    pub const POSE_TIMESTAMP: &str = "pose_timestamp";
    /// Driver present call; the anchor for per-frame delays.
    pub const PRESENT_CALLED: &str = "present_called";
    /// Client finished the frame.
    pub const END_FRAME: &str = "end_frame";
    /// Client sampled the pose used for the frame.
    pub const TRACKING_SAMPLED: &str = "tracking_sampled";
    /// Unprefixed tracking receive column of each process.
    pub const TRACKING_RECEIVED: &str = "tracking_received";
    /// Unprefixed tracking processed column of each process.
    pub const TRACKING_PROCESSED: &str = "tracking_processed";
    /// Driver pose access column before prefixing.
    pub const POSE_ACCESSED: &str = "pose_accessed";
    /// Driver pose access after prefixing.
    pub const DRIVER_POSE_ACCESSED: &str = "driver_pose_accessed";
    /// Server received the tracking sample.
    pub const SERVER_TRACKING_RECEIVED: &str = "server_tracking_received";
    /// Correction column added by client clock alignment.
    pub const CLIENT_CLOCK_ERROR: &str = "client_clock_error";
    /// Network round-trip time.
    pub const RTT: &str = "rtt";
    /// Network-reported clock error.
    pub const CLOCK_ERROR: &str = "clock_error";

    /// Ordered schema of the combined frame-time table.
    pub const FRAME_TIME_COLUMNS: [&str; 32] = [
        "frame_id",
        "frame_index",
        "dropped",
        "frame_delay",
        // driver
        "present_called",
        "vsync",
        "frame_sent",
        "wait_for_present_called",
        "server_finished",
        "pose_updated_event",
        // server
        "frame_event_received",
        "present_info_received",
        "shared_texture_opened",
        "shared_texture_acquired",
        "staging_texture_mapped",
        "encoder_frame_pushed",
        "encoder_frame_pulled",
        "before_last_get_next_packet",
        "after_last_get_next_packet",
        "before_last_send_packet",
        "after_last_send_packet",
        "finished_signal_sent",
        // client
        "tracking_sampled",
        "last_packet_received",
        "pushed_to_decoder",
        "begin_wait_frame",
        "begin_frame",
        "after_wait_swapchain",
        "after_render",
        "end_frame",
        "predicted_present_time",
        "pose_timestamp",
    ];

    /// Columns moved to the front of the fully combined table.
    pub const IDENTIFYING_COLUMNS: [&str; 5] = [
        "frame_id",
        "frame_index",
        "dropped",
        "frame_delay",
        "pose_timestamp",
    ];

    /// Columns left untouched when rebasing timestamps onto `present_called`.
    pub const DELAY_EXEMPT_COLUMNS: [&str; 5] = [
        "frame_id",
        "dropped",
        "frame_index",
        "frame_delay",
        "present_called",
    ];

    /// Timestamps taken on the client clock.
    pub const CLIENT_CLOCK_COLUMNS: [&str; 12] = [
        "client_tracking_received",
        "client_tracking_processed",
        "tracking_sampled",
        "last_packet_received",
        "pushed_to_decoder",
        "begin_wait_frame",
        "begin_frame",
        "after_wait_swapchain",
        "after_render",
        "end_frame",
        "predicted_present_time",
        "pose_timestamp",
    ];
}

/// Constants used by client clock alignment.
pub mod clock {
    use crate::types::Micros;

    /// Conservative floor for client to server transfer time, added to the
    /// min-based clock error estimate.
    pub const DEFAULT_TRANSFER_FLOOR_US: Micros = 500;
    /// Microseconds per second, used for FPS conversion.
    pub const MICROS_PER_SECOND: f64 = 1_000_000.0;
}

/// Prefixes used to disambiguate tracking columns shared by several processes.
pub mod sources {
    /// Prefix for client tracking columns.
    pub const CLIENT: &str = "client";
    /// Prefix for server tracking columns.
    pub const SERVER: &str = "server";
    /// Prefix for driver tracking columns.
    pub const DRIVER: &str = "driver";
}
