//! Synthetic captures shared by unit tests.

use crate::measurement::MeasurementFile;

/// Timeline of one synthetic frame, relative to its `present_called`.
#[derive(Clone, Debug)]
pub struct FrameSpec {
    pub frame_id: i64,
    pub frame_index: i64,
    pub present_called: i64,
    pub client: bool,
    pub client_skew: i64,
    pub extra_pose_accesses: Vec<i64>,
}

impl FrameSpec {
    pub fn new(frame_id: i64) -> Self {
        Self {
            frame_id,
            frame_index: frame_id,
            present_called: frame_id * 10_000,
            client: true,
            client_skew: 0,
            extra_pose_accesses: Vec::new(),
        }
    }

    pub fn sequence(count: i64) -> Vec<Self> {
        (1..=count).map(Self::new).collect()
    }

    pub fn pose_timestamp(&self) -> i64 {
        1_000_000 + self.frame_id
    }
}

/// Render specs as measurement log text.
pub fn render_measurement(specs: &[FrameSpec]) -> String {
    let mut out = String::new();
    let mut table = |name: &str, header: &str, rows: Vec<String>| {
        out.push_str(name);
        out.push('\n');
        out.push_str(header);
        out.push('\n');
        for row in rows {
            out.push_str(&row);
            out.push('\n');
        }
        out.push_str("---\n");
    };

    table(
        "driver_frame_time_measurements",
        "frame_id,present_called,vsync,frame_sent,wait_for_present_called,server_finished,pose_updated_event",
        specs
            .iter()
            .map(|s| {
                let b = s.present_called;
                format!("{},{},{},{},{},{},{}", s.frame_id, b, b + 100, b + 200, b + 50, b + 900, b - 500)
            })
            .collect(),
    );
    table(
        "driver_tracking_measurements",
        "pose_timestamp,tracking_received,tracking_processed",
        specs
            .iter()
            .map(|s| format!("{},{},{}", s.pose_timestamp(), s.present_called - 1_300, s.present_called - 1_200))
            .collect(),
    );
    table(
        "driver_pose_access_measurements",
        "pose_timestamp,pose_accessed",
        specs
            .iter()
            .flat_map(|s| {
                std::iter::once(-1_000)
                    .chain(s.extra_pose_accesses.iter().copied())
                    .map(move |offset| format!("{},{}", s.pose_timestamp(), s.present_called + offset))
            })
            .collect(),
    );
    table(
        "server_frame_time_measurements",
        "frame_id,dropped,frame_event_received,present_info_received,shared_texture_opened,shared_texture_acquired,staging_texture_mapped,encoder_frame_pushed,encoder_frame_pulled,before_last_get_next_packet,after_last_get_next_packet,before_last_send_packet,after_last_send_packet,finished_signal_sent",
        specs
            .iter()
            .map(|s| {
                let b = s.present_called;
                let stages: Vec<String> = [210, 220, 230, 240, 250, 300, 600, 610, 620, 630, 640, 650]
                    .iter()
                    .map(|offset| (b + offset).to_string())
                    .collect();
                format!("{},0,{}", s.frame_id, stages.join(","))
            })
            .collect(),
    );
    table(
        "server_tracking_measurements",
        "pose_timestamp,tracking_received,tracking_processed",
        specs
            .iter()
            .map(|s| format!("{},{},{}", s.pose_timestamp(), s.present_called - 1_500, s.present_called - 1_400))
            .collect(),
    );
    table(
        "client_frame_time_measurements",
        "frame_index,frame_id,frame_delay,tracking_sampled,last_packet_received,pushed_to_decoder,begin_wait_frame,begin_frame,after_wait_swapchain,after_render,end_frame,predicted_present_time,pose_timestamp",
        specs
            .iter()
            .filter(|s| s.client)
            .map(|s| {
                let b = s.present_called + s.client_skew;
                let stages: Vec<String> = [-2_000, 1_500, 1_600, 1_700, 1_800, 1_900, 2_500, 3_000, 11_000]
                    .iter()
                    .map(|offset| (b + offset).to_string())
                    .collect();
                format!("{},{},0,{},{}", s.frame_index, s.frame_id, stages.join(","), s.pose_timestamp())
            })
            .collect(),
    );
    table(
        "client_tracking_measurements",
        "pose_timestamp,tracking_received,tracking_processed",
        specs
            .iter()
            .map(|s| {
                let b = s.present_called + s.client_skew;
                format!("{},{},{}", s.pose_timestamp(), b - 2_000, b - 1_950)
            })
            .collect(),
    );
    table("network_measurements", "rtt,clock_error", vec!["800,-10".into(), "1200,30".into()]);
    out
}

/// Parse the rendered specs into a measurement.
pub fn build_measurement(specs: &[FrameSpec]) -> MeasurementFile {
    render_measurement(specs)
        .parse()
        .expect("synthetic measurement parses")
}
