#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// One synthetic capture run: `frames` frames 10 ms apart starting at `start`.
#[derive(Clone, Debug)]
pub struct RunSpec {
    pub frames: i64,
    pub start: i64,
    /// Client clock offset in µs relative to the server clock.
    pub skew: i64,
    /// Additional client clock offset per µs of server time.
    pub drift: f64,
}

impl RunSpec {
    pub fn new(frames: i64) -> Self {
        Self {
            frames,
            start: 1_000_000,
            skew: 0,
            drift: 0.0,
        }
    }

    pub fn starting_at(mut self, start: i64) -> Self {
        self.start = start;
        self
    }

    pub fn with_skew(mut self, skew: i64) -> Self {
        self.skew = skew;
        self
    }

    pub fn with_drift(mut self, drift: f64) -> Self {
        self.drift = drift;
        self
    }

    fn present(&self, frame_id: i64) -> i64 {
        self.start + frame_id * 10_000
    }

    fn client_offset(&self, present: i64) -> i64 {
        self.skew + (present as f64 * self.drift) as i64
    }
}

/// Render a run in the measurement log format.
///
/// True timeline per frame (server clock): pose sampled 2 ms before
/// `present_called`, received by the server 1.5 ms before, client done 3 ms after.
pub fn render_run(spec: &RunSpec) -> String {
    let mut driver_frames = vec![
        "driver_frame_time_measurements".to_string(),
        "frame_id,present_called,vsync,frame_sent,wait_for_present_called,server_finished,pose_updated_event".to_string(),
    ];
    let mut driver_tracking = vec![
        "driver_tracking_measurements".to_string(),
        "pose_timestamp,tracking_received,tracking_processed".to_string(),
    ];
    let mut pose_access = vec![
        "driver_pose_access_measurements".to_string(),
        "pose_timestamp,pose_accessed".to_string(),
    ];
    let mut server_frames = vec![
        "server_frame_time_measurements".to_string(),
        "frame_id,dropped,frame_event_received,present_info_received,shared_texture_opened,shared_texture_acquired,staging_texture_mapped,encoder_frame_pushed,encoder_frame_pulled,before_last_get_next_packet,after_last_get_next_packet,before_last_send_packet,after_last_send_packet,finished_signal_sent".to_string(),
    ];
    let mut server_tracking = vec![
        "server_tracking_measurements".to_string(),
        "pose_timestamp,tracking_received,tracking_processed".to_string(),
    ];
    let mut client_frames = vec![
        "client_frame_time_measurements".to_string(),
        "frame_index,frame_id,frame_delay,tracking_sampled,last_packet_received,pushed_to_decoder,begin_wait_frame,begin_frame,after_wait_swapchain,after_render,end_frame,predicted_present_time,pose_timestamp".to_string(),
    ];
    let mut client_tracking = vec![
        "client_tracking_measurements".to_string(),
        "pose_timestamp,tracking_received,tracking_processed".to_string(),
    ];

    for frame_id in 1..=spec.frames {
        let present = spec.present(frame_id);
        let client = present + spec.client_offset(present);
        let pose = 5_000_000 + frame_id;
        driver_frames.push(format!(
            "{frame_id},{present},{},{},{},{},{}",
            present + 100,
            present + 200,
            present + 50,
            present + 900,
            present - 500
        ));
        driver_tracking.push(format!("{pose},{},{}", present - 1_300, present - 1_200));
        pose_access.push(format!("{pose},{}", present - 1_000));
        server_frames.push(format!(
            "{frame_id},0,{}",
            (1..=12)
                .map(|stage| (present + 200 + stage * 40).to_string())
                .collect::<Vec<_>>()
                .join(",")
        ));
        server_tracking.push(format!("{pose},{},{}", present - 1_500, present - 1_400));
        client_frames.push(format!(
            "{frame_id},{frame_id},0,{},{},{},{},{},{},{},{},{},{pose}",
            client - 2_000,
            client + 1_500,
            client + 1_600,
            client + 1_700,
            client + 1_800,
            client + 1_900,
            client + 2_500,
            client + 3_000,
            client + 11_000
        ));
        client_tracking.push(format!("{pose},{},{}", client - 2_000, client - 1_950));
    }

    let network = vec![
        "network_measurements".to_string(),
        "rtt,clock_error".to_string(),
        "900,-20".to_string(),
        "1100,40".to_string(),
        "1000,10".to_string(),
    ];

    let mut out = String::new();
    for table in [
        driver_frames,
        driver_tracking,
        pose_access,
        server_frames,
        server_tracking,
        client_frames,
        client_tracking,
        network,
    ] {
        for line in table {
            out.push_str(&line);
            out.push('\n');
        }
        out.push_str("---\n");
    }
    out
}

/// Write a run as `wvb_measurements_pass_<pass>_run_<run>.csv` under `dir`.
pub fn write_run(dir: &Path, pass: u32, run: u32, spec: &RunSpec) -> PathBuf {
    let path = dir.join(format!("wvb_measurements_pass_{pass}_run_{run}.csv"));
    fs::write(&path, render_run(spec)).unwrap();
    path
}
