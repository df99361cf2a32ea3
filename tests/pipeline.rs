mod common;

use std::collections::HashSet;
use std::fs;

use tempfile::tempdir;

use wvb_latency::apps::run_latency_report;
use wvb_latency::{
    CombineOptions, MeasurementFile, Value, average_table, client_clock_error_fn, combine_all,
    combine_delays, combine_frame_times, fix_client_clock_error, load_dataset,
    load_measurement_pass, min_client_clock_error,
};

use common::{RunSpec, render_run, write_run};

#[test]
fn combined_rows_respect_pose_ordering_and_are_unique_per_frame() {
    let measurement: MeasurementFile = render_run(&RunSpec::new(6)).parse().unwrap();
    let all = combine_all(&measurement, CombineOptions::default()).unwrap();
    assert_eq!(all.len(), 6);

    let accessed = all.column_i64("driver_pose_accessed").unwrap();
    let present = all.column_i64("present_called").unwrap();
    for (accessed, present) in accessed.iter().zip(&present) {
        assert!(accessed.unwrap() < present.unwrap());
    }
    let ids: Vec<i64> = all
        .column_i64("frame_id")
        .unwrap()
        .into_iter()
        .map(Option::unwrap)
        .collect();
    let unique: HashSet<i64> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len());
    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn frame_combine_drops_frames_missing_from_driver() {
    let text = "\
driver_frame_time_measurements
frame_id,present_called,vsync,frame_sent,wait_for_present_called,server_finished,pose_updated_event
1,100,110,120,130,140,150
2,200,210,220,230,240,250
---
server_frame_time_measurements
frame_id,dropped,frame_event_received,present_info_received,shared_texture_opened,shared_texture_acquired,staging_texture_mapped,encoder_frame_pushed,encoder_frame_pulled,before_last_get_next_packet,after_last_get_next_packet,before_last_send_packet,after_last_send_packet,finished_signal_sent
1,0,1,2,3,4,5,6,7,8,9,10,11,12
2,0,1,2,3,4,5,6,7,8,9,10,11,12
3,0,1,2,3,4,5,6,7,8,9,10,11,12
---
client_frame_time_measurements
frame_index,frame_id,frame_delay,tracking_sampled,last_packet_received,pushed_to_decoder,begin_wait_frame,begin_frame,after_wait_swapchain,after_render,end_frame,predicted_present_time,pose_timestamp
---
";
    let measurement: MeasurementFile = text.parse().unwrap();
    let frames = combine_frame_times(&measurement).unwrap();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames.value(0, "frame_id"), Some(&Value::Int(1)));
    assert_eq!(frames.value(1, "frame_id"), Some(&Value::Int(2)));
    assert_eq!(frames.value(1, "vsync"), Some(&Value::Int(210)));
    assert_eq!(frames.value(1, "finished_signal_sent"), Some(&Value::Int(12)));
    assert_eq!(frames.value(0, "end_frame"), Some(&Value::Int(0)));
    assert_eq!(frames.value(0, "tracking_sampled"), Some(&Value::Int(0)));
}

#[test]
fn scalar_clock_correction_restores_transfer_floor() {
    let measurement: MeasurementFile = render_run(&RunSpec::new(4).with_skew(1_500))
        .parse()
        .unwrap();
    let all = combine_all(&measurement, CombineOptions::default()).unwrap();
    assert_eq!(min_client_clock_error(&all, 500).unwrap(), 1_500);

    let fixed = fix_client_clock_error(&all, None, 500).unwrap();
    let received = fixed.column_i64("server_tracking_received").unwrap();
    let sampled = fixed.column_i64("tracking_sampled").unwrap();
    for (received, sampled) in received.iter().zip(&sampled) {
        assert_eq!(received.unwrap() - sampled.unwrap(), 500);
    }
    assert_eq!(fixed.value(0, "client_clock_error"), Some(&Value::Int(1_500)));
}

#[test]
fn drift_fit_over_a_pass_corrects_averaged_delays() {
    let temp = tempdir().unwrap();
    for run in 0..4 {
        let spec = RunSpec::new(5)
            .starting_at(1_000_000 * (i64::from(run) + 1))
            .with_skew(1_000)
            .with_drift(0.001);
        write_run(temp.path(), 0, run, &spec);
    }

    let dataset = load_dataset(temp.path(), &[0]).unwrap();
    assert_eq!(dataset[0].len(), 4);
    let model = client_clock_error_fn(&dataset, true).unwrap();
    assert!((model.slope - 0.001).abs() < 1e-5, "slope {}", model.slope);
    assert!((model.intercept - 500.0).abs() < 2.0, "intercept {}", model.intercept);

    let delays = combine_delays(&dataset[0], Some(model)).unwrap();
    assert_eq!(delays.len(), 5);
    for row in 0..delays.len() {
        let end_frame = delays.value(row, "end_frame").unwrap().as_f64().unwrap();
        assert!((end_frame - 3_500.0).abs() < 10.0, "end_frame {end_frame}");
        let vsync = delays.value(row, "vsync").unwrap().as_f64().unwrap();
        assert!((vsync - 100.0).abs() < 1e-6);
    }
}

#[test]
fn network_table_is_averaged_across_runs() {
    let temp = tempdir().unwrap();
    write_run(temp.path(), 2, 0, &RunSpec::new(2));
    write_run(temp.path(), 2, 1, &RunSpec::new(3));

    let runs = load_measurement_pass(temp.path(), 2).unwrap();
    let network = average_table(&runs, "network_measurements").unwrap();
    assert_eq!(network.len(), 3);
    assert_eq!(network.value(0, "rtt"), Some(&Value::Float(900.0)));
    assert_eq!(network.value(2, "clock_error"), Some(&Value::Float(10.0)));
}

#[test]
fn latency_report_writes_parseable_delay_table() {
    let temp = tempdir().unwrap();
    write_run(temp.path(), 0, 0, &RunSpec::new(3).with_skew(800));
    write_run(temp.path(), 0, 1, &RunSpec::new(3).starting_at(2_000_000));
    let output = temp.path().join("delays.txt");

    let args = [
        "--dir",
        temp.path().to_str().unwrap(),
        "--pass",
        "0",
        "--transfer-floor-us",
        "250",
        "--output",
        output.to_str().unwrap(),
    ];
    run_latency_report(args.iter().map(|arg| arg.to_string())).unwrap();

    let written = MeasurementFile::load(&output).unwrap();
    let delays = written.table("frame_delays").unwrap();
    assert_eq!(delays.len(), 3);
    assert_eq!(delays.value(0, "frame_id").unwrap().as_i64(), Some(1));
}

#[test]
fn latency_report_help_and_missing_pass() {
    run_latency_report(["--help".to_string()].into_iter()).unwrap();

    let temp = tempdir().unwrap();
    fs::write(temp.path().join("unrelated.csv"), "x\n").unwrap();
    let args = ["--dir", temp.path().to_str().unwrap(), "--pass", "4"];
    assert!(run_latency_report(args.iter().map(|arg| arg.to_string())).is_err());
}
