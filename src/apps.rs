use std::error::Error;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::{Parser, error::ErrorKind};
use tracing::info;

use crate::aggregate::{avg_rtt, combine_delays, med_clock_error};
use crate::clock::{ClockModel, client_clock_error_fn, min_client_clock_error};
use crate::combine::combine_all;
use crate::config::AnalysisConfig;
use crate::metrics::{SeriesSummary, inter_frame_delays, latency_series};
use crate::transport::fs::load_dataset;
use crate::types::{Micros, PassId};

#[derive(Debug, Parser)]
#[command(
    name = "latency_report",
    disable_help_subcommand = true,
    about = "Summarize VR streaming latency captures",
    long_about = "Load measurement passes, align client clocks, and report per-frame latency averaged across the runs of the first pass.",
    after_help = "Flags override the matching fields of --config. RUST_LOG controls log verbosity."
)]
struct LatencyReportCli {
    #[arg(long, value_name = "DIR", help = "Directory holding wvb_measurements_pass_* files")]
    dir: PathBuf,
    #[arg(
        long = "pass",
        value_name = "ID",
        required = true,
        help = "Pass id to load, repeat as needed; the first pass is reported"
    )]
    passes: Vec<PassId>,
    #[arg(long, value_name = "JSON", help = "Optional analysis config file")]
    config: Option<PathBuf>,
    #[arg(long = "client-tracking", help = "Join the client tracking table")]
    client_tracking: bool,
    #[arg(long = "keep-dropped", help = "Keep dropped and repeated frames instead of deduplicating")]
    keep_dropped: bool,
    #[arg(long = "drift-fit", help = "Fit a clock drift line across every loaded run")]
    drift_fit: bool,
    #[arg(
        long = "all-points",
        help = "Use every tracked frame for the drift fit, not one minimum per run"
    )]
    all_points: bool,
    #[arg(
        long = "transfer-floor-us",
        value_name = "US",
        help = "Client to server transfer floor added to the scalar clock error"
    )]
    transfer_floor_us: Option<Micros>,
    #[arg(long, value_name = "PATH", help = "Write the averaged delay table here")]
    output: Option<PathBuf>,
}

impl LatencyReportCli {
    fn resolve_config(&self) -> Result<AnalysisConfig, Box<dyn Error>> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_json_path(path)?,
            None => AnalysisConfig::default(),
        };
        config.combine.client_tracking |= self.client_tracking;
        config.combine.keep_dropped |= self.keep_dropped;
        config.clock.drift_fit |= self.drift_fit;
        if self.all_points {
            config.clock.only_take_min_of_run = false;
        }
        if let Some(floor) = self.transfer_floor_us {
            config.clock.transfer_floor_us = floor;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Run the `latency_report` command-line front end.
pub fn run_latency_report<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let Some(cli) = parse_cli::<LatencyReportCli, _>(
        std::iter::once("latency_report".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };
    let config = cli.resolve_config()?;

    let dataset = load_dataset(&cli.dir, &cli.passes)?;
    let runs = match dataset.first() {
        Some(runs) if !runs.is_empty() => runs,
        _ => {
            return Err(format!(
                "no run files for pass {} under {}",
                cli.passes[0],
                cli.dir.display()
            )
            .into());
        }
    };

    let model = if config.clock.drift_fit {
        Some(client_clock_error_fn(
            &dataset,
            config.clock.only_take_min_of_run,
        )?)
    } else {
        None
    };

    println!("=== latency report ===");
    println!("directory: {}", cli.dir.display());
    println!("passes loaded: {:?}", cli.passes);
    println!("runs in pass {}: {}", cli.passes[0], runs.len());
    for (idx, run) in runs.iter().enumerate() {
        let all = combine_all(run, config.combine)?;
        let scalar = min_client_clock_error(&all, config.clock.transfer_floor_us)?;
        println!(
            "  run {idx}: {} combined rows, scalar clock correction {scalar} us",
            all.len()
        );
    }
    print_model(model);

    let delays = combine_delays(runs, model)?;
    info!(frames = delays.len(), "averaged delay table ready");
    println!("frames: {}", delays.len());

    let series = latency_series(&delays)?;
    print_summary("delay after present", &series.delay_after_present);
    print_summary("motion to photon", &series.motion_to_photon);
    print_summary("tracking latency", &series.tracking_latency);
    let inter_frame = inter_frame_delays(&delays)?;
    print_summary("client inter-frame", &inter_frame.client);
    print_summary("driver inter-frame", &inter_frame.driver);

    match avg_rtt(runs)? {
        Some(rtt) => println!("average rtt: {rtt:.1} us"),
        None => println!("average rtt: n/a"),
    }
    match med_clock_error(runs)? {
        Some(err) => println!("median clock error: {err:.1} us"),
        None => println!("median clock error: n/a"),
    }

    if let Some(path) = &cli.output {
        let mut writer = BufWriter::new(File::create(path)?);
        delays.write_to(&mut writer)?;
        writer.flush()?;
        println!("wrote delay table to {}", path.display());
    }
    Ok(())
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}

fn print_model(model: Option<ClockModel>) {
    match model {
        Some(model) => println!(
            "clock drift model: correction = {:.6} * t + {:.1} us",
            model.slope, model.intercept
        ),
        None => println!("clock drift model: none (per-run scalar correction)"),
    }
}

fn print_summary(label: &str, values: &[f64]) {
    match SeriesSummary::from_values(values) {
        Some(summary) => println!(
            "{label}: n={} mean={:.1} median={:.1} min={:.1} max={:.1} us",
            summary.count, summary.mean, summary.median, summary.min, summary.max
        ),
        None => println!("{label}: no samples"),
    }
}
