//! Compare the reference and predicted swing trajectories stored in a result bundle.
//!
//! Usage: `swing_compare [--results PATH] [--targets 0.17 0.18] [--out-dir DIR] [--levels 50] [--no-error-maps]`

use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::error;

use swing_compare_rs::comparison::DEFAULT_N_LEVELS;
use swing_compare_rs::{ComparisonConfig, ComparisonReport, DEFAULT_RESULTS_FILE, RenderSettings, ResultSource, run_comparison};

#[derive(Parser, Debug)]
#[command(name = "swing_compare")]
#[command(about = "Plot reference against predicted swing trajectories and their error maps")]
struct Args {
    /// Result bundle written by the inference stage (.npz)
    #[arg(long, default_value = DEFAULT_RESULTS_FILE)]
    results: PathBuf,

    /// Parameter values to compare, one figure column each
    #[arg(long, num_args = 1.., default_values_t = vec![0.17, 0.18])]
    targets: Vec<f64>,

    /// Directory the figures are written to
    #[arg(long = "out-dir", default_value = ".")]
    out_dir: PathBuf,

    /// Number of filled contour bands in each error map
    #[arg(long, default_value_t = DEFAULT_N_LEVELS)]
    levels: usize,

    /// Only draw the comparison grid
    #[arg(long)]
    no_error_maps: bool,
}

fn main() {
    env_logger::init();

    let args: Args = Args::parse();

    let config: ComparisonConfig = ComparisonConfig {
        targets: args.targets,
        result_source: ResultSource::NpzFile(args.results),
    };
    let settings: RenderSettings = RenderSettings {
        output_dir: args.out_dir,
        n_levels: args.levels,
        render_error_maps: !args.no_error_maps,
        ..RenderSettings::default()
    };

    let report: ComparisonReport = match run_comparison(&config, &settings) {
        Ok(report) => report,
        Err(run_error) => {
            error!("swing_compare: {}", run_error);
            eprintln!("Error: {}", run_error);
            process::exit(1);
        }
    };

    for resolved_target in &report.resolved_targets {
        println!(
            "Requested {:.4} -> column {} (value {:.4})",
            resolved_target.requested_value, resolved_target.resolved_index, resolved_target.resolved_value
        );
    }
    if let Some(spacing_warning) = report.spacing_warning {
        println!("Warning: {}", spacing_warning);
    }
}
