use log::{info, warn};
use ndarray::Array2;
use std::path::PathBuf;
use std::time::{Duration, Instant};

mod errors;
pub use errors::{Error, NonUniformSpacingWarning};
mod grid;
pub use grid::{ParameterAxis, TIME_SPACING_RELATIVE_TOLERANCE, TimeAxis, nearest_index};
mod derivatives;
pub use derivatives::time_derivative;
mod result_bundle;
pub use result_bundle::{KEY_ERROR_U, KEY_EXACT, KEY_T, KEY_U_PRED, KEY_X, ResultBundle};
pub mod comparison;
pub use comparison::{ComparisonLayout, ErrorMaps, absolute_error, assemble, render_maps};
mod config;
pub use config::{ComparisonConfig, DEFAULT_RESULTS_FILE, DEFAULT_TARGETS, RenderSettings, ResultSource};
pub mod rendering;

#[cfg(feature = "python")]
mod python;

/// Everything computed from a bundle, before anything is drawn
#[derive(Debug, Clone)]
pub struct ComparisonOutput {
    pub time_axis: TimeAxis,
    pub parameter_axis: ParameterAxis,
    pub layout: ComparisonLayout,
    pub maps: ErrorMaps,
}

/// One requested parameter value and where it landed on the grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedTarget {
    pub requested_value: f64,
    pub resolved_index: usize,
    pub resolved_value: f64,
}

/// Summary of a full run
#[derive(Debug, Clone)]
pub struct ComparisonReport {
    pub resolved_targets: Vec<ResolvedTarget>,
    /// Relative L2 error as stored in the bundle
    pub error_u: f64,
    pub spacing_warning: Option<NonUniformSpacingWarning>,
    pub written_paths: Vec<PathBuf>,
}

/// Compute the comparison grid and the three error maps from a bundle
///
/// # Arguments
/// * `bundle` - validated result bundle
/// * `targets` - requested parameter values, one column each
/// * `n_levels` - number of filled bands in each map
///
/// # Returns
/// * `ComparisonOutput` - the axes, the grid layout and the maps
///
/// Nothing is written to disk.
pub fn compare(bundle: &ResultBundle, targets: &[f64], n_levels: usize) -> Result<ComparisonOutput, Error> {
    let time_axis: TimeAxis = bundle.time_axis()?;
    let parameter_axis: ParameterAxis = bundle.parameter_axis()?;

    let (reference_derivative, predicted_derivative) = rayon::join(
        || time_derivative(&bundle.exact_2d, time_axis.dt),
        || time_derivative(&bundle.u_pred_2d, time_axis.dt),
    );
    let reference_derivative: Array2<f64> = reference_derivative?;
    let predicted_derivative: Array2<f64> = predicted_derivative?;

    let layout: ComparisonLayout = assemble(
        &bundle.exact_2d,
        &bundle.u_pred_2d,
        &reference_derivative,
        &predicted_derivative,
        &time_axis.values,
        &parameter_axis.values,
        targets,
    )?;

    let maps: ErrorMaps = render_maps(&bundle.exact_2d, &bundle.u_pred_2d, &bundle.t_2d, &bundle.x_2d, n_levels)?;

    return Ok(ComparisonOutput {
        time_axis,
        parameter_axis,
        layout,
        maps,
    });
}

/// Load the bundle, compare it and write the figures
pub fn run_comparison(config: &ComparisonConfig, settings: &RenderSettings) -> Result<ComparisonReport, Error> {
    let start_time: Instant = Instant::now();

    let loaded_bundle: ResultBundle;
    let bundle: &ResultBundle = match &config.result_source {
        ResultSource::NpzFile(path) => {
            loaded_bundle = ResultBundle::from_npz(path)?;
            &loaded_bundle
        }
        ResultSource::InMemory(bundle) => bundle,
    };
    println!("Loaded results successfully. Relative L2 error: {:.4e}", bundle.error_u);

    // All computation happens before the first file is written
    let output: ComparisonOutput = compare(bundle, &config.targets, settings.n_levels)?;
    let (t_start, t_end): (f64, f64) = output.time_axis.range();
    let (p_min, p_max): (f64, f64) = output.parameter_axis.range();
    info!(
        "run_comparison: {} time samples over [{}, {}] (dt={}), {} parameter samples over [{}, {}]",
        output.time_axis.values.len(),
        t_start,
        t_end,
        output.time_axis.dt,
        output.parameter_axis.values.len(),
        p_min,
        p_max
    );
    for &target in &config.targets {
        if target < p_min || target > p_max {
            warn!("run_comparison: target={} is outside the parameter range, clamped to the nearest end", target);
        }
    }
    for column in &output.layout.columns {
        info!(
            "run_comparison: target={} resolved to index={} value={}",
            column.requested_value, column.resolved_index, column.resolved_value
        );
    }

    std::fs::create_dir_all(&settings.output_dir)?;
    let mut written_paths: Vec<PathBuf> = Vec::new();

    let comparison_path: PathBuf = settings.comparison_path();
    rendering::draw_comparison(&output.layout, &comparison_path, settings.comparison_size)?;
    println!("Saved figure to: {}", comparison_path.display());
    written_paths.push(comparison_path);

    if settings.render_error_maps {
        let error_maps_path: PathBuf = settings.error_maps_path();
        rendering::draw_error_maps(&output.maps, &error_maps_path, settings.error_maps_size)?;
        println!("Saved figure to: {}", error_maps_path.display());
        written_paths.push(error_maps_path);
    }

    let resolved_targets: Vec<ResolvedTarget> = output
        .layout
        .columns
        .iter()
        .map(|column| ResolvedTarget {
            requested_value: column.requested_value,
            resolved_index: column.resolved_index,
            resolved_value: column.resolved_value,
        })
        .collect();

    let duration: Duration = start_time.elapsed();
    info!("run_comparison: finished in {:?}", duration);

    return Ok(ComparisonReport {
        resolved_targets,
        error_u: bundle.error_u,
        spacing_warning: output.time_axis.spacing_warning,
        written_paths,
    });
}

#[test]
fn test_compare_ones_three_by_three() {
    // Lazy loading of crates which are only used within the tests
    use approx::assert_abs_diff_eq;
    use ndarray::Array1;

    let t: Array1<f64> = Array1::from_vec(vec![0.0, 0.5, 1.0]);
    let p: Array1<f64> = Array1::from_vec(vec![0.1, 0.2, 0.3]);
    let x_2d: Array2<f64> = Array2::from_shape_fn((3, 3), |(_i_time, i_parameter)| p[i_parameter]);
    let t_2d: Array2<f64> = Array2::from_shape_fn((3, 3), |(i_time, _i_parameter)| t[i_time]);
    let ones: Array2<f64> = Array2::ones((3, 3));
    let bundle: ResultBundle = ResultBundle::new(x_2d, t_2d, ones.clone(), ones, 0.0).unwrap();

    let output: ComparisonOutput = compare(&bundle, &[0.2], 10).unwrap();
    assert_abs_diff_eq!(output.time_axis.dt, 0.5, epsilon = 1e-12);
    assert_eq!(output.layout.resolved_indices(), vec![1]);

    // Flat unit values, zero derivatives for both series
    let column: &comparison::ComparisonColumn = &output.layout.columns[0];
    assert_abs_diff_eq!(&column.value_panel.reference, &Array1::<f64>::ones(3), epsilon = 1e-12);
    assert_abs_diff_eq!(&column.value_panel.predicted, &Array1::<f64>::ones(3), epsilon = 1e-12);
    assert_abs_diff_eq!(&column.derivative_panel.reference, &Array1::<f64>::zeros(3), epsilon = 1e-12);
    assert_abs_diff_eq!(&column.derivative_panel.predicted, &Array1::<f64>::zeros(3), epsilon = 1e-12);

    // Identical fields, so the error map is zero everywhere
    assert_abs_diff_eq!(&output.maps.absolute_error.values, &Array2::<f64>::zeros((3, 3)), epsilon = 0.0);
}

#[test]
fn test_compare_single_time_sample() {
    use ndarray::Array1;

    let p: Array1<f64> = Array1::from_vec(vec![0.1, 0.2, 0.3]);
    let x_2d: Array2<f64> = Array2::from_shape_fn((1, 3), |(_i_time, i_parameter)| p[i_parameter]);
    let t_2d: Array2<f64> = Array2::zeros((1, 3));
    let ones: Array2<f64> = Array2::ones((1, 3));
    let bundle: ResultBundle = ResultBundle::new(x_2d, t_2d, ones.clone(), ones, 0.0).unwrap();

    let result: Result<ComparisonOutput, Error> = compare(&bundle, &[0.2], 10);
    assert!(matches!(result, Err(Error::InsufficientSamples { n_samples: 1, required: 2 })));
}

#[test]
fn test_run_comparison_fails_before_writing() {
    let (x_2d, t_2d, exact_2d, u_pred_2d) = result_bundle::synthetic_bundle_arrays(30, 6);
    let bundle: ResultBundle = ResultBundle::new(x_2d, t_2d, exact_2d, u_pred_2d, 1.0e-2).unwrap();
    let config: ComparisonConfig = ComparisonConfig {
        targets: Vec::new(),
        result_source: ResultSource::InMemory(bundle),
    };
    let output_dir: PathBuf = std::env::temp_dir().join(format!("swing_compare_empty_request_{}", std::process::id()));
    let settings: RenderSettings = RenderSettings {
        output_dir: output_dir.clone(),
        ..RenderSettings::default()
    };

    let result: Result<ComparisonReport, Error> = run_comparison(&config, &settings);
    assert!(matches!(result, Err(Error::EmptyRequest)));
    assert!(!output_dir.exists());
}

#[test]
fn test_run_comparison_missing_file() {
    let config: ComparisonConfig = ComparisonConfig {
        targets: vec![0.17],
        result_source: ResultSource::NpzFile(std::env::temp_dir().join("swing_compare_does_not_exist.npz")),
    };
    let result: Result<ComparisonReport, Error> = run_comparison(&config, &RenderSettings::default());
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn test_run_comparison_writes_both_figures() {
    if !rendering::font_available() {
        println!("no sans-serif font found, skipping the drawing check");
        return;
    }
    let (x_2d, t_2d, exact_2d, u_pred_2d) = result_bundle::synthetic_bundle_arrays(40, 8);
    let bundle: ResultBundle = ResultBundle::new(x_2d, t_2d, exact_2d, u_pred_2d, 1.0e-2).unwrap();
    let config: ComparisonConfig = ComparisonConfig {
        targets: vec![0.17, 0.18],
        result_source: ResultSource::InMemory(bundle),
    };
    let output_dir: PathBuf = std::env::temp_dir().join(format!("swing_compare_render_{}", std::process::id()));
    let settings: RenderSettings = RenderSettings {
        output_dir: output_dir.clone(),
        n_levels: 12,
        ..RenderSettings::default()
    };

    let report: ComparisonReport = run_comparison(&config, &settings).unwrap();
    assert_eq!(report.written_paths.len(), 2);
    for path in &report.written_paths {
        assert!(path.exists());
    }
    assert_eq!(report.resolved_targets.len(), 2);
    assert!(report.spacing_warning.is_none());

    std::fs::remove_dir_all(&output_dir).unwrap();
}
