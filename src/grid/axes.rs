use crate::{Error, NonUniformSpacingWarning};
use log::warn;
use ndarray::{Array1, Array2};

/// Relative tolerance on the time spacing before a `NonUniformSpacingWarning` is raised
pub const TIME_SPACING_RELATIVE_TOLERANCE: f64 = 1e-6;

/// The unique, ordered time samples `T[:, 0]`
#[derive(Debug, Clone)]
pub struct TimeAxis {
    pub values: Array1<f64>,
    /// Mean spacing of `values`, used as `dt` for the time derivative
    pub dt: f64,
    pub spacing_warning: Option<NonUniformSpacingWarning>,
}

impl TimeAxis {
    /// Extract the time axis from the time grid, which varies down the rows
    pub fn from_grid(t_2d: &Array2<f64>) -> Result<Self, Error> {
        let (n_time, n_parameter): (usize, usize) = t_2d.dim();
        if n_parameter == 0 {
            return Err(Error::EmptyAxis);
        }
        let values: Array1<f64> = t_2d.column(0).to_owned();
        if n_time < 2 {
            return Err(Error::InsufficientSamples { n_samples: n_time, required: 2 });
        }

        // Mean of the consecutive differences
        let mut dt_sum: f64 = 0.0;
        let mut dt_min: f64 = f64::INFINITY;
        let mut dt_max: f64 = f64::NEG_INFINITY;
        for i_time in 0..n_time - 1 {
            let dt_local: f64 = values[i_time + 1] - values[i_time];
            dt_sum += dt_local;
            dt_min = dt_min.min(dt_local);
            dt_max = dt_max.max(dt_local);
        }
        let dt: f64 = dt_sum / (n_time - 1) as f64;
        if !dt.is_finite() || dt <= 0.0 {
            return Err(Error::InvalidTimeStep { dt });
        }

        let max_relative_deviation: f64 = ((dt_max - dt).abs()).max((dt - dt_min).abs()) / dt.abs();
        let spacing_warning: Option<NonUniformSpacingWarning> = if max_relative_deviation > TIME_SPACING_RELATIVE_TOLERANCE {
            let spacing_warning: NonUniformSpacingWarning = NonUniformSpacingWarning {
                dt_mean: dt,
                dt_min,
                dt_max,
                max_relative_deviation,
            };
            warn!("{}", spacing_warning);
            Some(spacing_warning)
        } else {
            None
        };

        return Ok(TimeAxis { values, dt, spacing_warning });
    }

    /// (first, last) time sample
    pub fn range(&self) -> (f64, f64) {
        let n_time: usize = self.values.len();
        return (self.values[0], self.values[n_time - 1]);
    }
}

/// The ordered parameter samples `X[0, :]`
#[derive(Debug, Clone)]
pub struct ParameterAxis {
    pub values: Array1<f64>,
}

impl ParameterAxis {
    /// Extract the parameter axis from the parameter grid, which varies across the columns
    pub fn from_grid(x_2d: &Array2<f64>) -> Result<Self, Error> {
        if x_2d.nrows() == 0 {
            return Err(Error::EmptyAxis);
        }
        let values: Array1<f64> = x_2d.row(0).to_owned();
        return Ok(ParameterAxis { values });
    }

    /// (smallest, largest) parameter sample, NaN ignored
    pub fn range(&self) -> (f64, f64) {
        let mut p_min: f64 = f64::INFINITY;
        let mut p_max: f64 = f64::NEG_INFINITY;
        for &value in self.values.iter().filter(|value| !value.is_nan()) {
            p_min = p_min.min(value);
            p_max = p_max.max(value);
        }
        return (p_min, p_max);
    }
}

#[test]
fn test_time_axis_uniform() {
    use approx::assert_abs_diff_eq;

    let n_time: usize = 101;
    let n_parameter: usize = 4;
    let t: Array1<f64> = Array1::linspace(0.0, 2.0, n_time);
    let t_2d: Array2<f64> = Array2::from_shape_fn((n_time, n_parameter), |(i_time, _i_parameter)| t[i_time]);

    let time_axis: TimeAxis = TimeAxis::from_grid(&t_2d).unwrap();
    assert_eq!(time_axis.values.len(), n_time);
    assert_abs_diff_eq!(time_axis.dt, 0.02, epsilon = 1e-12);
    assert!(time_axis.spacing_warning.is_none());
    assert_abs_diff_eq!(time_axis.range().0, 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(time_axis.range().1, 2.0, epsilon = 1e-12);
}

#[test]
fn test_time_axis_non_uniform_warns_but_succeeds() {
    use approx::assert_abs_diff_eq;

    let t: Array1<f64> = Array1::from_vec(vec![0.0, 0.1, 0.3, 0.6]);
    let t_2d: Array2<f64> = Array2::from_shape_fn((4, 2), |(i_time, _i_parameter)| t[i_time]);

    let time_axis: TimeAxis = TimeAxis::from_grid(&t_2d).unwrap();
    assert_abs_diff_eq!(time_axis.dt, 0.2, epsilon = 1e-12);
    let spacing_warning: NonUniformSpacingWarning = time_axis.spacing_warning.expect("expected a spacing warning");
    assert_abs_diff_eq!(spacing_warning.dt_min, 0.1, epsilon = 1e-12);
    assert_abs_diff_eq!(spacing_warning.dt_max, 0.3, epsilon = 1e-12);
}

#[test]
fn test_time_axis_needs_two_samples() {
    let t_2d: Array2<f64> = Array2::zeros((1, 3));
    let result: Result<TimeAxis, Error> = TimeAxis::from_grid(&t_2d);
    assert!(matches!(result, Err(Error::InsufficientSamples { n_samples: 1, required: 2 })));
}

#[test]
fn test_time_axis_rejects_decreasing_time() {
    let t: Array1<f64> = Array1::from_vec(vec![1.0, 0.5, 0.0]);
    let t_2d: Array2<f64> = Array2::from_shape_fn((3, 1), |(i_time, _i_parameter)| t[i_time]);
    let result: Result<TimeAxis, Error> = TimeAxis::from_grid(&t_2d);
    assert!(matches!(result, Err(Error::InvalidTimeStep { .. })));
}

#[test]
fn test_parameter_axis_from_grid() {
    let p: Array1<f64> = Array1::from_vec(vec![0.10, 0.15, 0.20]);
    let x_2d: Array2<f64> = Array2::from_shape_fn((5, 3), |(_i_time, i_parameter)| p[i_parameter]);

    let parameter_axis: ParameterAxis = ParameterAxis::from_grid(&x_2d).unwrap();
    assert_eq!(parameter_axis.values, p);
    assert_eq!(parameter_axis.range(), (0.10, 0.20));
}

#[test]
fn test_parameter_axis_range_ignores_nan() {
    let parameter_axis: ParameterAxis = ParameterAxis {
        values: Array1::from_vec(vec![f64::NAN, 0.3, 0.1, 0.2]),
    };
    assert_eq!(parameter_axis.range(), (0.1, 0.3));
}
