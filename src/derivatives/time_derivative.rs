use crate::Error;
use ndarray::Array2;

/// Time derivative of a sampled field, d(field)/dt
///
/// # Arguments
/// * `field` - field indexed `(i_time, i_parameter)`, shape `(n_time, n_parameter)`
/// * `dt` - time step, normally the mean spacing of the time axis
///
/// # Returns
/// * `d_field_d_t` - same shape as `field`
///
/// # Notes
/// * Interior samples use the second order central difference `(f[i+1] - f[i-1]) / (2 dt)`
/// * The first and last samples use first order one-sided differences
/// * Each parameter column is differentiated independently
/// * A single `dt` is used for the whole axis. If the time axis is not evenly spaced the
///   result is less accurate, but no error is raised
///
pub fn time_derivative(field: &Array2<f64>, dt: f64) -> Result<Array2<f64>, Error> {
    let (n_time, n_parameter): (usize, usize) = field.dim();

    if n_time < 2 {
        return Err(Error::InsufficientSamples { n_samples: n_time, required: 2 });
    }
    if !dt.is_finite() || dt <= 0.0 {
        return Err(Error::InvalidTimeStep { dt });
    }

    let mut d_field_d_t: Array2<f64> = Array2::from_elem((n_time, n_parameter), f64::NAN);
    for i_parameter in 0..n_parameter {
        // Forward difference at the start
        d_field_d_t[[0, i_parameter]] = (field[[1, i_parameter]] - field[[0, i_parameter]]) / dt;

        // Central difference in the interior
        for i_time in 1..n_time - 1 {
            d_field_d_t[[i_time, i_parameter]] = (field[[i_time + 1, i_parameter]] - field[[i_time - 1, i_parameter]]) / (2.0 * dt);
        }

        // Backward difference at the end
        d_field_d_t[[n_time - 1, i_parameter]] = (field[[n_time - 1, i_parameter]] - field[[n_time - 2, i_parameter]]) / dt;
    }

    return Ok(d_field_d_t);
}

#[test]
fn test_time_derivative_of_constant_field_is_zero() {
    // Lazy loading of crates which are only used within the tests
    use approx::assert_abs_diff_eq;

    let field: Array2<f64> = Array2::from_elem((7, 4), 3.25);
    for dt in [1e-3, 0.5, 1.0, 42.0] {
        let d_field_d_t: Array2<f64> = time_derivative(&field, dt).unwrap();
        assert_abs_diff_eq!(&d_field_d_t, &Array2::<f64>::zeros((7, 4)));
    }
}

#[test]
fn test_time_derivative_of_linear_field_is_exact() {
    use approx::assert_abs_diff_eq;

    let n_time: usize = 9;
    let n_parameter: usize = 3;
    let dt: f64 = 0.25;
    // Different slope in each column, to check columns are independent
    let slopes: [f64; 3] = [1.5, -2.0, 0.0];
    let field: Array2<f64> = Array2::from_shape_fn((n_time, n_parameter), |(i_time, i_parameter)| slopes[i_parameter] * i_time as f64);

    let d_field_d_t: Array2<f64> = time_derivative(&field, dt).unwrap();

    for i_parameter in 0..n_parameter {
        for i_time in 0..n_time {
            assert_abs_diff_eq!(d_field_d_t[[i_time, i_parameter]], slopes[i_parameter] / dt, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_time_derivative_of_quadratic_field() {
    use approx::assert_abs_diff_eq;

    // f = t^2 -> central difference is exact in the interior, one-sided is off by dt at the ends
    let n_time: usize = 11;
    let dt: f64 = 0.1;
    let field: Array2<f64> = Array2::from_shape_fn((n_time, 1), |(i_time, _)| (i_time as f64 * dt).powi(2));

    let d_field_d_t: Array2<f64> = time_derivative(&field, dt).unwrap();

    for i_time in 1..n_time - 1 {
        assert_abs_diff_eq!(d_field_d_t[[i_time, 0]], 2.0 * i_time as f64 * dt, epsilon = 1e-10);
    }
    assert_abs_diff_eq!(d_field_d_t[[0, 0]], dt, epsilon = 1e-10);
    assert_abs_diff_eq!(d_field_d_t[[n_time - 1, 0]], 2.0 * (n_time - 1) as f64 * dt - dt, epsilon = 1e-10);
}

#[test]
fn test_time_derivative_two_samples() {
    let field: Array2<f64> = Array2::from_shape_vec((2, 2), vec![0.0, 1.0, 2.0, 5.0]).unwrap();
    let d_field_d_t: Array2<f64> = time_derivative(&field, 2.0).unwrap();
    assert_eq!(d_field_d_t, Array2::from_shape_vec((2, 2), vec![1.0, 2.0, 1.0, 2.0]).unwrap());
}

#[test]
fn test_time_derivative_single_sample_is_rejected() {
    let field: Array2<f64> = Array2::ones((1, 5));
    let result: Result<Array2<f64>, Error> = time_derivative(&field, 1.0);
    assert!(matches!(result, Err(Error::InsufficientSamples { n_samples: 1, required: 2 })));
}

#[test]
fn test_time_derivative_rejects_bad_dt() {
    let field: Array2<f64> = Array2::ones((3, 3));
    assert!(matches!(time_derivative(&field, 0.0), Err(Error::InvalidTimeStep { .. })));
    assert!(matches!(time_derivative(&field, -1.0), Err(Error::InvalidTimeStep { .. })));
    assert!(matches!(time_derivative(&field, f64::NAN), Err(Error::InvalidTimeStep { .. })));
}

#[test]
fn test_time_derivative_leaves_input_untouched() {
    let field: Array2<f64> = Array2::from_shape_fn((4, 2), |(i_time, i_parameter)| (i_time * 10 + i_parameter) as f64);
    let field_before: Array2<f64> = field.clone();
    let _d_field_d_t: Array2<f64> = time_derivative(&field, 1.0).unwrap();
    assert_eq!(field, field_before);
}
