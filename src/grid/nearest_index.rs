use crate::Error;
use ndarray::Array1;

/// Find the index of the sample closest to `target`
///
/// # Arguments
/// * `axis` - ordered 1D samples, e.g. the parameter axis `X[0, :]`
/// * `target` - requested value, does not need to be inside the axis range
///
/// # Returns
/// * `index` - the index minimising `|axis[index] - target|`
///
/// # Notes
/// No interpolation is done, the caller should read `axis[index]` back and report it
/// instead of the requested `target`.
/// Ties are resolved to the lowest index. Targets outside the axis clamp to the nearest end.
/// NaN samples never win; an axis made only of NaN returns 0.
///
/// # Example
/// ```
/// use ndarray::Array1;
/// use swing_compare_rs::nearest_index;
///
/// let p: Array1<f64> = Array1::from_vec(vec![0.10, 0.15, 0.20]);
/// let i_p: usize = nearest_index(&p, 0.17).unwrap();
/// assert_eq!(i_p, 1);
/// ```
pub fn nearest_index(axis: &Array1<f64>, target: f64) -> Result<usize, Error> {
    let n_axis: usize = axis.len();
    if n_axis == 0 {
        return Err(Error::EmptyAxis);
    }

    let mut i_nearest: usize = 0;
    let mut distance_nearest: f64 = (axis[0] - target).abs();
    for i_axis in 1..n_axis {
        let distance: f64 = (axis[i_axis] - target).abs();
        // Strict comparison keeps the first occurrence on ties
        if distance < distance_nearest || (distance_nearest.is_nan() && !distance.is_nan()) {
            i_nearest = i_axis;
            distance_nearest = distance;
        }
    }

    return Ok(i_nearest);
}

#[test]
fn test_nearest_index_picks_closest_sample() {
    let p: Array1<f64> = Array1::from_vec(vec![0.10, 0.15, 0.20]);

    // Distances are 0.07, 0.02, 0.03
    let i_p: usize = nearest_index(&p, 0.17).unwrap();
    assert_eq!(i_p, 1);
    assert_eq!(p[i_p], 0.15);

    let i_p: usize = nearest_index(&p, 0.19).unwrap();
    assert_eq!(i_p, 2);
}

#[test]
fn test_nearest_index_ties_go_to_lowest_index() {
    let axis: Array1<f64> = Array1::from_vec(vec![0.0, 1.0, 2.0, 3.0]);
    assert_eq!(nearest_index(&axis, 1.5).unwrap(), 1);

    // Repeated values
    let axis: Array1<f64> = Array1::from_vec(vec![5.0, 2.0, 2.0, 7.0]);
    assert_eq!(nearest_index(&axis, 2.0).unwrap(), 1);
}

#[test]
fn test_nearest_index_clamps_out_of_range_targets() {
    let axis: Array1<f64> = Array1::linspace(0.1, 0.3, 21);
    assert_eq!(nearest_index(&axis, -100.0).unwrap(), 0);
    assert_eq!(nearest_index(&axis, 100.0).unwrap(), 20);
}

#[test]
fn test_nearest_index_empty_axis() {
    let axis: Array1<f64> = Array1::zeros(0);
    let result: Result<usize, Error> = nearest_index(&axis, 0.17);
    assert!(matches!(result, Err(Error::EmptyAxis)));
}

#[test]
fn test_nearest_index_skips_nan() {
    let axis: Array1<f64> = Array1::from_vec(vec![f64::NAN, 0.4, 0.2]);
    assert_eq!(nearest_index(&axis, 0.25).unwrap(), 2);

    let axis: Array1<f64> = Array1::from_elem(3, f64::NAN);
    assert_eq!(nearest_index(&axis, 0.25).unwrap(), 0);
}

#[test]
fn test_nearest_index_is_minimal_against_brute_force() {
    // Lazy loading of crates which are only used within the tests
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng: StdRng = StdRng::seed_from_u64(2024);
    for _ in 0..200 {
        let n_axis: usize = rng.random_range(1..40);
        let mut values: Vec<f64> = (0..n_axis).map(|_| rng.random_range(-1.0..1.0)).collect();
        values.sort_by(|a, b| a.total_cmp(b));
        let axis: Array1<f64> = Array1::from_vec(values);
        let target: f64 = rng.random_range(-1.5..1.5);

        let i_nearest: usize = nearest_index(&axis, target).unwrap();
        let distance_nearest: f64 = (axis[i_nearest] - target).abs();
        for j_axis in 0..n_axis {
            let distance: f64 = (axis[j_axis] - target).abs();
            assert!(distance >= distance_nearest, "index {} is closer than {}", j_axis, i_nearest);
            if j_axis < i_nearest {
                assert!(distance > distance_nearest, "tie at {} should have won over {}", j_axis, i_nearest);
            }
        }
    }
}
