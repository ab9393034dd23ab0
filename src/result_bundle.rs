use crate::Error;
use crate::grid::{ParameterAxis, TimeAxis};
use log::{debug, info, warn};
use ndarray::{Array, Array1, Array2, Dimension, Ix0, Ix1, Ix2, OwnedRepr};
use ndarray_npy::{NpzReader, ReadNpzError, ReadableElement};
use std::fs::File;
use std::path::Path;

/// Names of the arrays inside the result bundle
pub const KEY_X: &str = "X";
pub const KEY_T: &str = "T";
pub const KEY_EXACT: &str = "Exact";
pub const KEY_U_PRED: &str = "U_pred";
pub const KEY_ERROR_U: &str = "error_u";

/// Result bundle written by the inference stage
///
/// All 2D arrays have shape `(n_time, n_parameter)`:
/// * axis 0 is time, `t_2d.column(0)` is the time axis
/// * axis 1 is the parameter, `x_2d.row(0)` is the parameter axis
#[derive(Debug, Clone)]
pub struct ResultBundle {
    pub x_2d: Array2<f64>,
    pub t_2d: Array2<f64>,
    pub exact_2d: Array2<f64>,
    pub u_pred_2d: Array2<f64>,
    /// Relative L2 error computed by the inference stage, only reported
    pub error_u: f64,
}

impl ResultBundle {
    /// Build a bundle from in-memory arrays, checking that every array has the same shape
    pub fn new(x_2d: Array2<f64>, t_2d: Array2<f64>, exact_2d: Array2<f64>, u_pred_2d: Array2<f64>, error_u: f64) -> Result<Self, Error> {
        let bundle: ResultBundle = ResultBundle {
            x_2d,
            t_2d,
            exact_2d,
            u_pred_2d,
            error_u,
        };
        bundle.validate_shapes()?;
        bundle.check_grid_orientation();

        return Ok(bundle);
    }

    /// Read the bundle from a NumPy `.npz` archive, as written by `np.savez`
    pub fn from_npz(path: &Path) -> Result<Self, Error> {
        info!("ResultBundle: reading {}", path.display());
        let file: File = File::open(path)?;
        let mut npz: NpzReader<File> = NpzReader::new(file).map_err(|error| Error::InvalidInput {
            name: path.display().to_string(),
            message: error.to_string(),
        })?;

        // Check every key is present before reading anything, so the first missing array is reported by name
        let names: Vec<String> = npz
            .names()
            .map_err(|error| Error::InvalidInput {
                name: path.display().to_string(),
                message: error.to_string(),
            })?
            .iter()
            .map(|name| name.trim_end_matches(".npy").to_string())
            .collect();
        debug!("ResultBundle: arrays in archive = {:?}", names);
        for key in [KEY_X, KEY_T, KEY_EXACT, KEY_U_PRED, KEY_ERROR_U] {
            if !names.iter().any(|name| name == key) {
                return Err(Error::MissingInput { name: key.to_string() });
            }
        }

        let x_2d: Array2<f64> = read_array2_f64(&mut npz, KEY_X)?;
        let t_2d: Array2<f64> = read_array2_f64(&mut npz, KEY_T)?;
        let exact_2d: Array2<f64> = read_array2_f64(&mut npz, KEY_EXACT)?;
        let u_pred_2d: Array2<f64> = read_array2_f64(&mut npz, KEY_U_PRED)?;
        let error_u: f64 = read_scalar_f64(&mut npz, KEY_ERROR_U)?;

        return ResultBundle::new(x_2d, t_2d, exact_2d, u_pred_2d, error_u);
    }

    /// `(n_time, n_parameter)`
    pub fn shape(&self) -> (usize, usize) {
        return self.x_2d.dim();
    }

    pub fn time_axis(&self) -> Result<TimeAxis, Error> {
        return TimeAxis::from_grid(&self.t_2d);
    }

    pub fn parameter_axis(&self) -> Result<ParameterAxis, Error> {
        return ParameterAxis::from_grid(&self.x_2d);
    }

    fn validate_shapes(&self) -> Result<(), Error> {
        let expected: (usize, usize) = self.x_2d.dim();
        let others: [(&str, &Array2<f64>); 3] = [(KEY_T, &self.t_2d), (KEY_EXACT, &self.exact_2d), (KEY_U_PRED, &self.u_pred_2d)];
        for (name, array) in others {
            if array.dim() != expected {
                return Err(Error::ShapeMismatch {
                    name: name.to_string(),
                    found: array.dim(),
                    expected,
                });
            }
        }
        return Ok(());
    }

    /// `T` should only vary down the rows and `X` only across the columns.
    /// Anything else is reported but not rejected, the data is not ours to validate.
    fn check_grid_orientation(&self) {
        let (n_time, n_parameter): (usize, usize) = self.shape();
        if n_time == 0 || n_parameter == 0 {
            return;
        }

        let time_axis: Array1<f64> = self.t_2d.column(0).to_owned();
        let parameter_axis: Array1<f64> = self.x_2d.row(0).to_owned();
        let mut max_t_deviation: f64 = 0.0;
        let mut max_x_deviation: f64 = 0.0;
        for i_time in 0..n_time {
            for i_parameter in 0..n_parameter {
                max_t_deviation = max_t_deviation.max((self.t_2d[[i_time, i_parameter]] - time_axis[i_time]).abs());
                max_x_deviation = max_x_deviation.max((self.x_2d[[i_time, i_parameter]] - parameter_axis[i_parameter]).abs());
            }
        }
        if max_t_deviation > 0.0 {
            warn!("ResultBundle: `T` varies across columns by up to {:e}, using T[:, 0] as the time axis", max_t_deviation);
        }
        if max_x_deviation > 0.0 {
            warn!("ResultBundle: `X` varies down rows by up to {:e}, using X[0, :] as the parameter axis", max_x_deviation);
        }
    }
}

/// Look the array up under `{key}.npy` first, then under the bare key
fn by_key<A: ReadableElement, D: Dimension>(npz: &mut NpzReader<File>, key: &str) -> Result<Array<A, D>, ReadNpzError> {
    return npz
        .by_name::<OwnedRepr<A>, D>(&format!("{key}.npy"))
        .or_else(|_| npz.by_name::<OwnedRepr<A>, D>(key));
}

/// Networks usually save float32, which is widened to f64
fn read_array2_f64(npz: &mut NpzReader<File>, key: &str) -> Result<Array2<f64>, Error> {
    let error_f64: ReadNpzError = match by_key::<f64, Ix2>(npz, key) {
        Ok(values) => return Ok(values),
        Err(error_f64) => error_f64,
    };
    if let Ok(values) = by_key::<f32, Ix2>(npz, key) {
        debug!("ResultBundle: `{}` stored as float32, widened to f64", key);
        return Ok(values.mapv(f64::from));
    }

    return Err(Error::InvalidInput {
        name: key.to_string(),
        message: error_f64.to_string(),
    });
}

/// `np.savez` stores a Python float as a 0-d array; a single element 1-d array is accepted too.
/// Either can be float64 or float32.
fn read_scalar_f64(npz: &mut NpzReader<File>, key: &str) -> Result<f64, Error> {
    if let Ok(value) = by_key::<f64, Ix0>(npz, key) {
        return Ok(value.into_scalar());
    }
    if let Ok(value) = by_key::<f32, Ix0>(npz, key) {
        return Ok(f64::from(value.into_scalar()));
    }

    let values: Array1<f64> = match by_key::<f64, Ix1>(npz, key) {
        Ok(values) => values,
        Err(error_f64) => match by_key::<f32, Ix1>(npz, key) {
            Ok(values) => values.mapv(f64::from),
            Err(_) => {
                return Err(Error::InvalidInput {
                    name: key.to_string(),
                    message: error_f64.to_string(),
                });
            }
        },
    };
    if values.len() != 1 {
        return Err(Error::InvalidInput {
            name: key.to_string(),
            message: format!("expected a scalar, found {} values", values.len()),
        });
    }

    return Ok(values[0]);
}

#[cfg(test)]
pub(crate) fn synthetic_bundle_arrays(n_time: usize, n_parameter: usize) -> (Array2<f64>, Array2<f64>, Array2<f64>, Array2<f64>) {
    let t: Array1<f64> = Array1::linspace(0.0, 1.0, n_time);
    let p: Array1<f64> = Array1::linspace(0.08, 0.2, n_parameter);
    let x_2d: Array2<f64> = Array2::from_shape_fn((n_time, n_parameter), |(_i_time, i_parameter)| p[i_parameter]);
    let t_2d: Array2<f64> = Array2::from_shape_fn((n_time, n_parameter), |(i_time, _i_parameter)| t[i_time]);
    let exact_2d: Array2<f64> = Array2::from_shape_fn((n_time, n_parameter), |(i_time, i_parameter)| (p[i_parameter] * 10.0 * t[i_time]).sin());
    let u_pred_2d: Array2<f64> = &exact_2d * 1.01;
    return (x_2d, t_2d, exact_2d, u_pred_2d);
}

#[test]
fn test_result_bundle_new_accepts_matching_shapes() {
    let (x_2d, t_2d, exact_2d, u_pred_2d) = synthetic_bundle_arrays(20, 5);
    let bundle: ResultBundle = ResultBundle::new(x_2d, t_2d, exact_2d, u_pred_2d, 1.2e-3).unwrap();
    assert_eq!(bundle.shape(), (20, 5));
    assert_eq!(bundle.time_axis().unwrap().values.len(), 20);
    assert_eq!(bundle.parameter_axis().unwrap().values.len(), 5);
}

#[test]
fn test_result_bundle_new_rejects_shape_mismatch() {
    let (x_2d, t_2d, exact_2d, _u_pred_2d) = synthetic_bundle_arrays(20, 5);
    let u_pred_2d: Array2<f64> = Array2::zeros((20, 4));

    let result: Result<ResultBundle, Error> = ResultBundle::new(x_2d, t_2d, exact_2d, u_pred_2d, 0.0);
    match result {
        Err(Error::ShapeMismatch { name, found, expected }) => {
            assert_eq!(name, KEY_U_PRED);
            assert_eq!(found, (20, 4));
            assert_eq!(expected, (20, 5));
        }
        other => panic!("expected ShapeMismatch, got {:?}", other),
    }
}

#[test]
fn test_result_bundle_npz_round_trip_and_missing_key() {
    // Lazy loading of crates which are only used within the tests
    use ndarray::arr0;
    use ndarray_npy::NpzWriter;

    let (x_2d, t_2d, exact_2d, u_pred_2d) = synthetic_bundle_arrays(12, 3);
    let directory: std::path::PathBuf = std::env::temp_dir().join(format!("swing_compare_rs_bundle_{}", std::process::id()));
    std::fs::create_dir_all(&directory).unwrap();

    // Complete archive
    let complete_path: std::path::PathBuf = directory.join("complete.npz");
    {
        let mut npz: NpzWriter<File> = NpzWriter::new(File::create(&complete_path).unwrap());
        npz.add_array(KEY_X, &x_2d).unwrap();
        npz.add_array(KEY_T, &t_2d).unwrap();
        npz.add_array(KEY_EXACT, &exact_2d).unwrap();
        npz.add_array(KEY_U_PRED, &u_pred_2d).unwrap();
        npz.add_array(KEY_ERROR_U, &arr0(0.0123)).unwrap();
        npz.finish().unwrap();
    }
    let bundle: ResultBundle = ResultBundle::from_npz(&complete_path).unwrap();
    assert_eq!(bundle.x_2d, x_2d);
    assert_eq!(bundle.t_2d, t_2d);
    assert_eq!(bundle.exact_2d, exact_2d);
    assert_eq!(bundle.u_pred_2d, u_pred_2d);
    assert_eq!(bundle.error_u, 0.0123);

    // Archive without the prediction
    let incomplete_path: std::path::PathBuf = directory.join("incomplete.npz");
    {
        let mut npz: NpzWriter<File> = NpzWriter::new(File::create(&incomplete_path).unwrap());
        npz.add_array(KEY_X, &x_2d).unwrap();
        npz.add_array(KEY_T, &t_2d).unwrap();
        npz.add_array(KEY_EXACT, &exact_2d).unwrap();
        npz.add_array(KEY_ERROR_U, &arr0(0.0123)).unwrap();
        npz.finish().unwrap();
    }
    let result: Result<ResultBundle, Error> = ResultBundle::from_npz(&incomplete_path);
    assert!(matches!(result, Err(Error::MissingInput { ref name }) if name == KEY_U_PRED));

    std::fs::remove_dir_all(&directory).unwrap();
}

#[test]
fn test_result_bundle_npz_float32_prediction_is_widened() {
    // Lazy loading of crates which are only used within the tests
    use ndarray::arr0;
    use ndarray_npy::NpzWriter;

    let (x_2d, t_2d, exact_2d, u_pred_2d) = synthetic_bundle_arrays(10, 4);
    let u_pred_2d_f32: Array2<f32> = u_pred_2d.mapv(|value| value as f32);
    let directory: std::path::PathBuf = std::env::temp_dir().join(format!("swing_compare_rs_bundle_f32_{}", std::process::id()));
    std::fs::create_dir_all(&directory).unwrap();

    let path: std::path::PathBuf = directory.join("float32.npz");
    {
        let mut npz: NpzWriter<File> = NpzWriter::new(File::create(&path).unwrap());
        npz.add_array(KEY_X, &x_2d).unwrap();
        npz.add_array(KEY_T, &t_2d).unwrap();
        npz.add_array(KEY_EXACT, &exact_2d).unwrap();
        npz.add_array(KEY_U_PRED, &u_pred_2d_f32).unwrap();
        npz.add_array(KEY_ERROR_U, &arr0(0.0123f32)).unwrap();
        npz.finish().unwrap();
    }

    let bundle: ResultBundle = ResultBundle::from_npz(&path).unwrap();
    assert_eq!(bundle.exact_2d, exact_2d);
    assert_eq!(bundle.u_pred_2d, u_pred_2d_f32.mapv(f64::from));
    assert_eq!(bundle.error_u, f64::from(0.0123f32));

    // Integers are still rejected, with the array named
    let integer_path: std::path::PathBuf = directory.join("integer.npz");
    {
        let mut npz: NpzWriter<File> = NpzWriter::new(File::create(&integer_path).unwrap());
        npz.add_array(KEY_X, &x_2d).unwrap();
        npz.add_array(KEY_T, &t_2d).unwrap();
        npz.add_array(KEY_EXACT, &exact_2d.mapv(|value| value as i64)).unwrap();
        npz.add_array(KEY_U_PRED, &u_pred_2d).unwrap();
        npz.add_array(KEY_ERROR_U, &arr0(0.0123)).unwrap();
        npz.finish().unwrap();
    }
    let result: Result<ResultBundle, Error> = ResultBundle::from_npz(&integer_path);
    assert!(matches!(result, Err(Error::InvalidInput { ref name, .. }) if name == KEY_EXACT));

    std::fs::remove_dir_all(&directory).unwrap();
}
