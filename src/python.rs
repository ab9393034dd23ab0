use crate::{Error, absolute_error, nearest_index, time_derivative};
use ndarray::{Array1, Array2};
use numpy::IntoPyArray; // converting to python data types
use numpy::PyArrayMethods; // used in to convert python data into ndarray
use numpy::{PyArray1, PyArray2};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

impl From<Error> for PyErr {
    fn from(error: Error) -> PyErr {
        return PyValueError::new_err(error.to_string());
    }
}

/// A Python module implemented in Rust; bindings added here
#[pymodule]
fn swing_compare_rs(_py: Python, m: &Bound<'_, PyModule>) -> PyResult<()> {
    #[pyfn(m)]
    fn nearest_index_py(axis: &Bound<'_, PyArray1<f64>>, target: f64) -> PyResult<usize> {
        let axis_ndarray: Array1<f64> = Array1::from(unsafe { axis.as_array() }.to_vec());
        let index: usize = nearest_index(&axis_ndarray, target)?;
        return Ok(index);
    }

    #[pyfn(m)]
    fn time_derivative_py(py: Python, field: &Bound<'_, PyArray2<f64>>, dt: f64) -> PyResult<Py<PyArray2<f64>>> {
        let field_ndarray: Array2<f64> = unsafe { field.as_array() }.to_owned();
        let derivative: Array2<f64> = time_derivative(&field_ndarray, dt)?;
        return Ok(derivative.into_pyarray(py).into());
    }

    #[pyfn(m)]
    fn absolute_error_py(py: Python, reference: &Bound<'_, PyArray2<f64>>, predicted: &Bound<'_, PyArray2<f64>>) -> PyResult<Py<PyArray2<f64>>> {
        let reference_ndarray: Array2<f64> = unsafe { reference.as_array() }.to_owned();
        let predicted_ndarray: Array2<f64> = unsafe { predicted.as_array() }.to_owned();
        let error_2d: Array2<f64> = absolute_error(&reference_ndarray, &predicted_ndarray)?;
        return Ok(error_2d.into_pyarray(py).into());
    }

    return Ok(());
}
