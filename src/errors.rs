use std::fmt;
use thiserror::Error;

// Define the possible **external** failures the comparison can produce
#[derive(Error, Debug)]
pub enum Error {
    #[error("missing input: `{name}` is not present in the result bundle")]
    MissingInput { name: String },

    #[error("shape mismatch: `{name}` has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        name: String,
        found: (usize, usize),
        expected: (usize, usize),
    },

    #[error("invalid input: `{name}` could not be read: {message}")]
    InvalidInput { name: String, message: String },

    #[error("empty axis: cannot find the nearest index on a zero-length axis")]
    EmptyAxis,

    #[error("insufficient samples: {n_samples} time samples supplied, at least {required} needed for a time derivative")]
    InsufficientSamples { n_samples: usize, required: usize },

    #[error("invalid time step: dt={dt} must be finite and strictly positive")]
    InvalidTimeStep { dt: f64 },

    #[error("empty request: no target parameter values were supplied")]
    EmptyRequest,

    #[error("contouring failed for `{name}`: {message}")]
    Contour { name: String, message: String },

    #[error("rendering failed: {0}")]
    Render(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Raised when the time axis is not evenly spaced.
/// This is not an error: the derivative is still computed with the mean spacing, only less accurately.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NonUniformSpacingWarning {
    pub dt_mean: f64,
    pub dt_min: f64,
    pub dt_max: f64,
    pub max_relative_deviation: f64,
}

impl fmt::Display for NonUniformSpacingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "time axis is not uniformly spaced: dt in [{:.6e}, {:.6e}], mean={:.6e}, max relative deviation={:.3e}; derivative accuracy is reduced",
            self.dt_min, self.dt_max, self.dt_mean, self.max_relative_deviation
        )
    }
}
