// Load modules
mod axes;
mod nearest_index;

// Expose functions to public
pub use axes::{ParameterAxis, TIME_SPACING_RELATIVE_TOLERANCE, TimeAxis};
pub use nearest_index::nearest_index;
