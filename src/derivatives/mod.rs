// Load modules
mod time_derivative;

// Expose functions to public
pub use time_derivative::time_derivative;
