// Load modules
mod comparison_figure;
mod contour_figure;

// Expose functions to public
pub use comparison_figure::draw_comparison;
pub use contour_figure::draw_error_maps;

use crate::Error;

/// plotters errors are generic over the backend, only their message is kept
fn render_error<E: std::fmt::Display>(error: E) -> Error {
    return Error::Render(error.to_string());
}

/// Whether the font used for captions and labels can be loaded on this machine
#[cfg(test)]
pub(crate) fn font_available() -> bool {
    use plotters::prelude::IntoFont;

    return ("sans-serif", 12).into_font().box_size("0").is_ok();
}
