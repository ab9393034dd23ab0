// Load modules
mod comparison_layout;
mod error_maps;

// Expose functions to public
pub use comparison_layout::{
    ComparisonColumn, ComparisonFields, ComparisonLabels, ComparisonLayout, ComparisonPanel, LegendEntry, LineStyle, PREDICTED_STYLE, PanelQuantity, REFERENCE_STYLE, assemble,
    assemble_with_labels,
};
pub use error_maps::{ContourBand, DEFAULT_N_LEVELS, ErrorMaps, FilledContourMap, absolute_error, render_maps};
