use crate::Error;
use crate::grid::nearest_index;
use log::debug;
use ndarray::{Array1, Array2};
use ndarray_stats::QuantileExt;
use rayon::prelude::*;

/// Fractional padding added above and below the data in each panel
const Y_RANGE_PADDING: f64 = 0.05;

/// Line encoding, shared by every panel and by the legend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineStyle {
    pub rgb: (u8, u8, u8),
    pub line_width: u32,
    pub dashed: bool,
}

/// Reference: solid black
pub const REFERENCE_STYLE: LineStyle = LineStyle {
    rgb: (0, 0, 0),
    line_width: 2,
    dashed: false,
};

/// Predicted: dashed red
pub const PREDICTED_STYLE: LineStyle = LineStyle {
    rgb: (220, 0, 0),
    line_width: 2,
    dashed: true,
};

/// Text used on the comparison grid
#[derive(Debug, Clone)]
pub struct ComparisonLabels {
    pub parameter_symbol: String,
    pub parameter_unit: String,
    /// Number of decimals of the resolved parameter value in column titles
    pub title_precision: usize,
    pub value_label: String,
    pub derivative_label: String,
    pub time_label: String,
    pub reference_label: String,
    pub predicted_label: String,
}

impl Default for ComparisonLabels {
    fn default() -> Self {
        return ComparisonLabels {
            parameter_symbol: "P".to_string(),
            parameter_unit: "p.u.".to_string(),
            title_precision: 2,
            value_label: "δ [rad]".to_string(),
            derivative_label: "ω [rad/s]".to_string(),
            time_label: "Time [s]".to_string(),
            reference_label: "Reference".to_string(),
            predicted_label: "Predicted".to_string(),
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelQuantity {
    /// Row 0: the field itself
    Value,
    /// Row 1: its time derivative
    Derivative,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub label: String,
    pub style: LineStyle,
}

/// One plot of the grid: reference and predicted against time
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonPanel {
    pub quantity: PanelQuantity,
    pub title: Option<String>,
    pub x_label: Option<String>,
    pub y_label: String,
    pub reference: Array1<f64>,
    pub predicted: Array1<f64>,
    /// Covers both series, so they are drawn on the same scale
    pub y_range: (f64, f64),
}

/// One requested parameter value: the value panel above the derivative panel
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonColumn {
    pub requested_value: f64,
    pub resolved_index: usize,
    /// The parameter value actually plotted, which is what the title reports
    pub resolved_value: f64,
    pub value_panel: ComparisonPanel,
    pub derivative_panel: ComparisonPanel,
}

/// A 2 x n_targets grid with a single legend
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonLayout {
    pub time: Array1<f64>,
    /// Shared by every panel
    pub time_range: (f64, f64),
    pub columns: Vec<ComparisonColumn>,
    pub legend: Vec<LegendEntry>,
}

impl ComparisonLayout {
    pub const N_ROWS: usize = 2;

    pub fn n_columns(&self) -> usize {
        return self.columns.len();
    }

    pub fn panel(&self, i_row: usize, i_column: usize) -> Option<&ComparisonPanel> {
        let column: &ComparisonColumn = self.columns.get(i_column)?;
        return match i_row {
            0 => Some(&column.value_panel),
            1 => Some(&column.derivative_panel),
            _ => None,
        };
    }

    pub fn resolved_indices(&self) -> Vec<usize> {
        return self.columns.iter().map(|column| column.resolved_index).collect();
    }
}

/// Assemble the comparison grid with the default labels
///
/// # Arguments
/// * `reference`, `predicted` - fields indexed `(i_time, i_parameter)`
/// * `reference_derivative`, `predicted_derivative` - their time derivatives, same shape
/// * `time_axis` - length `n_time`
/// * `parameter_axis` - length `n_parameter`
/// * `targets` - requested parameter values, one column each, in this order
///
pub fn assemble(
    reference: &Array2<f64>,
    predicted: &Array2<f64>,
    reference_derivative: &Array2<f64>,
    predicted_derivative: &Array2<f64>,
    time_axis: &Array1<f64>,
    parameter_axis: &Array1<f64>,
    targets: &[f64],
) -> Result<ComparisonLayout, Error> {
    let fields: ComparisonFields = ComparisonFields {
        reference,
        predicted,
        reference_derivative,
        predicted_derivative,
        time_axis,
        parameter_axis,
    };
    let labels: ComparisonLabels = ComparisonLabels::default();
    return assemble_with_labels(&fields, targets, &labels);
}

/// The fields, their derivatives and the axes they are sampled on
#[derive(Debug, Clone, Copy)]
pub struct ComparisonFields<'a> {
    pub reference: &'a Array2<f64>,
    pub predicted: &'a Array2<f64>,
    pub reference_derivative: &'a Array2<f64>,
    pub predicted_derivative: &'a Array2<f64>,
    pub time_axis: &'a Array1<f64>,
    pub parameter_axis: &'a Array1<f64>,
}

pub fn assemble_with_labels(fields: &ComparisonFields, targets: &[f64], labels: &ComparisonLabels) -> Result<ComparisonLayout, Error> {
    if targets.is_empty() {
        return Err(Error::EmptyRequest);
    }
    let ComparisonFields {
        reference,
        predicted,
        reference_derivative,
        predicted_derivative,
        time_axis,
        parameter_axis,
    } = *fields;

    // Every field must be on the same grid
    let expected: (usize, usize) = reference.dim();
    let others: [(&str, &Array2<f64>); 3] = [
        ("predicted", predicted),
        ("reference_derivative", reference_derivative),
        ("predicted_derivative", predicted_derivative),
    ];
    for (name, field) in others {
        if field.dim() != expected {
            return Err(Error::ShapeMismatch {
                name: name.to_string(),
                found: field.dim(),
                expected,
            });
        }
    }
    let (n_time, n_parameter): (usize, usize) = expected;
    if time_axis.len() != n_time {
        return Err(Error::InvalidInput {
            name: "time_axis".to_string(),
            message: format!("length {} does not match the {} time samples of the fields", time_axis.len(), n_time),
        });
    }
    if parameter_axis.len() != n_parameter {
        return Err(Error::InvalidInput {
            name: "parameter_axis".to_string(),
            message: format!("length {} does not match the {} parameter samples of the fields", parameter_axis.len(), n_parameter),
        });
    }
    if n_time == 0 {
        return Err(Error::InsufficientSamples { n_samples: 0, required: 1 });
    }

    // One column per target; collecting keeps the request order
    let columns: Vec<ComparisonColumn> = targets
        .par_iter()
        .map(|&target: &f64| -> Result<ComparisonColumn, Error> {
            let i_parameter: usize = nearest_index(parameter_axis, target)?;
            let resolved_value: f64 = parameter_axis[i_parameter];
            debug!("assemble: target={} resolved to index {} (value={})", target, i_parameter, resolved_value);

            let title: String = format!(
                "{} = {:.*} [{}]",
                labels.parameter_symbol, labels.title_precision, resolved_value, labels.parameter_unit
            );
            let value_panel: ComparisonPanel = build_panel(
                PanelQuantity::Value,
                reference,
                predicted,
                i_parameter,
                Some(title),
                None,
                labels.value_label.clone(),
            );
            let derivative_panel: ComparisonPanel = build_panel(
                PanelQuantity::Derivative,
                reference_derivative,
                predicted_derivative,
                i_parameter,
                None,
                Some(labels.time_label.clone()),
                labels.derivative_label.clone(),
            );

            return Ok(ComparisonColumn {
                requested_value: target,
                resolved_index: i_parameter,
                resolved_value,
                value_panel,
                derivative_panel,
            });
        })
        .collect::<Result<Vec<ComparisonColumn>, Error>>()?;

    let legend: Vec<LegendEntry> = vec![
        LegendEntry {
            label: labels.reference_label.clone(),
            style: REFERENCE_STYLE,
        },
        LegendEntry {
            label: labels.predicted_label.clone(),
            style: PREDICTED_STYLE,
        },
    ];

    let time_range: (f64, f64) = (time_axis[0], time_axis[n_time - 1]);

    return Ok(ComparisonLayout {
        time: time_axis.to_owned(),
        time_range,
        columns,
        legend,
    });
}

fn build_panel(
    quantity: PanelQuantity,
    reference: &Array2<f64>,
    predicted: &Array2<f64>,
    i_parameter: usize,
    title: Option<String>,
    x_label: Option<String>,
    y_label: String,
) -> ComparisonPanel {
    let reference_column: Array1<f64> = reference.column(i_parameter).to_owned();
    let predicted_column: Array1<f64> = predicted.column(i_parameter).to_owned();
    let y_range: (f64, f64) = padded_range(&reference_column, &predicted_column);

    return ComparisonPanel {
        quantity,
        title,
        x_label,
        y_label,
        reference: reference_column,
        predicted: predicted_column,
        y_range,
    };
}

/// Range covering both series, NaN ignored, with some padding
fn padded_range(reference: &Array1<f64>, predicted: &Array1<f64>) -> (f64, f64) {
    let y_min: f64 = (*reference.min_skipnan()).min(*predicted.min_skipnan());
    let y_max: f64 = (*reference.max_skipnan()).max(*predicted.max_skipnan());
    if !y_min.is_finite() || !y_max.is_finite() {
        return (-1.0, 1.0);
    }

    let span: f64 = y_max - y_min;
    let padding: f64 = if span > 0.0 {
        Y_RANGE_PADDING * span
    } else {
        // Flat line, keep it in the middle of the panel
        Y_RANGE_PADDING * y_max.abs().max(1.0)
    };

    return (y_min - padding, y_max + padding);
}

#[cfg(test)]
fn swing_fields(n_time: usize, n_parameter: usize) -> (Array1<f64>, Array1<f64>, Array2<f64>, Array2<f64>) {
    let t: Array1<f64> = Array1::linspace(0.0, 2.0, n_time);
    let p: Array1<f64> = Array1::linspace(0.1, 0.2, n_parameter);
    let reference: Array2<f64> = Array2::from_shape_fn((n_time, n_parameter), |(i_time, i_parameter)| p[i_parameter] * (3.0 * t[i_time]).sin());
    let predicted: Array2<f64> = reference.mapv(|value| value + 1e-3);
    return (t, p, reference, predicted);
}

#[test]
fn test_assemble_layout_structure() {
    use crate::derivatives::time_derivative;

    let (t, p, reference, predicted) = swing_fields(50, 11);
    let dt: f64 = t[1] - t[0];
    let reference_derivative: Array2<f64> = time_derivative(&reference, dt).unwrap();
    let predicted_derivative: Array2<f64> = time_derivative(&predicted, dt).unwrap();

    let targets: Vec<f64> = vec![0.17, 0.18, 0.102];
    let layout: ComparisonLayout = assemble(&reference, &predicted, &reference_derivative, &predicted_derivative, &t, &p, &targets).unwrap();

    // p = 0.10, 0.11, ..., 0.20
    assert_eq!(layout.n_columns(), 3);
    assert_eq!(layout.resolved_indices(), vec![7, 8, 0]);
    assert_eq!(layout.columns[0].requested_value, 0.17);
    assert_eq!(layout.columns[0].resolved_value, p[7]);

    // Titles report the resolved value, on the top row only
    assert_eq!(layout.columns[2].value_panel.title.as_deref(), Some("P = 0.10 [p.u.]"));
    assert!(layout.columns[2].derivative_panel.title.is_none());

    // x label on the bottom row only
    for column in &layout.columns {
        assert!(column.value_panel.x_label.is_none());
        assert_eq!(column.derivative_panel.x_label.as_deref(), Some("Time [s]"));
        assert_eq!(column.value_panel.quantity, PanelQuantity::Value);
        assert_eq!(column.derivative_panel.quantity, PanelQuantity::Derivative);
        assert_eq!(column.value_panel.reference, reference.column(column.resolved_index).to_owned());
        assert_eq!(column.derivative_panel.predicted, predicted_derivative.column(column.resolved_index).to_owned());
    }

    // A single legend with the fixed encoding
    assert_eq!(layout.legend.len(), 2);
    assert_eq!(layout.legend[0].label, "Reference");
    assert_eq!(layout.legend[0].style, REFERENCE_STYLE);
    assert!(!layout.legend[0].style.dashed);
    assert_eq!(layout.legend[1].label, "Predicted");
    assert_eq!(layout.legend[1].style, PREDICTED_STYLE);
    assert!(layout.legend[1].style.dashed);

    // Shared time range
    approx::assert_abs_diff_eq!(layout.time_range.0, 0.0, epsilon = 1e-12);
    approx::assert_abs_diff_eq!(layout.time_range.1, 2.0, epsilon = 1e-12);
    assert!(layout.panel(1, 2).is_some());
    assert!(layout.panel(2, 0).is_none());
    assert!(layout.panel(0, 3).is_none());
}

#[test]
fn test_assemble_is_idempotent() {
    let (t, p, reference, predicted) = swing_fields(30, 7);
    let targets: Vec<f64> = vec![0.19, 0.11, 0.15, 0.15];

    let layout_1: ComparisonLayout = assemble(&reference, &predicted, &reference, &predicted, &t, &p, &targets).unwrap();
    let layout_2: ComparisonLayout = assemble(&reference, &predicted, &reference, &predicted, &t, &p, &targets).unwrap();

    assert_eq!(layout_1.resolved_indices(), layout_2.resolved_indices());
    assert_eq!(layout_1, layout_2);
    let requested: Vec<f64> = layout_1.columns.iter().map(|column| column.requested_value).collect();
    assert_eq!(requested, targets);
}

#[test]
fn test_assemble_y_range_covers_both_series() {
    let (t, p, reference, predicted) = swing_fields(40, 5);
    let predicted: Array2<f64> = predicted * 3.0;
    let layout: ComparisonLayout = assemble(&reference, &predicted, &reference, &predicted, &t, &p, &[0.2]).unwrap();

    let panel: &ComparisonPanel = &layout.columns[0].value_panel;
    for value in panel.reference.iter().chain(panel.predicted.iter()) {
        assert!(*value > panel.y_range.0 && *value < panel.y_range.1);
    }
}

#[test]
fn test_assemble_flat_series_has_non_empty_range() {
    let t: Array1<f64> = Array1::linspace(0.0, 1.0, 3);
    let p: Array1<f64> = Array1::linspace(0.1, 0.3, 3);
    let ones: Array2<f64> = Array2::ones((3, 3));
    let zeros: Array2<f64> = Array2::zeros((3, 3));
    let layout: ComparisonLayout = assemble(&ones, &ones, &zeros, &zeros, &t, &p, &[0.2]).unwrap();

    let value_range: (f64, f64) = layout.columns[0].value_panel.y_range;
    assert!(value_range.0 < 1.0 && value_range.1 > 1.0);
    let derivative_range: (f64, f64) = layout.columns[0].derivative_panel.y_range;
    assert!(derivative_range.0 < 0.0 && derivative_range.1 > 0.0);
}

#[test]
fn test_assemble_rejects_empty_request() {
    let (t, p, reference, predicted) = swing_fields(10, 3);
    let result: Result<ComparisonLayout, Error> = assemble(&reference, &predicted, &reference, &predicted, &t, &p, &[]);
    assert!(matches!(result, Err(Error::EmptyRequest)));
}

#[test]
fn test_assemble_rejects_mismatched_fields() {
    let (t, p, reference, predicted) = swing_fields(10, 3);
    let short_derivative: Array2<f64> = Array2::zeros((9, 3));
    let result: Result<ComparisonLayout, Error> = assemble(&reference, &predicted, &short_derivative, &predicted, &t, &p, &[0.15]);
    assert!(matches!(result, Err(Error::ShapeMismatch { ref name, .. }) if name == "reference_derivative"));

    let short_axis: Array1<f64> = Array1::linspace(0.1, 0.2, 2);
    let result: Result<ComparisonLayout, Error> = assemble(&reference, &predicted, &reference, &predicted, &t, &short_axis, &[0.15]);
    assert!(matches!(result, Err(Error::InvalidInput { .. })));
}

#[test]
fn test_assemble_custom_labels() {
    let (t, p, reference, predicted) = swing_fields(10, 3);
    let labels: ComparisonLabels = ComparisonLabels {
        reference_label: "Exact".to_string(),
        title_precision: 3,
        ..ComparisonLabels::default()
    };
    let fields: ComparisonFields = ComparisonFields {
        reference: &reference,
        predicted: &predicted,
        reference_derivative: &reference,
        predicted_derivative: &predicted,
        time_axis: &t,
        parameter_axis: &p,
    };
    let layout: ComparisonLayout = assemble_with_labels(&fields, &[0.16], &labels).unwrap();
    assert_eq!(layout.legend[0].label, "Exact");
    assert_eq!(layout.columns[0].value_panel.title.as_deref(), Some("P = 0.150 [p.u.]"));
}
