use super::render_error;
use crate::Error;
use crate::comparison::{ComparisonLayout, ComparisonPanel, LegendEntry, LineStyle};
use ndarray::Array1;
use plotters::coord::Shift;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use std::path::Path;

/// Height in pixels of the strip above the grid holding the shared legend
const LEGEND_HEIGHT: u32 = 50;
const LEGEND_ENTRY_WIDTH: i32 = 170;
const LEGEND_SAMPLE_LENGTH: i32 = 44;

type LineChart<'a, 'b> = ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Draw the 2 x n_columns comparison grid to a PNG file
///
/// The legend is drawn once, centred above the grid.
/// The bitmap is released when this function returns, whether drawing succeeded or not.
pub fn draw_comparison(layout: &ComparisonLayout, path: &Path, size: (u32, u32)) -> Result<(), Error> {
    let n_columns: usize = layout.n_columns();
    if n_columns == 0 {
        return Err(Error::EmptyRequest);
    }
    // Legend order is (reference, predicted)
    let (reference_style, predicted_style): (&LineStyle, &LineStyle) = match layout.legend.as_slice() {
        [reference_entry, predicted_entry, ..] => (&reference_entry.style, &predicted_entry.style),
        _ => {
            return Err(Error::Render(format!(
                "legend needs a reference and a predicted entry, found {}",
                layout.legend.len()
            )));
        }
    };

    let root: DrawingArea<BitMapBackend, Shift> = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(render_error)?;
    let (legend_area, grid_area) = root.split_vertically(LEGEND_HEIGHT);

    draw_shared_legend(&legend_area, &layout.legend)?;

    // `split_evenly` returns the areas row by row
    let panel_areas: Vec<DrawingArea<BitMapBackend, Shift>> = grid_area.split_evenly((ComparisonLayout::N_ROWS, n_columns));
    for i_row in 0..ComparisonLayout::N_ROWS {
        for i_column in 0..n_columns {
            let panel: &ComparisonPanel = layout
                .panel(i_row, i_column)
                .ok_or_else(|| Error::Render(format!("no panel at row {} column {}", i_row, i_column)))?;
            draw_panel(
                &panel_areas[i_row * n_columns + i_column],
                &layout.time,
                layout.time_range,
                panel,
                reference_style,
                predicted_style,
            )?;
        }
    }

    root.present().map_err(render_error)?;
    return Ok(());
}

fn draw_panel(
    area: &DrawingArea<BitMapBackend, Shift>,
    time: &Array1<f64>,
    time_range: (f64, f64),
    panel: &ComparisonPanel,
    reference_style: &LineStyle,
    predicted_style: &LineStyle,
) -> Result<(), Error> {
    let mut chart_builder: ChartBuilder<BitMapBackend> = ChartBuilder::on(area);
    chart_builder.margin(12).x_label_area_size(40).y_label_area_size(60);
    if let Some(title) = &panel.title {
        chart_builder.caption(title, ("sans-serif", 20));
    }
    let mut chart: LineChart = chart_builder
        .build_cartesian_2d(time_range.0..time_range.1, panel.y_range.0..panel.y_range.1)
        .map_err(render_error)?;

    let mut mesh = chart.configure_mesh();
    mesh.y_desc(panel.y_label.as_str())
        .light_line_style(BLACK.mix(0.08))
        .bold_line_style(BLACK.mix(0.25))
        .label_style(("sans-serif", 14));
    if let Some(x_label) = &panel.x_label {
        mesh.x_desc(x_label.as_str());
    }
    mesh.draw().map_err(render_error)?;

    draw_line(&mut chart, time, &panel.reference, reference_style)?;
    draw_line(&mut chart, time, &panel.predicted, predicted_style)?;

    return Ok(());
}

fn draw_line(chart: &mut LineChart, time: &Array1<f64>, values: &Array1<f64>, line_style: &LineStyle) -> Result<(), Error> {
    let points: Vec<(f64, f64)> = time
        .iter()
        .zip(values.iter())
        .filter(|(t, value)| t.is_finite() && value.is_finite())
        .map(|(&t, &value)| (t, value))
        .collect();
    let shape_style: ShapeStyle = shape_style(line_style);

    if line_style.dashed {
        chart.draw_series(DashedLineSeries::new(points, 10, 6, shape_style)).map_err(render_error)?;
    } else {
        chart.draw_series(LineSeries::new(points, shape_style)).map_err(render_error)?;
    }

    return Ok(());
}

fn draw_shared_legend(area: &DrawingArea<BitMapBackend, Shift>, legend: &[LegendEntry]) -> Result<(), Error> {
    let (width, height): (u32, u32) = area.dim_in_pixel();
    let legend_width: i32 = LEGEND_ENTRY_WIDTH * legend.len() as i32;
    let x_start: i32 = (width as i32 - legend_width) / 2;
    let y_centre: i32 = height as i32 / 2;
    let text_style: TextStyle = TextStyle::from(("sans-serif", 18).into_font()).color(&BLACK);

    // Frame
    area.draw(&Rectangle::new(
        [(x_start - 12, y_centre - 16), (x_start + legend_width, y_centre + 16)],
        BLACK.stroke_width(1),
    ))
    .map_err(render_error)?;

    for (i_entry, entry) in legend.iter().enumerate() {
        let x_entry: i32 = x_start + i_entry as i32 * LEGEND_ENTRY_WIDTH;
        let shape_style: ShapeStyle = shape_style(&entry.style);
        if entry.style.dashed {
            let mut x_dash: i32 = x_entry;
            while x_dash < x_entry + LEGEND_SAMPLE_LENGTH {
                let x_dash_end: i32 = (x_dash + 10).min(x_entry + LEGEND_SAMPLE_LENGTH);
                area.draw(&PathElement::new(vec![(x_dash, y_centre), (x_dash_end, y_centre)], shape_style))
                    .map_err(render_error)?;
                x_dash += 16;
            }
        } else {
            area.draw(&PathElement::new(vec![(x_entry, y_centre), (x_entry + LEGEND_SAMPLE_LENGTH, y_centre)], shape_style))
                .map_err(render_error)?;
        }
        area.draw_text(&entry.label, &text_style, (x_entry + LEGEND_SAMPLE_LENGTH + 8, y_centre - 9))
            .map_err(render_error)?;
    }

    return Ok(());
}

fn shape_style(line_style: &LineStyle) -> ShapeStyle {
    let (red, green, blue): (u8, u8, u8) = line_style.rgb;
    return RGBColor(red, green, blue).stroke_width(line_style.line_width);
}

#[cfg(test)]
fn test_layout() -> ComparisonLayout {
    use crate::comparison::assemble;

    let n_time: usize = 40;
    let n_parameter: usize = 6;
    let t: Array1<f64> = Array1::linspace(0.0, 2.0, n_time);
    let p: Array1<f64> = Array1::linspace(0.1, 0.2, n_parameter);
    let reference: ndarray::Array2<f64> = ndarray::Array2::from_shape_fn((n_time, n_parameter), |(i_time, i_parameter)| (t[i_time] * 10.0 * p[i_parameter]).sin());
    let predicted: ndarray::Array2<f64> = reference.mapv(|value| 0.98 * value);
    return assemble(&reference, &predicted, &reference, &predicted, &t, &p, &[0.17, 0.18]).unwrap();
}

#[test]
fn test_draw_comparison_rejects_short_legend() {
    let mut layout: ComparisonLayout = test_layout();
    layout.legend.truncate(1);
    let path: std::path::PathBuf = std::env::temp_dir().join(format!("swing_compare_short_legend_{}.png", std::process::id()));

    let result: Result<(), Error> = draw_comparison(&layout, &path, (600, 400));
    assert!(matches!(result, Err(Error::Render(_))));
    assert!(!path.exists());
}

#[test]
fn test_draw_comparison_writes_png() {
    if !super::font_available() {
        println!("no sans-serif font found, skipping the drawing check");
        return;
    }
    let layout: ComparisonLayout = test_layout();
    let path: std::path::PathBuf = std::env::temp_dir().join(format!("swing_compare_grid_{}.png", std::process::id()));

    draw_comparison(&layout, &path, (900, 700)).unwrap();
    assert!(std::fs::metadata(&path).unwrap().len() > 0);

    std::fs::remove_file(&path).unwrap();
}
