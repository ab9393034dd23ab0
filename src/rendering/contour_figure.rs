use super::render_error;
use crate::Error;
use crate::comparison::{ErrorMaps, FilledContourMap};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::colors::colormaps::ViridisRGB;
use std::path::Path;

/// Width in pixels kept on the right of each map for its colour bar
const COLOUR_BAR_WIDTH: u32 = 110;

/// Draw the reference, predicted and absolute error maps side by side, each with its own colour bar
pub fn draw_error_maps(maps: &ErrorMaps, path: &Path, size: (u32, u32)) -> Result<(), Error> {
    let root: DrawingArea<BitMapBackend, Shift> = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(render_error)?;

    let map_areas: Vec<DrawingArea<BitMapBackend, Shift>> = root.split_evenly((1, 3));
    let ordered_maps: [&FilledContourMap; 3] = [&maps.reference, &maps.predicted, &maps.absolute_error];
    for (map_area, map) in map_areas.iter().zip(ordered_maps) {
        draw_filled_contour(map_area, map)?;
    }

    root.present().map_err(render_error)?;
    return Ok(());
}

fn draw_filled_contour(area: &DrawingArea<BitMapBackend, Shift>, map: &FilledContourMap) -> Result<(), Error> {
    let (area_width, _area_height): (u32, u32) = area.dim_in_pixel();
    let (plot_area, colour_bar_area) = area.split_horizontally(area_width.saturating_sub(COLOUR_BAR_WIDTH));

    let (x_min, x_max): (f64, f64) = non_degenerate(map.x_range);
    let (y_min, y_max): (f64, f64) = non_degenerate(map.y_range);

    let mut chart = ChartBuilder::on(&plot_area)
        .margin(12)
        .caption(&map.title, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(render_error)?;

    // Bands first, then the mesh on top so the axes stay visible
    for (i_band, polygon) in map.painting_order() {
        let band_middle: f64 = 0.5 * (map.bands[i_band].lower + map.bands[i_band].upper);
        let colour: RGBColor = ViridisRGB.get_color(map.normalised_level(band_middle));
        // Contour outlines can sit half a cell outside the grid
        let points: Vec<(f64, f64)> = polygon
            .exterior()
            .coords()
            .map(|coord| (coord.x.clamp(x_min, x_max), coord.y.clamp(y_min, y_max)))
            .collect();
        chart
            .draw_series(std::iter::once(Polygon::new(points, colour.filled())))
            .map_err(render_error)?;
    }

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(map.x_label.as_str())
        .y_desc(map.y_label.as_str())
        .label_style(("sans-serif", 14))
        .draw()
        .map_err(render_error)?;

    draw_colour_bar(&colour_bar_area, map.value_range)?;

    return Ok(());
}

fn draw_colour_bar(area: &DrawingArea<BitMapBackend, Shift>, value_range: (f64, f64)) -> Result<(), Error> {
    let (_bar_width, bar_height): (u32, u32) = area.dim_in_pixel();
    let x_bar: i32 = 10;
    let top_margin: i32 = 50;
    let bottom_margin: i32 = 50;
    let usable_height: i32 = (bar_height as i32).saturating_sub(top_margin + bottom_margin);
    if usable_height < 2 {
        return Ok(());
    }

    for i_pixel in 0..usable_height {
        let fraction: f64 = 1.0 - i_pixel as f64 / (usable_height - 1) as f64;
        let colour: RGBColor = ViridisRGB.get_color(fraction);
        area.draw(&Rectangle::new(
            [(x_bar, top_margin + i_pixel), (x_bar + 24, top_margin + i_pixel + 1)],
            colour.filled(),
        ))
        .map_err(render_error)?;
    }

    let text_style: TextStyle = TextStyle::from(("sans-serif", 13).into_font()).color(&BLACK);
    let n_labels: i32 = 5;
    for i_label in 0..n_labels {
        let fraction: f64 = i_label as f64 / (n_labels - 1) as f64;
        let value: f64 = value_range.1 - fraction * (value_range.1 - value_range.0);
        let y_label: i32 = top_margin + (fraction * (usable_height - 1) as f64) as i32;
        area.draw_text(&format!("{:.2e}", value), &text_style, (x_bar + 30, y_label - 6))
            .map_err(render_error)?;
    }

    return Ok(());
}

/// plotters needs a non-empty range
fn non_degenerate(range: (f64, f64)) -> (f64, f64) {
    let (low, high): (f64, f64) = range;
    if high > low {
        return (low, high);
    }
    return (low - 0.5, low + 0.5);
}

#[test]
fn test_draw_error_maps_writes_png() {
    // Lazy loading of crates which are only used within the tests
    use crate::comparison::render_maps;
    use ndarray::{Array1, Array2};

    if !super::font_available() {
        println!("no sans-serif font found, skipping the drawing check");
        return;
    }
    let n_time: usize = 30;
    let n_parameter: usize = 12;
    let t: Array1<f64> = Array1::linspace(0.0, 1.0, n_time);
    let p: Array1<f64> = Array1::linspace(0.1, 0.2, n_parameter);
    let t_2d: Array2<f64> = Array2::from_shape_fn((n_time, n_parameter), |(i_time, _i_parameter)| t[i_time]);
    let x_2d: Array2<f64> = Array2::from_shape_fn((n_time, n_parameter), |(_i_time, i_parameter)| p[i_parameter]);
    let reference: Array2<f64> = Array2::from_shape_fn((n_time, n_parameter), |(i_time, i_parameter)| (t[i_time] * 20.0 * p[i_parameter]).sin());
    let predicted: Array2<f64> = reference.mapv(|value| 1.05 * value + 0.01);
    let maps: ErrorMaps = render_maps(&reference, &predicted, &t_2d, &x_2d, 12).unwrap();
    let path: std::path::PathBuf = std::env::temp_dir().join(format!("swing_compare_maps_{}.png", std::process::id()));

    draw_error_maps(&maps, &path, (1500, 450)).unwrap();
    assert!(std::fs::metadata(&path).unwrap().len() > 0);

    std::fs::remove_file(&path).unwrap();
}
