use crate::Error;
use contour::ContourBuilder;
use geo::Area;
use geo_types::{MultiPolygon, Polygon};
use log::debug;
use ndarray::{Array1, Array2};
use ndarray_stats::QuantileExt;

/// Filled bands per map
pub const DEFAULT_N_LEVELS: usize = 50;

/// Region of the grid where `lower <= value < upper`
#[derive(Debug, Clone)]
pub struct ContourBand {
    pub lower: f64,
    pub upper: f64,
    pub polygons: MultiPolygon<f64>,
}

/// One filled-contour plot, with the parameter horizontally and time vertically
#[derive(Debug, Clone)]
pub struct FilledContourMap {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub values: Array2<f64>,
    /// `n_levels + 1` thresholds
    pub levels: Array1<f64>,
    pub bands: Vec<ContourBand>,
    /// Colour scale of this map only, maps are not normalised together
    pub value_range: (f64, f64),
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
}

impl FilledContourMap {
    /// Position of `value` on this map's colour scale, in [0, 1]
    pub fn normalised_level(&self, value: f64) -> f64 {
        let (value_min, value_max): (f64, f64) = self.value_range;
        let span: f64 = value_max - value_min;
        if span <= 0.0 || !span.is_finite() {
            return 0.5;
        }
        return ((value - value_min) / span).clamp(0.0, 1.0);
    }

    /// Every band polygon as `(band index, polygon)`, largest outline first.
    ///
    /// Polygon holes are always filled by smaller polygons of other bands, so painting the
    /// outlines in this order reproduces the holes without drawing them.
    pub fn painting_order(&self) -> Vec<(usize, &Polygon<f64>)> {
        let mut polygons: Vec<(usize, &Polygon<f64>, f64)> = Vec::new();
        for (i_band, band) in self.bands.iter().enumerate() {
            for polygon in band.polygons.iter() {
                let outline: Polygon<f64> = Polygon::new(polygon.exterior().clone(), vec![]);
                polygons.push((i_band, polygon, outline.unsigned_area()));
            }
        }
        polygons.sort_by(|a, b| b.2.total_cmp(&a.2));

        return polygons.into_iter().map(|(i_band, polygon, _area)| (i_band, polygon)).collect();
    }
}

/// The three maps of a full-field comparison
#[derive(Debug, Clone)]
pub struct ErrorMaps {
    pub reference: FilledContourMap,
    pub predicted: FilledContourMap,
    pub absolute_error: FilledContourMap,
}

/// Pointwise `|predicted - reference|`
pub fn absolute_error(reference: &Array2<f64>, predicted: &Array2<f64>) -> Result<Array2<f64>, Error> {
    if predicted.dim() != reference.dim() {
        return Err(Error::ShapeMismatch {
            name: "predicted".to_string(),
            found: predicted.dim(),
            expected: reference.dim(),
        });
    }

    let error_2d: Array2<f64> = (predicted - reference).mapv(f64::abs);
    return Ok(error_2d);
}

/// Filled contour maps of the reference, the prediction and their absolute difference
///
/// # Arguments
/// * `reference`, `predicted` - fields indexed `(i_time, i_parameter)`
/// * `time_grid` - time at each cell, varies down the rows
/// * `parameter_grid` - parameter at each cell, varies across the columns
/// * `n_levels` - number of filled bands per map
///
/// # Notes
/// Each map gets its own colour scale, from its own minimum to its own maximum.
///
pub fn render_maps(
    reference: &Array2<f64>,
    predicted: &Array2<f64>,
    time_grid: &Array2<f64>,
    parameter_grid: &Array2<f64>,
    n_levels: usize,
) -> Result<ErrorMaps, Error> {
    let expected: (usize, usize) = reference.dim();
    let others: [(&str, &Array2<f64>); 3] = [("predicted", predicted), ("time_grid", time_grid), ("parameter_grid", parameter_grid)];
    for (name, array) in others {
        if array.dim() != expected {
            return Err(Error::ShapeMismatch {
                name: name.to_string(),
                found: array.dim(),
                expected,
            });
        }
    }
    let (n_time, n_parameter): (usize, usize) = expected;
    if n_time == 0 || n_parameter == 0 {
        return Err(Error::EmptyAxis);
    }
    if n_levels == 0 {
        return Err(Error::InvalidInput {
            name: "n_levels".to_string(),
            message: "at least one contour level is needed".to_string(),
        });
    }

    let time: Array1<f64> = time_grid.column(0).to_owned();
    let parameter: Array1<f64> = parameter_grid.row(0).to_owned();
    let error_2d: Array2<f64> = absolute_error(reference, predicted)?;

    // The three maps are independent
    let (reference_map, (predicted_map, error_map)) = rayon::join(
        || filled_contour_map("Exact u(x,t)", reference, &time, &parameter, n_levels),
        || {
            rayon::join(
                || filled_contour_map("PINN Prediction u(x,t)", predicted, &time, &parameter, n_levels),
                || filled_contour_map("|Error|", &error_2d, &time, &parameter, n_levels),
            )
        },
    );

    return Ok(ErrorMaps {
        reference: reference_map?,
        predicted: predicted_map?,
        absolute_error: error_map?,
    });
}

fn filled_contour_map(title: &str, values: &Array2<f64>, time: &Array1<f64>, parameter: &Array1<f64>, n_levels: usize) -> Result<FilledContourMap, Error> {
    let (n_time, n_parameter): (usize, usize) = values.dim();

    let value_min: f64 = *values.min_skipnan();
    let value_max: f64 = *values.max_skipnan();
    if !value_min.is_finite() || !value_max.is_finite() {
        return Err(Error::InvalidInput {
            name: title.to_string(),
            message: "field has no finite values to contour".to_string(),
        });
    }
    let levels: Array1<f64> = contour_levels(value_min, value_max, n_levels);

    // Grid spacing, the parameter is along x and time along y
    let d_x: f64 = mean_step(parameter);
    let d_t: f64 = mean_step(time);
    let contour_grid: ContourBuilder = ContourBuilder::new(n_parameter, n_time, true) // x dim., y dim., smoothing
        .x_step(d_x)
        .y_step(d_t)
        .x_origin(parameter[0] - d_x / 2.0)
        .y_origin(time[0] - d_t / 2.0);

    // Row major, so the parameter index runs fastest
    let values_flattened: Vec<f64> = values.iter().cloned().collect();
    let thresholds: Vec<f64> = levels.to_vec();
    let bands_tmp: Vec<contour::Band> = contour_grid
        .isobands(&values_flattened, &thresholds)
        .map_err(|error| Error::Contour {
            name: title.to_string(),
            message: format!("{:?}", error),
        })?;

    let bands: Vec<ContourBand> = bands_tmp
        .iter()
        .map(|band| ContourBand {
            lower: band.min_v(),
            upper: band.max_v(),
            polygons: band.geometry().clone(),
        })
        .collect();
    debug!("filled_contour_map: `{}` has {} bands over [{}, {}]", title, bands.len(), value_min, value_max);

    return Ok(FilledContourMap {
        title: title.to_string(),
        x_label: "x".to_string(),
        y_label: "t".to_string(),
        values: values.to_owned(),
        levels,
        bands,
        value_range: (value_min, value_max),
        x_range: (parameter[0], parameter[n_parameter - 1]),
        y_range: (time[0], time[n_time - 1]),
    });
}

/// Evenly spaced thresholds from `value_min` to just above `value_max`, so the maximum falls inside the top band.
/// A constant field gets a single band around its value.
fn contour_levels(value_min: f64, value_max: f64, n_levels: usize) -> Array1<f64> {
    let span: f64 = value_max - value_min;
    if span <= 0.0 {
        let half_width: f64 = 0.5e-3 * value_max.abs().max(1.0);
        return Array1::from_vec(vec![value_min - half_width, value_max + half_width]);
    }

    let mut levels: Array1<f64> = Array1::linspace(value_min, value_max, n_levels + 1);
    levels[n_levels] = value_max + 1e-9 * span;
    return levels;
}

/// Mean spacing of an axis, 1.0 for a single sample
fn mean_step(axis: &Array1<f64>) -> f64 {
    let n_axis: usize = axis.len();
    if n_axis < 2 {
        return 1.0;
    }
    let step: f64 = (axis[n_axis - 1] - axis[0]) / (n_axis - 1) as f64;
    if step == 0.0 || !step.is_finite() {
        return 1.0;
    }
    return step;
}

#[cfg(test)]
fn test_grids(n_time: usize, n_parameter: usize) -> (Array2<f64>, Array2<f64>) {
    let t: Array1<f64> = Array1::linspace(0.0, 1.0, n_time);
    let p: Array1<f64> = Array1::linspace(0.1, 0.3, n_parameter);
    let t_2d: Array2<f64> = Array2::from_shape_fn((n_time, n_parameter), |(i_time, _)| t[i_time]);
    let x_2d: Array2<f64> = Array2::from_shape_fn((n_time, n_parameter), |(_, i_parameter)| p[i_parameter]);
    return (t_2d, x_2d);
}

#[test]
fn test_absolute_error_of_identical_fields_is_zero() {
    let field: Array2<f64> = Array2::from_shape_fn((6, 4), |(i_time, i_parameter)| (i_time as f64 * 0.3).cos() * i_parameter as f64);
    let error_2d: Array2<f64> = absolute_error(&field, &field).unwrap();
    assert_eq!(error_2d, Array2::<f64>::zeros((6, 4)));
}

#[test]
fn test_absolute_error_values_and_shape_check() {
    let reference: Array2<f64> = Array2::from_shape_vec((2, 2), vec![1.0, -2.0, 3.0, 0.5]).unwrap();
    let predicted: Array2<f64> = Array2::from_shape_vec((2, 2), vec![1.5, -3.0, 3.0, -0.5]).unwrap();
    let error_2d: Array2<f64> = absolute_error(&reference, &predicted).unwrap();
    assert_eq!(error_2d, Array2::from_shape_vec((2, 2), vec![0.5, 1.0, 0.0, 1.0]).unwrap());

    let wrong: Array2<f64> = Array2::zeros((3, 2));
    assert!(matches!(absolute_error(&reference, &wrong), Err(Error::ShapeMismatch { .. })));
}

#[test]
fn test_render_maps_ones_scenario() {
    let (t_2d, x_2d) = test_grids(3, 3);
    let ones: Array2<f64> = Array2::ones((3, 3));

    let maps: ErrorMaps = render_maps(&ones, &ones, &t_2d, &x_2d, DEFAULT_N_LEVELS).unwrap();

    assert_eq!(maps.absolute_error.values, Array2::<f64>::zeros((3, 3)));
    assert_eq!(maps.absolute_error.value_range, (0.0, 0.0));
    // Constant fields collapse to one band
    assert_eq!(maps.absolute_error.levels.len(), 2);
    assert_eq!(maps.reference.levels.len(), 2);
    assert_eq!(maps.reference.value_range, (1.0, 1.0));
    assert_eq!(maps.absolute_error.normalised_level(0.0), 0.5);
}

#[test]
fn test_render_maps_independent_scales() {
    use approx::assert_abs_diff_eq;

    let n_time: usize = 25;
    let n_parameter: usize = 15;
    let (t_2d, x_2d) = test_grids(n_time, n_parameter);
    let reference: Array2<f64> = Array2::from_shape_fn((n_time, n_parameter), |(i_time, i_parameter)| (i_time as f64 * 0.2).sin() + i_parameter as f64 * 0.1);
    let predicted: Array2<f64> = reference.mapv(|value| 2.0 * value + 1.0);

    let maps: ErrorMaps = render_maps(&reference, &predicted, &t_2d, &x_2d, 10).unwrap();

    assert_abs_diff_eq!(maps.reference.value_range.0, *reference.min().unwrap(), epsilon = 1e-14);
    assert_abs_diff_eq!(maps.predicted.value_range.1, *predicted.max().unwrap(), epsilon = 1e-14);
    assert!(maps.predicted.value_range.1 > maps.reference.value_range.1);
    let error_2d: Array2<f64> = absolute_error(&reference, &predicted).unwrap();
    assert_abs_diff_eq!(maps.absolute_error.value_range.1, *error_2d.max().unwrap(), epsilon = 1e-14);

    for map in [&maps.reference, &maps.predicted, &maps.absolute_error] {
        assert_eq!(map.levels.len(), 11);
        assert!(!map.bands.is_empty());
        assert!(map.bands.len() <= 10);
        assert_abs_diff_eq!(map.x_range.0, 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(map.x_range.1, 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(map.y_range.0, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(map.y_range.1, 1.0, epsilon = 1e-12);
        assert_eq!(map.normalised_level(map.value_range.0), 0.0);
        assert_eq!(map.normalised_level(map.value_range.1), 1.0);
    }
    assert_eq!(maps.reference.title, "Exact u(x,t)");
    assert_eq!(maps.predicted.title, "PINN Prediction u(x,t)");
    assert_eq!(maps.absolute_error.title, "|Error|");
}

#[test]
fn test_painting_order_is_largest_first() {
    let n_time: usize = 21;
    let n_parameter: usize = 21;
    let (t_2d, x_2d) = test_grids(n_time, n_parameter);
    // A bump in the middle gives nested bands
    let bump: Array2<f64> = Array2::from_shape_fn((n_time, n_parameter), |(i_time, i_parameter)| {
        let d_time: f64 = i_time as f64 - 10.0;
        let d_parameter: f64 = i_parameter as f64 - 10.0;
        return (-(d_time.powi(2) + d_parameter.powi(2)) / 20.0).exp();
    });

    let maps: ErrorMaps = render_maps(&bump, &bump, &t_2d, &x_2d, 5).unwrap();
    let order: Vec<(usize, &Polygon<f64>)> = maps.reference.painting_order();
    assert!(order.len() >= 2);

    let areas: Vec<f64> = order
        .iter()
        .map(|(_i_band, polygon)| Polygon::new(polygon.exterior().clone(), vec![]).unsigned_area())
        .collect();
    for i_area in 1..areas.len() {
        assert!(areas[i_area - 1] >= areas[i_area]);
    }
}

#[test]
fn test_render_maps_rejects_mismatched_grid() {
    let (t_2d, _x_2d) = test_grids(4, 4);
    let x_2d: Array2<f64> = Array2::zeros((4, 5));
    let field: Array2<f64> = Array2::ones((4, 4));
    let result: Result<ErrorMaps, Error> = render_maps(&field, &field, &t_2d, &x_2d, 5);
    assert!(matches!(result, Err(Error::ShapeMismatch { ref name, .. }) if name == "parameter_grid"));
}
