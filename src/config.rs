use crate::ResultBundle;
use crate::comparison::DEFAULT_N_LEVELS;
use std::path::PathBuf;

/// Default archive written by the inference stage
pub const DEFAULT_RESULTS_FILE: &str = "swing_PINN_results.npz";
pub const DEFAULT_TARGETS: [f64; 2] = [0.17, 0.18];

/// Where the result bundle comes from
#[derive(Debug, Clone)]
pub enum ResultSource {
    NpzFile(PathBuf),
    InMemory(ResultBundle),
}

/// What to compare
#[derive(Debug, Clone)]
pub struct ComparisonConfig {
    /// Requested parameter values, one figure column each, in this order
    pub targets: Vec<f64>,
    pub result_source: ResultSource,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        return ComparisonConfig {
            targets: DEFAULT_TARGETS.to_vec(),
            result_source: ResultSource::NpzFile(PathBuf::from(DEFAULT_RESULTS_FILE)),
        };
    }
}

/// How and where the figures are written
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub output_dir: PathBuf,
    pub comparison_file_name: String,
    pub error_maps_file_name: String,
    /// (width, height) in pixels
    pub comparison_size: (u32, u32),
    pub error_maps_size: (u32, u32),
    pub n_levels: usize,
    pub render_error_maps: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        return RenderSettings {
            output_dir: PathBuf::from("."),
            comparison_file_name: "swing_2x2_compare.png".to_string(),
            error_maps_file_name: "swing_error_maps.png".to_string(),
            comparison_size: (1200, 900),
            error_maps_size: (1800, 550),
            n_levels: DEFAULT_N_LEVELS,
            render_error_maps: true,
        };
    }
}

impl RenderSettings {
    pub fn comparison_path(&self) -> PathBuf {
        return self.output_dir.join(&self.comparison_file_name);
    }

    pub fn error_maps_path(&self) -> PathBuf {
        return self.output_dir.join(&self.error_maps_file_name);
    }
}

#[test]
fn test_default_config() {
    let config: ComparisonConfig = ComparisonConfig::default();
    assert_eq!(config.targets, vec![0.17, 0.18]);
    match config.result_source {
        ResultSource::NpzFile(path) => assert_eq!(path, PathBuf::from("swing_PINN_results.npz")),
        ResultSource::InMemory(_) => panic!("default source should be the npz archive"),
    }

    let settings: RenderSettings = RenderSettings::default();
    assert_eq!(settings.n_levels, 50);
    assert!(settings.render_error_maps);
    assert_eq!(settings.comparison_path(), PathBuf::from("./swing_2x2_compare.png"));
}
