//! Configuration loader - YAML manifest + .env secrets

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use anyhow::Result;

use crate::projection::extract::{FIELD_AREA, FIELD_FACE, FIELD_PERCENT_X, FIELD_PERCENT_Y};
use crate::projection::vertex_index::PartitionBounds;
use crate::projection::{CoordinateRange, PercentAxis, SchemaProfile, SideSettings};

/// Main configuration loaded from projection.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub ranges: Ranges,
    pub profiles: HashMap<String, SchemaProfile>,
    pub mesh: MeshSettings,
    #[serde(default)]
    pub partition: PartitionBounds,
    #[serde(default)]
    pub sides: SideSettings,
    pub datasets: Vec<Dataset>,
    #[serde(default)]
    pub view: ViewSettings,
    /// Jitter seed; a fresh OS seed is used when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Physical extents of the flattened measurement images
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Ranges {
    pub vertical: CoordinateRange,
    pub depth: CoordinateRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshSettings {
    pub path: PathBuf,
    /// Decimal places kept when deduplicating vertices
    #[serde(default = "default_decimals")]
    pub decimals: i32,
    /// Shift the mesh so each axis starts at zero
    #[serde(default = "default_true")]
    pub align_to_origin: bool,
}

fn default_decimals() -> i32 {
    2
}

fn default_true() -> bool {
    true
}

/// A single measurement dataset definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    pub name: String,
    /// Workbook or JSON rows file, relative to the data directory
    pub file: PathBuf,
    pub profile: String,
    pub colormap: String,
    #[serde(default = "default_true")]
    pub visible: bool,
}

/// Camera and axis limits handed to the renderer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewSettings {
    pub x_lim: [f64; 2],
    pub y_lim: [f64; 2],
    pub z_lim: [f64; 2],
    pub elevation: f64,
    pub azimuth: f64,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            x_lim: [0.0, 40.0],
            y_lim: [-10.0, 30.0],
            z_lim: [-10.0, 30.0],
            elevation: 10.0,
            azimuth: -57.0,
        }
    }
}

/// Secrets loaded from .env
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub data_dir: String,
    pub log_dir: String,
    pub api_base: String,
}

impl Config {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Every dataset must name a known profile
    pub fn validate(&self) -> Result<()> {
        for dataset in &self.datasets {
            if !self.profiles.contains_key(&dataset.profile) {
                anyhow::bail!(
                    "Dataset '{}' uses unknown profile '{}'",
                    dataset.id,
                    dataset.profile
                );
            }
        }
        Ok(())
    }

    /// Get profile by name
    pub fn get_profile(&self, name: &str) -> Option<&SchemaProfile> {
        self.profiles.get(name)
    }

    /// Get dataset by ID
    pub fn get_dataset(&self, id: &str) -> Option<&Dataset> {
        self.datasets.iter().find(|d| d.id == id)
    }
}

impl Default for Config {
    /// The rat stomach setup: three vagal datasets on one surface mesh
    fn default() -> Self {
        let columns: HashMap<String, String> = [
            ("%x (distance from pylorus side)", FIELD_PERCENT_X),
            ("%y (distance from bottom)", FIELD_PERCENT_Y),
            ("Average IGLE Area (um²)", FIELD_AREA),
            ("Area Of Innervation", FIELD_AREA),
            ("Neuron Area Of Innervation (um²) -Convex Hull", FIELD_AREA),
            ("V/D", FIELD_FACE),
            ("specimen anatomical location", FIELD_FACE),
        ]
        .into_iter()
        .map(|(raw, canonical)| (raw.to_string(), canonical.to_string()))
        .collect();

        let mut profiles = HashMap::new();
        profiles.insert(
            "stomach".to_string(),
            SchemaProfile {
                columns,
                require_face: true,
                vertical_axis: PercentAxis::Y,
                depth_axis: PercentAxis::X,
            },
        );

        let dataset = |id: &str, name: &str, file: &str, colormap: &str| Dataset {
            id: id.to_string(),
            name: name.to_string(),
            file: PathBuf::from(file),
            profile: "stomach".to_string(),
            colormap: colormap.to_string(),
            visible: true,
        };

        Config {
            ranges: Ranges {
                vertical: CoordinateRange::new(24.6, 0.0),
                depth: CoordinateRange::new(0.0, 36.7),
            },
            profiles,
            mesh: MeshSettings {
                path: PathBuf::from("res/stom_surf_mesh.stl"),
                decimals: default_decimals(),
                align_to_origin: true,
            },
            partition: PartitionBounds::default(),
            sides: SideSettings::default(),
            datasets: vec![
                dataset(
                    "efferent",
                    "Efferent neurons",
                    "Pennsieve-dataset-12-version-3/files/derivative/Efferent_data.xlsx",
                    "Blues",
                ),
                dataset(
                    "igle",
                    "IGLE",
                    "Pennsieve-dataset-10-version-3/files/derivative/IGLE_data.xlsx",
                    "BuGn",
                ),
                dataset(
                    "ima",
                    "IMA",
                    "Pennsieve-dataset-11-version-3/files/derivative/IMA_analyzed_data.xlsx",
                    "PuRd",
                ),
            ],
            view: ViewSettings::default(),
            seed: None,
        }
    }
}

impl Secrets {
    /// Load secrets from .env file
    pub fn load() -> Self {
        dotenvy::dotenv().ok();

        Secrets {
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
            log_dir: std::env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            api_base: std::env::var("PENNSIEVE_API")
                .unwrap_or_else(|_| "https://api.pennsieve.io".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::Side;

    #[test]
    fn test_default_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.datasets.len(), 3);
        assert_eq!(config.partition.ventral_max, 9.0);
        assert_eq!(config.partition.dorsal_min, 8.7);
    }

    #[test]
    fn test_yaml_with_defaults() {
        let yaml = r#"
ranges:
  vertical: { min: 24.6, max: 0.0 }
  depth: { min: 0.0, max: 36.7 }
profiles:
  swapped:
    columns:
      "X %": "%x"
      "Y %": "%y"
      "Area": "area"
    vertical_axis: x
    depth_axis: y
mesh:
  path: res/mesh.stl
datasets:
  - id: efferent
    name: Efferent
    file: efferent.json
    profile: swapped
    colormap: Blues
seed: 42
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();

        let profile = config.get_profile("swapped").unwrap();
        assert_eq!(profile.vertical_axis, PercentAxis::X);
        assert!(!profile.require_face);
        assert_eq!(config.mesh.decimals, 2);
        assert!(config.mesh.align_to_origin);
        assert!(config.get_dataset("efferent").unwrap().visible);
        assert_eq!(config.sides.unlabelled, Side::Dorsal);
        assert_eq!(config.view, ViewSettings::default());
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn test_shipped_manifest_matches_defaults() {
        let config: Config = serde_yaml::from_str(include_str!("../projection.yaml")).unwrap();
        config.validate().unwrap();

        let defaults = Config::default();
        assert_eq!(config.sides, defaults.sides);
        assert_eq!(config.partition, defaults.partition);
        assert_eq!(
            config.profiles["stomach"].columns,
            defaults.profiles["stomach"].columns
        );
        assert_eq!(config.datasets.len(), defaults.datasets.len());
        for (shipped, default) in config.datasets.iter().zip(&defaults.datasets) {
            assert_eq!(shipped.file, default.file);
        }
    }

    #[test]
    fn test_default_datasets_live_in_downloads() {
        use crate::catalog::dataset_dir_name;

        let config = Config::default();
        let igle = config.get_dataset("igle").unwrap();
        assert!(igle.file.starts_with(dataset_dir_name(10, 3)));
        assert!(config.get_dataset("ima").unwrap().file.starts_with(dataset_dir_name(11, 3)));
        assert!(config.get_dataset("efferent").unwrap().file.starts_with(dataset_dir_name(12, 3)));
        assert!(config.get_dataset("missing").is_none());
    }

    #[test]
    fn test_unknown_profile_rejected() {
        let mut config = Config::default();
        config.datasets[0].profile = "missing".to_string();
        assert!(config.validate().is_err());
    }
}
