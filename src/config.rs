use crate::aggregate::{AliasTable, InvalidValuePolicy};
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub aggregation: AggregationConfig,
    pub scale: ScaleConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    pub data_csv: PathBuf,
    pub boundaries: PathBuf, // .geojson, .json or .shp
    pub country_column: String,
    pub value_column: String,
    pub name_property: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            data_csv: PathBuf::from("data/global-air-pollution-dataset.csv"),
            boundaries: PathBuf::from("countries.geojson"),
            country_column: "Country".to_string(),
            value_column: "AQI Value".to_string(),
            name_property: "ADMIN".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AggregationConfig {
    pub invalid_values: InvalidValuePolicy,
    pub aliases: AliasTable,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScaleConfig {
    pub breakpoints: Vec<f64>,
    pub colors: Vec<String>, // Hex codes, one more than breakpoints
    pub fallback: String,
    pub labels: Vec<String>,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            breakpoints: vec![50.0, 100.0, 150.0, 200.0, 300.0],
            colors: ["#cbeef3", "#f49cbb", "#f26a8d", "#dd2d4a", "#880d1e", "#720026"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            fallback: "#ccc".to_string(),
            labels: [
                "Good (0–50)",
                "Moderate (51–100)",
                "Unhealthy for Sensitive Groups (101–150)",
                "Unhealthy (151–200)",
                "Very Unhealthy (201–300)",
                "Hazardous (301+)",
            ]
            .iter()
            .map(|l| l.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Svg,
    #[default]
    Html,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub projection_scale: f64,
    pub legend_offset: [f64; 2],
    pub legend_swatch: f64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("aqi-map.html"),
            format: OutputFormat::Html,
            width: 1400,
            height: 800,
            projection_scale: 120.0,
            legend_offset: [250.0, 400.0],
            legend_swatch: 20.0,
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }

    /// Falls back to the built-in defaults when `path` does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            info!("Config file {:?} not found, using defaults", path);
            Ok(Self::default())
        }
    }
}
