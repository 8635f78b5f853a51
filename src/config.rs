//! Dashboard configuration loaded from TOML.
//!
//! ## Loading Order
//!
//! 1. `WELLDASH_CONFIG` environment variable (path to a TOML file)
//! 2. `welldash.toml` in the current working directory
//! 3. Built-in defaults
//!
//! Every section and key is optional; anything left out keeps its default.

use crate::analytics::{AnomalyThresholds, DeclineParams, ProductionMix};
use crate::error::ConfigError;
use crate::sample::{default_fields, FieldSpec, DEFAULT_STATUS_WEIGHTS};
use crate::types::WellStatus;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const CONFIG_ENV: &str = "WELLDASH_CONFIG";
pub const LOCAL_CONFIG: &str = "welldash.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub data: DataConfig,
    pub refresh: RefreshConfig,
    pub analytics: AnalyticsConfig,
    pub table: TableConfig,
    pub sample: SampleConfig,
    pub external: ExternalConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Bundled well data loaded at startup.
    pub wells_csv: PathBuf,
    /// Optional price data loaded at startup when the file exists.
    pub prices_csv: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            wells_csv: PathBuf::from("assets/data/south_sudan_wells.csv"),
            prices_csv: PathBuf::from("assets/data/prices.csv"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Tick period; 0 disables refreshing.
    pub interval_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self { interval_ms: 60_000 }
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Option<Duration> {
        (self.interval_ms > 0).then(|| Duration::from_millis(self.interval_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub anomaly_change_pct: f64,
    pub high_water_cut_pct: f64,
    pub monthly_decline: f64,
    pub forecast_months: usize,
    pub top_wells: usize,
    pub production_mix: ProductionMix,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        let thresholds = AnomalyThresholds::default();
        let decline = DeclineParams::default();
        Self {
            anomaly_change_pct: thresholds.change_pct,
            high_water_cut_pct: thresholds.water_cut_pct,
            monthly_decline: decline.monthly_decline,
            forecast_months: decline.months,
            top_wells: 5,
            production_mix: ProductionMix::default(),
        }
    }
}

impl AnalyticsConfig {
    pub fn thresholds(&self) -> AnomalyThresholds {
        AnomalyThresholds {
            change_pct: self.anomaly_change_pct,
            water_cut_pct: self.high_water_cut_pct,
        }
    }

    pub fn decline(&self) -> DeclineParams {
        DeclineParams {
            monthly_decline: self.monthly_decline,
            months: self.forecast_months,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub rows_per_page: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self { rows_per_page: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleConfig {
    /// Weights for Producing, Shut-in, Abandoned, Drilling.
    pub status_weights: Vec<f64>,
    pub fields: Vec<FieldSpec>,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            status_weights: DEFAULT_STATUS_WEIGHTS.to_vec(),
            fields: default_fields(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalConfig {
    /// EIA open data key. Without one the benchmark lookup is skipped.
    pub eia_api_key: Option<String>,
    pub eia_url: String,
    pub brent_series: String,
    pub wti_series: String,
    pub country_url: String,
    pub timeout_secs: u64,
}

impl Default for ExternalConfig {
    fn default() -> Self {
        Self {
            eia_api_key: None,
            eia_url: "https://api.eia.gov/series/".to_string(),
            brent_series: "PET.RBRTE.D".to_string(),
            wti_series: "PET.RWTC.D".to_string(),
            country_url: "https://restcountries.com/v3.1/name/south%20sudan?fullText=true"
                .to_string(),
            timeout_secs: 5,
        }
    }
}

impl DashboardConfig {
    /// Load using the standard search order, falling back to defaults.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from {}", CONFIG_ENV);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{} points to a non-existent file, falling back", CONFIG_ENV);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./{}", LOCAL_CONFIG);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG);
                }
            }
        }

        info!("No config file found, using built-in defaults");
        Self::default()
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let a = &self.analytics;
        if !(0.0..1.0).contains(&a.monthly_decline) {
            return Err(ConfigError::Invalid {
                field: "analytics.monthly_decline",
                reason: format!("{} is outside [0, 1)", a.monthly_decline),
            });
        }
        if a.forecast_months == 0 {
            return Err(ConfigError::Invalid {
                field: "analytics.forecast_months",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.table.rows_per_page == 0 {
            return Err(ConfigError::Invalid {
                field: "table.rows_per_page",
                reason: "must be at least 1".to_string(),
            });
        }
        let w = &self.sample.status_weights;
        if w.len() != WellStatus::GENERATED.len()
            || w.iter().any(|v| !v.is_finite() || *v < 0.0)
            || w.iter().sum::<f64>() <= 0.0
        {
            return Err(ConfigError::Invalid {
                field: "sample.status_weights",
                reason: format!(
                    "need {} non-negative weights with a positive sum, got {:?}",
                    WellStatus::GENERATED.len(),
                    w
                ),
            });
        }
        if let Some(f) = self.sample.fields.iter().find(|f| f.production_factor < 0.0) {
            return Err(ConfigError::Invalid {
                field: "sample.fields",
                reason: format!("negative production factor for {}", f.name),
            });
        }
        Ok(())
    }
}
