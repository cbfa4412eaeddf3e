use crate::model::ConfigError;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Where a tabular report is read from.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SourceConfig {
    Url { url: String },
    File { path: PathBuf },
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplenishmentMode {
    /// Restock every category up to its maximum.
    #[default]
    ToMaximum,
    /// Only categories under their minimum, still topped up to the maximum.
    UrgentOnly,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelMode {
    #[default]
    Walking,
    Driving,
}

impl TravelMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TravelMode::Walking => "walking",
            TravelMode::Driving => "driving",
        }
    }
}

/// Supply rounds start at the base (the office/storeroom).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    pub origin: (f64, f64),
    pub travel_mode: TravelMode,
    pub return_to_base: bool,
    /// Google Maps accepts a limited number of stops per link.
    pub max_stops: usize,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            origin: (39.45702028460933, -0.38498336081567713),
            travel_mode: TravelMode::Walking,
            return_to_base: false,
            max_stops: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MastersConfig {
    /// APARTAMENTO, ALMACEN, optional LAT/LNG.
    pub apartments: PathBuf,
    /// APARTAMENTO, ZONA.
    #[serde(default)]
    pub zones: Option<PathBuf>,
    /// APARTAMENTO, CAFE_TIPO.
    #[serde(default)]
    pub coffee: Option<PathBuf>,
    /// Amenity, Minimo, Maximo, optional ALMACEN.
    #[serde(default)]
    pub thresholds: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub bookings: SourceConfig,
    pub stock: SourceConfig,
    pub masters: MastersConfig,
    #[serde(default)]
    pub cleaning: Option<SourceConfig>,
    #[serde(default)]
    pub mode: ReplenishmentMode,
    #[serde(default)]
    pub period_start: Option<NaiveDate>,
    #[serde(default = "default_period_days")]
    pub period_days: u32,
    /// Zones shown on the board and in the supply cart; empty means all.
    #[serde(default)]
    pub zones: Vec<String>,
    /// Apartments where the guest is received in person.
    #[serde(default)]
    pub presential_apartments: Vec<String>,
    #[serde(default)]
    pub export_path: Option<PathBuf>,
    #[serde(default)]
    pub routes: RouteConfig,
}

fn default_period_days() -> u32 {
    2
}

pub const MAX_PERIOD_DAYS: u32 = 14;

pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_string(),
        source,
    })?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_json::from_str(content)?;
    if !(1..=MAX_PERIOD_DAYS).contains(&config.period_days) {
        return Err(ConfigError::Invalid(format!(
            "period_days must be between 1 and {}, got {}",
            MAX_PERIOD_DAYS, config.period_days
        )));
    }
    if config.routes.max_stops == 0 {
        return Err(ConfigError::Invalid("routes.max_stops must be at least 1".into()));
    }
    Ok(config)
}
