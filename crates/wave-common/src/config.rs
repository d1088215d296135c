//! Monitor configuration loaded from YAML.
//!
//! One file describes the whole deployment: where data and images live, which
//! wave-model product to fetch, the station registry, the schedule and the
//! upload target. The parsed [`MonitorConfig`] is passed explicitly to every
//! component.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Parameter, StationRegistry, WaveError, WaveResult};

/// Longest horizon the wave model produces (hours).
pub const MAX_FORECAST_HOURS: u32 = 149;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub observations: ObservationConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Missing or empty fails validation with `EmptyQuery`
    #[serde(default)]
    pub stations: StationRegistry,
}

/// Local directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Downloaded GRIB2 files (one subdirectory per day) and buoy text files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Rendered station images
    #[serde(default = "default_plot_dir")]
    pub plot_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_plot_dir() -> PathBuf {
    PathBuf::from("images")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            plot_dir: default_plot_dir(),
        }
    }
}

/// Wave-model source and plotting window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Product directory prefix; the run date (YYYYMMDD) is appended
    #[serde(default = "default_forecast_url")]
    pub base_url: String,
    /// File name template with a `{cycle:02}` placeholder
    #[serde(default = "default_file_pattern")]
    pub file_pattern: String,
    /// Inventory variables to keep in partial downloads
    #[serde(default = "default_variables")]
    pub variables: Vec<String>,
    /// Forecast hours plotted from each run
    #[serde(default = "default_horizon")]
    pub horizon_hours: u32,
    /// Days of past runs to plot
    #[serde(default = "default_history_days")]
    pub history_days: u32,
}

fn default_forecast_url() -> String {
    "https://nomads.ncep.noaa.gov/pub/data/nccf/com/glwu/prod/glwu.".to_string()
}

fn default_file_pattern() -> String {
    "glwu.grlc_2p5km.t{cycle:02}z.grib2".to_string()
}

fn default_variables() -> Vec<String> {
    Parameter::all()
        .iter()
        .map(|p| p.short_name().to_string())
        .collect()
}

fn default_horizon() -> u32 {
    84
}

fn default_history_days() -> u32 {
    5
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            base_url: default_forecast_url(),
            file_pattern: default_file_pattern(),
            variables: default_variables(),
            horizon_hours: default_horizon(),
            history_days: default_history_days(),
        }
    }
}

impl ForecastConfig {
    /// File name for a model cycle hour.
    pub fn file_name(&self, cycle: u32) -> String {
        self.file_pattern
            .replace("{cycle:02}", &format!("{:02}", cycle))
            .replace("{cycle}", &cycle.to_string())
    }
}

/// Observation feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationConfig {
    /// Directory holding `{station}.txt` realtime files
    #[serde(default = "default_buoy_url")]
    pub base_url: String,
}

fn default_buoy_url() -> String {
    "https://www.ndbc.noaa.gov/data/realtime2/".to_string()
}

impl Default for ObservationConfig {
    fn default() -> Self {
        Self {
            base_url: default_buoy_url(),
        }
    }
}

/// Wall-clock schedule (UTC).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Daily forecast download times, "HH:MM"
    #[serde(default = "default_forecast_times")]
    pub forecast_downloads: Vec<String>,
    /// Minutes past every hour to refresh observations, plot and upload
    #[serde(default = "default_plot_minutes")]
    pub plot_minutes: Vec<u32>,
}

fn default_forecast_times() -> Vec<String> {
    vec!["07:35".to_string(), "19:35".to_string()]
}

fn default_plot_minutes() -> Vec<u32> {
    vec![0, 30]
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            forecast_downloads: default_forecast_times(),
            plot_minutes: default_plot_minutes(),
        }
    }
}

/// Object store backend for rendered images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Amazon S3 or any S3-compatible service
    S3,
    /// Google Cloud Storage
    Gcs,
    /// Local directory (testing, or a synced folder)
    Local,
}

/// Upload target. Credentials come from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    /// Bucket name, or root directory for the local backend
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Folder images are placed in
    #[serde(default)]
    pub prefix: String,
    /// Custom endpoint for S3-compatible services
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub allow_http: bool,
}

fn default_backend() -> StorageBackend {
    StorageBackend::Local
}

fn default_bucket() -> String {
    "uploads".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            bucket: default_bucket(),
            prefix: String::new(),
            endpoint: None,
            allow_http: false,
        }
    }
}

impl MonitorConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> WaveResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            WaveError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;

        let config = Self::from_yaml(&content)?;
        debug!(
            path = %path.display(),
            stations = config.stations.len(),
            "Loaded monitor config"
        );
        Ok(config)
    }

    /// Parse and validate YAML text.
    pub fn from_yaml(yaml: &str) -> WaveResult<Self> {
        let config: MonitorConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every setting that can be checked without touching the network.
    pub fn validate(&self) -> WaveResult<()> {
        self.stations.validate()?;

        if self.forecast.horizon_hours == 0 || self.forecast.horizon_hours > MAX_FORECAST_HOURS {
            return Err(WaveError::Config(format!(
                "horizon_hours must be within 1..={}, got {}",
                MAX_FORECAST_HOURS, self.forecast.horizon_hours
            )));
        }

        if self.forecast.variables.is_empty() {
            return Err(WaveError::Config("no forecast variables configured".into()));
        }

        for time in &self.schedule.forecast_downloads {
            parse_hh_mm(time)?;
        }

        if let Some(minute) = self.schedule.plot_minutes.iter().find(|&&m| m > 59) {
            return Err(WaveError::Config(format!("invalid plot minute: {}", minute)));
        }

        Ok(())
    }
}

/// Parse an "HH:MM" wall-clock time.
pub fn parse_hh_mm(value: &str) -> WaveResult<(u32, u32)> {
    let invalid = || WaveError::InvalidTime(format!("expected HH:MM, got '{}'", value));

    let (h, m) = value.trim().split_once(':').ok_or_else(invalid)?;
    let hour: u32 = h.parse().map_err(|_| invalid())?;
    let minute: u32 = m.parse().map_err(|_| invalid())?;

    if hour > 23 || minute > 59 {
        return Err(invalid());
    }
    Ok((hour, minute))
}
