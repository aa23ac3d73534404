use serde::Deserialize;
use std::fs;

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    /// Only rows whose process task equals this label feed the metrics.
    pub stow_task: String,
    /// Day-section calendar hours, inclusive.
    pub day_first_hour: usize,
    pub day_last_hour: usize,
    /// Hour the charting series starts at ("09시" first).
    pub series_first_hour: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            stow_task: "STOW(STOW)".to_string(),
            day_first_hour: 9,
            day_last_hour: 18,
            series_first_hour: 9,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LabelsConfig {
    pub unknown_worker: String,
    pub uncategorized_location: String,
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            unknown_worker: "이름 없음".to_string(),
            uncategorized_location: "(미지정)".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub labels: LabelsConfig,
}

pub fn load_config() -> Config {
    let config_path = dirs::config_dir()
        .map(|p| p.join("stowtrack/config.json"))
        .or_else(|| dirs::home_dir().map(|p| p.join(".config/stowtrack/config.json")));

    if let Some(path) = config_path {
        if path.exists() {
            if let Ok(content) = fs::read_to_string(&path) {
                if let Ok(config) = serde_json::from_str(&content) {
                    return config;
                }
            }
        }
    }

    Config::default()
}
