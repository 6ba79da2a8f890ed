//! Weather controller settings. Loaded from RON; missing fields take defaults.

use crate::{WeatherCategory, WeatherError};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Shortest time a weather holds, in minutes.
    #[serde(default = "default_min_duration")]
    pub min_duration_minutes: f32,
    /// Longest time a weather holds, in minutes.
    #[serde(default = "default_max_duration")]
    pub max_duration_minutes: f32,
    /// Chance (percent) that the next weather is rain.
    #[serde(default = "default_chance_rain")]
    pub chance_rain: f32,
    /// Chance (percent) that the next weather is snow.
    #[serde(default = "default_chance_snow")]
    pub chance_snow: f32,
    /// Log the weather report at start and every `report_interval` seconds.
    #[serde(default = "default_true")]
    pub debug_report: bool,
    #[serde(default = "default_report_interval")]
    pub report_interval: f32,
    /// Weather used when the owner carries no stored tag.
    #[serde(default)]
    pub initial_weather: WeatherCategory,
    /// Whether the controller ticks. Overridden by the owner's `activate` property.
    #[serde(default)]
    pub active: bool,
}

fn default_min_duration() -> f32 {
    0.1
}
fn default_max_duration() -> f32 {
    0.2
}
fn default_chance_rain() -> f32 {
    15.0
}
fn default_chance_snow() -> f32 {
    30.0
}
fn default_true() -> bool {
    true
}
fn default_report_interval() -> f32 {
    30.0
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            min_duration_minutes: default_min_duration(),
            max_duration_minutes: default_max_duration(),
            chance_rain: default_chance_rain(),
            chance_snow: default_chance_snow(),
            debug_report: default_true(),
            report_interval: default_report_interval(),
            initial_weather: WeatherCategory::default(),
            active: false,
        }
    }
}

impl WeatherConfig {
    /// Read and sanitize a config file.
    pub fn load(path: &Path) -> Result<Self, WeatherError> {
        let data = std::fs::read_to_string(path).map_err(|source| WeatherError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = ron::from_str(&data).map_err(|source| WeatherError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config.sanitized())
    }

    /// Load config from `path`. If the file is missing or invalid, returns default config.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(c) => c,
            Err(WeatherError::Io { .. }) => Self::default(),
            Err(e) => {
                log::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Clamp values into a usable range: non-negative durations in order,
    /// chances in 0..=100 with rain + snow at most 100, positive report interval.
    pub fn sanitized(mut self) -> Self {
        let finite_or = |v: f32, d: f32| if v.is_finite() { v } else { d };

        self.min_duration_minutes = finite_or(self.min_duration_minutes, default_min_duration()).max(0.0);
        self.max_duration_minutes = finite_or(self.max_duration_minutes, default_max_duration()).max(0.0);
        if self.min_duration_minutes > self.max_duration_minutes {
            log::warn!(
                "Weather min duration {} > max {}, swapping",
                self.min_duration_minutes,
                self.max_duration_minutes
            );
            std::mem::swap(&mut self.min_duration_minutes, &mut self.max_duration_minutes);
        }

        self.chance_rain = finite_or(self.chance_rain, 0.0).clamp(0.0, 100.0);
        self.chance_snow = finite_or(self.chance_snow, 0.0).clamp(0.0, 100.0);
        if self.chance_rain + self.chance_snow > 100.0 {
            let snow = 100.0 - self.chance_rain;
            log::warn!(
                "Rain + snow chance exceeds 100% ({} + {}), snow reduced to {}",
                self.chance_rain,
                self.chance_snow,
                snow
            );
            self.chance_snow = snow;
        }

        if !(self.report_interval.is_finite() && self.report_interval > 0.0) {
            self.report_interval = default_report_interval();
        }
        self
    }

    /// Duration bounds in seconds.
    pub fn duration_range_secs(&self) -> (f32, f32) {
        (self.min_duration_minutes * 60.0, self.max_duration_minutes * 60.0)
    }
}
