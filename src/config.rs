//! Client settings loaded from `config/settings.json`

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::FishingError;
use crate::utils::path::get_data_dir;

/// How much room the UI has for the autofish attempt log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayDensity {
    Compact,
    #[default]
    Normal,
    Wide,
}

impl DisplayDensity {
    /// Maximum number of autofish log entries shown at this density
    pub fn max_log_entries(&self) -> usize {
        match self {
            DisplayDensity::Compact => 5,
            DisplayDensity::Normal => 10,
            DisplayDensity::Wide => 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReelConfig {
    pub api_base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    pub request_timeout_ms: u64,
    pub cast_animation_delay_ms: u64,
    pub default_miss_timeout_ms: u64,
    pub result_display_ms: u64,
    pub autofish_interval_ms: u64,
    pub autofish_failsafe_ms: u64,
    pub autofish_log_lifetime_ms: u64,
    pub display_density: DisplayDensity,
    pub refresh_stale_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autofish_max_consecutive_errors: Option<u32>,
    pub action_cooldown_ms: u64,
}

impl Default for ReelConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000/api".to_string(),
            api_token: None,
            request_timeout_ms: 10_000,
            cast_animation_delay_ms: 600,
            default_miss_timeout_ms: 2_500,
            result_display_ms: 2_000,
            autofish_interval_ms: 6_000,
            autofish_failsafe_ms: 15_000,
            autofish_log_lifetime_ms: 60_000,
            display_density: DisplayDensity::Normal,
            refresh_stale_ms: 30_000,
            autofish_max_consecutive_errors: None,
            action_cooldown_ms: 300,
        }
    }
}

impl ReelConfig {
    /// Durations for the session controller
    pub fn session_timing(&self) -> SessionTiming {
        SessionTiming {
            cast_animation_delay: Duration::from_millis(self.cast_animation_delay_ms),
            default_miss_timeout: Duration::from_millis(self.default_miss_timeout_ms),
            result_display: Duration::from_millis(self.result_display_ms),
            catch_cooldown: Duration::from_millis(self.action_cooldown_ms),
        }
    }

    /// Tuning for the autofish loop
    pub fn autofish_settings(&self) -> AutofishSettings {
        AutofishSettings {
            interval: Duration::from_millis(self.autofish_interval_ms),
            failsafe: Duration::from_millis(self.autofish_failsafe_ms),
            log_lifetime: Duration::from_millis(self.autofish_log_lifetime_ms),
            log_capacity: self.display_density.max_log_entries(),
            refresh_stale: Duration::from_millis(self.refresh_stale_ms),
            max_consecutive_errors: self.autofish_max_consecutive_errors,
        }
    }
}

/// Fixed durations used by the session controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    pub cast_animation_delay: Duration,
    pub default_miss_timeout: Duration,
    pub result_display: Duration,
    pub catch_cooldown: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        ReelConfig::default().session_timing()
    }
}

/// Tuning for the autofish loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutofishSettings {
    pub interval: Duration,
    /// Must exceed any expected round trip
    pub failsafe: Duration,
    pub log_lifetime: Duration,
    pub log_capacity: usize,
    pub refresh_stale: Duration,
    pub max_consecutive_errors: Option<u32>,
}

impl Default for AutofishSettings {
    fn default() -> Self {
        ReelConfig::default().autofish_settings()
    }
}

impl AutofishSettings {
    /// Reject durations the loop cannot run with
    pub fn validate(&self) -> Result<(), FishingError> {
        if self.interval.is_zero() {
            return Err(FishingError::Config(
                "autofish_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.failsafe.is_zero() {
            return Err(FishingError::Config(
                "autofish_failsafe_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration file path
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config").join("settings.json")
}

/// Load settings from the default location
pub fn load_config() -> ReelConfig {
    load_config_from(&get_config_path())
}

/// Load settings from `path`, falling back to defaults on any error
pub fn load_config_from(path: &Path) -> ReelConfig {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => {
            tracing::debug!("[CONFIG] No settings at {:?}, using defaults", path);
            return ReelConfig::default();
        }
    };

    match serde_json::from_str::<ReelConfig>(&content) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("[CONFIG] Ignoring malformed settings {:?}: {}", path, e);
            ReelConfig::default()
        }
    }
}

/// Save settings to `path`
pub fn save_config(path: &Path, config: &ReelConfig) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(config)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("settings.json"));
        assert_eq!(config, ReelConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{"api_base_url":"https://fish.example/api","display_density":"compact"}"#,
        )
        .unwrap();

        let config = load_config_from(&path);
        assert_eq!(config.api_base_url, "https://fish.example/api");
        assert_eq!(config.display_density, DisplayDensity::Compact);
        assert_eq!(config.cast_animation_delay_ms, 600);
        assert_eq!(config.autofish_settings().log_capacity, 5);
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_config_from(&path), ReelConfig::default());
    }

    #[test]
    fn test_zero_autofish_durations_rejected() {
        assert_eq!(AutofishSettings::default().validate(), Ok(()));

        let config = ReelConfig {
            autofish_interval_ms: 0,
            ..ReelConfig::default()
        };
        assert!(matches!(
            config.autofish_settings().validate(),
            Err(FishingError::Config(_))
        ));

        let config = ReelConfig {
            autofish_failsafe_ms: 0,
            ..ReelConfig::default()
        };
        assert!(matches!(
            config.autofish_settings().validate(),
            Err(FishingError::Config(_))
        ));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("settings.json");
        let config = ReelConfig {
            api_token: Some("secret".to_string()),
            autofish_max_consecutive_errors: Some(5),
            ..ReelConfig::default()
        };
        save_config(&path, &config).unwrap();
        assert_eq!(load_config_from(&path), config);
    }
}
