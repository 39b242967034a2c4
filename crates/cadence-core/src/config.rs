use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::domain::POMODORO_PLAN_NAME;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("read error: {source}")]
    Read {
        #[from]
        source: std::io::Error,
    },

    #[error("TOML parse error: {source}")]
    Parse {
        #[from]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub timer: TimerConfig,
    pub notifications: NotificationConfig,
    pub tray: TrayConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    pub tick_interval_millis: u64,
    pub default_plan: String,
    pub default_total_work_minutes: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub sound_enabled: bool,
    pub urgency: NotificationUrgency,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationUrgency {
    Low,
    #[default]
    Normal,
    Critical,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TrayConfig {
    pub enabled: bool,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_interval_millis: 1000,
            default_plan: POMODORO_PLAN_NAME.to_string(),
            default_total_work_minutes: 120,
        }
    }
}

impl TimerConfig {
    /// Interval between countdown ticks; a zero value falls back to one second.
    pub fn tick_interval(&self) -> Duration {
        if self.tick_interval_millis == 0 {
            Duration::from_secs(1)
        } else {
            Duration::from_millis(self.tick_interval_millis)
        }
    }

    pub fn default_total_work_time(&self) -> Duration {
        Duration::from_secs(self.default_total_work_minutes * 60)
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sound_enabled: true,
            urgency: NotificationUrgency::Normal,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cadence")
            .join("config.toml")
    }

    pub fn data_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|directory| directory.join("cadence"))
    }

    pub fn plans_database_path() -> Option<PathBuf> {
        Self::data_dir().map(|directory| directory.join("plans.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sensible_values() {
        let config = Config::default();

        assert_eq!(config.timer.tick_interval_millis, 1000);
        assert_eq!(config.timer.default_plan, "POMODORO");
        assert_eq!(config.timer.default_total_work_minutes, 120);
        assert!(config.notifications.enabled);
        assert!(config.notifications.sound_enabled);
        assert!(!config.tray.enabled);
    }

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
            [timer]
            default_total_work_minutes = 90
        "#;

        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.timer.default_total_work_minutes, 90);
        assert_eq!(config.timer.tick_interval_millis, 1000);
        assert_eq!(config.timer.default_plan, "POMODORO");
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
            [timer]
            tick_interval_millis = 250
            default_plan = "deep-work"
            default_total_work_minutes = 240

            [notifications]
            enabled = false
            sound_enabled = false
            urgency = "critical"

            [tray]
            enabled = true
        "#;

        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.timer.tick_interval(), Duration::from_millis(250));
        assert_eq!(config.timer.default_plan, "deep-work");
        assert_eq!(
            config.timer.default_total_work_time(),
            Duration::from_secs(240 * 60)
        );
        assert!(!config.notifications.enabled);
        assert!(!config.notifications.sound_enabled);
        assert!(matches!(
            config.notifications.urgency,
            NotificationUrgency::Critical
        ));
        assert!(config.tray.enabled);
    }

    #[test]
    fn zero_tick_interval_falls_back_to_one_second() {
        let toml = r#"
            [timer]
            tick_interval_millis = 0
        "#;

        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.timer.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn unknown_urgency_is_a_parse_error() {
        let toml = r#"
            [notifications]
            urgency = "deafening"
        "#;

        assert!(toml::from_str::<Config>(toml).is_err());
    }
}
