use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub schedule: ScheduleConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Used when `RUST_LOG` is unset.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "attendwise=info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// How far ahead recurring sessions are planned.
    pub generation_window_days: u32,
    /// Cap on occurrences produced by a single expansion.
    pub max_occurrences: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            generation_window_days: 30,
            max_occurrences: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// IANA zone label attached to output. Not used for arithmetic.
    pub timezone: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
        }
    }
}

impl Config {
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.logging.filter, "attendwise=info");
        assert_eq!(config.logging.format, LogFormat::Text);
        assert_eq!(config.schedule.generation_window_days, 30);
        assert_eq!(config.schedule.max_occurrences, 1000);
        assert_eq!(config.display.timezone, "UTC");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[schedule]\ngeneration_window_days = 14\n\n[logging]\nformat = \"json\""
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.schedule.generation_window_days, 14);
        assert_eq!(config.schedule.max_occurrences, 1000);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.filter, "attendwise=info");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[schedule]\ngeneration_window_days = \"soon\"").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse config file"));
    }
}
