//! Settings loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{Settings, SettingsFile};

/// Errors from loading or validating the settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("settings parse: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("settings invalid: {0}")]
    Invalid(&'static str),
}

/// Load and validate settings from a TOML file.
pub fn load_settings(path: &Path) -> Result<Settings, SettingsError> {
    let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let file: SettingsFile = toml::from_str(&content)?;
    validate(&file.main)?;
    Ok(file.main)
}

fn validate(settings: &Settings) -> Result<(), SettingsError> {
    if settings.config_path.as_os_str().is_empty() {
        return Err(SettingsError::Invalid("lvsConfigFilePath must not be empty"));
    }
    if settings.label.is_empty() {
        return Err(SettingsError::Invalid("labelToMonitorName must not be empty"));
    }
    if settings.namespace.is_empty() {
        return Err(SettingsError::Invalid(
            "labelToMonitorNamespace must not be empty",
        ));
    }
    if settings.destination_port == 0 {
        return Err(SettingsError::Invalid("lvsDestionationPort must not be 0"));
    }
    if settings.sleep_secs == 0 {
        return Err(SettingsError::Invalid("lvsSleepTime must be at least 1"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use super::*;

    const SAMPLE: &str = r#"
[main]
lvsConfigFilePath = "/etc/lvs/lvs.conf"
labelToMonitorName = "app=connector"
labelToMonitorNamespace = "default"
lvsDestionationPort = 8080
lvsSleepTime = 30
"#;

    fn write_settings(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_historical_key_names() {
        let file = write_settings(SAMPLE);
        let settings = load_settings(file.path()).unwrap();

        assert_eq!(settings.config_path.to_str(), Some("/etc/lvs/lvs.conf"));
        assert_eq!(settings.label, "app=connector");
        assert_eq!(settings.namespace, "default");
        assert_eq!(settings.destination_port, 8080);
        assert_eq!(settings.step_interval(), Duration::from_secs(30));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let error = load_settings(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(error, SettingsError::Io { .. }));
    }

    #[test]
    fn missing_key_is_a_parse_error() {
        let file = write_settings("[main]\nlvsSleepTime = 30\n");
        assert!(matches!(
            load_settings(file.path()),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn zero_port_is_rejected() {
        let file = write_settings(&SAMPLE.replace("8080", "0"));
        assert!(matches!(
            load_settings(file.path()),
            Err(SettingsError::Invalid(_))
        ));
    }

    #[test]
    fn zero_sleep_is_rejected() {
        let file = write_settings(&SAMPLE.replace("lvsSleepTime = 30", "lvsSleepTime = 0"));
        assert!(matches!(
            load_settings(file.path()),
            Err(SettingsError::Invalid(_))
        ));
    }
}
