//! Settings schema definitions.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// On-disk settings file. Every recognized key lives in the `[main]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsFile {
    pub main: Settings,
}

/// Runtime settings, immutable after startup.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Path of the LVS config file this controller reads and rewrites.
    #[serde(rename = "lvsConfigFilePath")]
    pub config_path: PathBuf,

    /// Label selector identifying members of the monitored pool.
    #[serde(rename = "labelToMonitorName")]
    pub label: String,

    /// Namespace the monitored pool lives in.
    #[serde(rename = "labelToMonitorNamespace")]
    pub namespace: String,

    /// Destination port the backends listen on.
    // historical key spelling, kept so existing settings files load unchanged
    #[serde(rename = "lvsDestionationPort")]
    pub destination_port: u16,

    /// Seconds to wait between ramp weight steps.
    #[serde(rename = "lvsSleepTime")]
    pub sleep_secs: u64,
}

impl Settings {
    /// Pause between two ramp steps.
    pub fn step_interval(&self) -> Duration {
        Duration::from_secs(self.sleep_secs)
    }
}
