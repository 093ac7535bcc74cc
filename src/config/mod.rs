use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::core::bluetooth::DROID_NAME;

/// Droid configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DroidConfig {
    /// Advertised name the scanner matches on
    pub device_name: String,
    /// Give up scanning after this many seconds. Scans forever when unset.
    pub scan_timeout_secs: Option<u64>,
    /// Joystick radius used by the stick mapper
    pub stick_radius: f64,
}

impl Default for DroidConfig {
    fn default() -> Self {
        DroidConfig {
            device_name: DROID_NAME.to_string(),
            scan_timeout_secs: None,
            stick_radius: 100.0,
        }
    }
}

impl DroidConfig {
    /// Loads the config from a configuration file.
    pub async fn load(file_path: impl AsRef<Path>) -> Result<Self> {
        let file_path = file_path.as_ref();
        if !fs::try_exists(file_path).await.unwrap_or(false) {
            warn!("Droid config file not found at {:?}, using default.", file_path);
            return Ok(Self::default());
        }

        let config_json = fs::read_to_string(file_path).await?;
        let config = Self::from_json(&config_json)?;

        info!("Droid config loaded from {:?}", file_path);
        Ok(config)
    }

    pub fn from_json(config_json: &str) -> Result<Self> {
        Ok(serde_json::from_str(config_json)?)
    }

    pub fn scan_timeout(&self) -> Option<Duration> {
        self.scan_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = DroidConfig::from_json(r#"{ "scan_timeout_secs": 5 }"#).unwrap();
        assert_eq!(config.device_name, DROID_NAME);
        assert_eq!(config.scan_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.stick_radius, 100.0);
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        assert!(DroidConfig::from_json("{ device_name: 3 }").is_err());
    }

    #[tokio::test]
    async fn test_missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("droidkit-missing-config.json");
        let config = DroidConfig::load(&path).await.unwrap();
        assert_eq!(config, DroidConfig::default());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("droidkit-config-{}.json", std::process::id()));
        fs::write(&path, r#"{ "device_name": "bench droid", "stick_radius": 50.0 }"#)
            .await
            .unwrap();

        let config = DroidConfig::load(&path).await.unwrap();
        let _ = fs::remove_file(&path).await;

        assert_eq!(config.device_name, "bench droid");
        assert_eq!(config.stick_radius, 50.0);
        assert_eq!(config.scan_timeout_secs, None);
    }
}
