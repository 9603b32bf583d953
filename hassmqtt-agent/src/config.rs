//! Agent configuration
//!
//! Handles:
//! - MQTT broker settings
//! - Home Assistant device identity and display metadata
//! - Publish interval and enabled metrics
//!
//! Read from TOML at `$HASSMQTT_AGENT_CONFIG`, or the OS config directory.
//! Every field has a default, a missing file means "all defaults".

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "HASSMQTT_AGENT_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub mqtt: MqttConfig,
    pub device: DeviceConfig,
    pub publish: PublishConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub keep_alive_secs: u64,
    /// Replaces the generated client ID when set
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub namespace: String,
    /// Application prefix fed to `hassmqtt::client_id`
    pub client_prefix: String,
    /// Defaults to the short host name
    pub id: Option<String>,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub hw_version: String,
    pub sw_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub interval_secs: u64,
    /// Metric keys to publish, see `metrics::SystemMetric::key`
    pub metrics: Vec<String>,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "127.0.0.1".to_string(),
            broker_port: 1883,
            keep_alive_secs: 30,
            client_id: None,
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            namespace: "hassmqtt".to_string(),
            client_prefix: "hassmqtt-agent".to_string(),
            id: None,
            name: String::new(),
            manufacturer: String::new(),
            model: String::new(),
            hw_version: String::new(),
            sw_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            metrics: crate::metrics::SystemMetric::ALL
                .iter()
                .map(|m| m.key().to_string())
                .collect(),
        }
    }
}

impl DeviceConfig {
    /// Configured device id, or the host name up to its first dot
    pub fn device_id(&self) -> String {
        if let Some(id) = &self.id {
            return id.clone();
        }
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_default();
        match hostname.split('.').next() {
            Some(short) if !short.is_empty() => short.to_string(),
            _ => "unknown".to_string(),
        }
    }
}

impl AgentConfig {
    /// Load config from `$HASSMQTT_AGENT_CONFIG` or the OS-specific location
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_file_path()?;
        Self::load_from(&config_path).await
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: AgentConfig = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        if config.publish.interval_secs == 0 {
            anyhow::bail!("publish.interval_secs must be greater than zero");
        }
        Ok(config)
    }

    /// Get config file path, environment override first
    pub fn config_file_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }

        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        path.push("hassmqtt-agent");
        path.push("config.toml");
        Ok(path)
    }
}
