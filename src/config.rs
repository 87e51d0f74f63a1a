use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SERVICE_URL_ENV: &str = "TRANSCRIBE_SERVICE_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service_url: String,
    pub timeout_secs: u64,
    pub upload_timeout_secs: u64,
    pub poll_interval_secs: u64,
    /// Largest file an upload may carry, in bytes.
    pub max_upload_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_url: "http://localhost:3000/api".to_string(),
            timeout_secs: 30,
            upload_timeout_secs: 3600,
            poll_interval_secs: 3,
            max_upload_size: 100 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&get_config_path()?)?;
        if let Ok(url) = std::env::var(SERVICE_URL_ENV) {
            if !url.trim().is_empty() {
                config.service_url = url;
            }
        }
        Ok(config)
    }

    /// Reads the config at `path`, writing the defaults there first if it is missing.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let config = Config::default();
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(config_path, serde_json::to_string_pretty(&config)?)?;
            log::info!("Wrote default config to {}", config_path.display());
            return Ok(config);
        }

        let content = std::fs::read_to_string(config_path)
            .context("Failed to read config file")?;
        let config: Config = serde_json::from_str(&content)
            .context("Failed to parse config file")?;
        Ok(config)
    }

    pub fn with_url(service_url: impl Into<String>) -> Self {
        Self {
            service_url: service_url.into(),
            ..Default::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    /// `service_url` joined with an endpoint path.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.service_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("transcription-client"))
}

fn get_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.json"))
}
