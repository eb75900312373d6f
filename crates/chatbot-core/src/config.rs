use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::client::DEFAULT_BACKEND_URL;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub backend_url: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    /// Load from an explicit path. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn save_backend_url(url: &str) -> Result<PathBuf> {
        let path = Self::get_config_path()?;
        let mut config = Self::load_from(&path).unwrap_or_default();
        config.backend_url = Some(url.to_string());
        config.save_to(&path)?;
        Ok(path)
    }

    /// Pick the endpoint: an explicit override wins, then the file, then
    /// the built-in default.
    pub fn resolve_backend_url(&self, cli_override: Option<&str>) -> String {
        non_blank(cli_override)
            .or_else(|| non_blank(self.backend_url.as_deref()))
            .unwrap_or(DEFAULT_BACKEND_URL)
            .to_string()
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("chatbot-widget").join("config.json"))
    }
}

fn non_blank(url: Option<&str>) -> Option<&str> {
    url.filter(|url| !url.trim().is_empty())
}
