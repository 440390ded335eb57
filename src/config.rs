use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    /// Per-user root folder; navigation never climbs above it
    #[serde(default)]
    pub root_path: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub move_overwrite: bool,
}

fn default_page_size() -> u32 {
    50
}

fn default_timeout_secs() -> u64 {
    30
}

impl Config {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("Failed to parse config")
    }

    pub fn load(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_yaml(&text)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Determine the config file path with fallback logic
pub fn get_config_path(cli_path: Option<String>) -> Result<PathBuf> {
    // If CLI argument provided, use it
    if let Some(path) = cli_path {
        let p = PathBuf::from(&path);
        if p.exists() {
            return Ok(p);
        } else {
            anyhow::bail!("Config file not found at specified path: {}", path);
        }
    }

    // Try ~/.config/fileshelf/config.yaml
    if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join("fileshelf").join("config.yaml");
        if config_path.exists() {
            return Ok(config_path);
        }
    }

    // Fallback to ./config.yaml
    let local_config = PathBuf::from("config.yaml");
    if local_config.exists() {
        return Ok(local_config);
    }

    let expected_path = if let Some(config_dir) = dirs::config_dir() {
        config_dir
            .join("fileshelf")
            .join("config.yaml")
            .display()
            .to_string()
    } else {
        "~/.config/fileshelf/config.yaml".to_string()
    };

    anyhow::bail!(
        "Config file not found. Expected locations:\n\
         1. {} (preferred)\n\
         2. ./config.yaml (fallback)\n\
         \n\
         Use --config <path> to specify a custom location.",
        expected_path
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_defaults() {
        let config = Config::from_yaml("base_url: http://localhost:5087/api\n").expect("valid config");
        assert_eq!(config.base_url, "http://localhost:5087/api");
        assert_eq!(config.token, None);
        assert_eq!(config.root_path, "");
        assert_eq!(config.page_size, 50);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(!config.move_overwrite);
    }

    #[test]
    fn test_full_config() {
        let yaml = "base_url: https://files.example.org/api\n\
                    token: abc123\n\
                    root_path: users/ann\n\
                    page_size: 100\n\
                    timeout_secs: 5\n\
                    move_overwrite: true\n";
        let config = Config::from_yaml(yaml).expect("valid config");
        assert_eq!(config.token.as_deref(), Some("abc123"));
        assert_eq!(config.root_path, "users/ann");
        assert_eq!(config.page_size, 100);
        assert_eq!(config.timeout_secs, 5);
        assert!(config.move_overwrite);
    }

    #[test]
    fn test_missing_base_url_rejected() {
        assert!(Config::from_yaml("page_size: 10\n").is_err());
    }

    #[test]
    fn test_explicit_missing_path_errors() {
        let err = get_config_path(Some("/definitely/not/here.yaml".to_string()))
            .expect_err("missing file");
        assert!(err.to_string().contains("not found"));
    }
}
