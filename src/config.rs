use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

const CLIENT_ID_VAR: &str = "CLIENT_ID";
const CLIENT_SECRET_VAR: &str = "CLIENT_SECRET";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Directory holding chart and analysis CSV files.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    pub client_id: Option<String>,
    pub client_secret: Option<String>,

    #[serde(default = "default_token_url")]
    pub token_url: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_billboard_url")]
    pub billboard_url: String,

    #[serde(default = "default_netease_url")]
    pub netease_url: String,

    #[serde(default = "default_browser_command")]
    pub browser_command: String,

    #[serde(default = "default_browser_args")]
    pub browser_args: Vec<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Everything the catalog client needs, handed over at construction.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
    pub api_base: String,
    pub request_timeout_secs: u64,
}

fn app_data_dir() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hit-charts");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir
}

fn default_db_path() -> String {
    app_data_dir()
        .join("project_database.db")
        .to_string_lossy()
        .to_string()
}

fn default_data_dir() -> String {
    app_data_dir().to_string_lossy().to_string()
}

fn default_token_url() -> String {
    "https://accounts.spotify.com/api/token".to_string()
}

fn default_api_base() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_billboard_url() -> String {
    "https://www.billboard.com/charts/year-end/hot-100-songs/".to_string()
}

fn default_netease_url() -> String {
    // The listing lives in this frame; the `#/discover/toplist` page only embeds it.
    "https://music.163.com/discover/toplist?id=2809513713".to_string()
}

fn default_browser_command() -> String {
    "chromium".to_string()
}

fn default_browser_args() -> Vec<String> {
    vec![
        "--headless".to_string(),
        "--disable-gpu".to_string(),
        "--virtual-time-budget=5000".to_string(),
        "--dump-dom".to_string(),
    ]
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            data_dir: default_data_dir(),
            client_id: None,
            client_secret: None,
            token_url: default_token_url(),
            api_base: default_api_base(),
            billboard_url: default_billboard_url(),
            netease_url: default_netease_url(),
            browser_command: default_browser_command(),
            browser_args: default_browser_args(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml_str(&content)?
        } else {
            let config = Config::default();
            config.save()?;
            config
        };

        config.apply_env_overrides(
            std::env::var(CLIENT_ID_VAR).ok(),
            std::env::var(CLIENT_SECRET_VAR).ok(),
        );
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hit-charts")
            .join("config.toml")
    }

    fn apply_env_overrides(&mut self, client_id: Option<String>, client_secret: Option<String>) {
        if let Some(id) = client_id.filter(|s| !s.is_empty()) {
            self.client_id = Some(id);
        }
        if let Some(secret) = client_secret.filter(|s| !s.is_empty()) {
            self.client_secret = Some(secret);
        }
    }

    pub fn data_file(&self, name: &str) -> PathBuf {
        Path::new(&self.data_dir).join(name)
    }

    pub fn catalog(&self) -> Result<CatalogConfig> {
        let client_id = self.client_id.clone().ok_or_else(|| {
            AppError::Config(format!("missing client_id (set {} or edit the config file)", CLIENT_ID_VAR))
        })?;
        let client_secret = self.client_secret.clone().ok_or_else(|| {
            AppError::Config(format!(
                "missing client_secret (set {} or edit the config file)",
                CLIENT_SECRET_VAR
            ))
        })?;

        Ok(CatalogConfig {
            client_id,
            client_secret,
            token_url: self.token_url.clone(),
            api_base: self.api_base.clone(),
            request_timeout_secs: self.request_timeout_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = Config::from_toml_str(
            r#"
            db_path = "/tmp/charts.db"
            client_id = "abc"
            "#,
        )
        .unwrap();

        assert_eq!(config.db_path, "/tmp/charts.db");
        assert_eq!(config.client_id.as_deref(), Some("abc"));
        assert_eq!(config.client_secret, None);
        assert_eq!(config.api_base, "https://api.spotify.com/v1");
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.browser_args.contains(&"--dump-dom".to_string()));
    }

    #[test]
    fn env_overrides_replace_file_credentials() {
        let mut config = Config::from_toml_str(
            r#"
            client_id = "from-file"
            client_secret = "secret-from-file"
            "#,
        )
        .unwrap();

        config.apply_env_overrides(Some("from-env".to_string()), Some(String::new()));

        assert_eq!(config.client_id.as_deref(), Some("from-env"));
        assert_eq!(config.client_secret.as_deref(), Some("secret-from-file"));
    }

    #[test]
    fn catalog_requires_both_credentials() {
        let mut config = Config::from_toml_str("").unwrap();
        config.client_id = Some("id".to_string());
        assert!(matches!(config.catalog(), Err(AppError::Config(_))));

        config.client_secret = Some("secret".to_string());
        let catalog = config.catalog().unwrap();
        assert_eq!(catalog.client_id, "id");
        assert_eq!(catalog.client_secret, "secret");
        assert_eq!(catalog.token_url, "https://accounts.spotify.com/api/token");
    }
}
