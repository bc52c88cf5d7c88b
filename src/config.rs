use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

use crate::error::{GreenieError, Result};
use crate::message::{DEFAULT_ERROR_TEXT, TITLE_MAX_LENGTH};

/// Main configuration structure for the Greenie client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the assistant backend; chat turns go to `{base_url}/api/chat`
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_title_max_length")]
    pub title_max_length: usize,
    #[serde(default)]
    pub show_typing_indicator: bool,
    /// Sentence shown to the user when a turn fails
    #[serde(default = "default_error_message")]
    pub error_message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_sessions_table")]
    pub table: String,
}

fn default_title_max_length() -> usize {
    TITLE_MAX_LENGTH
}

fn default_error_message() -> String {
    DEFAULT_ERROR_TEXT.to_string()
}

fn default_sessions_table() -> String {
    "chat_sessions".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            title_max_length: default_title_max_length(),
            show_typing_indicator: false,
            error_message: default_error_message(),
        }
    }
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            table: default_sessions_table(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment variable overrides.
    /// Always returns a usable config; problems are logged.
    pub fn load() -> Self {
        let mut env_loaded = false;
        for path in [".env", "../.env"] {
            if dotenvy::from_path(path).is_ok() {
                tracing::info!("Loaded .env from: {}", path);
                env_loaded = true;
                break;
            }
        }
        if !env_loaded {
            tracing::debug!("No .env file found - continuing with env vars only");
        }

        let config_path =
            env::var("GREENIE_CONFIG_PATH").unwrap_or_else(|_| "greenie.yaml".to_string());
        let mut config = Self::from_file(Path::new(&config_path));

        config.apply_env_overrides();

        if let Err(e) = config.validate() {
            tracing::warn!("Config validation warnings: {} - continuing anyway", e);
        }

        config
    }

    fn from_file(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!("Config file not found at {} - using defaults", path.display());
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match Self::from_yaml(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to parse config file {}: {} - using defaults",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                tracing::error!(
                    "Failed to read config file {}: {} - using defaults",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    pub fn from_yaml(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(contents)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply overrides from a key lookup (the process environment in `load`)
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("GREENIE_BACKEND_URL") {
            self.backend.base_url = url;
        }

        if let Some(len) = lookup("GREENIE_TITLE_MAX_LENGTH") {
            match len.parse() {
                Ok(len) => self.chat.title_max_length = len,
                Err(e) => tracing::warn!("Ignoring GREENIE_TITLE_MAX_LENGTH={}: {}", len, e),
            }
        }
        if let Some(flag) = lookup("GREENIE_SHOW_TYPING") {
            self.chat.show_typing_indicator = matches!(
                flag.to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }

        if let Some(url) = lookup("SUPABASE_URL") {
            self.sessions.url = Some(url);
        }
        if let Some(key) = lookup("SUPABASE_KEY") {
            self.sessions.api_key = Some(key);
        }
        if let Some(table) = lookup("GREENIE_SESSIONS_TABLE") {
            self.sessions.table = table;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !is_http_url(&self.backend.base_url) {
            return Err(GreenieError::Config(format!(
                "backend.base_url must be an http(s) URL, got '{}'",
                self.backend.base_url
            )));
        }

        if self.chat.title_max_length == 0 {
            return Err(GreenieError::Config(
                "chat.title_max_length cannot be 0".to_string(),
            ));
        }

        if let Some(url) = &self.sessions.url {
            if !is_http_url(url) {
                return Err(GreenieError::Config(format!(
                    "sessions.url must be an http(s) URL, got '{url}'"
                )));
            }
            if self.sessions.api_key.as_deref().is_none_or(str::is_empty) {
                return Err(GreenieError::Config(
                    "sessions.api_key is required when sessions.url is set".to_string(),
                ));
            }
        }

        Ok(())
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = Config::default();
        assert_eq!(cfg.backend.base_url, "http://localhost:8000");
        assert_eq!(cfg.chat.title_max_length, 25);
        assert!(!cfg.chat.show_typing_indicator);
        assert_eq!(cfg.sessions.table, "chat_sessions");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let cfg = Config::from_yaml(
            r#"
backend:
  base_url: "https://greenie.example.org"
chat:
  show_typing_indicator: true
"#,
        )
        .unwrap();
        assert_eq!(cfg.backend.base_url, "https://greenie.example.org");
        assert!(cfg.chat.show_typing_indicator);
        assert_eq!(cfg.chat.title_max_length, 25);
        assert_eq!(cfg.chat.error_message, DEFAULT_ERROR_TEXT);
        assert!(cfg.sessions.url.is_none());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("GREENIE_BACKEND_URL", "http://10.0.0.2:9000"),
            ("GREENIE_TITLE_MAX_LENGTH", "40"),
            ("GREENIE_SHOW_TYPING", "yes"),
            ("SUPABASE_URL", "https://db.example.org"),
            ("SUPABASE_KEY", "anon"),
        ]
        .into_iter()
        .collect();

        let mut cfg = Config::default();
        cfg.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(cfg.backend.base_url, "http://10.0.0.2:9000");
        assert_eq!(cfg.chat.title_max_length, 40);
        assert!(cfg.chat.show_typing_indicator);
        assert_eq!(cfg.sessions.url.as_deref(), Some("https://db.example.org"));
        assert_eq!(cfg.sessions.api_key.as_deref(), Some("anon"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_bad_numeric_override_is_ignored() {
        let mut cfg = Config::default();
        cfg.apply_overrides(|key| (key == "GREENIE_TITLE_MAX_LENGTH").then(|| "lots".to_string()));
        assert_eq!(cfg.chat.title_max_length, 25);
    }

    #[test]
    fn test_validation_failures() {
        let mut cfg = Config::default();
        cfg.backend.base_url = "localhost:8000".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.sessions.url = Some("https://db.example.org".to_string());
        assert!(cfg.validate().is_err());
        cfg.sessions.api_key = Some("anon".to_string());
        assert!(cfg.validate().is_ok());
    }
}
