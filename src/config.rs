// Client configuration.
// Layers defaults, an optional config.json, and environment overrides.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

pub const ENV_API_URL: &str = "SNAPDECK_API_URL";
pub const ENV_SESSION: &str = "SNAPDECK_SESSION";
pub const ENV_LOG: &str = "SNAPDECK_LOG";

/// Runtime configuration for the photo client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Base URL of the photo API, without a trailing slash.
    pub api_url: String,
    /// Path of the external login entry point.
    pub login_path: String,
    /// Value of the backend's `SESSION` cookie, if signed in.
    pub session_cookie: Option<String>,
    pub request_timeout_secs: u64,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:3001".to_string(),
            login_path: "/auth/github".to_string(),
            session_cookie: None,
            request_timeout_secs: 30,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the platform config directory and the environment.
    pub fn load() -> Result<Self> {
        let mut config = match config_path() {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        config.normalize()?;
        Ok(config)
    }

    /// Read a config file, falling back to defaults when it does not exist.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Apply overrides from a variable lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_url = url;
        }
        if let Some(session) = lookup(ENV_SESSION) {
            self.session_cookie = Some(session).filter(|s| !s.is_empty());
        }
        if let Some(level) = lookup(ENV_LOG) {
            self.log_level = level;
        }
    }

    fn normalize(&mut self) -> Result<()> {
        let trimmed = self.api_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(AppError::Config("api_url must not be empty".to_string()));
        }
        self.api_url = trimmed.to_string();

        if self.request_timeout_secs == 0 {
            return Err(AppError::Config(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }

        if !self.login_path.starts_with('/') {
            self.login_path = format!("/{}", self.login_path);
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "snapdeck")
}

/// Path of the optional config file (~/.config/snapdeck/config.json on Linux).
pub fn config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.json"))
}

/// Path of the log file written while the terminal UI is running.
pub fn log_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.cache_dir().join("snapdeck.log"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::from_file(&temp_dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{"apiUrl": "https://photos.example.com/"}"#).unwrap();

        let mut config = Config::from_file(&path).unwrap();
        config.normalize().unwrap();

        assert_eq!(config.api_url, "https://photos.example.com");
        assert_eq!(config.login_path, "/auth/github");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env(|name| match name {
            ENV_API_URL => Some("http://localhost:8080".to_string()),
            ENV_SESSION => Some("abc123".to_string()),
            _ => None,
        });

        assert_eq!(config.api_url, "http://localhost:8080");
        assert_eq!(config.session_cookie.as_deref(), Some("abc123"));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_empty_session_clears_cookie() {
        let mut config = Config {
            session_cookie: Some("stale".to_string()),
            ..Config::default()
        };
        config.apply_env(|name| (name == ENV_SESSION).then(String::new));
        assert_eq!(config.session_cookie, None);
    }

    #[test]
    fn test_normalize_rejects_empty_url() {
        let mut config = Config {
            api_url: " / ".to_string(),
            ..Config::default()
        };
        assert!(config.normalize().is_err());
    }

    #[test]
    fn test_normalize_prefixes_login_path() {
        let mut config = Config {
            login_path: "auth/github".to_string(),
            ..Config::default()
        };
        config.normalize().unwrap();
        assert_eq!(config.login_path, "/auth/github");
    }

    #[test]
    fn test_normalize_rejects_zero_timeout() {
        let mut config = Config {
            request_timeout_secs: 0,
            ..Config::default()
        };
        let err = config.normalize().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
