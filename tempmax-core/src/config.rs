use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

/// Environment variable overriding the prediction service base URL.
pub const API_BASE_URL_ENV: &str = "API_BASE_URL";

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(60_000);
pub const DEFAULT_MIN_DISPLAY: Duration = Duration::from_millis(1_500);

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_base_url = "http://10.0.0.5:8000"
/// request_timeout_ms = 60000
/// min_display_ms = 1500
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub min_display_ms: Option<u64>,
}

/// Fully resolved values handed to the service and the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub base_url: String,
    pub request_timeout: Duration,
    pub min_display: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            min_display: DEFAULT_MIN_DISPLAY,
        }
    }
}

impl ClientSettings {
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "tempmax", "tempmax-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn set_api_base_url(&mut self, url: &str) -> Result<()> {
        let url = normalize_url(Some(url))
            .ok_or_else(|| anyhow!("The API base URL must not be empty"))?;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(anyhow!("The API base URL must start with http:// or https://, got '{url}'"));
        }

        self.api_base_url = Some(url);
        Ok(())
    }

    /// Resolve the settings once at process start.
    ///
    /// Base URL precedence: `cli_override` > `env_override` (the value of
    /// [`API_BASE_URL_ENV`]) > `api_base_url` from the file > loopback
    /// default. Blank values are skipped at every layer.
    pub fn resolve(&self, cli_override: Option<&str>, env_override: Option<&str>) -> ClientSettings {
        let base_url = normalize_url(cli_override)
            .or_else(|| normalize_url(env_override))
            .or_else(|| normalize_url(self.api_base_url.as_deref()))
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        ClientSettings {
            base_url,
            request_timeout: self
                .request_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            min_display: self.min_display_ms.map(Duration::from_millis).unwrap_or(DEFAULT_MIN_DISPLAY),
        }
    }

    /// [`resolve`](Self::resolve) reading the override from the process environment.
    pub fn resolve_from_env(&self, cli_override: Option<&str>) -> ClientSettings {
        let env = std::env::var(API_BASE_URL_ENV).ok();
        self.resolve(cli_override, env.as_deref())
    }
}

fn normalize_url(url: Option<&str>) -> Option<String> {
    let trimmed = url?.trim().trim_end_matches('/');
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_loopback() {
        let settings = Config::default().resolve(None, None);

        assert_eq!(settings, ClientSettings::default());
        assert_eq!(settings.endpoint("/predict"), "http://127.0.0.1:8000/predict");
    }

    #[test]
    fn env_overrides_file() {
        let cfg = Config { api_base_url: Some("http://file:8000".into()), ..Default::default() };

        assert_eq!(cfg.resolve(None, Some("http://env:9000")).base_url, "http://env:9000");
        assert_eq!(cfg.resolve(None, None).base_url, "http://file:8000");
    }

    #[test]
    fn cli_overrides_env() {
        let cfg = Config::default();
        let settings = cfg.resolve(Some("https://cli.example/"), Some("http://env:9000"));

        assert_eq!(settings.base_url, "https://cli.example");
        assert_eq!(settings.endpoint("predict"), "https://cli.example/predict");
    }

    #[test]
    fn blank_values_are_skipped() {
        let cfg = Config { api_base_url: Some("   ".into()), ..Default::default() };
        assert_eq!(cfg.resolve(Some(""), Some(" ")).base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn timings_come_from_file() {
        let cfg = Config::from_toml("request_timeout_ms = 5000\nmin_display_ms = 0\n").unwrap();
        let settings = cfg.resolve(None, None);

        assert_eq!(settings.request_timeout, Duration::from_secs(5));
        assert_eq!(settings.min_display, Duration::ZERO);
    }

    #[test]
    fn set_api_base_url_validates_scheme() {
        let mut cfg = Config::default();

        let err = cfg.set_api_base_url("localhost:8000").unwrap_err();
        assert!(err.to_string().contains("must start with http://"));

        cfg.set_api_base_url("http://localhost:8000/").unwrap();
        assert_eq!(cfg.api_base_url.as_deref(), Some("http://localhost:8000"));
    }

    #[test]
    fn toml_roundtrip() {
        let mut cfg = Config::default();
        cfg.set_api_base_url("http://10.0.0.5:8000").unwrap();
        cfg.min_display_ms = Some(250);

        let text = toml::to_string_pretty(&cfg).unwrap();
        assert_eq!(Config::from_toml(&text).unwrap(), cfg);
    }
}
