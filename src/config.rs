use crate::error::ConfigError;
use crate::upload::Multiplier;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "dataset-multiplier.toml";

const MAX_BACKOFF_FACTOR: f64 = 10.0;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub polling: Polling,
    #[serde(default)]
    pub workflow: Workflow,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&raw, &path.display().to_string())
    }

    pub fn from_toml(raw: &str, origin: &str) -> Result<Self, ConfigError> {
        let cfg: Config = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api.base_url()?;
        if self.limits.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid("limits.max_upload_bytes must be > 0".into()));
        }
        if self.limits.accepted_extension.is_empty() {
            return Err(ConfigError::Invalid("limits.accepted_extension is empty".into()));
        }
        if !(1.0..=MAX_BACKOFF_FACTOR).contains(&self.polling.backoff_factor) {
            return Err(ConfigError::Invalid(format!(
                "polling.backoff_factor must be within 1.0..={MAX_BACKOFF_FACTOR}"
            )));
        }
        if self.polling.initial_interval_ms == 0 || self.polling.deadline_secs == 0 {
            return Err(ConfigError::Invalid(
                "polling.initial_interval_ms and polling.deadline_secs must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub environment: Environment,
    pub development_url: String,
    pub production_url: String,
    /// Overrides whichever URL `environment` selects.
    pub base_url_override: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            development_url: "http://localhost:8000/api".into(),
            production_url: "https://your-django-backend.onrender.com/api".into(),
            base_url_override: None,
            request_timeout_secs: 900,
        }
    }
}

impl ApiConfig {
    /// Base URL with a trailing slash, so relative joins keep the `/api` prefix.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let raw = match (&self.base_url_override, self.environment) {
            (Some(url), _) => url.as_str(),
            (None, Environment::Development) => self.development_url.as_str(),
            (None, Environment::Production) => self.production_url.as_str(),
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::Invalid("api base URL is empty".into()));
        }
        let with_slash = if trimmed.ends_with('/') {
            trimmed.to_string()
        } else {
            format!("{trimmed}/")
        };
        Url::parse(&with_slash)
            .map_err(|e| ConfigError::Invalid(format!("api base URL '{trimmed}': {e}")))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_upload_bytes: u64,
    pub accepted_extension: String,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_upload_bytes: 100 * 1024 * 1024,
            accepted_extension: ".zip".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Polling {
    pub initial_interval_ms: u64,
    pub max_interval_ms: u64,
    pub backoff_factor: f64,
    pub deadline_secs: u64,
}

impl Default for Polling {
    fn default() -> Self {
        Self {
            initial_interval_ms: 500,
            max_interval_ms: 5_000,
            backoff_factor: 2.0,
            deadline_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default)]
    pub default_multiplier: Multiplier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}
