use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::account::Account;
use crate::flow::{DEFAULT_PLAN, FlowSettings};

const MAX_DEBOUNCE_MS: u64 = 5_000;
const MAX_DISMISS_DELAY_MS: u64 = 60_000;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpsellConfig {
    pub version: u32,
    pub api: ApiConfig,
    pub account: AccountConfig,
    #[serde(default)]
    pub upsell: UpsellSection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
    pub login: String,
    pub email: String,
    #[serde(default)]
    pub unlocked: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpsellSection {
    #[serde(default = "default_plan")]
    pub plan: String,
    #[serde(default)]
    pub enterprise: bool,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_dismiss_delay_ms")]
    pub dismiss_delay_ms: u64,
}

impl Default for UpsellSection {
    fn default() -> Self {
        Self {
            plan: default_plan(),
            enterprise: false,
            debounce_ms: default_debounce_ms(),
            dismiss_delay_ms: default_dismiss_delay_ms(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_plan() -> String {
    DEFAULT_PLAN.to_string()
}

fn default_debounce_ms() -> u64 {
    200
}

fn default_dismiss_delay_ms() -> u64 {
    1000
}

impl UpsellConfig {
    pub fn account(&self) -> Account {
        Account {
            login: self.account.login.clone(),
            email: self.account.email.clone(),
            unlocked_kactus: self.account.unlocked,
        }
    }

    pub fn flow_settings(&self) -> FlowSettings {
        FlowSettings {
            plan: self.upsell.plan.clone(),
            enterprise: self.upsell.enterprise,
            debounce: Duration::from_millis(self.upsell.debounce_ms),
            dismiss_delay: Duration::from_millis(self.upsell.dismiss_delay_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn api_base_url(&self) -> &str {
        self.api.base_url.trim_end_matches('/')
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not resolve home directory for config path")]
    HomeDirectoryUnavailable,
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {message}")]
    Validation { message: String },
}

pub fn resolve_config_path() -> anyhow::Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or(ConfigError::HomeDirectoryUnavailable)?;
    Ok(base_dirs
        .home_dir()
        .join(".config")
        .join("kactus-upsell")
        .join("config.toml"))
}

pub fn load_config(path: &Path) -> Result<UpsellConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let parsed: UpsellConfig = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    validate_config(&parsed)?;
    Ok(parsed)
}

pub fn validate_config(config: &UpsellConfig) -> Result<(), ConfigError> {
    if config.version != 1 {
        return Err(invalid("version must be 1"));
    }

    let base_url = config.api.base_url.trim();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(invalid("api.base_url must start with http:// or https://"));
    }

    if config.api.timeout_secs == 0 {
        return Err(invalid("api.timeout_secs must be greater than zero"));
    }

    if config.account.login.trim().is_empty() {
        return Err(invalid("account.login must be non-empty"));
    }

    if config.account.email.trim().is_empty() {
        return Err(invalid("account.email must be non-empty"));
    }

    if config.upsell.plan.trim().is_empty() {
        return Err(invalid("upsell.plan must be non-empty"));
    }

    if config.upsell.debounce_ms == 0 || config.upsell.debounce_ms > MAX_DEBOUNCE_MS {
        return Err(invalid(format!(
            "upsell.debounce_ms must be between 1 and {MAX_DEBOUNCE_MS}"
        )));
    }

    if config.upsell.dismiss_delay_ms > MAX_DISMISS_DELAY_MS {
        return Err(invalid(format!(
            "upsell.dismiss_delay_ms must be at most {MAX_DISMISS_DELAY_MS}"
        )));
    }

    Ok(())
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}
