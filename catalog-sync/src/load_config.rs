/// `load_config` module: Loads an optional static YAML config and merges environment
/// variables into the settings the CLI needs.
///
/// This module is the only place where user-supplied YAML and environment values are
/// parsed and mapped to strongly-typed structs.
///
/// # Responsibilities
/// - Parse the optional YAML file (`shop`, `data`, `logging` sections; every key optional)
/// - Overlay environment variables, which always win over the file
/// - Keep credentials out of the file: username and password come from the environment only
/// - Produce clear diagnostics naming the offending setting on any failure
///
/// # Environment
/// `SHOPWARE_URL`, `SHOPWARE_API_USERNAME`, `SHOPWARE_API_PASSWORD`, `CSV_FILE_PATH`,
/// `CHECK_INTERVAL`, `LOG_LEVEL`, `LOG_FILE`.
///
/// # Errors
/// All errors in this module use `anyhow::Error` and are surfaced at the CLI boundary.
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use catalog_sync_core::config::{SyncConfig, DEFAULT_CHECK_INTERVAL};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing::{error, info};

use crate::client::ApiConfig;

pub const ENV_URL: &str = "SHOPWARE_URL";
pub const ENV_USERNAME: &str = "SHOPWARE_API_USERNAME";
pub const ENV_PASSWORD: &str = "SHOPWARE_API_PASSWORD";
pub const ENV_DATA_FILE: &str = "CSV_FILE_PATH";
pub const ENV_CHECK_INTERVAL: &str = "CHECK_INTERVAL";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
pub const ENV_LOG_FILE: &str = "LOG_FILE";

pub const DEFAULT_DATA_FILE: &str = "./data/products.csv";
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::INFO;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    shop: ShopSection,
    data: DataSection,
    logging: LoggingSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ShopSection {
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DataSection {
    file: Option<PathBuf>,
    check_interval_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct LoggingSection {
    level: Option<String>,
    file: Option<PathBuf>,
}

/// Connection settings as loaded; checked for completeness only by commands that talk to the shop.
#[derive(Clone, Default)]
pub struct ApiSettings {
    pub base_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl std::fmt::Debug for ApiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiSettings")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

impl ApiSettings {
    /// Complete connection settings, or an error naming the first missing variable.
    pub fn require(&self) -> Result<ApiConfig> {
        let base_url = self
            .base_url
            .as_deref()
            .with_context(|| format!("{ENV_URL} is not set (environment or shop.base_url)"))?;
        let username = self
            .username
            .clone()
            .with_context(|| format!("{ENV_USERNAME} environment variable not set"))?;
        let password = self
            .password
            .clone()
            .with_context(|| format!("{ENV_PASSWORD} environment variable not set"))?;

        Ok(ApiConfig {
            base_url: normalise_base_url(base_url),
            username,
            password,
        })
    }
}

/// Adds `https://` when no scheme is given and strips trailing slashes.
pub fn normalise_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LevelFilter,
    pub file: Option<PathBuf>,
}

/// Parses a level name case-insensitively; `warning` and `critical` are accepted
/// as aliases for `warn` and `error`.
pub fn parse_log_level(raw: &str) -> Result<LevelFilter> {
    let name = raw.trim().to_ascii_lowercase();
    let canonical = match name.as_str() {
        "warning" => "warn",
        "critical" => "error",
        other => other,
    };
    canonical.parse::<LevelFilter>().map_err(|_| {
        anyhow::anyhow!(
            "{ENV_LOG_LEVEL} must be one of off, error, warn, info, debug, trace; got {raw:?}"
        )
    })
}

/// Everything the CLI needs, merged from file and environment.
#[derive(Debug)]
pub struct CliConfig {
    pub api: ApiSettings,
    pub sync: SyncConfig,
    pub logging: LogConfig,
}

impl CliConfig {
    pub fn trace_loaded(&self) {
        info!(
            base_url = self.api.base_url.as_deref().unwrap_or("<unset>"),
            username_set = self.api.username.is_some(),
            password_set = self.api.password.is_some(),
            log_level = %self.logging.level,
            log_file = ?self.logging.file,
            "Loaded CliConfig"
        );
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Loads the optional YAML config file and overlays environment variables.
pub fn load_config(path: Option<&Path>) -> Result<CliConfig> {
    let raw = match path {
        Some(path_ref) => read_config_file(path_ref)?,
        None => {
            info!("No config file given, using environment and defaults");
            RawConfig::default()
        }
    };

    let check_interval = match env_var(ENV_CHECK_INTERVAL) {
        Some(var) => match var.trim().parse::<u64>() {
            Ok(secs) => Duration::from_secs(secs),
            Err(e) => {
                error!(error = ?e, var = %var, "CHECK_INTERVAL must be a whole number of seconds");
                anyhow::bail!("{ENV_CHECK_INTERVAL} must be a whole number of seconds: {e}");
            }
        },
        None => raw
            .data
            .check_interval_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_CHECK_INTERVAL),
    };
    if check_interval.is_zero() {
        anyhow::bail!("{ENV_CHECK_INTERVAL} must be greater than zero");
    }

    let data_file = env_var(ENV_DATA_FILE)
        .map(PathBuf::from)
        .or(raw.data.file)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE));

    let api = ApiSettings {
        base_url: env_var(ENV_URL).or(raw.shop.base_url),
        username: env_var(ENV_USERNAME),
        password: env_var(ENV_PASSWORD),
    };

    let level = match env_var(ENV_LOG_LEVEL).or(raw.logging.level) {
        Some(name) => parse_log_level(&name).map_err(|e| {
            error!(level = %name, "Unknown log level");
            e
        })?,
        None => DEFAULT_LOG_LEVEL,
    };
    let logging = LogConfig {
        level,
        file: env_var(ENV_LOG_FILE).map(PathBuf::from).or(raw.logging.file),
    };

    info!(
        data_file = %data_file.display(),
        check_interval_secs = check_interval.as_secs(),
        "Config loaded and merged successfully"
    );

    Ok(CliConfig {
        api,
        sync: SyncConfig::new(data_file).with_check_interval(check_interval),
        logging,
    })
}

fn read_config_file(path_ref: &Path) -> Result<RawConfig> {
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    // An empty file is a valid "all defaults" config.
    if config_content.trim().is_empty() {
        return Ok(RawConfig::default());
    }

    match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            Ok(conf)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            Err(anyhow::anyhow!("Failed to parse config YAML: {e}"))
        }
    }
}
