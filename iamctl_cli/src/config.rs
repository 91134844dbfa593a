use crate::output::OutputFormat;
use crate::paths;
use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use iamctl_core::ClientConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Environment variable prefix, nested keys are separated by `__`
const ENV_PREFIX: &str = "IAMCTL_";

/// Longest password policy minimum the local backend accepts
const MAX_PASSWORD_LENGTH: usize = 128;

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub directory: DirectoryConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Settings for the bundled local directory backend
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DirectoryConfig {
    /// JSON snapshot path, defaults to the platform data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,
    pub password_min_length: usize,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct OutputConfig {
    pub default_format: String,
    pub color_enabled: bool,
    pub progress_enabled: bool,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            state_file: None,
            password_min_length: 8,
        }
    }
}

impl DirectoryConfig {
    /// Snapshot path with the platform default applied
    pub fn state_path(&self) -> PathBuf {
        self.state_file.clone().unwrap_or_else(paths::get_state_path)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_format: "human".to_string(),
            color_enabled: true,
            progress_enabled: true,
        }
    }
}

impl OutputConfig {
    /// Configured default format, `human` if the value is not recognised
    pub fn format(&self) -> OutputFormat {
        OutputFormat::from_string(&self.default_format).unwrap_or(OutputFormat::Human)
    }
}

impl AppConfig {
    /// Apply CLI argument overrides to the configuration
    pub fn apply_cli_overrides(&mut self, state_file: Option<PathBuf>) {
        if let Some(path) = state_file {
            self.directory.state_file = Some(path);
        }
    }
}

/// Configuration manager that handles XDG-compliant paths and layered configuration
pub struct ConfigManager {
    config_path: PathBuf,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config_path: paths::get_config_path(),
        }
    }

    /// Create a ConfigManager with a specific path (for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    pub fn get_config_path(&self) -> PathBuf {
        self.config_path.clone()
    }

    /// Load configuration with layered priority: ENV > File > Defaults
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::new();

        // Layer 1: Defaults
        figment = figment.merge(Serialized::defaults(AppConfig::default()));

        // Layer 2: Config file (if exists)
        if self.config_path.exists() {
            figment = figment.merge(Toml::file(&self.config_path));
        }

        // Layer 3: Environment variables
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        figment.extract().context("Failed to load configuration")
    }

    /// Get a configuration value by key (dot notation)
    pub fn get(&self, key: &str) -> Result<String> {
        let config = self.load()?;
        let value: toml::Value = toml::from_str(&toml::to_string(&config)?)?;

        let mut current = &value;
        for part in key.split('.') {
            match current {
                toml::Value::Table(table) => {
                    current = table
                        .get(part)
                        .ok_or_else(|| anyhow::anyhow!("Key '{}' is not set", key))?;
                }
                _ => anyhow::bail!("Invalid key path: {}", key),
            }
        }

        match current {
            toml::Value::String(s) => Ok(s.clone()),
            toml::Value::Integer(i) => Ok(i.to_string()),
            toml::Value::Float(f) => Ok(f.to_string()),
            toml::Value::Boolean(b) => Ok(b.to_string()),
            _ => anyhow::bail!("Value at '{}' is not a simple type", key),
        }
    }

    /// Set a configuration value by key (dot notation) and write the file
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parsed_value = Self::parse_config_value(key, value)?;

        let mut config = if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path).with_context(|| {
                format!("Failed to read {}", self.config_path.display())
            })?;
            toml::from_str(&content)?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };

        let parts: Vec<&str> = key.split('.').collect();
        let Some((last, sections)) = parts.split_last() else {
            anyhow::bail!("Empty key");
        };

        let mut current = &mut config;
        for part in sections {
            let toml::Value::Table(table) = current else {
                anyhow::bail!("Invalid key path: expected table at '{}'", part);
            };
            current = table
                .entry(part.to_string())
                .or_insert(toml::Value::Table(toml::map::Map::new()));
        }
        match current {
            toml::Value::Table(table) => {
                table.insert(last.to_string(), parsed_value);
            }
            _ => anyhow::bail!("Cannot set value on non-table"),
        }

        // The merged result must still extract
        Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Toml::string(&toml::to_string(&config)?))
            .extract::<AppConfig>()
            .with_context(|| format!("Invalid value for '{key}'"))?;

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.config_path, toml::to_string_pretty(&config)?)
            .with_context(|| format!("Failed to write {}", self.config_path.display()))?;

        Ok(())
    }

    /// List all configuration values that are set, sorted by key
    pub fn list(&self) -> Result<Vec<(String, String)>> {
        let config = self.load()?;
        let value: toml::Value = toml::from_str(&toml::to_string(&config)?)?;

        let mut items = Vec::new();
        Self::collect_values(&value, String::new(), &mut items);
        items.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(items)
    }

    fn collect_values(value: &toml::Value, prefix: String, items: &mut Vec<(String, String)>) {
        match value {
            toml::Value::Table(table) => {
                for (key, val) in table {
                    let new_prefix = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{prefix}.{key}")
                    };
                    Self::collect_values(val, new_prefix, items);
                }
            }
            toml::Value::String(s) => items.push((prefix, s.clone())),
            toml::Value::Integer(i) => items.push((prefix, i.to_string())),
            toml::Value::Float(f) => items.push((prefix, f.to_string())),
            toml::Value::Boolean(b) => items.push((prefix, b.to_string())),
            _ => {}
        }
    }

    /// Validate and convert a value for a known key
    fn parse_config_value(key: &str, value: &str) -> Result<toml::Value> {
        match key {
            "client.max_concurrency" => {
                let limit: i64 = value
                    .parse()
                    .context("max_concurrency must be a non-negative integer (0 = unbounded)")?;
                if limit < 0 {
                    anyhow::bail!("max_concurrency must not be negative");
                }
                Ok(toml::Value::Integer(limit))
            }
            "client.operation_timeout_secs" => {
                let secs: i64 = value
                    .parse()
                    .context("operation_timeout_secs must be a non-negative integer")?;
                if secs < 0 {
                    anyhow::bail!("operation_timeout_secs must not be negative");
                }
                Ok(toml::Value::Integer(secs))
            }
            "directory.password_min_length" => {
                let length: usize = value
                    .parse()
                    .context("password_min_length must be a positive integer")?;
                if length == 0 || length > MAX_PASSWORD_LENGTH {
                    anyhow::bail!(
                        "password_min_length must be between 1 and {MAX_PASSWORD_LENGTH}"
                    );
                }
                Ok(toml::Value::Integer(length as i64))
            }
            "directory.state_file" => {
                if value.trim().is_empty() {
                    anyhow::bail!("state_file must not be empty");
                }
                Ok(toml::Value::String(value.to_string()))
            }
            "output.default_format" => {
                OutputFormat::from_string(value)?;
                Ok(toml::Value::String(value.to_lowercase()))
            }
            "output.color_enabled" | "output.progress_enabled" => {
                let enabled: bool = value
                    .parse()
                    .context("Expected boolean value (true/false)")?;
                Ok(toml::Value::Boolean(enabled))
            }
            _ => anyhow::bail!("Unknown configuration key: {}", key),
        }
    }
}

/// Load the configuration from the default location
pub fn get_config() -> Result<AppConfig> {
    ConfigManager::new().load()
}
